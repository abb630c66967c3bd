//! Per-element query surface.
//!
//! Views borrow the [`Broker`] and answer the questions a runtime
//! reflection API would: names, modifiers, ancestors, members, parameter
//! lists, default values and documentation.  They are cheap handles (an
//! `Arc` to the record or composed type plus the broker reference) and can
//! be created as often as needed.
//!
//! Every view also exposes its fields through an enumerated attribute
//! table (see [`attributes`]) for callers that select fields by name.

pub mod attributes;
mod class;
mod member;

pub use attributes::AttributeValue;
pub use class::{ClassView, TypeSummary};
pub use member::{ConstantView, FunctionView, MethodView, ParameterView, PropertyView};

use crate::broker::{Broker, Lookup};
use crate::error::ResolutionError;
use crate::types::SymbolName;

impl Broker {
    /// Reflect a class, interface or trait (or an external stub).
    pub fn class(&self, name: &str) -> Result<ClassView<'_>, ResolutionError> {
        let view = self.compose(name)?;
        Ok(ClassView::new(self, view))
    }

    /// Reflect a top-level function.
    pub fn function(&self, name: &str) -> Result<FunctionView<'_>, ResolutionError> {
        let record = self.get_function(name)?;
        Ok(FunctionView::new(self, record))
    }

    /// Reflect a global constant (declared with `const` or `define()`).
    pub fn constant(&self, name: &str) -> Result<ConstantView<'_>, ResolutionError> {
        let record = self.get_constant(name)?;
        Ok(ConstantView::global(self, record))
    }

    /// Views of every declared (non-stub) type, sorted by name.
    pub fn classes(&self) -> Result<Vec<ClassView<'_>>, ResolutionError> {
        self.types()
            .iter()
            .map(|record| self.class(record.name.as_str()))
            .collect()
    }

    pub(crate) fn class_of(&self, name: SymbolName) -> Result<Option<ClassView<'_>>, ResolutionError> {
        match self.get_type(name.as_str()) {
            Ok(Lookup::Found(_)) | Ok(Lookup::ExternalStub(_)) => self.class(name.as_str()).map(Some),
            Err(e) if e.is_does_not_exist() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
