//! Static PHP reflection built from the token stream.
//!
//! Source units are tokenized, turned into declaration records by the
//! element builders in [`parser`], and registered with a [`Broker`].  The
//! broker answers registry queries directly and hands out reflection
//! views ([`ClassView`], [`MethodView`], ...) whose derived data is
//! computed lazily:
//!
//! - [`inheritance`] composes a type's effective member tables from its
//!   traits, parent chain and interfaces, and completes derived modifier
//!   bits once every ancestor is known.
//! - [`docblock`] materialises annotation sets: shared annotation blocks,
//!   `@copydoc`, `{@inheritdoc}` and tag backfill from ancestors.
//! - [`value`] folds default values and constant expressions.
//!
//! ```
//! use phpantom_reflection::Broker;
//!
//! let mut broker = Broker::new();
//! broker
//!     .register_source("<?php class Base { public function f() {} } class Child extends Base {}", None)
//!     .unwrap();
//! let child = broker.class("Child").unwrap();
//! assert_eq!(child.get_method("f").unwrap().declaring_class_name().as_str(), "Base");
//! ```
//!
//! Nothing here executes PHP.  Expressions that cannot be folded are kept
//! as source text.

pub mod broker;
pub mod config;
pub mod cursor;
pub mod docblock;
pub mod error;
pub mod inheritance;
pub mod lexer;
pub mod parser;
pub mod reflection;
pub mod resolution;
pub mod types;
pub mod util;
pub mod value;

pub use broker::{Broker, Lookup, SharedBroker};
pub use config::ReflectConfig;
pub use docblock::{AnnotationSet, parse_docblock};
pub use error::{ElementKind, Error, ParseError, ResolutionError, Result, SymbolKind};
pub use inheritance::{ComposedType, Lifecycle, MemberOrigin};
pub use lexer::tokenize;
pub use parser::{parse_source, parse_tokens};
pub use reflection::{
    AttributeValue, ClassView, ConstantView, FunctionView, MethodView, ParameterView,
    PropertyView, TypeSummary,
};
pub use types::{ClassModifiers, ElementKey, MemberModifiers, SymbolName, Visibility};
pub use value::ConstValue;
