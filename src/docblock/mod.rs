//! PHPDoc block parsing and the annotation engine.
//!
//! A doc comment is parsed into an [`AnnotationSet`]: a short description,
//! a long description and a map from lowercased tag name to every value
//! given for it.  The set of a declaration is materialised lazily by
//! [`Broker::annotations`](crate::Broker::annotations) and then cached.
//!
//! # Submodules
//!
//! - [`tags`]: comment text to tag map.
//! - [`templates`]: shared annotation blocks (`/**#@+ ... */ ... /**#@-*/`)
//!   merged into every declaration they enclose.
//! - [`inherit`]: `@copydoc` copying with cycle detection, `{@inheritdoc}`
//!   description inheritance and `@param`/`@return`/`@throws`/`@var`
//!   backfill from ancestors.

mod inherit;
mod tags;
mod templates;

use std::collections::BTreeMap;

use serde::Serialize;

pub use tags::parse_docblock;
pub use templates::merge_templates;

/// Pseudo tag name for the short description.
pub const SHORT_DESCRIPTION: &str = " short_description";
/// Pseudo tag name for the long description.
pub const LONG_DESCRIPTION: &str = " long_description";

/// Parsed documentation of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationSet {
    pub short_description: String,
    pub long_description: String,
    /// Lowercased tag name (without `@`) → values in source order.
    pub tags: BTreeMap<String, Vec<String>>,
}

impl AnnotationSet {
    pub fn is_empty(&self) -> bool {
        self.short_description.is_empty()
            && self.long_description.is_empty()
            && self.tags.is_empty()
    }

    /// Values of a tag, or of one of the two description pseudo tags.
    /// Tag names are matched case-insensitively, with or without `@`.
    pub fn annotation(&self, name: &str) -> Option<&[String]> {
        match name {
            SHORT_DESCRIPTION => Some(std::slice::from_ref(&self.short_description)),
            LONG_DESCRIPTION => Some(std::slice::from_ref(&self.long_description)),
            _ => {
                let name = name.trim_start_matches('@').to_ascii_lowercase();
                self.tags.get(&name).map(Vec::as_slice)
            }
        }
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        match name {
            SHORT_DESCRIPTION => !self.short_description.is_empty(),
            LONG_DESCRIPTION => !self.long_description.is_empty(),
            _ => self.annotation(name).is_some(),
        }
    }

    /// First value of a tag.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.annotation(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub(crate) fn push(&mut self, tag: &str, value: String) {
        self.tags.entry(tag.to_string()).or_default().push(value);
    }
}
