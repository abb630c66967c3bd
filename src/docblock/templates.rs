//! Shared annotation blocks.
//!
//! A `/**#@+ ... */` comment opens a template that applies to every
//! declaration until the matching `/**#@-*/`.  The builders record the
//! open templates on each declaration's [`Docblock`](crate::types::Docblock);
//! they are merged here when the annotation set is materialised.

use super::AnnotationSet;

/// Merge `templates` (outermost first) into `own`.
///
/// Template long descriptions are prepended to the element's own, and tag
/// values are concatenated with the template's values first.  The short
/// description is never taken from a template.
pub fn merge_templates(own: AnnotationSet, templates: &[AnnotationSet]) -> AnnotationSet {
    if templates.is_empty() {
        return own;
    }
    let mut merged = AnnotationSet {
        short_description: own.short_description,
        ..AnnotationSet::default()
    };

    let mut long: Vec<String> = templates
        .iter()
        .map(|t| t.long_description.clone())
        .filter(|l| !l.is_empty())
        .collect();
    if !own.long_description.is_empty() {
        long.push(own.long_description);
    }
    merged.long_description = long.join("\n");

    for template in templates {
        for (tag, values) in &template.tags {
            merged
                .tags
                .entry(tag.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
    for (tag, values) in own.tags {
        merged.tags.entry(tag).or_default().extend(values);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docblock::parse_docblock;

    #[test]
    fn template_contributes_long_description_and_tags_only() {
        let template = parse_docblock("/**#@+\n * Template short\n *\n * Template long\n * @author Ann\n */");
        let own = parse_docblock("/**\n * Own short\n *\n * Own long\n * @author Bob\n */");
        let merged = merge_templates(own, &[template]);
        assert_eq!(merged.short_description, "Own short");
        assert_eq!(merged.long_description, "Template long\nOwn long");
        assert_eq!(merged.annotation("author").unwrap(), ["Ann", "Bob"]);
    }
}
