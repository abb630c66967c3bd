//! PHPDoc tag extraction.
//!
//! Lines are scanned after stripping the comment delimiters and the
//! leading `*` of each line.  Text up to the first blank line is the short
//! description, text after it the long description.  A line starting with
//! `@name` opens a tag; following non-tag lines continue its value.

use super::AnnotationSet;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Short,
    Long,
    Tags,
}

/// Parse a doc comment (`/** ... */`) or shared annotation block
/// (`/**#@+ ... */`).
pub fn parse_docblock(comment: &str) -> AnnotationSet {
    let inner = comment.trim();
    let inner = inner.strip_prefix("/**").unwrap_or(inner);
    let inner = inner
        .strip_prefix("#@+")
        .or_else(|| inner.strip_prefix("#@-"))
        .unwrap_or(inner);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    let mut set = AnnotationSet::default();
    let mut short: Vec<&str> = Vec::new();
    let mut long: Vec<&str> = Vec::new();
    let mut section = Section::Short;
    let mut current: Option<(String, String)> = None;

    for raw in inner.lines() {
        let line = raw.trim().trim_start_matches('*').trim();

        if let Some((name, value)) = split_tag(line) {
            if let Some((tag, value)) = current.take() {
                set.push(&tag, value);
            }
            current = Some((name.to_ascii_lowercase(), value.to_string()));
            section = Section::Tags;
            continue;
        }

        match section {
            Section::Short if line.is_empty() => {
                if !short.is_empty() {
                    section = Section::Long;
                }
            }
            Section::Short => short.push(line),
            Section::Long => long.push(line),
            Section::Tags => {
                if let Some((_, value)) = current.as_mut()
                    && !line.is_empty()
                {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line);
                }
            }
        }
    }
    if let Some((tag, value)) = current {
        set.push(&tag, value);
    }

    set.short_description = short.join(" ");
    while long.last().is_some_and(|l| l.is_empty()) {
        long.pop();
    }
    let first = long.iter().position(|l| !l.is_empty()).unwrap_or(long.len());
    set.long_description = long[first..].join("\n");
    set
}

/// `@name rest` → `(name, rest)`.  Names may contain `-`, `_`, `:` and
/// `\` (`@phpstan-param`, `@ORM\Column`).
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '\\')))
        .unwrap_or(rest.len());
    if end == 0 || !rest.starts_with(|c: char| c.is_alphabetic() || c == '\\') {
        return None;
    }
    let (name, value) = rest.split_at(end);
    Some((name, value.trim()))
}
