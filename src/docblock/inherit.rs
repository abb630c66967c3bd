//! Cross-references and documentation inheritance.
//!
//! After a declaration's own comment and its templates are merged, three
//! directives are applied, in order:
//!
//! 1. `@copydoc Target` copies every tag (and each description) the
//!    element does not already have from `Target`: a type, `function()`,
//!    a constant, or `Type::method()`, `Type::$property`, `Type::CONST`,
//!    with `self::` and `parent::` accepted.  Targets are resolved and
//!    materialised recursively; an element already on the in-flight stack
//!    raises [`ResolutionError::InfiniteLoop`].
//! 2. `{@inheritdoc}` (or `{inheritdoc}`, or a bare `@inheritdoc` tag) in
//!    a type, method or property description is replaced with the first
//!    non-empty description from the parent, then the implemented
//!    interfaces.  No candidate leaves an empty string.
//! 3. Methods backfill missing trailing `@param` entries, `@return` and
//!    `@throws` from the nearest ancestor declaring the same method;
//!    properties backfill `@var`.
//!
//! A result that depended on an unresolved target or an incomplete
//! ancestor chain is cached for the current registry generation only and
//! retried after the next registration.

use std::sync::Arc;

use super::{AnnotationSet, merge_templates, parse_docblock};
use crate::broker::{Broker, CacheSlot};
use crate::error::{ResolutionError, SymbolKind};
use crate::resolution::{function_candidates, resolve_class_reference, resolve_name};
use crate::types::*;

const PLACEHOLDERS: &[&str] = &["{@inheritdoc}", "{inheritdoc}"];

/// Documentation source of one element after redirecting inherited
/// members to their declaring type.
struct ElementDoc {
    key: ElementKey,
    doc: Docblock,
    context: Arc<NameContext>,
    /// Declaring type, for `self::` and `parent::` targets.
    class: Option<SymbolName>,
    parameter_count: usize,
    /// Depends on ancestors that may still appear.
    is_final: bool,
}

impl Broker {
    /// The materialised annotation set of `key`.
    pub fn annotations(&self, key: &ElementKey) -> Result<Arc<AnnotationSet>, ResolutionError> {
        let mut stack = Vec::new();
        self.annotations_with(key, &mut stack).map(|(set, _)| set)
    }

    fn annotations_with(
        &self,
        key: &ElementKey,
        stack: &mut Vec<ElementKey>,
    ) -> Result<(Arc<AnnotationSet>, bool), ResolutionError> {
        let element = self.element_doc(key)?;
        let generation = self.generation();
        if let Some(slot) = self.annotations.lock().get(&element.key)
            && slot.is_fresh(generation)
        {
            return Ok((Arc::clone(&slot.value), slot.is_final));
        }
        if stack.contains(&element.key) {
            let mut chain: Vec<String> = stack.iter().map(ToString::to_string).collect();
            chain.push(element.key.to_string());
            return Err(ResolutionError::InfiniteLoop { chain });
        }

        stack.push(element.key.clone());
        let built = self.build_annotations(&element, stack);
        stack.pop();
        let (set, is_final) = built?;
        let set = Arc::new(set);

        self.annotations.lock().insert(
            element.key.clone(),
            CacheSlot {
                value: Arc::clone(&set),
                generation,
                is_final,
            },
        );
        Ok((set, is_final))
    }

    fn element_doc(&self, key: &ElementKey) -> Result<ElementDoc, ResolutionError> {
        let simple = |key: ElementKey, doc: &Docblock, context: &Arc<NameContext>| ElementDoc {
            key,
            doc: doc.clone(),
            context: Arc::clone(context),
            class: None,
            parameter_count: 0,
            is_final: true,
        };

        match key {
            ElementKey::Type(name) => {
                let Some(record) = self.type_record(*name) else {
                    // External stubs have no documentation yet.
                    self.get_type(name.as_str())?;
                    return Ok(ElementDoc {
                        is_final: false,
                        ..simple(key.clone(), &Docblock::default(), &Arc::default())
                    });
                };
                Ok(ElementDoc {
                    class: Some(record.name),
                    ..simple(key.clone(), &record.doc, &record.context)
                })
            }
            ElementKey::Function(name) => {
                let record = self.get_function(name.as_str())?;
                Ok(ElementDoc {
                    parameter_count: record.parameters.len(),
                    ..simple(key.clone(), &record.doc, &record.context)
                })
            }
            ElementKey::Constant(name) => {
                let record = self.get_constant(name.as_str())?;
                Ok(simple(key.clone(), &record.doc, &record.context))
            }
            ElementKey::Method(ty, name) => {
                let view = self.compose(ty.as_str())?;
                let method = view.method(name).ok_or_else(|| {
                    ResolutionError::missing(SymbolKind::Method, format!("{ty}::{name}"))
                })?;
                let owner = method.record.declaring_type;
                Ok(ElementDoc {
                    class: Some(owner),
                    parameter_count: method.record.parameters.len(),
                    ..simple(
                        ElementKey::Method(owner, method.record.name.clone()),
                        &method.record.doc,
                        &method.record.context,
                    )
                })
            }
            ElementKey::Property(ty, name) => {
                let view = self.compose(ty.as_str())?;
                let property = view.property(name).ok_or_else(|| {
                    ResolutionError::missing(SymbolKind::Property, format!("{ty}::${name}"))
                })?;
                let owner = property.record.declaring_type;
                Ok(ElementDoc {
                    class: Some(owner),
                    ..simple(
                        ElementKey::Property(owner, name.clone()),
                        &property.record.doc,
                        &property.record.context,
                    )
                })
            }
            ElementKey::ClassConstant(ty, name) => {
                let view = self.compose(ty.as_str())?;
                let constant = view.constant(name).ok_or_else(|| {
                    ResolutionError::missing(SymbolKind::ClassConstant, format!("{ty}::{name}"))
                })?;
                let owner = constant.record.declaring_type.unwrap_or(view.name);
                Ok(ElementDoc {
                    class: Some(owner),
                    ..simple(
                        ElementKey::ClassConstant(owner, name.clone()),
                        &constant.record.doc,
                        &constant.record.context,
                    )
                })
            }
        }
    }

    fn build_annotations(
        &self,
        element: &ElementDoc,
        stack: &mut Vec<ElementKey>,
    ) -> Result<(AnnotationSet, bool), ResolutionError> {
        let own = element
            .doc
            .comment
            .as_deref()
            .map(parse_docblock)
            .unwrap_or_default();
        let templates: Vec<_> = element
            .doc
            .templates
            .iter()
            .map(|t| parse_docblock(t))
            .collect();
        let mut set = merge_templates(own, &templates);
        let mut is_final = element.is_final;

        // 1. @copydoc
        let targets: Vec<String> = set
            .annotation("copydoc")
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.split_whitespace().next().map(str::to_string))
            .collect();
        for target in targets {
            match self.resolve_doc_reference(&target, element) {
                Some(target) => {
                    let (source, source_final) = self.annotations_with(&target, stack)?;
                    copy_missing(&mut set, &source);
                    is_final &= source_final;
                }
                None => is_final = false,
            }
        }

        // 2 and 3 need ancestors.
        if matches!(
            element.key,
            ElementKey::Type(_) | ElementKey::Method(..) | ElementKey::Property(..)
        ) {
            let (candidates, chain_complete) = self.inheritance_candidates(&element.key)?;
            is_final &= chain_complete;
            let mut sources = Vec::new();
            for candidate in candidates {
                if stack.contains(&candidate) {
                    is_final = false;
                    continue;
                }
                let (source, source_final) = self.annotations_with(&candidate, stack)?;
                is_final &= source_final;
                sources.push(source);
            }
            inherit_descriptions(&mut set, &sources);
            match element.key {
                ElementKey::Method(..) => backfill_method(&mut set, &sources, element.parameter_count),
                ElementKey::Property(..) => backfill_tag(&mut set, &sources, "var"),
                _ => {}
            }
        }
        Ok((set, is_final))
    }

    /// Ancestor elements to inherit documentation from, nearest first, and
    /// whether the ancestor chain they came from is complete.
    fn inheritance_candidates(
        &self,
        key: &ElementKey,
    ) -> Result<(Vec<ElementKey>, bool), ResolutionError> {
        let ty = match key {
            ElementKey::Type(ty) | ElementKey::Method(ty, _) | ElementKey::Property(ty, _) => *ty,
            _ => return Ok((Vec::new(), true)),
        };
        if self.type_record(ty).is_none() {
            return Ok((Vec::new(), false));
        }
        let view = self.compose(ty.as_str())?;
        let ancestors = view
            .parents
            .first()
            .into_iter()
            .chain(view.interfaces.iter())
            .copied()
            .filter(|a| self.type_record(*a).is_some());

        let mut candidates = Vec::new();
        for ancestor in ancestors {
            let candidate = match key {
                ElementKey::Type(_) => Some(ElementKey::Type(ancestor)),
                ElementKey::Method(_, name) => {
                    let a = self.compose(ancestor.as_str())?;
                    a.method(name)
                        .filter(|m| m.visibility() != Visibility::Private)
                        .map(|_| ElementKey::Method(ancestor, name.clone()))
                }
                ElementKey::Property(_, name) => {
                    let a = self.compose(ancestor.as_str())?;
                    a.property(name)
                        .filter(|p| p.visibility() != Visibility::Private)
                        .map(|_| ElementKey::Property(ancestor, name.clone()))
                }
                _ => None,
            };
            candidates.extend(candidate);
        }
        Ok((candidates, view.is_complete()))
    }

    /// Resolve a `@copydoc` target written in `element`'s scope.  Targets
    /// that do not exist (yet) yield `None`.
    fn resolve_doc_reference(&self, target: &str, element: &ElementDoc) -> Option<ElementKey> {
        let ctx = &element.context;
        let parent = element
            .class
            .and_then(|c| self.type_record(c))
            .and_then(|r| r.parent);

        if let Some((class, member)) = target.split_once("::") {
            let class = resolve_class_reference(
                class,
                &ctx.type_aliases,
                &ctx.namespace,
                element.class,
                parent,
            )?;
            let view = self.compose(class.as_str()).ok()?;
            if let Some(property) = member.strip_prefix('$') {
                return view
                    .property(property)
                    .map(|_| ElementKey::Property(class, property.to_string()));
            }
            if let Some(method) = member.strip_suffix("()") {
                return view
                    .method(method)
                    .map(|_| ElementKey::Method(class, method.to_string()));
            }
            if view.constant(member).is_some() {
                return Some(ElementKey::ClassConstant(class, member.to_string()));
            }
            return view
                .method(member)
                .map(|_| ElementKey::Method(class, member.to_string()));
        }

        if let Some(function) = target.strip_suffix("()") {
            return function_candidates(function, &ctx.function_aliases, &ctx.namespace)
                .into_iter()
                .find(|f| self.has_function(f.as_str()))
                .map(ElementKey::Function);
        }

        let ty = resolve_name(target, &ctx.type_aliases, &ctx.namespace);
        if self.type_record(ty).is_some() {
            return Some(ElementKey::Type(ty));
        }
        function_candidates(target, &ctx.constant_aliases, &ctx.namespace)
            .into_iter()
            .find(|c| self.has_constant(c.as_str()))
            .map(ElementKey::Constant)
    }
}

/// Copy every tag and description `target` lacks from `source`.
fn copy_missing(target: &mut AnnotationSet, source: &AnnotationSet) {
    if target.short_description.is_empty() {
        target.short_description = source.short_description.clone();
    }
    if target.long_description.is_empty() {
        target.long_description = source.long_description.clone();
    }
    for (tag, values) in &source.tags {
        if tag != "copydoc" && !target.tags.contains_key(tag) {
            target.tags.insert(tag.clone(), values.clone());
        }
    }
}

fn find_placeholder(text: &str) -> Option<(usize, usize)> {
    let lower = text.to_ascii_lowercase();
    PLACEHOLDERS
        .iter()
        .filter_map(|p| lower.find(p).map(|at| (at, p.len())))
        .min_by_key(|(at, _)| *at)
}

/// One left-to-right pass; replacements are never rescanned.
fn replace_placeholders(text: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    let mut rest = text;
    while let Some((at, len)) = find_placeholder(rest) {
        out.push_str(&rest[..at]);
        out.push_str(replacement);
        rest = &rest[at + len..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

fn inherit_descriptions(set: &mut AnnotationSet, sources: &[Arc<AnnotationSet>]) {
    let tag_requested = set.has_annotation("inheritdoc")
        && set.short_description.is_empty()
        && set.long_description.is_empty();
    let in_short = find_placeholder(&set.short_description).is_some();
    let in_long = find_placeholder(&set.long_description).is_some();
    if !(tag_requested || in_short || in_long) {
        return;
    }

    let source = sources
        .iter()
        .find(|s| !s.short_description.is_empty() || !s.long_description.is_empty());
    let (short, long) = source
        .map(|s| (s.short_description.as_str(), s.long_description.as_str()))
        .unwrap_or_default();

    if tag_requested {
        set.short_description = short.to_string();
        set.long_description = long.to_string();
        return;
    }
    if in_short {
        set.short_description = replace_placeholders(&set.short_description, short);
    }
    if in_long {
        set.long_description = replace_placeholders(&set.long_description, long);
    }
}

/// Parameter name of a `@param` value (`int $a desc` → `a`).
fn param_name(value: &str) -> Option<&str> {
    value
        .split_whitespace()
        .find(|w| w.starts_with('$') || w.starts_with("...$") || w.starts_with("&$"))
        .map(|w| w.trim_start_matches(['.', '&']).trim_start_matches('$'))
}

fn backfill_method(set: &mut AnnotationSet, sources: &[Arc<AnnotationSet>], parameter_count: usize) {
    for source in sources {
        let inherited = source.annotation("param").unwrap_or_default();
        let own = set.tags.entry("param".to_string()).or_default();
        // Only trailing entries the override does not document yet.
        let already: Vec<String> = own
            .iter()
            .filter_map(|v| param_name(v).map(str::to_string))
            .collect();
        for value in inherited.iter().skip(own.len()) {
            if own.len() >= parameter_count {
                break;
            }
            if param_name(value).is_some_and(|n| already.iter().any(|a| a == n)) {
                continue;
            }
            own.push(value.clone());
        }
        if own.is_empty() {
            set.tags.remove("param");
        }
    }
    backfill_tag(set, sources, "return");
    backfill_tag(set, sources, "throws");
}

fn backfill_tag(set: &mut AnnotationSet, sources: &[Arc<AnnotationSet>], tag: &str) {
    if set.tags.contains_key(tag) {
        return;
    }
    if let Some(values) = sources.iter().find_map(|s| s.annotation(tag)) {
        set.tags.insert(tag.to_string(), values.to_vec());
    }
}
