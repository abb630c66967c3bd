/// Name resolution.
///
/// Maps a name as it appears in source to a fully-qualified
/// [`SymbolName`] using the import table (`use` statements) and the
/// enclosing namespace.  Everything here is pure: no registry access, no
/// I/O.
///
/// Precedence:
///
///   1. Fully-qualified names (`\PDO`) are returned with the leading `\`
///      stripped.
///   2. The first segment is looked up in the alias map.  A bare name that
///      matches an alias resolves to the alias target; a qualified name has
///      its first segment replaced (`OA\Endpoint` with `use Swagger\OpenAPI
///      as OA;` → `Swagger\OpenAPI\Endpoint`).
///   3. Otherwise the enclosing namespace is prepended, unless it is the
///      global namespace.
///
/// `self`, `parent` and `static` never reach [`resolve_name`]; callers
/// rewrite them first (see [`resolve_class_reference`]).
use std::collections::HashMap;

use crate::types::{NO_NAMESPACE, SymbolName};
use crate::util::{is_pseudo, qualify};

/// Resolve `reference` against `aliases` and `namespace`.
pub fn resolve_name(
    reference: &str,
    aliases: &HashMap<String, String>,
    namespace: &str,
) -> SymbolName {
    // ── Fully qualified name (leading `\`) ──────────────
    if let Some(stripped) = reference.strip_prefix('\\') {
        return SymbolName::new(stripped);
    }

    // ── Alias expansion of the first segment ────────────
    let (first, rest) = match reference.find('\\') {
        Some(idx) => (&reference[..idx], &reference[idx..]),
        None => (reference, ""),
    };
    if let Some(target) = aliases.get(first) {
        return SymbolName::new(&format!("{}{}", target, rest));
    }

    // ── Namespace prefixing ─────────────────────────────
    if namespace.is_empty() || namespace == NO_NAMESPACE {
        return SymbolName::new(reference);
    }
    SymbolName::new(&qualify(namespace, reference))
}

/// Resolve a type reference that may use `self`, `parent` or `static`.
///
/// `declaring` and `parent` are the enclosing type and its parent.  Returns
/// `None` for `parent` in a type without one, and for `self`/`static`
/// outside a type.
pub fn resolve_class_reference(
    reference: &str,
    aliases: &HashMap<String, String>,
    namespace: &str,
    declaring: Option<SymbolName>,
    parent: Option<SymbolName>,
) -> Option<SymbolName> {
    if is_pseudo(reference, "self") || is_pseudo(reference, "static") {
        return declaring;
    }
    if is_pseudo(reference, "parent") {
        return parent;
    }
    Some(resolve_name(reference, aliases, namespace))
}

/// Resolve a function or constant name.
///
/// Unlike classes there is a global fallback: an unqualified, unaliased
/// name inside a namespace yields both the namespaced candidate and the
/// global one, in that order.
pub fn function_candidates(
    reference: &str,
    aliases: &HashMap<String, String>,
    namespace: &str,
) -> Vec<SymbolName> {
    let primary = resolve_name(reference, aliases, namespace);
    let unqualified = !reference.contains('\\') && !aliases.contains_key(reference);
    let mut candidates = vec![primary];
    if unqualified && !namespace.is_empty() && namespace != NO_NAMESPACE {
        candidates.push(SymbolName::new(reference));
    }
    candidates
}
