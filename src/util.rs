/// Small string helpers shared by the builders and resolvers.

/// The last segment of a namespace-qualified name (`Foo\Bar` → `Bar`).
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Join a namespace and a relative name; the global namespace adds no
/// prefix.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace, name)
    }
}

/// Strip the `$` sigil from a variable token.
pub fn strip_sigil(variable: &str) -> &str {
    variable.strip_prefix('$').unwrap_or(variable)
}

/// Whether `word` equals one of PHP's case-insensitive pseudo names.
pub fn is_pseudo(word: &str, pseudo: &str) -> bool {
    word.eq_ignore_ascii_case(pseudo)
}
