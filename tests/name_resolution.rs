mod common;

use std::collections::HashMap;

use common::broker_with;
use phpantom_reflection::SymbolName;
use phpantom_reflection::resolution::{function_candidates, resolve_class_reference, resolve_name};
use phpantom_reflection::types::NO_NAMESPACE;

fn imports(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect()
}

// ─── resolve_name ───────────────────────────────────────────────────────────

#[test]
fn test_resolve_fully_qualified_ignores_imports_and_namespace() {
    let map = imports(&[("Model", "Other\\Model")]);
    assert_eq!(resolve_name("\\Model", &map, "App").as_str(), "Model");
    assert_eq!(resolve_name("\\A\\B", &map, "App").as_str(), "A\\B");
}

#[test]
fn test_resolve_alias_then_namespace() {
    let map = imports(&[("OA", "Swagger\\OpenAPI"), ("Model", "Illuminate\\Model")]);
    assert_eq!(resolve_name("Model", &map, "App").as_str(), "Illuminate\\Model");
    assert_eq!(
        resolve_name("OA\\Path\\Item", &map, "App").as_str(),
        "Swagger\\OpenAPI\\Path\\Item"
    );
    assert_eq!(resolve_name("Sub\\Thing", &map, "App").as_str(), "App\\Sub\\Thing");
}

#[test]
fn test_resolve_global_namespace_markers() {
    let map = HashMap::new();
    assert_eq!(resolve_name("Thing", &map, "").as_str(), "Thing");
    assert_eq!(resolve_name("Thing", &map, NO_NAMESPACE).as_str(), "Thing");
}

#[test]
fn test_resolve_alias_is_case_sensitive() {
    // Import lookup is exact-case, as the alias was written.
    let map = imports(&[("Model", "Illuminate\\Model")]);
    assert_eq!(resolve_name("model", &map, "App").as_str(), "App\\model");
}

// ─── resolve_class_reference ────────────────────────────────────────────────

#[test]
fn test_class_reference_pseudo_names() {
    let map = HashMap::new();
    let me = Some(SymbolName::new("App\\Child"));
    let base = Some(SymbolName::new("App\\Base"));
    assert_eq!(resolve_class_reference("self", &map, "App", me, base), me);
    assert_eq!(resolve_class_reference("Static", &map, "App", me, base), me);
    assert_eq!(resolve_class_reference("PARENT", &map, "App", me, base), base);
    assert_eq!(resolve_class_reference("self", &map, "App", None, None), None);
    assert_eq!(
        resolve_class_reference("Other", &map, "App", me, base),
        Some(SymbolName::new("App\\Other"))
    );
}

// ─── function_candidates ────────────────────────────────────────────────────

#[test]
fn test_function_candidates_fall_back_to_global() {
    let map = HashMap::new();
    assert_eq!(
        function_candidates("strlen", &map, "App"),
        vec![SymbolName::new("App\\strlen"), SymbolName::new("strlen")]
    );
    assert_eq!(
        function_candidates("strlen", &map, ""),
        vec![SymbolName::new("strlen")]
    );
}

#[test]
fn test_function_candidates_qualified_or_aliased_have_no_fallback() {
    let map = imports(&[("helper", "Lib\\helper")]);
    assert_eq!(
        function_candidates("helper", &map, "App"),
        vec![SymbolName::new("Lib\\helper")]
    );
    assert_eq!(
        function_candidates("Sub\\run", &map, "App"),
        vec![SymbolName::new("App\\Sub\\run")]
    );
}

// ─── Through the registry ───────────────────────────────────────────────────

#[test]
fn test_imports_do_not_leak_between_namespaces() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace First;\n",
        "use Vendor\\Base;\n",
        "class A extends Base {}\n",
        "namespace Second;\n",
        "class B extends Base {}\n",
    )]);
    let a = broker.get_type("First\\A").unwrap();
    assert_eq!(a.record().unwrap().parent.unwrap().as_str(), "Vendor\\Base");
    let b = broker.get_type("Second\\B").unwrap();
    assert_eq!(b.record().unwrap().parent.unwrap().as_str(), "Second\\Base");
}

#[test]
fn test_function_and_constant_imports_are_separate_tables() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App;\n",
        "use function Lib\\format;\n",
        "use const Lib\\LIMIT;\n",
        "use Lib\\format as FormatClass;\n",
        "class User {}\n",
    )]);
    let user = broker.get_type("App\\User").unwrap();
    let context = &user.record().unwrap().context;
    assert_eq!(
        context.function_aliases.get("format").map(String::as_str),
        Some("Lib\\format")
    );
    assert_eq!(
        context.constant_aliases.get("LIMIT").map(String::as_str),
        Some("Lib\\LIMIT")
    );
    assert_eq!(
        context.type_aliases.get("FormatClass").map(String::as_str),
        Some("Lib\\format")
    );
    assert!(!context.type_aliases.contains_key("format"));
}

#[test]
fn test_group_use_with_mixed_kinds() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App;\n",
        "use Lib\\{Thing, function helper, const MAX as LIMIT};\n",
        "class User extends Thing {}\n",
    )]);
    let record = broker.type_record(SymbolName::new("App\\User")).unwrap();
    assert_eq!(record.parent.unwrap().as_str(), "Lib\\Thing");
    assert_eq!(
        record.context.function_aliases.get("helper").map(String::as_str),
        Some("Lib\\helper")
    );
    assert_eq!(
        record.context.constant_aliases.get("LIMIT").map(String::as_str),
        Some("Lib\\MAX")
    );
}
