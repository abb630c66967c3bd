mod common;

use std::sync::Arc;

use common::broker_with;
use phpantom_reflection::{ElementKey, ResolutionError, SymbolName};

// ─── @param / @return backfill ──────────────────────────────────────────────

#[test]
fn test_missing_trailing_params_are_backfilled() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /**\n",
        "     * Save a record.\n",
        "     *\n",
        "     * @param int $id Parent id\n",
        "     * @param bool $force Parent force\n",
        "     * @return bool Saved\n",
        "     * @throws RuntimeException\n",
        "     */\n",
        "    public function save($id, $force) {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /**\n",
        "     * @param int $id Child id\n",
        "     */\n",
        "    public function save($id, $force) {}\n",
        "}\n",
    )]);
    let child = broker.class("Child").unwrap();
    let set = child.get_method("save").unwrap().annotations().unwrap();
    assert_eq!(
        set.annotation("param").unwrap(),
        ["int $id Child id", "bool $force Parent force"]
    );
    assert_eq!(set.first("return"), Some("bool Saved"));
    assert_eq!(set.first("throws"), Some("RuntimeException"));
    assert!(
        set.short_description.is_empty(),
        "descriptions are only inherited on request"
    );
}

#[test]
fn test_backfill_stops_at_parameter_count() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /**\n",
        "     * @param int $a\n",
        "     * @param int $b\n",
        "     * @param int $c\n",
        "     */\n",
        "    public function f($a, $b, $c = 0) {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /** @return void */\n",
        "    public function f($a, $b) {}\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_method("f").unwrap().annotations().unwrap();
    assert_eq!(set.annotation("param").unwrap(), ["int $a", "int $b"]);
    assert_eq!(set.first("return"), Some("void"), "own @return is kept");
}

#[test]
fn test_backfill_skips_names_already_documented() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /**\n",
        "     * @param int $a\n",
        "     * @param int $b\n",
        "     */\n",
        "    public function f($a, $b) {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /** @param string $b Out of order */\n",
        "    public function f($a, $b) {}\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_method("f").unwrap().annotations().unwrap();
    assert_eq!(set.annotation("param").unwrap(), ["string $b Out of order"]);
}

#[test]
fn test_interface_documentation_is_inherited() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "interface Repository {\n",
        "    /**\n",
        "     * Find by key.\n",
        "     *\n",
        "     * @param string $key\n",
        "     * @return object|null\n",
        "     */\n",
        "    public function find($key);\n",
        "}\n",
        "class Users implements Repository {\n",
        "    /** {@inheritdoc} */\n",
        "    public function find($key) {}\n",
        "}\n",
    )]);
    let set = broker.class("Users").unwrap().get_method("find").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "Find by key.");
    assert_eq!(set.first("param"), Some("string $key"));
    assert_eq!(set.first("return"), Some("object|null"));
}

#[test]
fn test_property_var_is_backfilled() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /** @var string[] */\n",
        "    protected $tags;\n",
        "}\n",
        "class Child extends Base {\n",
        "    /** Overridden. */\n",
        "    protected $tags;\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_property("tags").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "Overridden.");
    assert_eq!(set.first("var"), Some("string[]"));
}

// ─── {@inheritdoc} ──────────────────────────────────────────────────────────

#[test]
fn test_inline_inheritdoc_is_replaced_in_place() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "/**\n",
        " * Base service.\n",
        " *\n",
        " * Handles requests.\n",
        " */\n",
        "class Base {}\n",
        "/**\n",
        " * Child service.\n",
        " *\n",
        " * Before. {@inheritDoc} After.\n",
        " */\n",
        "class Child extends Base {}\n",
    )]);
    let set = broker.class("Child").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "Child service.");
    assert_eq!(set.long_description, "Before. Handles requests. After.");
}

#[test]
fn test_inheritdoc_tag_copies_both_descriptions() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /**\n",
        "     * Run it.\n",
        "     *\n",
        "     * At once.\n",
        "     */\n",
        "    public function run() {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /** @inheritdoc */\n",
        "    public function run() {}\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_method("run").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "Run it.");
    assert_eq!(set.long_description, "At once.");
}

#[test]
fn test_inheritdoc_without_ancestor_leaves_empty_text() {
    let broker = broker_with(&["<?php\n/** {@inheritdoc} */\nclass Lonely {}\n"]);
    let set = broker.class("Lonely").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "");
}

#[test]
fn test_inheritdoc_skips_undocumented_parent() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "interface Named {\n",
        "    /** The display name. */\n",
        "    public function name();\n",
        "}\n",
        "class Base { public function name() {} }\n",
        "class Child extends Base implements Named {\n",
        "    /** {@inheritdoc} */\n",
        "    public function name() {}\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_method("name").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "The display name.");
}

// ─── @copydoc ───────────────────────────────────────────────────────────────

#[test]
fn test_copydoc_copies_missing_tags() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App;\n",
        "class Source {\n",
        "    /**\n",
        "     * Source text.\n",
        "     * @param int $x\n",
        "     * @return int\n",
        "     */\n",
        "    public function compute($x) {}\n",
        "}\n",
        "class Target {\n",
        "    /**\n",
        "     * @copydoc Source::compute()\n",
        "     * @return float\n",
        "     */\n",
        "    public function compute($x) {}\n",
        "}\n",
    )]);
    let set = broker
        .class("App\\Target")
        .unwrap()
        .get_method("compute")
        .unwrap()
        .annotations()
        .unwrap();
    assert_eq!(set.short_description, "Source text.");
    assert_eq!(set.first("param"), Some("int $x"));
    assert_eq!(set.first("return"), Some("float"), "own tags win");
}

#[test]
fn test_copydoc_target_forms() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "/** Helper docs. */\n",
        "function helper() {}\n",
        "/** Limit docs. */\n",
        "const LIMIT = 10;\n",
        "/** Type docs. */\n",
        "class Docs {\n",
        "    /** Property docs. */\n",
        "    public $p;\n",
        "    /** Constant docs. */\n",
        "    const C = 1;\n",
        "    /** @copydoc self::$p */\n",
        "    public $q;\n",
        "    /** @copydoc helper() */\n",
        "    public function a() {}\n",
        "    /** @copydoc LIMIT */\n",
        "    public function b() {}\n",
        "    /** @copydoc Docs */\n",
        "    public function c() {}\n",
        "    /** @copydoc Docs::C */\n",
        "    public function d() {}\n",
        "}\n",
    )]);
    let docs = broker.class("Docs").unwrap();
    let short = |name: &str| {
        docs.get_method(name)
            .unwrap()
            .annotations()
            .unwrap()
            .short_description
            .clone()
    };
    assert_eq!(short("a"), "Helper docs.");
    assert_eq!(short("b"), "Limit docs.");
    assert_eq!(short("c"), "Type docs.");
    assert_eq!(short("d"), "Constant docs.");
    let q = docs.get_property("q").unwrap().annotations().unwrap();
    assert_eq!(q.short_description, "Property docs.");
}

#[test]
fn test_copydoc_parent_reference() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {\n",
        "    /** Base helper. */\n",
        "    protected function helper() {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /** @copydoc parent::helper() */\n",
        "    public function other() {}\n",
        "}\n",
    )]);
    let set = broker.class("Child").unwrap().get_method("other").unwrap().annotations().unwrap();
    assert_eq!(set.short_description, "Base helper.");
}

#[test]
fn test_copydoc_cycle_is_infinite_loop() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Loop {\n",
        "    /** @copydoc Loop::b() */\n",
        "    public function a() {}\n",
        "    /** @copydoc Loop::a() */\n",
        "    public function b() {}\n",
        "}\n",
    )]);
    let err = broker
        .class("Loop")
        .unwrap()
        .get_method("a")
        .unwrap()
        .annotations()
        .unwrap_err();
    match err {
        ResolutionError::InfiniteLoop { chain } => {
            assert_eq!(chain, ["Loop::a()", "Loop::b()", "Loop::a()"]);
        }
        other => panic!("expected InfiniteLoop, got {other:?}"),
    }
}

#[test]
fn test_copydoc_self_reference_is_infinite_loop() {
    let broker = broker_with(&["<?php\n/** @copydoc Me */\nclass Me {}\n"]);
    assert!(matches!(
        broker.class("Me").unwrap().annotations(),
        Err(ResolutionError::InfiniteLoop { .. })
    ));
}

#[test]
fn test_unresolved_copydoc_is_retried_after_registration() {
    let mut broker = broker_with(&["<?php\n/** @copydoc Later */\nclass Early {}\n"]);
    let before = broker.annotations(&ElementKey::Type(SymbolName::new("Early"))).unwrap();
    assert!(before.short_description.is_empty());

    broker
        .register_source("<?php\n/** Later docs. */\nclass Later {}\n", None)
        .unwrap();
    let after = broker.annotations(&ElementKey::Type(SymbolName::new("Early"))).unwrap();
    assert_eq!(after.short_description, "Later docs.");
}

// ─── Caching ────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_queries_return_the_same_set() {
    let mut broker = broker_with(&[concat!(
        "<?php\n",
        "class Helper {\n",
        "    /**\n",
        "     * Describe it.\n",
        "     * @see Other\n",
        "     */\n",
        "    public function describe() {}\n",
        "}\n",
        "class Base {\n",
        "    /**\n",
        "     * Save.\n",
        "     *\n",
        "     * Writes the row.\n",
        "     * @return bool Saved\n",
        "     */\n",
        "    public function save() {}\n",
        "}\n",
        "class Child extends Base {\n",
        "    /**\n",
        "     * Child save.\n",
        "     *\n",
        "     * First {@inheritdoc} then more.\n",
        "     * @copydoc Helper::describe()\n",
        "     */\n",
        "    public function save() {}\n",
        "}\n",
    )]);
    let key = ElementKey::Method(SymbolName::new("Child"), "save".to_string());
    let first = broker.annotations(&key).unwrap();
    let second = broker.annotations(&key).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.long_description, "First Writes the row. then more.");
    assert_eq!(first.first("return"), Some("bool Saved"));
    assert_eq!(first.first("see"), Some("Other"));

    broker.register_source("<?php class Unrelated {}", None).unwrap();
    let third = broker.annotations(&key).unwrap();
    assert!(Arc::ptr_eq(&first, &third), "complete results survive registration");
}

#[test]
fn test_incomplete_set_is_recomputed_after_registration() {
    let mut broker = broker_with(&[concat!(
        "<?php\n",
        "class Child extends Later {\n",
        "    /** {@inheritdoc} */\n",
        "    public function run() {}\n",
        "}\n",
    )]);
    let key = ElementKey::Method(SymbolName::new("Child"), "run".to_string());
    let first = broker.annotations(&key).unwrap();
    let again = broker.annotations(&key).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(first.short_description.is_empty());

    broker
        .register_source("<?php class Later { /** Runs. */ public function run() {} }", None)
        .unwrap();
    let after = broker.annotations(&key).unwrap();
    assert!(!Arc::ptr_eq(&first, &after));
    assert_eq!(after.short_description, "Runs.");
}

// ─── Templates ──────────────────────────────────────────────────────────────

#[test]
fn test_shared_annotation_block_applies_to_enclosed_members() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Config {\n",
        "    /**#@+\n",
        "     * @access protected\n",
        "     * @var string\n",
        "     */\n",
        "    /** Host name. */\n",
        "    public $host;\n",
        "    public $user;\n",
        "    /**#@-*/\n",
        "    /** Port number. */\n",
        "    public $port;\n",
        "}\n",
    )]);
    let config = broker.class("Config").unwrap();
    let host = config.get_property("host").unwrap().annotations().unwrap();
    assert_eq!(host.short_description, "Host name.");
    assert_eq!(host.first("access"), Some("protected"));
    let user = config.get_property("user").unwrap().annotations().unwrap();
    assert_eq!(user.first("var"), Some("string"));
    let port = config.get_property("port").unwrap().annotations().unwrap();
    assert!(!port.has_annotation("access"));
}

#[test]
fn test_annotations_for_unknown_element() {
    let broker = broker_with(&["<?php class A {}"]);
    let err = broker
        .annotations(&ElementKey::Method(SymbolName::new("A"), "nope".to_string()))
        .unwrap_err();
    assert!(err.is_does_not_exist());
}
