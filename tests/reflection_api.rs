mod common;

use common::broker_with;
use phpantom_reflection::error::SymbolKind;
use phpantom_reflection::reflection::attributes::{ClassAttribute, MethodAttribute};
use phpantom_reflection::{AttributeValue, ConstValue, ResolutionError, SymbolName, Visibility};

// ─── Classes ────────────────────────────────────────────────────────────────

#[test]
fn test_class_names_and_location() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App\\Models;\n",
        "\n",
        "/** A user. */\n",
        "final class User\n",
        "{\n",
        "}\n",
    )]);
    let user = broker.class("App\\Models\\User").unwrap();
    assert_eq!(user.name().as_str(), "App\\Models\\User");
    assert_eq!(user.short_name(), "User");
    assert_eq!(user.namespace_name(), "App\\Models");
    assert!(user.in_namespace());
    assert!(user.is_final());
    assert_eq!(user.file_name(), Some("unit0.php"));
    assert_eq!(user.start_line(), 5);
    assert_eq!(user.end_line(), 7);
    assert_eq!(user.doc_comment(), Some("/** A user. */"));
}

#[test]
fn test_global_class_is_not_in_namespace() {
    let broker = broker_with(&["<?php class Plain {}"]);
    let plain = broker.class("Plain").unwrap();
    assert!(!plain.in_namespace());
    assert_eq!(plain.namespace_name(), "");
}

#[test]
fn test_ancestor_views() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "interface Marker {}\n",
        "trait Helps {}\n",
        "class Base {}\n",
        "class Child extends Base implements Marker { use Helps; }\n",
    )]);
    let child = broker.class("Child").unwrap();
    let parent = child.parent_class().unwrap().unwrap();
    assert_eq!(parent.name().as_str(), "Base");
    assert!(parent.parent_class().unwrap().is_none());

    let interfaces = child.interfaces().unwrap();
    assert_eq!(interfaces.len(), 1);
    assert!(interfaces[0].is_interface());
    let traits = child.traits().unwrap();
    assert!(traits[0].is_trait());
}

// ─── Methods ────────────────────────────────────────────────────────────────

#[test]
fn test_method_modifiers() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "abstract class Shape {\n",
        "    public function __construct() {}\n",
        "    public function __destruct() {}\n",
        "    abstract protected function area(): float;\n",
        "    final public static function make(): static {}\n",
        "    private function &cache(): array {}\n",
        "}\n",
    )]);
    let shape = broker.class("Shape").unwrap();
    assert!(shape.get_method("__construct").unwrap().is_constructor());
    assert!(shape.get_method("__destruct").unwrap().is_destructor());

    let area = shape.get_method("area").unwrap();
    assert!(area.is_abstract());
    assert!(area.is_protected());
    assert_eq!(area.return_type(), Some("float"));

    let make = shape.get_method("make").unwrap();
    assert!(make.is_final());
    assert!(make.is_static());
    assert!(make.is_public());

    let cache = shape.get_method("cache").unwrap();
    assert!(cache.is_private());
    assert!(cache.returns_reference());
}

#[test]
fn test_missing_method_does_not_exist() {
    let broker = broker_with(&["<?php class A {}"]);
    let err = broker.class("A").unwrap().get_method("nope").unwrap_err();
    assert_eq!(
        err,
        ResolutionError::DoesNotExist {
            kind: SymbolKind::Method,
            name: "A::nope".to_string(),
        }
    );
}

#[test]
fn test_prototype_prefers_parent_then_interface() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "interface Runs { function run(); function stop(); }\n",
        "class Base { public function run() {} }\n",
        "class Child extends Base implements Runs {\n",
        "    public function run() {}\n",
        "    public function stop() {}\n",
        "    public function own() {}\n",
        "}\n",
    )]);
    let child = broker.class("Child").unwrap();
    let run = child.get_method("run").unwrap().prototype().unwrap();
    assert_eq!(run.declaring_class_name().as_str(), "Base");
    let stop = child.get_method("stop").unwrap().prototype().unwrap();
    assert_eq!(stop.declaring_class_name().as_str(), "Runs");
    assert!(
        child
            .get_method("own")
            .unwrap()
            .prototype()
            .unwrap_err()
            .is_does_not_exist()
    );
}

#[test]
fn test_private_parent_method_is_not_a_prototype() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base { private function f() {} }\n",
        "class Child extends Base { public function f() {} }\n",
    )]);
    let f = broker.class("Child").unwrap().get_method("f").unwrap();
    assert!(f.prototype().is_err());
}

// ─── Parameters ─────────────────────────────────────────────────────────────

#[test]
fn test_optional_parameters_form_a_tail() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Svc {\n",
        "    const LIMIT = 5;\n",
        "    public function m($a = 1, $b, $c = self::LIMIT * 2, $d = __METHOD__, ...$rest) {}\n",
        "}\n",
    )]);
    let m = broker.class("Svc").unwrap().get_method("m").unwrap();
    let optional: Vec<bool> = m.parameters().iter().map(|p| p.is_optional()).collect();
    assert_eq!(optional, [false, false, true, true, true]);
    assert_eq!(m.number_of_parameters(), 5);
    assert_eq!(m.number_of_required_parameters(), 2);

    let a = m.parameter("a").unwrap();
    assert!(a.is_default_value_available());
    assert!(!a.is_optional(), "a default before a required parameter is not optional");
    assert_eq!(m.parameter("c").unwrap().default_value().unwrap(), ConstValue::Int(10));
    assert_eq!(
        m.parameter("d").unwrap().default_value().unwrap(),
        ConstValue::String("Svc::m".to_string())
    );
    assert_eq!(m.parameter("c").unwrap().default_value_definition().unwrap(), "self::LIMIT * 2");
}

#[test]
fn test_parameter_without_default() {
    let broker = broker_with(&["<?php function take(int $x) {}"]);
    let x = broker.function("take").unwrap().parameter("x").unwrap();
    assert!(!x.is_default_value_available());
    assert_eq!(
        x.default_value().unwrap_err(),
        ResolutionError::DoesNotExist {
            kind: SymbolKind::DefaultValue,
            name: "take($x)".to_string(),
        }
    );
    assert!(x.default_value_definition().unwrap_err().is_does_not_exist());
    assert_eq!(x.declaring_function_name(), "take");
    assert_eq!(x.declaring_class_name(), None);
}

#[test]
fn test_parameter_class_view() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App;\n",
        "use Vendor\\Logger;\n",
        "class Request {}\n",
        "function handle(Request $req, Logger $log, ?int $n = null) {}\n",
    )]);
    let handle = broker.function("App\\handle").unwrap();
    let req = handle.parameter("req").unwrap();
    assert_eq!(req.class_name(), Some(SymbolName::new("App\\Request")));
    assert_eq!(req.class().unwrap().unwrap().short_name(), "Request");

    let log = handle.parameter("log").unwrap();
    assert_eq!(log.class_name(), Some(SymbolName::new("Vendor\\Logger")));
    assert!(
        log.class().unwrap().is_none(),
        "parameter types do not create stubs"
    );

    let n = handle.parameter("n").unwrap();
    assert!(n.allows_null());
    assert_eq!(n.class_name(), None);
    assert_eq!(n.default_value().unwrap(), ConstValue::Null);
}

#[test]
fn test_missing_parameter() {
    let broker = broker_with(&["<?php class A { public function f($x) {} }"]);
    let err = broker
        .class("A")
        .unwrap()
        .get_method("f")
        .unwrap()
        .parameter("y")
        .unwrap_err();
    assert_eq!(
        err,
        ResolutionError::DoesNotExist {
            kind: SymbolKind::Parameter,
            name: "A::f($y)".to_string(),
        }
    );
}

// ─── Properties ─────────────────────────────────────────────────────────────

#[test]
fn test_sibling_inherits_private_and_static() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Bag {\n",
        "    private static $a, $b = 2;\n",
        "    private $c, $d;\n",
        "}\n",
    )]);
    let bag = broker.class("Bag").unwrap();
    let b = bag.get_property("b").unwrap();
    assert_eq!(b.visibility(), Visibility::Private);
    assert!(b.is_static());
    let d = bag.get_property("d").unwrap();
    assert_eq!(d.visibility(), Visibility::Private);
    assert!(!d.is_static());
}

#[test]
fn test_property_defaults() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Opts {\n",
        "    public $list = [1, 2, 'k' => 3];\n",
        "    public ?string $name;\n",
        "    protected int $count = 0;\n",
        "}\n",
    )]);
    let opts = broker.class("Opts").unwrap();
    let list = opts.get_property("list").unwrap();
    assert_eq!(list.default_value_definition(), Some("[1, 2, 'k' => 3]"));
    assert_eq!(
        list.value().unwrap(),
        ConstValue::Array(vec![
            (ConstValue::Int(0), ConstValue::Int(1)),
            (ConstValue::Int(1), ConstValue::Int(2)),
            (ConstValue::String("k".into()), ConstValue::Int(3)),
        ])
    );

    let name = opts.get_property("name").unwrap();
    assert!(!name.is_default_value_available());
    assert_eq!(name.default_value().unwrap(), ConstValue::Null);
    assert_eq!(name.type_hint(), Some("?string"));
}

#[test]
fn test_non_public_value_needs_accessibility() {
    let broker = broker_with(&["<?php class Opts { protected int $count = 3; }"]);
    let mut count = broker.class("Opts").unwrap().get_property("count").unwrap();
    assert!(!count.is_accessible());
    assert_eq!(
        count.value().unwrap_err(),
        ResolutionError::NotAccessible {
            kind: SymbolKind::Property,
            name: "Opts::$count".to_string(),
        }
    );
    assert_eq!(count.default_value().unwrap(), ConstValue::Int(3));

    count.set_accessible(true);
    assert_eq!(count.value().unwrap(), ConstValue::Int(3));
}

#[test]
fn test_promoted_property() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Point {\n",
        "    public function __construct(private readonly int $x = 0) {}\n",
        "}\n",
    )]);
    let point = broker.class("Point").unwrap();
    let x = point.get_property("x").unwrap();
    assert!(x.is_promoted());
    assert!(x.is_readonly());
    assert!(x.is_private());
    let param = point.get_method("__construct").unwrap().parameter("x").unwrap();
    assert!(param.is_promoted());
}

// ─── Constants and functions ────────────────────────────────────────────────

#[test]
fn test_constant_views() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace Cfg;\n",
        "const RATE = 0.5;\n",
        "define('DEBUG', true);\n",
        "class Box { final public const SIZE = RATE * 4; }\n",
    )]);
    let rate = broker.constant("Cfg\\RATE").unwrap();
    assert_eq!(rate.qualified_name(), "Cfg\\RATE");
    assert_eq!(rate.declaring_class_name(), None);
    assert_eq!(rate.value().unwrap(), ConstValue::Float(0.5));
    assert!(!rate.is_defined_by_call());

    let debug = broker.constant("DEBUG").unwrap();
    assert!(debug.is_defined_by_call());
    assert_eq!(debug.value().unwrap(), ConstValue::Bool(true));

    let size = broker.class("Cfg\\Box").unwrap().get_constant("SIZE").unwrap();
    assert!(size.is_final());
    assert_eq!(size.visibility(), Visibility::Public);
    assert_eq!(size.value_definition(), "RATE * 4");
    assert_eq!(size.value().unwrap(), ConstValue::Float(2.0));
}

#[test]
fn test_function_view() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace Util;\n",
        "/** Join parts. */\n",
        "function &join(string $sep, string ...$parts): string {}\n",
    )]);
    let join = broker.function("Util\\join").unwrap();
    assert_eq!(join.short_name(), "join");
    assert_eq!(join.namespace_name(), "Util");
    assert!(join.returns_reference());
    assert_eq!(join.return_type(), Some("string"));
    assert_eq!(join.number_of_required_parameters(), 1);
    assert!(join.parameter("parts").unwrap().is_variadic());
    assert_eq!(join.annotations().unwrap().short_description, "Join parts.");
}

// ─── Attribute tables ───────────────────────────────────────────────────────

#[test]
fn test_attributes_by_name() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "class Base {}\n",
        "abstract class Child extends Base {\n",
        "    public function run($a, $b = 1) {}\n",
        "}\n",
    )]);
    let child = broker.class("Child").unwrap();
    assert_eq!(child.get("isAbstract").unwrap(), AttributeValue::Bool(true));
    assert_eq!(child.get("is_abstract").unwrap(), AttributeValue::Bool(true));
    assert_eq!(
        child.get("parentClassName").unwrap(),
        AttributeValue::Text("Base".to_string())
    );
    assert_eq!(child.get("kind").unwrap(), AttributeValue::Text("class".to_string()));
    assert_eq!(child.attribute(ClassAttribute::DocComment), AttributeValue::None);

    let run = child.get_method("run").unwrap();
    assert_eq!(run.get("numberOfParameters").unwrap(), AttributeValue::Int(2));
    assert_eq!(
        run.attribute(MethodAttribute::NumberOfRequiredParameters),
        AttributeValue::Int(1)
    );
    let b = run.parameter("b").unwrap();
    assert_eq!(
        b.get("defaultValueDefinition").unwrap(),
        AttributeValue::Text("1".to_string())
    );
}

#[test]
fn test_unknown_attribute_is_invalid_argument() {
    let broker = broker_with(&["<?php class A { public $p; public function f() {} }"]);
    let a = broker.class("A").unwrap();
    assert!(matches!(
        a.get("colour"),
        Err(ResolutionError::InvalidArgument { .. })
    ));
    assert!(matches!(
        a.get_method("f").unwrap().get("getName"),
        Err(ResolutionError::InvalidArgument { .. })
    ));
    assert!(matches!(
        a.get_property("p").unwrap().get(""),
        Err(ResolutionError::InvalidArgument { .. })
    ));
}

#[test]
fn test_attribute_names_are_canonical() {
    for attr in ClassAttribute::ALL {
        assert_eq!(ClassAttribute::from_name(attr.name()), Some(*attr));
    }
}

// ─── Summary ────────────────────────────────────────────────────────────────

#[test]
fn test_summary_serializes_to_json() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "trait Greets { public function greet() {} }\n",
        "class Base { protected $id; }\n",
        "class Child extends Base { use Greets; const V = 1; }\n",
    )]);
    let summary = broker.class("Child").unwrap().summary();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["name"], "Child");
    assert_eq!(json["kind"], "class");
    assert_eq!(json["lifecycle"], "complete");
    assert_eq!(json["parents"], serde_json::json!(["Base"]));
    assert_eq!(json["traits"], serde_json::json!(["Greets"]));
    assert_eq!(json["methods"][0]["name"], "greet");
    assert_eq!(json["methods"][0]["origin"], "trait");
    assert_eq!(json["methods"][0]["declared_in"], "Child");
    assert_eq!(json["properties"][0]["origin"], "inherited");
    assert_eq!(json["properties"][0]["visibility"], "protected");
    assert_eq!(json["constants"][0]["name"], "V");
    assert_eq!(json["missing"], serde_json::json!([]));
}
