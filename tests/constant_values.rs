mod common;

use common::broker_with;
use phpantom_reflection::error::SymbolKind;
use phpantom_reflection::{ConstValue, ResolutionError};

fn int(i: i64) -> ConstValue {
    ConstValue::Int(i)
}

fn string(s: &str) -> ConstValue {
    ConstValue::String(s.to_string())
}

// ─── Operators ──────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_precedence() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const A = 1 + 2 * 3;\n",
        "const B = 2 ** 3 ** 2;\n",
        "const C = (1 + 2) * 3;\n",
        "const D = 7 / 2;\n",
        "const E = 6 / 2;\n",
        "const F = -5 % 3;\n",
        "const G = 1 << 4 | 1;\n",
        "const H = 0x10 + 0b11 + 017;\n",
    )]);
    let value = |name: &str| broker.constant_value(name).unwrap();
    assert_eq!(value("A"), int(7));
    assert_eq!(value("B"), int(512), "** is right-associative");
    assert_eq!(value("C"), int(9));
    assert_eq!(value("D"), ConstValue::Float(3.5));
    assert_eq!(value("E"), int(3), "exact division stays integral");
    assert_eq!(value("F"), int(-2));
    assert_eq!(value("G"), int(17));
    assert_eq!(value("H"), int(16 + 3 + 15));
}

#[test]
fn test_strings_and_logic() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const CAT = 'a' . 'b' . 1;\n",
        "const TAB = \"x\\ty\";\n",
        "const BOTH = 1 < 2 && 'a' === 'a';\n",
        "const LOOSE = 1 == 1.0;\n",
        "const STRICT = 1 === 1.0;\n",
        "const FALLBACK = null ?? 'fallback';\n",
        "const NOT = !0;\n",
    )]);
    let value = |name: &str| broker.constant_value(name).unwrap();
    assert_eq!(value("CAT"), string("ab1"));
    assert_eq!(value("TAB"), string("x\ty"));
    assert_eq!(value("BOTH"), ConstValue::Bool(true));
    assert_eq!(value("LOOSE"), ConstValue::Bool(true));
    assert_eq!(value("STRICT"), ConstValue::Bool(false));
    assert_eq!(value("FALLBACK"), string("fallback"));
    assert_eq!(value("NOT"), ConstValue::Bool(true));
}

#[test]
fn test_casts() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const I = (int) '42' + 1;\n",
        "const B = (bool) 0;\n",
        "const S = (string) 1.5;\n",
        "const F = (float) 3;\n",
    )]);
    assert_eq!(broker.constant_value("I").unwrap(), int(43));
    assert_eq!(broker.constant_value("B").unwrap(), ConstValue::Bool(false));
    assert_eq!(broker.constant_value("S").unwrap(), string("1.5"));
    assert_eq!(broker.constant_value("F").unwrap(), ConstValue::Float(3.0));
}

#[test]
fn test_heredoc_and_nowdoc() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const HERE = <<<EOT\n",
        "    one\n",
        "      two\n",
        "    EOT;\n",
        "const NOW = <<<'EOT'\n",
        "cost: $5\n",
        "EOT;\n",
    )]);
    assert_eq!(broker.constant_value("HERE").unwrap(), string("one\n  two"));
    assert_eq!(broker.constant_value("NOW").unwrap(), string("cost: $5"));
}

#[test]
fn test_heredoc_with_non_ascii_label() {
    let broker = broker_with(&["<?php class A { const X = <<<ÉTÉ\nhello\nÉTÉ; }"]);
    assert_eq!(broker.class_constant_value("A", "X").unwrap(), string("hello"));
}

// ─── Arrays ─────────────────────────────────────────────────────────────────

#[test]
fn test_array_keys_follow_php_rules() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const LIST = ['a', 'b', 5 => 'c', 'd'];\n",
        "const DUP = array('k' => 1, 'k' => 2);\n",
        "const NUMERIC = ['1' => 'x', true => 'y'];\n",
        "const UNION = ['a' => 1] + ['a' => 2, 'b' => 3];\n",
    )]);
    assert_eq!(
        broker.constant_value("LIST").unwrap(),
        ConstValue::Array(vec![
            (int(0), string("a")),
            (int(1), string("b")),
            (int(5), string("c")),
            (int(6), string("d")),
        ])
    );
    assert_eq!(
        broker.constant_value("DUP").unwrap(),
        ConstValue::Array(vec![(string("k"), int(2))])
    );
    assert_eq!(
        broker.constant_value("NUMERIC").unwrap(),
        ConstValue::Array(vec![(int(1), string("y"))]),
        "'1' and true both normalise to key 1"
    );
    assert_eq!(
        broker.constant_value("UNION").unwrap(),
        ConstValue::Array(vec![(string("a"), int(1)), (string("b"), int(3))])
    );
}

#[test]
fn test_array_display() {
    let broker = broker_with(&["<?php const MAP = ['k' => [1, 2], 'flag' => false];"]);
    assert_eq!(
        broker.constant_value("MAP").unwrap().to_string(),
        "['k' => [0 => 1, 1 => 2], 'flag' => false]"
    );
}

// ─── References ─────────────────────────────────────────────────────────────

#[test]
fn test_namespaced_constant_references() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace Cfg;\n",
        "const BASE = 10;\n",
        "const NEXT = BASE + 1;\n",
        "const FULL = \\Cfg\\BASE * 2;\n",
        "const EOL = PHP_EOL;\n",
    )]);
    assert_eq!(broker.constant_value("Cfg\\NEXT").unwrap(), int(11));
    assert_eq!(broker.constant_value("Cfg\\FULL").unwrap(), int(20));
    assert_eq!(
        broker.constant_value("Cfg\\EOL").unwrap(),
        string("\n"),
        "falls back to the engine constant"
    );
}

#[test]
fn test_global_fallback_for_unqualified_constant() {
    let broker = broker_with(&[
        "<?php const SHARED = 'global';",
        "<?php namespace Inner; const USE_IT = SHARED . '!';",
    ]);
    assert_eq!(broker.constant_value("Inner\\USE_IT").unwrap(), string("global!"));
}

#[test]
fn test_self_binds_to_declaring_class() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "namespace App;\n",
        "class Base {\n",
        "    const A = 'a';\n",
        "    const B = self::A . 'b';\n",
        "    const NAME = Base::class;\n",
        "    const WHERE = __CLASS__;\n",
        "    const NS = __NAMESPACE__;\n",
        "}\n",
        "class Child extends Base {\n",
        "    const A = 'z';\n",
        "    const UP = parent::A;\n",
        "}\n",
    )]);
    assert_eq!(broker.class_constant_value("App\\Child", "B").unwrap(), string("ab"));
    assert_eq!(broker.class_constant_value("App\\Child", "UP").unwrap(), string("a"));
    assert_eq!(
        broker.class_constant_value("App\\Base", "NAME").unwrap(),
        string("App\\Base")
    );
    assert_eq!(
        broker.class_constant_value("App\\Child", "WHERE").unwrap(),
        string("App\\Base")
    );
    assert_eq!(broker.class_constant_value("App\\Base", "NS").unwrap(), string("App"));
}

#[test]
fn test_interface_constant_through_implementor() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "interface Limits { const MAX = 3; }\n",
        "class Pool implements Limits { const DOUBLE = self::MAX * 2; }\n",
    )]);
    let pool = broker.class("Pool").unwrap();
    assert_eq!(pool.constant_value("MAX").unwrap(), int(3));
    assert_eq!(pool.constant_value("DOUBLE").unwrap(), int(6));
}

#[test]
fn test_magic_line_constant() {
    let broker = broker_with(&["<?php const HERE = __LINE__;"]);
    assert_eq!(broker.constant_value("HERE").unwrap(), int(1));
}

// ─── Unfoldable expressions ─────────────────────────────────────────────────

#[test]
fn test_unfoldable_expressions_keep_source() {
    let broker = broker_with(&[concat!(
        "<?php\n",
        "const CALL = strlen('x');\n",
        "const MIXED = 1 + foo();\n",
        "const UNKNOWN = MISSING;\n",
        "const DERIVED = CALL . 'x';\n",
    )]);
    assert_eq!(
        broker.constant_value("CALL").unwrap(),
        ConstValue::Expression("strlen('x')".to_string())
    );
    assert_eq!(
        broker.constant_value("MIXED").unwrap(),
        ConstValue::Expression("1 + foo()".to_string())
    );
    assert!(broker.constant_value("UNKNOWN").unwrap().is_expression());
    assert_eq!(
        broker.constant_value("DERIVED").unwrap(),
        ConstValue::Expression("CALL . 'x'".to_string())
    );
}

#[test]
fn test_division_by_zero_is_not_folded() {
    let broker = broker_with(&["<?php const BAD = 1 / 0;"]);
    assert!(broker.constant_value("BAD").unwrap().is_expression());
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[test]
fn test_constant_cycle_is_infinite_loop() {
    let broker = broker_with(&["<?php const A = B; const B = A;"]);
    match broker.constant_value("A").unwrap_err() {
        ResolutionError::InfiniteLoop { chain } => assert_eq!(chain, ["A", "B", "A"]),
        other => panic!("expected InfiniteLoop, got {other:?}"),
    }
}

#[test]
fn test_class_constant_cycle_is_infinite_loop() {
    let broker = broker_with(&["<?php class Loop { const X = self::Y; const Y = self::X; }"]);
    match broker.class_constant_value("Loop", "X").unwrap_err() {
        ResolutionError::InfiniteLoop { chain } => {
            assert_eq!(chain, ["Loop::X", "Loop::Y", "Loop::X"]);
        }
        other => panic!("expected InfiniteLoop, got {other:?}"),
    }
}

#[test]
fn test_missing_constants_do_not_exist() {
    let broker = broker_with(&["<?php class Base { const A = 1; }"]);
    assert_eq!(
        broker.class_constant_value("Base", "NOPE").unwrap_err(),
        ResolutionError::DoesNotExist {
            kind: SymbolKind::ClassConstant,
            name: "Base::NOPE".to_string(),
        }
    );
    assert!(broker.constant_value("NOPE").unwrap_err().is_does_not_exist());
    assert!(broker.class_constant_value("Nope", "A").unwrap_err().is_does_not_exist());
}
