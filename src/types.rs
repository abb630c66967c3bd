//! Data types used throughout the reflection engine.
//!
//! This module contains the "model" structs and enums that represent
//! declarations extracted from a token stream (classes, methods,
//! properties, constants, parameters, functions, namespaces).  Records
//! refer to each other by [`SymbolName`] only; the broker owns them and
//! resolves names to records on demand.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Serialize, Serializer};
use ustr::Ustr;

use crate::lexer::Token;
use crate::util::short_name;

/// Sentinel used by callers that spell "the global namespace" explicitly.
pub const NO_NAMESPACE: &str = "no-namespace";

/// A fully-qualified name without the leading `\`.
///
/// Interned, so copies and hashing are cheap and the text is never
/// mutated after creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolName(Ustr);

impl SymbolName {
    pub fn new(name: &str) -> Self {
        Self(Ustr::from(name.strip_prefix('\\').unwrap_or(name)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The last namespace segment (`Foo\Bar` → `Bar`).
    pub fn short_name(&self) -> &str {
        short_name(self.as_str())
    }

    /// Everything before the last segment, empty for global names.
    pub fn namespace_name(&self) -> &str {
        match self.as_str().rfind('\\') {
            Some(idx) => &self.as_str()[..idx],
            None => "",
        }
    }
}

impl fmt::Debug for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SymbolName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SymbolName> for String {
    fn from(value: SymbolName) -> Self {
        value.as_str().to_string()
    }
}

impl Serialize for SymbolName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Visibility of a class member (method, property, or constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_modifier(self) -> MemberModifiers {
        match self {
            Self::Public => MemberModifiers::PUBLIC,
            Self::Protected => MemberModifiers::PROTECTED,
            Self::Private => MemberModifiers::PRIVATE,
        }
    }

    /// `self` is strictly more permissive than `other`.
    pub fn is_looser_than(self, other: Visibility) -> bool {
        let rank = |v: Visibility| match v {
            Visibility::Public => 2,
            Visibility::Protected => 1,
            Visibility::Private => 0,
        };
        rank(self) > rank(other)
    }
}

bitflags! {
    /// Class-level modifier bits, numerically compatible with PHP's
    /// `ReflectionClass` constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassModifiers: u32 {
        const IMPLICIT_ABSTRACT = 0x10;
        const EXPLICIT_ABSTRACT = 0x20;
        const FINAL = 0x40;
        const READONLY = 0x1_0000;
        const IMPLEMENTS_INTERFACES = 0x8_0000;
        const IMPLEMENTS_TRAITS = 0x40_0000;
    }
}

bitflags! {
    /// Member-level modifier bits (methods, properties, constants),
    /// numerically compatible with PHP's `ReflectionMethod` constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberModifiers: u32 {
        const STATIC = 0x1;
        const ABSTRACT = 0x2;
        const FINAL = 0x4;
        const IMPLEMENTED_ABSTRACT = 0x8;
        const READONLY = 0x80;
        const PUBLIC = 0x100;
        const PROTECTED = 0x200;
        const PRIVATE = 0x400;
        const ACCESS_LEVEL_CHANGED = 0x800;
    }
}

impl MemberModifiers {
    /// Visibility encoded in these bits; public when none is set.
    pub fn visibility(self) -> Visibility {
        if self.contains(Self::PRIVATE) {
            Visibility::Private
        } else if self.contains(Self::PROTECTED) {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    /// Replace the visibility bits.
    pub fn with_visibility(self, visibility: Visibility) -> Self {
        (self - (Self::PUBLIC | Self::PROTECTED | Self::PRIVATE)) | visibility.as_modifier()
    }

    /// Bits that are derived by the composition resolver rather than read
    /// from source.
    pub fn derived() -> Self {
        Self::IMPLEMENTED_ABSTRACT | Self::ACCESS_LEVEL_CHANGED
    }
}

/// Distinguishes classes from interfaces and traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLikeKind {
    Class,
    Interface,
    Trait,
}

/// Where a declaration lives in its source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub file: Option<Arc<str>>,
    pub start_line: usize,
    pub end_line: usize,
}

/// Raw documentation attached to a declaration.
///
/// `templates` holds every shared annotation block (`/**#@+ ... */`) that
/// was open in the enclosing scope when the declaration was built.  The
/// annotation engine merges them lazily.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docblock {
    pub comment: Option<String>,
    pub templates: Vec<Arc<str>>,
}

impl Docblock {
    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.templates.is_empty()
    }
}

/// An unevaluated expression (default value or constant value).
///
/// `source` is the compacted source text; `tokens` are the significant
/// tokens retained for folding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueExpr {
    pub source: String,
    pub tokens: Vec<Token>,
}

/// Import table and namespace in effect for one declaration.
///
/// Shared between all records built under the same `use` statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    /// Enclosing namespace, empty for the global namespace.
    pub namespace: String,
    /// `use Foo\Bar as Baz;` → `"Baz" => "Foo\Bar"`.
    pub type_aliases: HashMap<String, String>,
    /// `use function Foo\bar;`
    pub function_aliases: HashMap<String, String>,
    /// `use const Foo\BAR;`
    pub constant_aliases: HashMap<String, String>,
}

/// Parameter type constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeConstraint {
    None,
    Array,
    Callable,
    /// A class or interface, resolved to its fully-qualified name.
    Class(SymbolName),
    /// A scalar or pseudo type (`int`, `string`, `mixed`, ...).
    Builtin(String),
    /// Union, intersection or DNF types, kept as written.
    Composite(String),
}

/// Stores extracted parameter information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRecord {
    /// Zero-based position in the parameter list.
    pub position: usize,
    /// The parameter name WITHOUT the `$` prefix.
    pub name: String,
    /// The type hint as written (e.g. `"?Foo"`, `"array"`).
    pub type_hint: Option<String>,
    pub constraint: TypeConstraint,
    /// `?Foo` or a `null` default.
    pub allows_null: bool,
    pub is_reference: bool,
    pub is_variadic: bool,
    pub default: Option<ValueExpr>,
    /// Name of the owning function or method.
    pub function: String,
    /// Declaring type, for method parameters.
    pub declaring_type: Option<SymbolName>,
    /// Constructor promotion visibility, if promoted.
    pub promoted: Option<Visibility>,
    pub line: usize,
}

impl ParameterRecord {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn class_name(&self) -> Option<SymbolName> {
        match &self.constraint {
            TypeConstraint::Class(name) => Some(*name),
            _ => None,
        }
    }
}

/// Stores extracted method information.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRecord {
    pub name: String,
    /// The type this method is a member of.  Trait-imported copies carry
    /// the composing type here.
    pub declaring_type: SymbolName,
    /// The trait this copy originated from.
    pub declaring_trait: Option<SymbolName>,
    /// The method name inside the trait when imported under an alias.
    pub original_name: Option<String>,
    /// Modifiers as written (visibility, static, abstract, final).
    pub modifiers: MemberModifiers,
    pub parameters: Vec<ParameterRecord>,
    pub returns_reference: bool,
    pub return_type: Option<String>,
    pub doc: Docblock,
    pub span: Span,
    pub context: Arc<NameContext>,
}

impl MethodRecord {
    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(MemberModifiers::ABSTRACT)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MemberModifiers::STATIC)
    }

    /// Copy this method into `target` as a trait import.
    pub fn alias_into(
        &self,
        target: SymbolName,
        trait_name: SymbolName,
        alias: Option<&str>,
        visibility: Option<Visibility>,
    ) -> MethodRecord {
        let mut copy = self.clone();
        copy.declaring_type = target;
        copy.declaring_trait = Some(trait_name);
        if let Some(alias) = alias {
            copy.original_name = Some(self.name.clone());
            copy.name = alias.to_string();
        }
        if let Some(vis) = visibility {
            copy.modifiers = copy.modifiers.with_visibility(vis);
        }
        for param in &mut copy.parameters {
            param.declaring_type = Some(target);
            param.function = copy.name.clone();
        }
        copy
    }
}

/// Stores extracted property information.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    /// The property name WITHOUT the `$` prefix.
    pub name: String,
    pub declaring_type: SymbolName,
    pub declaring_trait: Option<SymbolName>,
    pub modifiers: MemberModifiers,
    pub type_hint: Option<String>,
    pub default: Option<ValueExpr>,
    /// Declared through constructor promotion.
    pub promoted: bool,
    pub doc: Docblock,
    pub span: Span,
    pub context: Arc<NameContext>,
}

impl PropertyRecord {
    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MemberModifiers::STATIC)
    }
}

/// Stores extracted constant information (class or global).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRecord {
    /// Short name (`MAX_SIZE`).
    pub name: String,
    /// `Some` for class constants.
    pub declaring_type: Option<SymbolName>,
    pub declaring_trait: Option<SymbolName>,
    pub modifiers: MemberModifiers,
    pub value: ValueExpr,
    /// Declared through `define()` rather than `const`.
    pub via_define: bool,
    pub doc: Docblock,
    pub span: Span,
    pub context: Arc<NameContext>,
}

impl ConstantRecord {
    /// Fully-qualified name for global constants; `Class::NAME` for
    /// class constants.
    pub fn qualified_name(&self) -> String {
        match self.declaring_type {
            Some(ty) => format!("{}::{}", ty, self.name),
            None if self.via_define || self.context.namespace.is_empty() => self.name.clone(),
            None => format!("{}\\{}", self.context.namespace, self.name),
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }
}

/// Stores extracted standalone function information.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
    pub name: SymbolName,
    pub parameters: Vec<ParameterRecord>,
    pub returns_reference: bool,
    pub return_type: Option<String>,
    pub doc: Docblock,
    pub span: Span,
    pub context: Arc<NameContext>,
}

/// `A::foo as protected bar;` inside a trait adaptation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitAlias {
    /// Qualifying trait, when written as `Trait::method`.
    pub trait_name: Option<SymbolName>,
    pub method_name: String,
    pub alias: Option<String>,
    pub visibility: Option<Visibility>,
}

/// `A::foo insteadof B, C;` inside a trait adaptation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitPrecedence {
    pub trait_name: SymbolName,
    pub method_name: String,
    pub insteadof: Vec<SymbolName>,
}

/// Stores extracted class, interface or trait information.
///
/// Ancestors are kept as names so that forward references and types that
/// are never declared do not need to exist when the record is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub name: SymbolName,
    pub kind: ClassLikeKind,
    /// Modifiers as written (`abstract`, `final`, `readonly`).
    pub modifiers: ClassModifiers,
    /// The parent class from the `extends` clause (classes only).
    pub parent: Option<SymbolName>,
    /// Implemented interfaces, or extended interfaces for an interface.
    pub interfaces: Vec<SymbolName>,
    pub traits: Vec<SymbolName>,
    pub trait_aliases: Vec<TraitAlias>,
    pub trait_precedences: Vec<TraitPrecedence>,
    pub methods: Vec<Arc<MethodRecord>>,
    pub properties: Vec<Arc<PropertyRecord>>,
    pub constants: Vec<Arc<ConstantRecord>>,
    pub doc: Docblock,
    pub span: Span,
    pub context: Arc<NameContext>,
}

impl ClassRecord {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassLikeKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.kind == ClassLikeKind::Trait
    }

    pub fn own_method(&self, name: &str) -> Option<&Arc<MethodRecord>> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn own_property(&self, name: &str) -> Option<&Arc<PropertyRecord>> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn own_constant(&self, name: &str) -> Option<&Arc<ConstantRecord>> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Every type name this record refers to as an ancestor.
    pub fn ancestor_names(&self) -> impl Iterator<Item = SymbolName> + '_ {
        self.parent
            .iter()
            .chain(self.interfaces.iter())
            .chain(self.traits.iter())
            .copied()
    }
}

/// Names declared directly inside one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRecord {
    /// Empty for the global namespace.
    pub name: String,
    /// Import aliases in effect (union across units in the registry view).
    pub aliases: HashMap<String, String>,
    pub types: Vec<SymbolName>,
    pub functions: Vec<SymbolName>,
    pub constants: Vec<SymbolName>,
}

/// Everything one source unit declares.
#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    pub file: Option<Arc<str>>,
    pub namespaces: Vec<NamespaceRecord>,
    pub types: Vec<ClassRecord>,
    pub functions: Vec<FunctionRecord>,
    pub constants: Vec<ConstantRecord>,
}

/// Identifies any reflected element for the annotation engine and the
/// value evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKey {
    Type(SymbolName),
    Function(SymbolName),
    Constant(SymbolName),
    Method(SymbolName, String),
    Property(SymbolName, String),
    ClassConstant(SymbolName, String),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) | Self::Constant(name) => write!(f, "{name}"),
            Self::Function(name) => write!(f, "{name}()"),
            Self::Method(ty, m) => write!(f, "{ty}::{m}()"),
            Self::Property(ty, p) => write!(f, "{ty}::${p}"),
            Self::ClassConstant(ty, c) => write!(f, "{ty}::{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_name_strips_leading_separator() {
        let name = SymbolName::new("\\Foo\\Bar");
        assert_eq!(name.as_str(), "Foo\\Bar");
        assert_eq!(name.short_name(), "Bar");
        assert_eq!(name.namespace_name(), "Foo");
        assert_eq!(SymbolName::new("Baz").namespace_name(), "");
    }

    #[test]
    fn visibility_ordering() {
        assert!(Visibility::Public.is_looser_than(Visibility::Protected));
        assert!(Visibility::Protected.is_looser_than(Visibility::Private));
        assert!(!Visibility::Private.is_looser_than(Visibility::Private));
    }

    #[test]
    fn with_visibility_replaces_bits() {
        let m = MemberModifiers::PUBLIC | MemberModifiers::STATIC;
        let m = m.with_visibility(Visibility::Private);
        assert_eq!(m.visibility(), Visibility::Private);
        assert!(m.contains(MemberModifiers::STATIC));
        assert!(!m.contains(MemberModifiers::PUBLIC));
    }
}
