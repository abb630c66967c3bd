//! Enumerated attribute tables.
//!
//! Each view kind has a closed set of readable attributes.  The names
//! accepted by `from_name` are fixed at compile time; an unknown name is an
//! [`InvalidArgument`](crate::ResolutionError::InvalidArgument) error at the
//! view's `get` method rather than a silent `None`.

use serde::Serialize;

use crate::value::ConstValue;

/// The value of one attribute read through a view's `get`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(u64),
    Text(String),
    Names(Vec<String>),
    Value(ConstValue),
    /// The attribute does not apply (no parent, no default, ...).
    None,
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

macro_rules! attribute_table {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => [$($key:literal),+]),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Look an attribute up by its `camelCase` or `snake_case` name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($($key)|+ => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Canonical (first listed) name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => [$($key),+][0],)+
                }
            }
        }
    };
}

attribute_table! {
    /// Readable attributes of a [`ClassView`](super::ClassView).
    ClassAttribute {
        Name => ["name"],
        ShortName => ["shortName", "short_name"],
        NamespaceName => ["namespaceName", "namespace_name"],
        Kind => ["kind"],
        Modifiers => ["modifiers"],
        IsAbstract => ["isAbstract", "is_abstract"],
        IsFinal => ["isFinal", "is_final"],
        IsInterface => ["isInterface", "is_interface"],
        IsTrait => ["isTrait", "is_trait"],
        IsComplete => ["isComplete", "is_complete"],
        IsExternalStub => ["isExternalStub", "is_external_stub"],
        ParentClassName => ["parentClassName", "parent_class_name"],
        ParentClassNames => ["parentClassNames", "parent_class_names"],
        InterfaceNames => ["interfaceNames", "interface_names"],
        TraitNames => ["traitNames", "trait_names"],
        FileName => ["fileName", "file_name"],
        StartLine => ["startLine", "start_line"],
        EndLine => ["endLine", "end_line"],
        DocComment => ["docComment", "doc_comment"],
    }
}

attribute_table! {
    /// Readable attributes of a [`MethodView`](super::MethodView).
    MethodAttribute {
        Name => ["name"],
        DeclaringClassName => ["declaringClassName", "declaring_class_name"],
        DeclaringTraitName => ["declaringTraitName", "declaring_trait_name"],
        OriginalName => ["originalName", "original_name"],
        Modifiers => ["modifiers"],
        IsAbstract => ["isAbstract", "is_abstract"],
        IsFinal => ["isFinal", "is_final"],
        IsStatic => ["isStatic", "is_static"],
        IsPublic => ["isPublic", "is_public"],
        IsProtected => ["isProtected", "is_protected"],
        IsPrivate => ["isPrivate", "is_private"],
        IsConstructor => ["isConstructor", "is_constructor"],
        ReturnsReference => ["returnsReference", "returns_reference"],
        ReturnType => ["returnType", "return_type"],
        NumberOfParameters => ["numberOfParameters", "number_of_parameters"],
        NumberOfRequiredParameters => ["numberOfRequiredParameters", "number_of_required_parameters"],
        StartLine => ["startLine", "start_line"],
        EndLine => ["endLine", "end_line"],
        DocComment => ["docComment", "doc_comment"],
    }
}

attribute_table! {
    /// Readable attributes of a [`PropertyView`](super::PropertyView).
    PropertyAttribute {
        Name => ["name"],
        DeclaringClassName => ["declaringClassName", "declaring_class_name"],
        DeclaringTraitName => ["declaringTraitName", "declaring_trait_name"],
        Modifiers => ["modifiers"],
        IsStatic => ["isStatic", "is_static"],
        IsReadonly => ["isReadonly", "is_readonly"],
        IsPublic => ["isPublic", "is_public"],
        IsProtected => ["isProtected", "is_protected"],
        IsPrivate => ["isPrivate", "is_private"],
        IsPromoted => ["isPromoted", "is_promoted"],
        TypeHint => ["type", "typeHint", "type_hint"],
        DefaultValueDefinition => ["defaultValueDefinition", "default_value_definition"],
        DocComment => ["docComment", "doc_comment"],
    }
}

attribute_table! {
    /// Readable attributes of a [`ParameterView`](super::ParameterView).
    ParameterAttribute {
        Name => ["name"],
        Position => ["position"],
        TypeHint => ["type", "typeHint", "type_hint"],
        ClassName => ["className", "class_name"],
        IsArray => ["isArray", "is_array"],
        IsCallable => ["isCallable", "is_callable"],
        AllowsNull => ["allowsNull", "allows_null"],
        IsPassedByReference => ["isPassedByReference", "is_passed_by_reference"],
        IsVariadic => ["isVariadic", "is_variadic"],
        IsOptional => ["isOptional", "is_optional"],
        IsDefaultValueAvailable => ["isDefaultValueAvailable", "is_default_value_available"],
        DefaultValueDefinition => ["defaultValueDefinition", "default_value_definition"],
        DeclaringFunctionName => ["declaringFunctionName", "declaring_function_name"],
        DeclaringClassName => ["declaringClassName", "declaring_class_name"],
    }
}

attribute_table! {
    /// Readable attributes of a [`ConstantView`](super::ConstantView).
    ConstantAttribute {
        Name => ["name"],
        QualifiedName => ["qualifiedName", "qualified_name"],
        DeclaringClassName => ["declaringClassName", "declaring_class_name"],
        Modifiers => ["modifiers"],
        IsFinal => ["isFinal", "is_final"],
        ValueDefinition => ["valueDefinition", "value_definition"],
        DocComment => ["docComment", "doc_comment"],
    }
}

attribute_table! {
    /// Readable attributes of a [`FunctionView`](super::FunctionView).
    FunctionAttribute {
        Name => ["name"],
        ShortName => ["shortName", "short_name"],
        NamespaceName => ["namespaceName", "namespace_name"],
        ReturnsReference => ["returnsReference", "returns_reference"],
        ReturnType => ["returnType", "return_type"],
        NumberOfParameters => ["numberOfParameters", "number_of_parameters"],
        NumberOfRequiredParameters => ["numberOfRequiredParameters", "number_of_required_parameters"],
        FileName => ["fileName", "file_name"],
        StartLine => ["startLine", "start_line"],
        EndLine => ["endLine", "end_line"],
        DocComment => ["docComment", "doc_comment"],
    }
}
