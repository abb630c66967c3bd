use std::sync::Arc;

use super::attributes::{
    AttributeValue, ConstantAttribute, FunctionAttribute, MethodAttribute, ParameterAttribute,
    PropertyAttribute,
};
use super::class::ClassView;
use crate::broker::Broker;
use crate::docblock::AnnotationSet;
use crate::error::{ResolutionError, SymbolKind};
use crate::inheritance::{MemberOrigin, Resolved};
use crate::types::*;
use crate::value::{ConstValue, EvalScope};

fn unknown(kind: &str, name: &str) -> ResolutionError {
    ResolutionError::InvalidArgument {
        reason: format!("unknown {kind} attribute `{name}`"),
    }
}

/// Build parameter views for a parameter list, computing optionality
/// from the back: a parameter is optional when it is variadic, or has a
/// default and every later parameter is optional too.
fn parameter_views<'b>(
    broker: &'b Broker,
    parameters: &[ParameterRecord],
    context: &Arc<NameContext>,
    file: Option<&Arc<str>>,
) -> Vec<ParameterView<'b>> {
    let mut optional_tail = true;
    let mut flags = vec![false; parameters.len()];
    for (i, param) in parameters.iter().enumerate().rev() {
        optional_tail &= param.is_variadic || param.has_default();
        flags[i] = optional_tail;
    }
    parameters
        .iter()
        .zip(flags)
        .map(|(record, is_optional)| ParameterView {
            broker,
            record: record.clone(),
            is_optional,
            context: Arc::clone(context),
            file: file.cloned(),
        })
        .collect()
}

// ─── Methods ────────────────────────────────────────────────────────────────

/// A method as seen through one composed type.
#[derive(Debug, Clone)]
pub struct MethodView<'b> {
    broker: &'b Broker,
    /// The type the method was looked up on.
    through: SymbolName,
    member: Resolved<MethodRecord>,
}

impl<'b> MethodView<'b> {
    pub(crate) fn new(broker: &'b Broker, through: SymbolName, member: Resolved<MethodRecord>) -> Self {
        Self {
            broker,
            through,
            member,
        }
    }

    pub fn record(&self) -> &Arc<MethodRecord> {
        &self.member.record
    }

    pub fn name(&self) -> &str {
        &self.member.record.name
    }

    pub fn origin(&self) -> MemberOrigin {
        self.member.origin
    }

    pub fn declaring_class_name(&self) -> SymbolName {
        self.member.record.declaring_type
    }

    pub fn declaring_class(&self) -> Result<ClassView<'b>, ResolutionError> {
        self.broker.class(self.declaring_class_name().as_str())
    }

    pub fn declaring_trait_name(&self) -> Option<SymbolName> {
        self.member.record.declaring_trait
    }

    /// The name inside the trait when imported under an alias.
    pub fn original_name(&self) -> Option<&str> {
        self.member.record.original_name.as_deref()
    }

    /// Effective modifiers, including derived bits once the composing
    /// type is complete.
    pub fn modifiers(&self) -> MemberModifiers {
        self.member.modifiers
    }

    pub fn visibility(&self) -> Visibility {
        self.member.visibility()
    }

    pub fn is_public(&self) -> bool {
        self.visibility() == Visibility::Public
    }

    pub fn is_protected(&self) -> bool {
        self.visibility() == Visibility::Protected
    }

    pub fn is_private(&self) -> bool {
        self.visibility() == Visibility::Private
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers().contains(MemberModifiers::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers().contains(MemberModifiers::FINAL)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().contains(MemberModifiers::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name().eq_ignore_ascii_case("__construct")
    }

    pub fn is_destructor(&self) -> bool {
        self.name().eq_ignore_ascii_case("__destruct")
    }

    pub fn returns_reference(&self) -> bool {
        self.member.record.returns_reference
    }

    pub fn return_type(&self) -> Option<&str> {
        self.member.record.return_type.as_deref()
    }

    pub fn parameters(&self) -> Vec<ParameterView<'b>> {
        let record = &self.member.record;
        parameter_views(
            self.broker,
            &record.parameters,
            &record.context,
            record.span.file.as_ref(),
        )
    }

    /// A parameter by name (without `$`).
    pub fn parameter(&self, name: &str) -> Result<ParameterView<'b>, ResolutionError> {
        self.parameters()
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| {
                ResolutionError::missing(
                    SymbolKind::Parameter,
                    format!("{}::{}(${})", self.through, self.name(), name),
                )
            })
    }

    pub fn number_of_parameters(&self) -> usize {
        self.member.record.parameters.len()
    }

    pub fn number_of_required_parameters(&self) -> usize {
        self.parameters().iter().filter(|p| !p.is_optional()).count()
    }

    /// The nearest ancestor method this one overrides or implements:
    /// the parent chain first, then the interfaces.
    pub fn prototype(&self) -> Result<MethodView<'b>, ResolutionError> {
        let declaring = self.broker.compose(self.declaring_class_name().as_str())?;
        let candidates = declaring
            .parents
            .first()
            .into_iter()
            .chain(declaring.interfaces.iter());
        for ancestor in candidates {
            let Some(class) = self.broker.class_of(*ancestor)? else {
                continue;
            };
            if let Some(method) = class.method(self.name())
                && !method.is_private()
            {
                return Ok(method);
            }
        }
        Err(ResolutionError::missing(
            SymbolKind::Method,
            format!("prototype of {}::{}", declaring.name, self.name()),
        ))
    }

    pub fn start_line(&self) -> usize {
        self.member.record.span.start_line
    }

    pub fn end_line(&self) -> usize {
        self.member.record.span.end_line
    }

    pub fn file_name(&self) -> Option<&str> {
        self.member.record.span.file.as_deref()
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.member.record.doc.comment.as_deref()
    }

    pub fn annotations(&self) -> Result<Arc<AnnotationSet>, ResolutionError> {
        self.broker.annotations(&ElementKey::Method(
            self.through,
            self.member.record.name.clone(),
        ))
    }

    pub fn attribute(&self, attr: MethodAttribute) -> AttributeValue {
        match attr {
            MethodAttribute::Name => self.name().into(),
            MethodAttribute::DeclaringClassName => self.declaring_class_name().as_str().into(),
            MethodAttribute::DeclaringTraitName => {
                self.declaring_trait_name().map(|t| t.to_string()).into()
            }
            MethodAttribute::OriginalName => self.original_name().into(),
            MethodAttribute::Modifiers => AttributeValue::Int(self.modifiers().bits().into()),
            MethodAttribute::IsAbstract => self.is_abstract().into(),
            MethodAttribute::IsFinal => self.is_final().into(),
            MethodAttribute::IsStatic => self.is_static().into(),
            MethodAttribute::IsPublic => self.is_public().into(),
            MethodAttribute::IsProtected => self.is_protected().into(),
            MethodAttribute::IsPrivate => self.is_private().into(),
            MethodAttribute::IsConstructor => self.is_constructor().into(),
            MethodAttribute::ReturnsReference => self.returns_reference().into(),
            MethodAttribute::ReturnType => self.return_type().into(),
            MethodAttribute::NumberOfParameters => {
                AttributeValue::Int(self.number_of_parameters() as u64)
            }
            MethodAttribute::NumberOfRequiredParameters => {
                AttributeValue::Int(self.number_of_required_parameters() as u64)
            }
            MethodAttribute::StartLine => AttributeValue::Int(self.start_line() as u64),
            MethodAttribute::EndLine => AttributeValue::Int(self.end_line() as u64),
            MethodAttribute::DocComment => self.doc_comment().into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        MethodAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| unknown("method", name))
    }
}

// ─── Properties ─────────────────────────────────────────────────────────────

/// A property as seen through one composed type.
#[derive(Debug, Clone)]
pub struct PropertyView<'b> {
    broker: &'b Broker,
    through: SymbolName,
    member: Resolved<PropertyRecord>,
    accessible: bool,
}

impl<'b> PropertyView<'b> {
    pub(crate) fn new(
        broker: &'b Broker,
        through: SymbolName,
        member: Resolved<PropertyRecord>,
    ) -> Self {
        Self {
            broker,
            through,
            member,
            accessible: false,
        }
    }

    pub fn record(&self) -> &Arc<PropertyRecord> {
        &self.member.record
    }

    pub fn name(&self) -> &str {
        &self.member.record.name
    }

    pub fn origin(&self) -> MemberOrigin {
        self.member.origin
    }

    pub fn declaring_class_name(&self) -> SymbolName {
        self.member.record.declaring_type
    }

    pub fn declaring_class(&self) -> Result<ClassView<'b>, ResolutionError> {
        self.broker.class(self.declaring_class_name().as_str())
    }

    pub fn declaring_trait_name(&self) -> Option<SymbolName> {
        self.member.record.declaring_trait
    }

    pub fn modifiers(&self) -> MemberModifiers {
        self.member.modifiers
    }

    pub fn visibility(&self) -> Visibility {
        self.member.visibility()
    }

    pub fn is_public(&self) -> bool {
        self.visibility() == Visibility::Public
    }

    pub fn is_protected(&self) -> bool {
        self.visibility() == Visibility::Protected
    }

    pub fn is_private(&self) -> bool {
        self.visibility() == Visibility::Private
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().contains(MemberModifiers::STATIC)
    }

    pub fn is_readonly(&self) -> bool {
        self.modifiers().contains(MemberModifiers::READONLY)
    }

    pub fn is_promoted(&self) -> bool {
        self.member.record.promoted
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.member.record.type_hint.as_deref()
    }

    pub fn is_default_value_available(&self) -> bool {
        self.member.record.default.is_some()
    }

    pub fn default_value_definition(&self) -> Option<&str> {
        self.member.record.default.as_ref().map(|d| d.source.as_str())
    }

    /// The folded default; `null` when none is written.
    pub fn default_value(&self) -> Result<ConstValue, ResolutionError> {
        let record = &self.member.record;
        let Some(expr) = &record.default else {
            return Ok(ConstValue::Null);
        };
        let scope = EvalScope {
            context: &record.context,
            class: Some(record.declaring_type),
            function: None,
            file: record.span.file.as_deref(),
            line: record.span.start_line,
        };
        self.broker.fold(None, expr, scope, &mut Vec::new())
    }

    /// Allow [`PropertyView::value`] on a non-public property.
    pub fn set_accessible(&mut self, accessible: bool) {
        self.accessible = accessible;
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible || self.is_public()
    }

    /// The statically known value, which is the folded default.
    pub fn value(&self) -> Result<ConstValue, ResolutionError> {
        if !self.is_accessible() {
            return Err(ResolutionError::NotAccessible {
                kind: SymbolKind::Property,
                name: format!("{}::${}", self.through, self.name()),
            });
        }
        self.default_value()
    }

    pub fn start_line(&self) -> usize {
        self.member.record.span.start_line
    }

    pub fn end_line(&self) -> usize {
        self.member.record.span.end_line
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.member.record.doc.comment.as_deref()
    }

    pub fn annotations(&self) -> Result<Arc<AnnotationSet>, ResolutionError> {
        self.broker.annotations(&ElementKey::Property(
            self.through,
            self.member.record.name.clone(),
        ))
    }

    pub fn attribute(&self, attr: PropertyAttribute) -> AttributeValue {
        match attr {
            PropertyAttribute::Name => self.name().into(),
            PropertyAttribute::DeclaringClassName => self.declaring_class_name().as_str().into(),
            PropertyAttribute::DeclaringTraitName => {
                self.declaring_trait_name().map(|t| t.to_string()).into()
            }
            PropertyAttribute::Modifiers => AttributeValue::Int(self.modifiers().bits().into()),
            PropertyAttribute::IsStatic => self.is_static().into(),
            PropertyAttribute::IsReadonly => self.is_readonly().into(),
            PropertyAttribute::IsPublic => self.is_public().into(),
            PropertyAttribute::IsProtected => self.is_protected().into(),
            PropertyAttribute::IsPrivate => self.is_private().into(),
            PropertyAttribute::IsPromoted => self.is_promoted().into(),
            PropertyAttribute::TypeHint => self.type_hint().into(),
            PropertyAttribute::DefaultValueDefinition => self.default_value_definition().into(),
            PropertyAttribute::DocComment => self.doc_comment().into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        PropertyAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| unknown("property", name))
    }
}

// ─── Parameters ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ParameterView<'b> {
    broker: &'b Broker,
    record: ParameterRecord,
    is_optional: bool,
    context: Arc<NameContext>,
    file: Option<Arc<str>>,
}

impl<'b> ParameterView<'b> {
    pub fn record(&self) -> &ParameterRecord {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn position(&self) -> usize {
        self.record.position
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.record.type_hint.as_deref()
    }

    pub fn constraint(&self) -> &TypeConstraint {
        &self.record.constraint
    }

    pub fn class_name(&self) -> Option<SymbolName> {
        self.record.class_name()
    }

    /// The class named by the type constraint.
    pub fn class(&self) -> Result<Option<ClassView<'b>>, ResolutionError> {
        match self.class_name() {
            Some(name) => self.broker.class_of(name),
            None => Ok(None),
        }
    }

    pub fn is_array(&self) -> bool {
        self.record.constraint == TypeConstraint::Array
    }

    pub fn is_callable(&self) -> bool {
        self.record.constraint == TypeConstraint::Callable
    }

    pub fn allows_null(&self) -> bool {
        self.record.allows_null
    }

    pub fn is_passed_by_reference(&self) -> bool {
        self.record.is_reference
    }

    pub fn is_variadic(&self) -> bool {
        self.record.is_variadic
    }

    pub fn is_promoted(&self) -> bool {
        self.record.promoted.is_some()
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn is_default_value_available(&self) -> bool {
        self.record.has_default()
    }

    fn owner_label(&self) -> String {
        match self.record.declaring_type {
            Some(ty) => format!("{}::{}(${})", ty, self.record.function, self.record.name),
            None => format!("{}(${})", self.record.function, self.record.name),
        }
    }

    fn default_expr(&self) -> Result<&ValueExpr, ResolutionError> {
        self.record
            .default
            .as_ref()
            .ok_or_else(|| ResolutionError::missing(SymbolKind::DefaultValue, self.owner_label()))
    }

    pub fn default_value_definition(&self) -> Result<&str, ResolutionError> {
        self.default_expr().map(|d| d.source.as_str())
    }

    /// The folded default value.
    pub fn default_value(&self) -> Result<ConstValue, ResolutionError> {
        let expr = self.default_expr()?;
        let scope = EvalScope {
            context: &self.context,
            class: self.record.declaring_type,
            function: Some(self.record.function.as_str()),
            file: self.file.as_deref(),
            line: self.record.line,
        };
        self.broker.fold(None, expr, scope, &mut Vec::new())
    }

    pub fn declaring_function_name(&self) -> &str {
        &self.record.function
    }

    pub fn declaring_class_name(&self) -> Option<SymbolName> {
        self.record.declaring_type
    }

    pub fn attribute(&self, attr: ParameterAttribute) -> AttributeValue {
        match attr {
            ParameterAttribute::Name => self.name().into(),
            ParameterAttribute::Position => AttributeValue::Int(self.position() as u64),
            ParameterAttribute::TypeHint => self.type_hint().into(),
            ParameterAttribute::ClassName => self.class_name().map(|c| c.to_string()).into(),
            ParameterAttribute::IsArray => self.is_array().into(),
            ParameterAttribute::IsCallable => self.is_callable().into(),
            ParameterAttribute::AllowsNull => self.allows_null().into(),
            ParameterAttribute::IsPassedByReference => self.is_passed_by_reference().into(),
            ParameterAttribute::IsVariadic => self.is_variadic().into(),
            ParameterAttribute::IsOptional => self.is_optional().into(),
            ParameterAttribute::IsDefaultValueAvailable => {
                self.is_default_value_available().into()
            }
            ParameterAttribute::DefaultValueDefinition => {
                self.default_value_definition().ok().into()
            }
            ParameterAttribute::DeclaringFunctionName => self.declaring_function_name().into(),
            ParameterAttribute::DeclaringClassName => {
                self.declaring_class_name().map(|c| c.to_string()).into()
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        ParameterAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| unknown("parameter", name))
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// A class constant (seen through one composed type) or a global constant.
#[derive(Debug, Clone)]
pub struct ConstantView<'b> {
    broker: &'b Broker,
    record: Arc<ConstantRecord>,
    /// `Some` for class constants: the type it was looked up on.
    through: Option<SymbolName>,
    modifiers: MemberModifiers,
}

impl<'b> ConstantView<'b> {
    pub(crate) fn member(
        broker: &'b Broker,
        through: SymbolName,
        member: Resolved<ConstantRecord>,
    ) -> Self {
        Self {
            broker,
            modifiers: member.modifiers,
            record: member.record,
            through: Some(through),
        }
    }

    pub(crate) fn global(broker: &'b Broker, record: Arc<ConstantRecord>) -> Self {
        Self {
            broker,
            modifiers: record.modifiers,
            record,
            through: None,
        }
    }

    pub fn record(&self) -> &Arc<ConstantRecord> {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn qualified_name(&self) -> String {
        self.record.qualified_name()
    }

    pub fn declaring_class_name(&self) -> Option<SymbolName> {
        self.record.declaring_type.or(self.through)
    }

    pub fn modifiers(&self) -> MemberModifiers {
        self.modifiers
    }

    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(MemberModifiers::FINAL)
    }

    pub fn is_defined_by_call(&self) -> bool {
        self.record.via_define
    }

    pub fn value_definition(&self) -> &str {
        &self.record.value.source
    }

    pub fn value(&self) -> Result<ConstValue, ResolutionError> {
        let key = match self.declaring_class_name() {
            Some(owner) => ElementKey::ClassConstant(owner, self.record.name.clone()),
            None => ElementKey::Constant(SymbolName::new(&self.record.qualified_name())),
        };
        self.broker.fold(
            Some(key),
            &self.record.value,
            EvalScope::of_constant(&self.record),
            &mut Vec::new(),
        )
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.record.doc.comment.as_deref()
    }

    pub fn annotations(&self) -> Result<Arc<AnnotationSet>, ResolutionError> {
        let key = match self.through {
            Some(ty) => ElementKey::ClassConstant(ty, self.record.name.clone()),
            None => ElementKey::Constant(SymbolName::new(&self.record.qualified_name())),
        };
        self.broker.annotations(&key)
    }

    pub fn attribute(&self, attr: ConstantAttribute) -> AttributeValue {
        match attr {
            ConstantAttribute::Name => self.name().into(),
            ConstantAttribute::QualifiedName => self.qualified_name().into(),
            ConstantAttribute::DeclaringClassName => {
                self.declaring_class_name().map(|c| c.to_string()).into()
            }
            ConstantAttribute::Modifiers => AttributeValue::Int(self.modifiers().bits().into()),
            ConstantAttribute::IsFinal => self.is_final().into(),
            ConstantAttribute::ValueDefinition => self.value_definition().into(),
            ConstantAttribute::DocComment => self.doc_comment().into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        ConstantAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| unknown("constant", name))
    }
}

// ─── Functions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FunctionView<'b> {
    broker: &'b Broker,
    record: Arc<FunctionRecord>,
}

impl<'b> FunctionView<'b> {
    pub(crate) fn new(broker: &'b Broker, record: Arc<FunctionRecord>) -> Self {
        Self { broker, record }
    }

    pub fn record(&self) -> &Arc<FunctionRecord> {
        &self.record
    }

    pub fn name(&self) -> SymbolName {
        self.record.name
    }

    pub fn short_name(&self) -> &str {
        self.record.name.short_name()
    }

    pub fn namespace_name(&self) -> &str {
        self.record.name.namespace_name()
    }

    pub fn returns_reference(&self) -> bool {
        self.record.returns_reference
    }

    pub fn return_type(&self) -> Option<&str> {
        self.record.return_type.as_deref()
    }

    pub fn parameters(&self) -> Vec<ParameterView<'b>> {
        parameter_views(
            self.broker,
            &self.record.parameters,
            &self.record.context,
            self.record.span.file.as_ref(),
        )
    }

    pub fn parameter(&self, name: &str) -> Result<ParameterView<'b>, ResolutionError> {
        self.parameters()
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| {
                ResolutionError::missing(
                    SymbolKind::Parameter,
                    format!("{}(${})", self.record.name, name),
                )
            })
    }

    pub fn number_of_parameters(&self) -> usize {
        self.record.parameters.len()
    }

    pub fn number_of_required_parameters(&self) -> usize {
        self.parameters().iter().filter(|p| !p.is_optional()).count()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.record.span.file.as_deref()
    }

    pub fn start_line(&self) -> usize {
        self.record.span.start_line
    }

    pub fn end_line(&self) -> usize {
        self.record.span.end_line
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.record.doc.comment.as_deref()
    }

    pub fn annotations(&self) -> Result<Arc<AnnotationSet>, ResolutionError> {
        self.broker.annotations(&ElementKey::Function(self.record.name))
    }

    pub fn attribute(&self, attr: FunctionAttribute) -> AttributeValue {
        match attr {
            FunctionAttribute::Name => self.name().as_str().into(),
            FunctionAttribute::ShortName => self.short_name().into(),
            FunctionAttribute::NamespaceName => self.namespace_name().into(),
            FunctionAttribute::ReturnsReference => self.returns_reference().into(),
            FunctionAttribute::ReturnType => self.return_type().into(),
            FunctionAttribute::NumberOfParameters => {
                AttributeValue::Int(self.number_of_parameters() as u64)
            }
            FunctionAttribute::NumberOfRequiredParameters => {
                AttributeValue::Int(self.number_of_required_parameters() as u64)
            }
            FunctionAttribute::FileName => self.file_name().into(),
            FunctionAttribute::StartLine => AttributeValue::Int(self.start_line() as u64),
            FunctionAttribute::EndLine => AttributeValue::Int(self.end_line() as u64),
            FunctionAttribute::DocComment => self.doc_comment().into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        FunctionAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| unknown("function", name))
    }
}
