use std::sync::Arc;

use serde::Serialize;

use super::attributes::{AttributeValue, ClassAttribute};
use super::member::{ConstantView, MethodView, PropertyView};
use crate::broker::Broker;
use crate::docblock::AnnotationSet;
use crate::error::{ResolutionError, SymbolKind};
use crate::inheritance::{ComposedType, Lifecycle, MemberOrigin};
use crate::types::*;
use crate::value::ConstValue;

/// Reflection of one class, interface, trait or external stub.
#[derive(Debug, Clone)]
pub struct ClassView<'b> {
    broker: &'b Broker,
    view: Arc<ComposedType>,
}

/// Serializable overview of a composed type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeSummary {
    pub name: SymbolName,
    pub kind: Option<ClassLikeKind>,
    pub lifecycle: Lifecycle,
    pub modifiers: u32,
    pub file: Option<String>,
    pub start_line: usize,
    pub parents: Vec<SymbolName>,
    pub interfaces: Vec<SymbolName>,
    pub traits: Vec<SymbolName>,
    pub methods: Vec<MemberSummary>,
    pub properties: Vec<MemberSummary>,
    pub constants: Vec<MemberSummary>,
    pub missing: Vec<SymbolName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub name: String,
    pub declared_in: SymbolName,
    pub origin: &'static str,
    pub visibility: Visibility,
    pub modifiers: u32,
}

fn origin_label(origin: MemberOrigin) -> &'static str {
    match origin {
        MemberOrigin::Declared => "declared",
        MemberOrigin::Trait(_) => "trait",
        MemberOrigin::Inherited(_) => "inherited",
        MemberOrigin::Interface(_) => "interface",
    }
}

impl<'b> ClassView<'b> {
    pub(crate) fn new(broker: &'b Broker, view: Arc<ComposedType>) -> Self {
        Self { broker, view }
    }

    /// The underlying composed type.
    pub fn composed(&self) -> &Arc<ComposedType> {
        &self.view
    }

    pub fn record(&self) -> Option<&Arc<ClassRecord>> {
        self.view.record.as_ref()
    }

    // ─── Identity ───────────────────────────────────────────────────────

    pub fn name(&self) -> SymbolName {
        self.view.name
    }

    pub fn short_name(&self) -> &str {
        self.view.name.short_name()
    }

    pub fn namespace_name(&self) -> &str {
        self.view.name.namespace_name()
    }

    pub fn in_namespace(&self) -> bool {
        !self.namespace_name().is_empty()
    }

    pub fn kind(&self) -> Option<ClassLikeKind> {
        self.view.kind()
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == Some(ClassLikeKind::Interface)
    }

    pub fn is_trait(&self) -> bool {
        self.kind() == Some(ClassLikeKind::Trait)
    }

    pub fn is_external_stub(&self) -> bool {
        self.view.lifecycle == Lifecycle::ExternalStub
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.view.lifecycle
    }

    pub fn is_complete(&self) -> bool {
        self.view.is_complete()
    }

    // ─── Modifiers ──────────────────────────────────────────────────────

    /// Effective modifiers.  Until the type is complete these are the
    /// modifiers as written plus the `IMPLEMENTS_*` bits.
    pub fn modifiers(&self) -> ClassModifiers {
        self.view.modifiers
    }

    pub fn is_abstract(&self) -> bool {
        self.view.modifiers.intersects(
            ClassModifiers::EXPLICIT_ABSTRACT | ClassModifiers::IMPLICIT_ABSTRACT,
        ) || self.is_interface()
    }

    pub fn is_final(&self) -> bool {
        self.view.modifiers.contains(ClassModifiers::FINAL)
    }

    pub fn is_readonly(&self) -> bool {
        self.view.modifiers.contains(ClassModifiers::READONLY)
    }

    /// A concrete class whose constructor, if any, is public.
    pub fn is_instantiable(&self) -> bool {
        self.kind() == Some(ClassLikeKind::Class)
            && !self.is_abstract()
            && self
                .method("__construct")
                .is_none_or(|ctor| ctor.visibility() == Visibility::Public)
    }

    // ─── Ancestors ──────────────────────────────────────────────────────

    pub fn parent_class_name(&self) -> Option<SymbolName> {
        self.view.parents.first().copied()
    }

    /// The parent, or `None` when there is none or it was never declared
    /// and stub recording is off.
    pub fn parent_class(&self) -> Result<Option<ClassView<'b>>, ResolutionError> {
        match self.parent_class_name() {
            Some(parent) => self.broker.class_of(parent),
            None => Ok(None),
        }
    }

    /// Parent classes, nearest first.
    pub fn parent_class_names(&self) -> &[SymbolName] {
        &self.view.parents
    }

    pub fn interface_names(&self) -> &[SymbolName] {
        &self.view.interfaces
    }

    /// Interfaces named in this type's own `implements` (or `extends` for
    /// an interface) clause.
    pub fn own_interface_names(&self) -> &[SymbolName] {
        self.record().map(|r| r.interfaces.as_slice()).unwrap_or_default()
    }

    pub fn interfaces(&self) -> Result<Vec<ClassView<'b>>, ResolutionError> {
        let mut out = Vec::new();
        for name in &self.view.interfaces {
            out.extend(self.broker.class_of(*name)?);
        }
        Ok(out)
    }

    pub fn trait_names(&self) -> &[SymbolName] {
        &self.view.traits
    }

    pub fn own_trait_names(&self) -> &[SymbolName] {
        self.record().map(|r| r.traits.as_slice()).unwrap_or_default()
    }

    pub fn traits(&self) -> Result<Vec<ClassView<'b>>, ResolutionError> {
        let mut out = Vec::new();
        for name in &self.view.traits {
            out.extend(self.broker.class_of(*name)?);
        }
        Ok(out)
    }

    /// `alias => Trait::method` for every aliased trait import.
    pub fn trait_aliases(&self) -> &std::collections::BTreeMap<String, String> {
        &self.view.trait_aliases
    }

    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.view.is_subclass_of(SymbolName::new(name))
    }

    pub fn implements_interface(&self, name: &str) -> bool {
        self.view.implements_interface(SymbolName::new(name))
    }

    pub fn uses_trait(&self, name: &str) -> bool {
        self.view.uses_trait(SymbolName::new(name))
    }

    /// Ancestors that are missing, external stubs or cyclic.
    pub fn unresolved_ancestors(&self) -> &[SymbolName] {
        &self.view.missing
    }

    // ─── Methods ────────────────────────────────────────────────────────

    pub fn has_method(&self, name: &str) -> bool {
        self.view.method(name).is_some()
    }

    pub fn method(&self, name: &str) -> Option<MethodView<'b>> {
        self.view
            .method(name)
            .map(|m| MethodView::new(self.broker, self.view.name, m.clone()))
    }

    pub fn get_method(&self, name: &str) -> Result<MethodView<'b>, ResolutionError> {
        self.method(name).ok_or_else(|| {
            ResolutionError::missing(SymbolKind::Method, format!("{}::{}", self.view.name, name))
        })
    }

    /// Every visible method: own, trait-imported, inherited and
    /// interface-declared.
    pub fn methods(&self) -> Vec<MethodView<'b>> {
        self.methods_where(|_| true)
    }

    /// Declared here or copied in from a trait.
    pub fn own_methods(&self) -> Vec<MethodView<'b>> {
        self.methods_where(MemberOrigin::is_own)
    }

    pub fn trait_methods(&self) -> Vec<MethodView<'b>> {
        self.methods_where(|o| matches!(o, MemberOrigin::Trait(_)))
    }

    pub fn inherited_methods(&self) -> Vec<MethodView<'b>> {
        self.methods_where(|o| !o.is_own())
    }

    fn methods_where(&self, keep: impl Fn(MemberOrigin) -> bool) -> Vec<MethodView<'b>> {
        self.view
            .methods
            .values()
            .filter(|m| keep(m.origin))
            .map(|m| MethodView::new(self.broker, self.view.name, m.clone()))
            .collect()
    }

    // ─── Properties ─────────────────────────────────────────────────────

    pub fn has_property(&self, name: &str) -> bool {
        self.view.property(name).is_some()
    }

    pub fn property(&self, name: &str) -> Option<PropertyView<'b>> {
        self.view
            .property(name)
            .map(|p| PropertyView::new(self.broker, self.view.name, p.clone()))
    }

    pub fn get_property(&self, name: &str) -> Result<PropertyView<'b>, ResolutionError> {
        self.property(name).ok_or_else(|| {
            ResolutionError::missing(SymbolKind::Property, format!("{}::${}", self.view.name, name))
        })
    }

    pub fn properties(&self) -> Vec<PropertyView<'b>> {
        self.properties_where(|_| true)
    }

    pub fn own_properties(&self) -> Vec<PropertyView<'b>> {
        self.properties_where(MemberOrigin::is_own)
    }

    pub fn trait_properties(&self) -> Vec<PropertyView<'b>> {
        self.properties_where(|o| matches!(o, MemberOrigin::Trait(_)))
    }

    pub fn inherited_properties(&self) -> Vec<PropertyView<'b>> {
        self.properties_where(|o| !o.is_own())
    }

    fn properties_where(&self, keep: impl Fn(MemberOrigin) -> bool) -> Vec<PropertyView<'b>> {
        self.view
            .properties
            .values()
            .filter(|p| keep(p.origin))
            .map(|p| PropertyView::new(self.broker, self.view.name, p.clone()))
            .collect()
    }

    // ─── Constants ──────────────────────────────────────────────────────

    pub fn has_constant(&self, name: &str) -> bool {
        self.view.constant(name).is_some()
    }

    pub fn constant(&self, name: &str) -> Option<ConstantView<'b>> {
        self.view
            .constant(name)
            .map(|c| ConstantView::member(self.broker, self.view.name, c.clone()))
    }

    pub fn get_constant(&self, name: &str) -> Result<ConstantView<'b>, ResolutionError> {
        self.constant(name).ok_or_else(|| {
            ResolutionError::missing(
                SymbolKind::ClassConstant,
                format!("{}::{}", self.view.name, name),
            )
        })
    }

    pub fn constants(&self) -> Vec<ConstantView<'b>> {
        self.constants_where(|_| true)
    }

    pub fn own_constants(&self) -> Vec<ConstantView<'b>> {
        self.constants_where(MemberOrigin::is_own)
    }

    pub fn inherited_constants(&self) -> Vec<ConstantView<'b>> {
        self.constants_where(|o| !o.is_own())
    }

    fn constants_where(&self, keep: impl Fn(MemberOrigin) -> bool) -> Vec<ConstantView<'b>> {
        self.view
            .constants
            .values()
            .filter(|c| keep(c.origin))
            .map(|c| ConstantView::member(self.broker, self.view.name, c.clone()))
            .collect()
    }

    pub fn constant_value(&self, name: &str) -> Result<ConstValue, ResolutionError> {
        self.broker
            .class_constant_value(self.view.name.as_str(), name)
    }

    // ─── Source and documentation ───────────────────────────────────────

    pub fn file_name(&self) -> Option<&str> {
        self.record().and_then(|r| r.span.file.as_deref())
    }

    pub fn start_line(&self) -> usize {
        self.record().map_or(0, |r| r.span.start_line)
    }

    pub fn end_line(&self) -> usize {
        self.record().map_or(0, |r| r.span.end_line)
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.record().and_then(|r| r.doc.comment.as_deref())
    }

    pub fn annotations(&self) -> Result<Arc<AnnotationSet>, ResolutionError> {
        self.broker.annotations(&ElementKey::Type(self.view.name))
    }

    pub fn has_annotation(&self, name: &str) -> Result<bool, ResolutionError> {
        Ok(self.annotations()?.has_annotation(name))
    }

    // ─── Attribute table ────────────────────────────────────────────────

    pub fn attribute(&self, attr: ClassAttribute) -> AttributeValue {
        let names = |names: &[SymbolName]| {
            AttributeValue::Names(names.iter().map(ToString::to_string).collect())
        };
        match attr {
            ClassAttribute::Name => self.view.name.as_str().into(),
            ClassAttribute::ShortName => self.short_name().into(),
            ClassAttribute::NamespaceName => self.namespace_name().into(),
            ClassAttribute::Kind => self.kind().map(|k| format!("{k:?}").to_lowercase()).into(),
            ClassAttribute::Modifiers => AttributeValue::Int(self.modifiers().bits().into()),
            ClassAttribute::IsAbstract => self.is_abstract().into(),
            ClassAttribute::IsFinal => self.is_final().into(),
            ClassAttribute::IsInterface => self.is_interface().into(),
            ClassAttribute::IsTrait => self.is_trait().into(),
            ClassAttribute::IsComplete => self.is_complete().into(),
            ClassAttribute::IsExternalStub => self.is_external_stub().into(),
            ClassAttribute::ParentClassName => {
                self.parent_class_name().map(|p| p.to_string()).into()
            }
            ClassAttribute::ParentClassNames => names(self.parent_class_names()),
            ClassAttribute::InterfaceNames => names(self.interface_names()),
            ClassAttribute::TraitNames => names(self.trait_names()),
            ClassAttribute::FileName => self.file_name().into(),
            ClassAttribute::StartLine => AttributeValue::Int(self.start_line() as u64),
            ClassAttribute::EndLine => AttributeValue::Int(self.end_line() as u64),
            ClassAttribute::DocComment => self.doc_comment().into(),
        }
    }

    /// Read an attribute by name.
    pub fn get(&self, name: &str) -> Result<AttributeValue, ResolutionError> {
        ClassAttribute::from_name(name)
            .map(|attr| self.attribute(attr))
            .ok_or_else(|| ResolutionError::InvalidArgument {
                reason: format!("unknown class attribute `{name}`"),
            })
    }

    pub fn summary(&self) -> TypeSummary {
        fn member<T>(
            name: &str,
            declared_in: SymbolName,
            resolved: &crate::inheritance::Resolved<T>,
        ) -> MemberSummary {
            MemberSummary {
                name: name.to_string(),
                declared_in,
                origin: origin_label(resolved.origin),
                visibility: resolved.visibility(),
                modifiers: resolved.modifiers.bits(),
            }
        }

        let v = &self.view;
        TypeSummary {
            name: v.name,
            kind: v.kind(),
            lifecycle: v.lifecycle,
            modifiers: v.modifiers.bits(),
            file: self.file_name().map(str::to_string),
            start_line: self.start_line(),
            parents: v.parents.clone(),
            interfaces: v.interfaces.clone(),
            traits: v.traits.clone(),
            methods: v
                .methods
                .iter()
                .map(|(n, m)| member(n, m.record.declaring_type, m))
                .collect(),
            properties: v
                .properties
                .iter()
                .map(|(n, p)| member(n, p.record.declaring_type, p))
                .collect(),
            constants: v
                .constants
                .iter()
                .map(|(n, c)| member(n, c.record.declaring_type.unwrap_or(v.name), c))
                .collect(),
            missing: v.missing.clone(),
        }
    }
}
