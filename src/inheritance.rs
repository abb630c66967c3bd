/// Class composition.
///
/// This module merges members from traits, the parent chain and
/// implemented interfaces into a single [`ComposedType`].  The merged view
/// contains the complete set of members visible on the type, respecting
/// PHP's precedence rules:
///
///   own declarations > trait copies > parent chain > interfaces
///
/// Trait members are copied into the composing type (they become part of
/// its own table), so a trait method shadows an inherited one.  Private
/// parent members are never inherited.
///
/// Ancestors are fetched from the [`Broker`] by name and may be missing,
/// external stubs, or still under construction.  Such a view is flagged
/// [`Lifecycle::Incomplete`], is cached only for the current registry
/// generation, and is recomputed once new units have been registered.
/// Derived modifier bits are filled in only once every ancestor is itself
/// complete.
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::broker::{Broker, CacheSlot, TypeEntry};
use crate::error::{ResolutionError, SymbolKind};
use crate::types::*;

/// Where a type stands in its resolution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Not composed at the current generation, or composition is in
    /// progress further up the current call stack.
    Pending,
    /// Built from source, but some ancestor is missing, a stub, pending,
    /// or itself incomplete.
    Incomplete,
    /// Every ancestor is resolved and complete.
    Complete,
    /// Referenced but never declared; has no members.
    ExternalStub,
}

/// How a member reached the composed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin {
    Declared,
    /// Copied in from the named trait.
    Trait(SymbolName),
    /// Inherited from the named ancestor class (the declaring type).
    Inherited(SymbolName),
    /// Declared by the named interface and not implemented here.
    Interface(SymbolName),
}

impl MemberOrigin {
    /// Declared here or copied in from a trait.
    pub fn is_own(self) -> bool {
        matches!(self, Self::Declared | Self::Trait(_))
    }
}

/// A member in a composed table with its effective modifiers.
#[derive(Debug)]
pub struct Resolved<T> {
    pub record: Arc<T>,
    pub origin: MemberOrigin,
    pub modifiers: MemberModifiers,
}

impl<T> Clone for Resolved<T> {
    fn clone(&self) -> Self {
        Self {
            record: Arc::clone(&self.record),
            origin: self.origin,
            modifiers: self.modifiers,
        }
    }
}

impl<T> Resolved<T> {
    fn new(record: Arc<T>, origin: MemberOrigin, modifiers: MemberModifiers) -> Self {
        Self {
            record,
            origin,
            modifiers,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.modifiers.visibility()
    }
}

/// The merged view of one class, interface or trait.
#[derive(Debug, Clone)]
pub struct ComposedType {
    pub name: SymbolName,
    /// `None` for external stubs.
    pub record: Option<Arc<ClassRecord>>,
    pub lifecycle: Lifecycle,
    pub modifiers: ClassModifiers,
    /// Parent classes, nearest first.
    pub parents: Vec<SymbolName>,
    /// Every implemented interface: own declared, then the parent's, then
    /// those inherited through interfaces.
    pub interfaces: Vec<SymbolName>,
    /// Used traits, including traits used by traits.
    pub traits: Vec<SymbolName>,
    /// `alias => Trait::method`.
    pub trait_aliases: BTreeMap<String, String>,
    pub methods: BTreeMap<String, Resolved<MethodRecord>>,
    pub properties: BTreeMap<String, Resolved<PropertyRecord>>,
    pub constants: BTreeMap<String, Resolved<ConstantRecord>>,
    /// Ancestors that kept this view from completing.
    pub missing: Vec<SymbolName>,
}

impl ComposedType {
    fn stub(name: SymbolName) -> Self {
        Self {
            name,
            record: None,
            lifecycle: Lifecycle::ExternalStub,
            modifiers: ClassModifiers::empty(),
            parents: Vec::new(),
            interfaces: Vec::new(),
            traits: Vec::new(),
            trait_aliases: BTreeMap::new(),
            methods: BTreeMap::new(),
            properties: BTreeMap::new(),
            constants: BTreeMap::new(),
            missing: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.lifecycle == Lifecycle::Complete
    }

    pub fn kind(&self) -> Option<ClassLikeKind> {
        self.record.as_ref().map(|r| r.kind)
    }

    pub fn method(&self, name: &str) -> Option<&Resolved<MethodRecord>> {
        self.methods.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&Resolved<PropertyRecord>> {
        self.properties.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Resolved<ConstantRecord>> {
        self.constants.get(name)
    }

    pub fn is_subclass_of(&self, other: SymbolName) -> bool {
        self.parents.contains(&other) || self.interfaces.contains(&other)
    }

    pub fn implements_interface(&self, interface: SymbolName) -> bool {
        self.interfaces.contains(&interface)
    }

    pub fn uses_trait(&self, name: SymbolName) -> bool {
        self.traits.contains(&name)
    }
}

/// Tracks what kept a composition from completing.
#[derive(Default)]
struct Progress {
    complete: bool,
    missing: Vec<SymbolName>,
}

impl Progress {
    fn blocked_by(&mut self, name: SymbolName) {
        self.complete = false;
        if !self.missing.contains(&name) {
            self.missing.push(name);
        }
    }
}

fn push_unique(list: &mut Vec<SymbolName>, name: SymbolName) {
    if !list.contains(&name) {
        list.push(name);
    }
}

impl Broker {
    /// The composed view of `name`.
    ///
    /// Memoised: a complete view is computed once; an incomplete one is
    /// reused until the next registration and then recomputed.
    pub fn compose(&self, name: &str) -> Result<Arc<ComposedType>, ResolutionError> {
        let mut stack = Vec::new();
        self.compose_with(SymbolName::new(name), &mut stack)
    }

    /// Where `name` stands without advancing it.  [`Broker::compose`] is
    /// the idempotent "attempt to advance" operation.
    pub fn lifecycle(&self, name: &str) -> Result<Lifecycle, ResolutionError> {
        let name = SymbolName::new(name);
        match self.type_entry(name) {
            Some(TypeEntry::ExternalStub(_)) => Ok(Lifecycle::ExternalStub),
            None => Err(ResolutionError::missing(SymbolKind::Type, name)),
            Some(TypeEntry::Tokenized(_)) => Ok(self
                .compositions
                .lock()
                .get(&name)
                .filter(|slot| slot.is_fresh(self.generation()))
                .map_or(Lifecycle::Pending, |slot| slot.value.lifecycle)),
        }
    }

    pub(crate) fn compose_with(
        &self,
        name: SymbolName,
        stack: &mut Vec<SymbolName>,
    ) -> Result<Arc<ComposedType>, ResolutionError> {
        let record = match self.type_entry(name) {
            Some(TypeEntry::Tokenized(record)) => Arc::clone(record),
            Some(TypeEntry::ExternalStub(_)) => return Ok(Arc::new(ComposedType::stub(name))),
            None => return Err(ResolutionError::missing(SymbolKind::Type, name)),
        };

        let generation = self.generation();
        if let Some(slot) = self.compositions.lock().get(&name) {
            if slot.is_fresh(generation) {
                return Ok(Arc::clone(&slot.value));
            }
            trace!(
                "recomposing {} (incomplete at generation {}, now {})",
                name, slot.generation, generation
            );
        }

        if stack.len() >= self.config().max_inheritance_depth {
            return Err(ResolutionError::InvalidArgument {
                reason: format!(
                    "inheritance chain of {} exceeds {} levels",
                    name,
                    self.config().max_inheritance_depth
                ),
            });
        }

        stack.push(name);
        let composed = self.compose_record(&record, stack);
        stack.pop();
        let composed = Arc::new(composed?);

        self.compositions.lock().insert(
            name,
            CacheSlot {
                value: Arc::clone(&composed),
                generation,
                is_final: composed.is_complete(),
            },
        );
        Ok(composed)
    }

    /// Fetch an ancestor's view, noting why it might block completion.
    fn ancestor(
        &self,
        name: SymbolName,
        expected: ClassLikeKind,
        owner: SymbolName,
        stack: &mut Vec<SymbolName>,
        progress: &mut Progress,
    ) -> Result<Option<Arc<ComposedType>>, ResolutionError> {
        if stack.contains(&name) {
            // Pending: cyclic or in-progress construction.
            progress.blocked_by(name);
            return Ok(None);
        }
        match self.type_entry(name) {
            None | Some(TypeEntry::ExternalStub(_)) => {
                progress.blocked_by(name);
                Ok(None)
            }
            Some(TypeEntry::Tokenized(record)) => {
                if record.kind != expected {
                    return Err(ResolutionError::InvalidArgument {
                        reason: format!(
                            "{} cannot use {} {} as a {}",
                            owner,
                            kind_label(record.kind),
                            name,
                            kind_label(expected)
                        ),
                    });
                }
                let view = self.compose_with(name, stack)?;
                if !view.is_complete() {
                    progress.complete = false;
                    for missing in &view.missing {
                        push_unique(&mut progress.missing, *missing);
                    }
                }
                Ok(Some(view))
            }
        }
    }

    fn compose_record(
        &self,
        record: &Arc<ClassRecord>,
        stack: &mut Vec<SymbolName>,
    ) -> Result<ComposedType, ResolutionError> {
        let name = record.name;
        let mut progress = Progress {
            complete: true,
            ..Progress::default()
        };
        let mut view = ComposedType {
            record: Some(Arc::clone(record)),
            lifecycle: Lifecycle::Incomplete,
            modifiers: record.modifiers,
            ..ComposedType::stub(name)
        };

        // 1. Own declarations.
        for method in &record.methods {
            view.methods.insert(
                method.name.clone(),
                Resolved::new(Arc::clone(method), MemberOrigin::Declared, method.modifiers),
            );
        }
        for property in &record.properties {
            view.properties.insert(
                property.name.clone(),
                Resolved::new(
                    Arc::clone(property),
                    MemberOrigin::Declared,
                    property.modifiers,
                ),
            );
        }
        for constant in &record.constants {
            view.constants.insert(
                constant.name.clone(),
                Resolved::new(
                    Arc::clone(constant),
                    MemberOrigin::Declared,
                    constant.modifiers,
                ),
            );
        }

        // 2. Traits, copied in by value.
        let mut trait_views = Vec::new();
        for trait_name in &record.traits {
            push_unique(&mut view.traits, *trait_name);
            if let Some(t) =
                self.ancestor(*trait_name, ClassLikeKind::Trait, name, stack, &mut progress)?
            {
                for nested in &t.traits {
                    push_unique(&mut view.traits, *nested);
                }
                trait_views.push(t);
            }
        }
        self.merge_traits(record, &trait_views, &mut view)?;

        // 3. Parent chain.
        let mut inherited_interfaces = Vec::new();
        if let Some(parent_name) = record.parent {
            if let Some(parent) =
                self.ancestor(parent_name, ClassLikeKind::Class, name, stack, &mut progress)?
            {
                view.parents.push(parent_name);
                view.parents.extend(parent.parents.iter().copied());
                inherited_interfaces.extend(parent.interfaces.iter().copied());
                inherit_members(&parent, &mut view);
            } else {
                view.parents.push(parent_name);
            }
        }

        // 4. Interfaces.
        let mut through_interfaces = Vec::new();
        let mut interface_views = Vec::new();
        for iface in &record.interfaces {
            push_unique(&mut view.interfaces, *iface);
            if let Some(i) =
                self.ancestor(*iface, ClassLikeKind::Interface, name, stack, &mut progress)?
            {
                through_interfaces.extend(i.interfaces.iter().copied());
                interface_views.push(i);
            }
        }
        for iface in inherited_interfaces.into_iter().chain(through_interfaces) {
            push_unique(&mut view.interfaces, iface);
        }
        for iface in &interface_views {
            merge_interface(iface, &mut view);
        }

        // 5. Modifier completion.
        view.missing = progress.missing;
        if progress.complete {
            view.lifecycle = Lifecycle::Complete;
            complete_modifiers(&mut view);
        } else {
            strip_derived(&mut view);
        }
        if !view.interfaces.is_empty() && record.kind == ClassLikeKind::Class {
            view.modifiers |= ClassModifiers::IMPLEMENTS_INTERFACES;
        }
        if !view.traits.is_empty() {
            view.modifiers |= ClassModifiers::IMPLEMENTS_TRAITS;
        }
        Ok(view)
    }

    /// Apply the trait adaptation rules and copy trait members in.
    fn merge_traits(
        &self,
        record: &ClassRecord,
        traits: &[Arc<ComposedType>],
        view: &mut ComposedType,
    ) -> Result<(), ResolutionError> {
        let name = record.name;
        // Which trait installed each method name, for conflict detection.
        let mut installed: BTreeMap<String, SymbolName> = BTreeMap::new();

        for t in traits {
            let trait_name = t.name;
            for (method_name, method) in &t.methods {
                let excluded = record.trait_precedences.iter().any(|rule| {
                    rule.method_name == *method_name
                        && rule.trait_name != trait_name
                        && rule.insteadof.contains(&trait_name)
                });

                let rules = record.trait_aliases.iter().filter(|rule| {
                    rule.method_name == *method_name
                        && rule.trait_name.is_none_or(|t| t == trait_name)
                });
                let mut visibility_change = None;
                for rule in rules {
                    match &rule.alias {
                        Some(alias) => {
                            view.trait_aliases
                                .insert(alias.clone(), format!("{}::{}", trait_name, method_name));
                            let copy = method.record.alias_into(
                                name,
                                trait_name,
                                Some(alias),
                                rule.visibility,
                            );
                            install_trait_method(view, &mut installed, trait_name, copy)?;
                        }
                        None => visibility_change = rule.visibility,
                    }
                }

                if excluded {
                    continue;
                }
                let copy = method
                    .record
                    .alias_into(name, trait_name, None, visibility_change);
                install_trait_method(view, &mut installed, trait_name, copy)?;
            }

            for (prop_name, property) in &t.properties {
                view.properties.entry(prop_name.clone()).or_insert_with(|| {
                    let mut copy = (*property.record).clone();
                    copy.declaring_type = name;
                    copy.declaring_trait = Some(trait_name);
                    let modifiers = copy.modifiers;
                    Resolved::new(Arc::new(copy), MemberOrigin::Trait(trait_name), modifiers)
                });
            }
            for (const_name, constant) in &t.constants {
                view.constants.entry(const_name.clone()).or_insert_with(|| {
                    let mut copy = (*constant.record).clone();
                    copy.declaring_type = Some(name);
                    copy.declaring_trait = Some(trait_name);
                    let modifiers = copy.modifiers;
                    Resolved::new(Arc::new(copy), MemberOrigin::Trait(trait_name), modifiers)
                });
            }
        }
        Ok(())
    }
}

fn kind_label(kind: ClassLikeKind) -> &'static str {
    match kind {
        ClassLikeKind::Class => "class",
        ClassLikeKind::Interface => "interface",
        ClassLikeKind::Trait => "trait",
    }
}

/// Install one trait method copy.  Own declarations win silently; two
/// traits providing the same name is a conflict unless one of them is
/// abstract.
fn install_trait_method(
    view: &mut ComposedType,
    installed: &mut BTreeMap<String, SymbolName>,
    trait_name: SymbolName,
    copy: MethodRecord,
) -> Result<(), ResolutionError> {
    if view
        .methods
        .get(&copy.name)
        .is_some_and(|m| m.origin == MemberOrigin::Declared)
    {
        return Ok(());
    }
    if let Some(previous) = installed.get(&copy.name)
        && *previous != trait_name
        && let Some(existing) = view.methods.get(&copy.name)
    {
        if copy.is_abstract() {
            return Ok(());
        }
        if !existing.record.is_abstract() {
            return Err(ResolutionError::duplicate(
                SymbolKind::Method,
                format!("{}::{}", view.name, copy.name),
            ));
        }
    }
    installed.insert(copy.name.clone(), trait_name);
    let modifiers = copy.modifiers;
    view.methods.insert(
        copy.name.clone(),
        Resolved::new(Arc::new(copy), MemberOrigin::Trait(trait_name), modifiers),
    );
    Ok(())
}

/// Inherit non-private members of `parent` that `view` does not override,
/// and flag overrides.
fn inherit_members(parent: &ComposedType, view: &mut ComposedType) {
    for (name, inherited) in &parent.methods {
        if inherited.visibility() == Visibility::Private {
            continue;
        }
        match view.methods.get_mut(name) {
            Some(own) => {
                if inherited.record.is_abstract() && !own.record.is_abstract() {
                    own.modifiers |= MemberModifiers::IMPLEMENTED_ABSTRACT;
                }
                if own.visibility().is_looser_than(inherited.visibility()) {
                    own.modifiers |= MemberModifiers::ACCESS_LEVEL_CHANGED;
                }
            }
            None => {
                let origin = match inherited.origin {
                    MemberOrigin::Interface(i) => MemberOrigin::Interface(i),
                    _ => MemberOrigin::Inherited(inherited.record.declaring_type),
                };
                view.methods.insert(
                    name.clone(),
                    Resolved::new(Arc::clone(&inherited.record), origin, inherited.modifiers),
                );
            }
        }
    }

    for (name, inherited) in &parent.properties {
        if inherited.visibility() == Visibility::Private {
            continue;
        }
        match view.properties.get_mut(name) {
            Some(own) => {
                if own.visibility().is_looser_than(inherited.visibility()) {
                    own.modifiers |= MemberModifiers::ACCESS_LEVEL_CHANGED;
                }
            }
            None => {
                let origin = MemberOrigin::Inherited(inherited.record.declaring_type);
                view.properties.insert(
                    name.clone(),
                    Resolved::new(Arc::clone(&inherited.record), origin, inherited.modifiers),
                );
            }
        }
    }

    for (name, inherited) in &parent.constants {
        if inherited.visibility() == Visibility::Private || view.constants.contains_key(name) {
            continue;
        }
        let origin = match (inherited.origin, inherited.record.declaring_type) {
            (MemberOrigin::Interface(i), _) => MemberOrigin::Interface(i),
            (_, Some(declaring)) => MemberOrigin::Inherited(declaring),
            (_, None) => MemberOrigin::Inherited(parent.name),
        };
        view.constants.insert(
            name.clone(),
            Resolved::new(Arc::clone(&inherited.record), origin, inherited.modifiers),
        );
    }
}

/// Interfaces contribute methods and constants the type has not got.
fn merge_interface(iface: &ComposedType, view: &mut ComposedType) {
    for (name, method) in &iface.methods {
        match view.methods.get_mut(name) {
            Some(own) => {
                if !own.record.is_abstract() {
                    own.modifiers |= MemberModifiers::IMPLEMENTED_ABSTRACT;
                }
            }
            None => {
                let declaring = match method.origin {
                    MemberOrigin::Interface(i) => i,
                    _ => method.record.declaring_type,
                };
                view.methods.insert(
                    name.clone(),
                    Resolved::new(
                        Arc::clone(&method.record),
                        MemberOrigin::Interface(declaring),
                        method.modifiers,
                    ),
                );
            }
        }
    }
    for (name, constant) in &iface.constants {
        if view.constants.contains_key(name) {
            continue;
        }
        let declaring = match constant.origin {
            MemberOrigin::Interface(i) => i,
            _ => constant.record.declaring_type.unwrap_or(iface.name),
        };
        view.constants.insert(
            name.clone(),
            Resolved::new(
                Arc::clone(&constant.record),
                MemberOrigin::Interface(declaring),
                constant.modifiers,
            ),
        );
    }
}

/// Fill the class modifier bits that depend on the whole hierarchy.
fn complete_modifiers(view: &mut ComposedType) {
    let is_class = view.kind() == Some(ClassLikeKind::Class);
    let has_abstract = view
        .methods
        .values()
        .any(|m| m.modifiers.contains(MemberModifiers::ABSTRACT));
    if is_class && has_abstract && !view.modifiers.contains(ClassModifiers::EXPLICIT_ABSTRACT) {
        view.modifiers |= ClassModifiers::IMPLICIT_ABSTRACT;
    }
}

/// An incomplete view reports modifiers as written.
fn strip_derived(view: &mut ComposedType) {
    for method in view.methods.values_mut() {
        method.modifiers -= MemberModifiers::derived();
    }
    for property in view.properties.values_mut() {
        property.modifiers -= MemberModifiers::derived();
    }
}
