/// The symbol registry.
///
/// The [`Broker`] owns every record built from source and maps
/// fully-qualified names to them.  Records refer to each other by name
/// only; the composition resolver and the annotation engine look ancestors
/// up here on demand and memoise their results in per-kind caches owned by
/// the broker.
///
/// Registration is the only mutation and needs `&mut self`.  Queries take
/// `&self`; the caches sit behind `parking_lot` mutexes so a broker shared
/// through [`Broker::shared`] can serve readers concurrently while one
/// writer registers new units.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::ReflectConfig;
use crate::docblock::AnnotationSet;
use crate::error::{Error, ResolutionError, SymbolKind};
use crate::inheritance::ComposedType;
use crate::parser::parse_source;
use crate::types::*;

/// A broker shared between threads behind a single writer lock.
pub type SharedBroker = Arc<RwLock<Broker>>;

/// Registry state of a type name.
#[derive(Debug, Clone)]
pub enum TypeEntry {
    /// Built from an analysed source unit.
    Tokenized(Arc<ClassRecord>),
    /// Referenced as an ancestor but never declared.
    ExternalStub(SymbolName),
}

/// Result of a type lookup that found something.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Arc<ClassRecord>),
    ExternalStub(SymbolName),
}

impl Lookup {
    pub fn record(&self) -> Option<&Arc<ClassRecord>> {
        match self {
            Self::Found(record) => Some(record),
            Self::ExternalStub(_) => None,
        }
    }

    pub fn is_external_stub(&self) -> bool {
        matches!(self, Self::ExternalStub(_))
    }
}

/// A memoised result and the registry generation it was computed at.
#[derive(Debug, Clone)]
pub(crate) struct CacheSlot<T> {
    pub value: Arc<T>,
    pub generation: u64,
    /// Final results are never recomputed.
    pub is_final: bool,
}

impl<T> CacheSlot<T> {
    /// The slot can be served at `generation` without recomputing.
    pub fn is_fresh(&self, generation: u64) -> bool {
        self.is_final || self.generation == generation
    }
}

#[derive(Debug, Default)]
pub struct Broker {
    config: ReflectConfig,
    types: HashMap<SymbolName, TypeEntry>,
    functions: HashMap<SymbolName, Arc<FunctionRecord>>,
    constants: HashMap<SymbolName, Arc<ConstantRecord>>,
    namespaces: HashMap<String, NamespaceRecord>,
    files: Vec<Arc<str>>,
    /// Bumped on every successful registration; incomplete cache entries
    /// from an older generation are recomputed.
    generation: u64,
    pub(crate) compositions: Mutex<HashMap<SymbolName, CacheSlot<ComposedType>>>,
    pub(crate) annotations: Mutex<HashMap<ElementKey, CacheSlot<AnnotationSet>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::with_config(ReflectConfig::default())
    }

    pub fn with_config(config: ReflectConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReflectConfig {
        &self.config
    }

    /// Wrap the broker for use behind a single writer lock.
    pub fn shared(self) -> SharedBroker {
        Arc::new(RwLock::new(self))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ─── Registration ───────────────────────────────────────────────────

    /// Insert everything one source unit declares.
    ///
    /// Either all of the unit's types, functions and constants are
    /// inserted or none are: any collision with an already registered
    /// declaration (or within the unit itself) fails the whole unit with
    /// [`ResolutionError::AlreadyExists`].  An external stub is not a
    /// collision; the declaration replaces it.
    pub fn register_unit(&mut self, unit: ParsedUnit) -> Result<(), ResolutionError> {
        self.check_collisions(&unit)?;

        let ParsedUnit {
            file,
            namespaces,
            types,
            functions,
            constants,
        } = unit;
        let counts = (types.len(), functions.len(), constants.len());

        let mut ancestors = Vec::new();
        for record in types {
            ancestors.extend(record.ancestor_names());
            self.types
                .insert(record.name, TypeEntry::Tokenized(Arc::new(record)));
        }
        for record in functions {
            self.functions.insert(record.name, Arc::new(record));
        }
        for record in constants {
            let name = SymbolName::new(&record.qualified_name());
            self.constants.insert(name, Arc::new(record));
        }
        for ns in namespaces {
            let entry = self
                .namespaces
                .entry(ns.name.clone())
                .or_insert_with(|| NamespaceRecord {
                    name: ns.name.clone(),
                    ..NamespaceRecord::default()
                });
            entry.aliases.extend(ns.aliases);
            entry.types.extend(ns.types);
            entry.functions.extend(ns.functions);
            entry.constants.extend(ns.constants);
        }

        if self.config.record_external_stubs {
            for name in ancestors {
                if !self.types.contains_key(&name) {
                    debug!("recording external stub for {}", name);
                    self.types.insert(name, TypeEntry::ExternalStub(name));
                }
            }
        }
        if let Some(file) = &file {
            self.files.push(Arc::clone(file));
        }
        self.generation += 1;

        debug!(
            "registered {}: {} types, {} functions, {} constants (generation {})",
            file.as_deref().unwrap_or("<source>"),
            counts.0,
            counts.1,
            counts.2,
            self.generation
        );
        Ok(())
    }

    fn check_collisions(&self, unit: &ParsedUnit) -> Result<(), ResolutionError> {
        let mut seen = HashSet::new();
        for record in &unit.types {
            let taken = matches!(self.types.get(&record.name), Some(TypeEntry::Tokenized(_)));
            if taken || !seen.insert(record.name) {
                return Err(ResolutionError::duplicate(SymbolKind::Type, record.name));
            }
        }
        let mut seen = HashSet::new();
        for record in &unit.functions {
            if self.functions.contains_key(&record.name) || !seen.insert(record.name) {
                return Err(ResolutionError::duplicate(SymbolKind::Function, record.name));
            }
        }
        let mut seen = HashSet::new();
        for record in &unit.constants {
            let name = SymbolName::new(&record.qualified_name());
            if self.constants.contains_key(&name) || !seen.insert(name) {
                return Err(ResolutionError::duplicate(SymbolKind::Constant, name));
            }
        }
        Ok(())
    }

    /// Tokenize, parse and register one source unit.
    pub fn register_source(&mut self, source: &str, file: Option<&str>) -> Result<(), Error> {
        let unit = parse_source(source, file)?;
        self.register_unit(unit)?;
        Ok(())
    }

    /// Read, parse and register a file.
    pub fn register_file(&mut self, path: &Path) -> Result<(), Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = path.to_string_lossy();
        self.register_source(&source, Some(&file))
    }

    // ─── Types ──────────────────────────────────────────────────────────

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(&SymbolName::new(name))
    }

    /// Look up a type; a stub is reported as such rather than as absent.
    pub fn get_type(&self, name: &str) -> Result<Lookup, ResolutionError> {
        let key = SymbolName::new(name);
        match self.types.get(&key) {
            Some(TypeEntry::Tokenized(record)) => Ok(Lookup::Found(Arc::clone(record))),
            Some(TypeEntry::ExternalStub(name)) => Ok(Lookup::ExternalStub(*name)),
            None => Err(ResolutionError::missing(SymbolKind::Type, key)),
        }
    }

    /// The tokenized record of `name`, if one was built.
    pub fn type_record(&self, name: SymbolName) -> Option<&Arc<ClassRecord>> {
        match self.types.get(&name) {
            Some(TypeEntry::Tokenized(record)) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn type_entry(&self, name: SymbolName) -> Option<&TypeEntry> {
        self.types.get(&name)
    }

    /// All tokenized types, ordered by name.
    pub fn types(&self) -> Vec<Arc<ClassRecord>> {
        let mut records: Vec<_> = self
            .types
            .values()
            .filter_map(|entry| match entry {
                TypeEntry::Tokenized(record) => Some(Arc::clone(record)),
                TypeEntry::ExternalStub(_) => None,
            })
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Names referenced as ancestors but never declared.
    pub fn external_stubs(&self) -> Vec<SymbolName> {
        let stubs: BTreeSet<_> = self
            .types
            .values()
            .filter_map(|entry| match entry {
                TypeEntry::ExternalStub(name) => Some(*name),
                TypeEntry::Tokenized(_) => None,
            })
            .collect();
        stubs.into_iter().collect()
    }

    // ─── Functions ──────────────────────────────────────────────────────

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(&SymbolName::new(name))
    }

    pub fn get_function(&self, name: &str) -> Result<Arc<FunctionRecord>, ResolutionError> {
        let key = SymbolName::new(name);
        self.functions
            .get(&key)
            .cloned()
            .ok_or_else(|| ResolutionError::missing(SymbolKind::Function, key))
    }

    pub fn functions(&self) -> Vec<Arc<FunctionRecord>> {
        let mut records: Vec<_> = self.functions.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    // ─── Constants ──────────────────────────────────────────────────────

    pub fn has_constant(&self, name: &str) -> bool {
        self.constants.contains_key(&SymbolName::new(name))
    }

    pub fn get_constant(&self, name: &str) -> Result<Arc<ConstantRecord>, ResolutionError> {
        let key = SymbolName::new(name);
        self.constants
            .get(&key)
            .cloned()
            .ok_or_else(|| ResolutionError::missing(SymbolKind::Constant, key))
    }

    pub fn constants(&self) -> Vec<Arc<ConstantRecord>> {
        let mut records: Vec<_> = self.constants.values().cloned().collect();
        records.sort_by_key(|c| c.qualified_name());
        records
    }

    // ─── Namespaces ─────────────────────────────────────────────────────

    fn namespace_key(name: &str) -> &str {
        let name = name.trim_start_matches('\\');
        if name == NO_NAMESPACE { "" } else { name }
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains_key(Self::namespace_key(name))
    }

    /// Namespace records merge every unit that declared into the
    /// namespace.  The global namespace is `""` or [`NO_NAMESPACE`].
    pub fn get_namespace(&self, name: &str) -> Result<&NamespaceRecord, ResolutionError> {
        let key = Self::namespace_key(name);
        self.namespaces
            .get(key)
            .ok_or_else(|| ResolutionError::missing(SymbolKind::Namespace, key))
    }

    pub fn namespaces(&self) -> Vec<&NamespaceRecord> {
        let mut records: Vec<_> = self.namespaces.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Files registered so far, in registration order.
    pub fn files(&self) -> &[Arc<str>] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_bumps_generation() {
        let mut broker = Broker::new();
        assert_eq!(broker.generation(), 0);
        broker
            .register_source("<?php class A {}", Some("a.php"))
            .unwrap();
        assert_eq!(broker.generation(), 1);
        assert_eq!(broker.files().len(), 1);
    }

    #[test]
    fn failed_unit_leaves_registry_untouched() {
        let mut broker = Broker::new();
        broker.register_source("<?php class A {}", None).unwrap();
        let err = broker
            .register_source("<?php class B {} function f() {} class A {}", None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::AlreadyExists { .. })
        ));
        assert!(!broker.has_type("B"));
        assert!(!broker.has_function("f"));
        assert_eq!(broker.generation(), 1);
    }

    #[test]
    fn stub_is_replaced_by_declaration() {
        let mut broker = Broker::new();
        broker
            .register_source("<?php class Child extends Base {}", None)
            .unwrap();
        assert!(broker.get_type("Base").unwrap().is_external_stub());
        broker.register_source("<?php class Base {}", None).unwrap();
        assert!(broker.get_type("Base").unwrap().record().is_some());
        assert!(broker.external_stubs().is_empty());
    }
}
