// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dataref Registry
//!
//! Process-wide (but explicitly constructed) map from hierarchical names to
//! [`DataRef`] handles, and the orphan/reactivation state machine behind
//! them.
//!
//! # Architecture
//!
//! ```text
//! Registry
//! +-- index: DashMap<Arc<str>, DataRef>        name -> handle, O(1) find
//! +-- arena: RwLock<Arena>
//! |   +-- records: Vec<Arc<Record>>            append-only, DataRef = index
//! |   +-- listed:  Vec<DataRef>                enumeration order
//! +-- hub: SharedHub                           shared-data slots
//!
//! Record
//! +-- name: Arc<str>                           immutable
//! +-- binding: ArcSwap<Binding>                swapped whole on (re)register
//! +-- slot: ArcSwapOption<SharedSlot>          set while a slot is attached
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! register ──> Active ──unregister──> Orphaned ──register(same name)──> Active
//!                                        │
//!                                  purge_orphans (explicit only)
//! ```
//!
//! Handles are never removed from the arena, so a `DataRef` held by any
//! consumer stays valid for the registry's whole lifetime.
//!
//! # Locking
//!
//! Lock order is `hub.slots -> index shard -> arena`. No lock is held while
//! an owner accessor, a subscriber, or an observer runs, which is what makes
//! re-entrant calls from those callbacks safe.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::accessor::AccessorTable;
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::introspection::{Observer, RegistryEvent};
use crate::shared::{SharedHub, SharedSlot};
use crate::types::{Capabilities, DataRef, HandleState, Owner};

// ---------------------------------------------------------------------------
// Binding / Record
// ---------------------------------------------------------------------------

/// Everything an owner supplies at registration, plus the lifecycle state.
///
/// Replaced wholesale, never mutated in place.
pub(crate) struct Binding {
    pub(crate) state: HandleState,
    pub(crate) writable: bool,
    pub(crate) capabilities: Capabilities,
    pub(crate) owner: Owner,
    pub(crate) accessors: AccessorTable,
    /// Number of re-registrations this handle has seen.
    pub(crate) generation: u32,
}

impl Binding {
    /// Same declaration, accessors dropped.
    fn orphaned(&self) -> Self {
        Self {
            state: HandleState::Orphaned,
            writable: self.writable,
            capabilities: self.capabilities,
            owner: self.owner.clone(),
            accessors: AccessorTable::new(),
            generation: self.generation,
        }
    }
}

pub(crate) struct Record {
    pub(crate) id: DataRef,
    pub(crate) name: Arc<str>,
    pub(crate) binding: ArcSwap<Binding>,
    pub(crate) slot: ArcSwapOption<SharedSlot>,
    pub(crate) purged: AtomicBool,
}

impl Record {
    pub(crate) fn is_active(&self) -> bool {
        self.binding.load().state == HandleState::Active
    }
}

#[derive(Default)]
struct Arena {
    records: Vec<Arc<Record>>,
    listed: Vec<DataRef>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Typed dataref registry.
///
/// # Example
///
/// ```rust
/// use datarefs::{AccessorTable, Owner, Registry, ScalarAccessor};
/// use parking_lot::RwLock;
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let altitude = Arc::new(RwLock::new(0.0f32));
///
/// let handle = registry
///     .register(
///         "demo/altitude",
///         true,
///         AccessorTable::new().scalar(ScalarAccessor::backed_by(altitude)),
///         Owner::new("demo"),
///     )
///     .unwrap();
///
/// registry.set_float(handle, 1500.0);
/// assert_eq!(registry.get_float(handle), 1500.0);
/// ```
pub struct Registry {
    config: RegistryConfig,
    index: DashMap<Arc<str>, DataRef>,
    arena: RwLock<Arena>,
    pub(crate) hub: SharedHub,
    pub(crate) observers: Mutex<Vec<Observer>>,
    pub(crate) next_observer: AtomicU64,
}

impl Registry {
    /// Registry with the default (environment aware) configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            index: DashMap::new(),
            arena: RwLock::new(Arena::default()),
            hub: SharedHub::new(),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Publish a dataref.
    ///
    /// The capability mask is the set of types present in `accessors`.
    /// Registering a name whose handle is Orphaned reactivates that same
    /// handle with the new accessors, owner and writability.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] / [`Error::ReservedName`] on a rejected name
    /// - [`Error::EmptyCapabilities`] if `accessors` is empty
    /// - [`Error::DuplicateName`] if the name is already Active
    /// - [`Error::RegistryFull`] once `u32::MAX` handles have been issued
    pub fn register(
        &self,
        name: &str,
        writable: bool,
        accessors: AccessorTable,
        owner: impl Into<Owner>,
    ) -> Result<DataRef> {
        let owner = owner.into();
        self.validate_name(name, &owner)?;
        let (data_ref, _, event) = self.bind(name, writable, accessors, owner)?;
        self.emit(&event);
        Ok(data_ref)
    }

    pub(crate) fn validate_name(&self, name: &str, owner: &Owner) -> Result<()> {
        if !self.config.is_valid_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if let Some(prefix) = self.config.reserved_prefix_of(name) {
            if self.config.strict_prefixes {
                return Err(Error::ReservedName(name.to_string()));
            }
            log::warn!(
                "[Registry::register] {} registers '{}' under reserved prefix '{}'",
                owner,
                name,
                prefix
            );
        }
        Ok(())
    }

    /// Create or reactivate the handle for `name` without notifying
    /// observers. Returns the handle, the generation of the new binding and
    /// the event the caller emits once its own locks are released.
    pub(crate) fn bind(
        &self,
        name: &str,
        writable: bool,
        accessors: AccessorTable,
        owner: Owner,
    ) -> Result<(DataRef, u32, RegistryEvent)> {
        let capabilities = accessors.capabilities();
        if capabilities.is_empty() {
            return Err(Error::EmptyCapabilities(name.to_string()));
        }

        match self.index.entry(Arc::from(name)) {
            Entry::Occupied(entry) => {
                let data_ref = *entry.get();
                let record = self
                    .record(data_ref)
                    .ok_or_else(|| Error::NotFound(name.to_string()))?;

                let previous = record.binding.rcu(|current| {
                    if current.state == HandleState::Active {
                        Arc::clone(current)
                    } else {
                        Arc::new(Binding {
                            state: HandleState::Active,
                            writable,
                            capabilities,
                            owner: owner.clone(),
                            accessors: accessors.clone(),
                            generation: current.generation.wrapping_add(1),
                        })
                    }
                });
                if previous.state == HandleState::Active {
                    return Err(Error::DuplicateName(name.to_string()));
                }

                let generation = previous.generation.wrapping_add(1);
                log::debug!(
                    "[Registry::register] reactivated {} '{}' as {} (owner {}, generation {})",
                    data_ref,
                    name,
                    capabilities,
                    owner,
                    generation
                );
                Ok((
                    data_ref,
                    generation,
                    RegistryEvent::Reactivated {
                        data_ref,
                        name: Arc::clone(&record.name),
                    },
                ))
            }
            Entry::Vacant(entry) => {
                let mut arena = self.arena.write();
                let index = u32::try_from(arena.records.len())
                    .map_err(|_| Error::RegistryFull(name.to_string()))?;
                let data_ref = DataRef(index);
                let name: Arc<str> = Arc::clone(entry.key());

                arena.records.push(Arc::new(Record {
                    id: data_ref,
                    name: Arc::clone(&name),
                    binding: ArcSwap::from_pointee(Binding {
                        state: HandleState::Active,
                        writable,
                        capabilities,
                        owner: owner.clone(),
                        accessors,
                        generation: 0,
                    }),
                    slot: ArcSwapOption::empty(),
                    purged: AtomicBool::new(false),
                }));
                arena.listed.push(data_ref);
                entry.insert(data_ref);

                log::debug!(
                    "[Registry::register] registered {} '{}' as {} (owner {}, writable={})",
                    data_ref,
                    name,
                    capabilities,
                    owner,
                    writable
                );
                Ok((data_ref, 0, RegistryEvent::Registered { data_ref, name }))
            }
        }
    }

    /// Orphan a handle.
    ///
    /// The name mapping and the handle itself stay valid; reads return zero
    /// values and writes are dropped until the name is registered again.
    /// Returns `false` if the handle was not Active.
    pub fn unregister(&self, data_ref: DataRef) -> bool {
        self.orphan(data_ref, None)
    }

    /// Orphan `data_ref` only while its current registration is still
    /// `generation`. Used by shared slots tearing down a handle they created,
    /// which must not touch a later registration of the same name.
    pub(crate) fn unregister_generation(&self, data_ref: DataRef, generation: u32) -> bool {
        self.orphan(data_ref, Some(generation))
    }

    /// Current registration generation, if the handle is Active.
    pub(crate) fn active_generation(&self, data_ref: DataRef) -> Option<u32> {
        let record = self.record(data_ref)?;
        let binding = record.binding.load();
        (binding.state == HandleState::Active).then_some(binding.generation)
    }

    fn orphan(&self, data_ref: DataRef, generation: Option<u32>) -> bool {
        let Some(record) = self.record(data_ref) else {
            log::debug!("[Registry::unregister] unknown {}", data_ref);
            return false;
        };

        let matches = |binding: &Binding| {
            binding.state == HandleState::Active
                && generation.map_or(true, |expected| binding.generation == expected)
        };
        let previous = record.binding.rcu(|current| {
            if matches(&**current) {
                Arc::new(current.orphaned())
            } else {
                Arc::clone(current)
            }
        });
        if !matches(&*previous) {
            return false;
        }

        log::debug!(
            "[Registry::unregister] orphaned {} '{}' (owner {})",
            data_ref,
            record.name,
            previous.owner
        );
        self.emit(&RegistryEvent::Orphaned {
            data_ref,
            name: Arc::clone(&record.name),
        });
        true
    }

    /// Orphan every Active handle registered by `owner` (owner teardown).
    ///
    /// Returns the number of handles orphaned.
    pub fn orphan_owner(&self, owner: &Owner) -> usize {
        let owned: Vec<DataRef> = self
            .records()
            .into_iter()
            .filter(|record| {
                let binding = record.binding.load();
                binding.state == HandleState::Active && binding.owner == *owner
            })
            .map(|record| record.id)
            .collect();

        let orphaned = owned
            .into_iter()
            .filter(|data_ref| self.unregister(*data_ref))
            .count();
        if orphaned > 0 {
            log::info!(
                "[Registry::orphan_owner] {} torn down, {} dataref(s) orphaned",
                owner,
                orphaned
            );
        }
        orphaned
    }

    /// Remove every Orphaned name that no shared slot is attached to.
    ///
    /// Outside normal operation. Purged handles remain valid references that
    /// behave as Orphaned forever and are no longer enumerated; registering
    /// the name again allocates a new handle. Returns the number purged.
    pub fn purge_orphans(&self) -> usize {
        let candidates: Vec<Arc<Record>> = self
            .records()
            .into_iter()
            .filter(|record| {
                !record.purged.load(Ordering::Acquire)
                    && !record.is_active()
                    && record.slot.load().is_none()
            })
            .collect();

        let mut purged = Vec::new();
        for record in candidates {
            let removed = self.index.remove_if(&record.name, |_, data_ref| {
                *data_ref == record.id && !record.is_active() && record.slot.load().is_none()
            });
            if removed.is_some() {
                record.purged.store(true, Ordering::Release);
                purged.push(record);
            }
        }

        if !purged.is_empty() {
            let mut arena = self.arena.write();
            let Arena { records, listed } = &mut *arena;
            listed.retain(|data_ref| {
                records
                    .get(data_ref.0 as usize)
                    .is_some_and(|record| !record.purged.load(Ordering::Acquire))
            });
        }

        log::info!("[Registry::purge_orphans] purged {} dataref(s)", purged.len());
        for record in &purged {
            self.emit(&RegistryEvent::Purged {
                data_ref: record.id,
                name: Arc::clone(&record.name),
            });
        }
        purged.len()
    }

    /// Resolve a name. Orphaned handles resolve too.
    pub fn find(&self, name: &str) -> Result<DataRef> {
        self.lookup(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// `Option` flavour of [`find`](Self::find).
    pub fn lookup(&self, name: &str) -> Option<DataRef> {
        self.index.get(name).map(|entry| *entry.value())
    }

    /// Number of enumerable handles (Active and Orphaned).
    pub fn count(&self) -> usize {
        self.arena.read().listed.len()
    }

    /// Page through handles in registration order.
    ///
    /// Pages are stable as long as nothing is registered or purged between
    /// calls.
    pub fn enumerate(&self, offset: usize, count: usize) -> Vec<DataRef> {
        self.arena
            .read()
            .listed
            .iter()
            .skip(offset)
            .take(count)
            .copied()
            .collect()
    }

    /// Lifecycle state. Unknown or purged handles report Orphaned.
    pub fn state(&self, data_ref: DataRef) -> HandleState {
        self.record(data_ref)
            .map(|record| record.binding.load().state)
            .unwrap_or(HandleState::Orphaned)
    }

    /// True while the handle is Active.
    pub fn is_good(&self, data_ref: DataRef) -> bool {
        self.state(data_ref) == HandleState::Active
    }

    /// Declared capability mask (retained while Orphaned).
    pub fn capabilities(&self, data_ref: DataRef) -> Capabilities {
        self.record(data_ref)
            .map(|record| record.binding.load().capabilities)
            .unwrap_or_else(Capabilities::empty)
    }

    /// Declared writability (retained while Orphaned).
    pub fn is_writable(&self, data_ref: DataRef) -> bool {
        self.record(data_ref)
            .is_some_and(|record| record.binding.load().writable)
    }

    pub fn name(&self, data_ref: DataRef) -> Option<Arc<str>> {
        self.record(data_ref).map(|record| Arc::clone(&record.name))
    }

    /// Owner of the latest registration.
    pub fn owner(&self, data_ref: DataRef) -> Option<Owner> {
        self.record(data_ref)
            .map(|record| record.binding.load().owner.clone())
    }

    pub(crate) fn record(&self, data_ref: DataRef) -> Option<Arc<Record>> {
        self.arena.read().records.get(data_ref.0 as usize).cloned()
    }

    /// Snapshot of every record ever allocated, purged ones included.
    pub(crate) fn records(&self) -> Vec<Arc<Record>> {
        self.arena.read().records.clone()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.count())
            .field("shared", &self.shared_count())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RegistryBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Registry`].
///
/// ```rust
/// use datarefs::Registry;
///
/// let registry = Registry::builder()
///     .reserved_prefixes(["sim/", "core/"])
///     .strict_prefixes(true)
///     .build();
/// assert!(registry.config().strict_prefixes);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reserved_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_reserved_prefixes(prefixes);
        self
    }

    pub fn strict_prefixes(mut self, strict: bool) -> Self {
        self.config = self.config.with_strict_prefixes(strict);
        self
    }

    pub fn max_name_len(mut self, len: usize) -> Self {
        self.config = self.config.with_max_name_len(len);
        self
    }

    pub fn build(self) -> Registry {
        Registry::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::ScalarAccessor;

    fn int_table(value: i32) -> AccessorTable {
        AccessorTable::new().scalar(ScalarAccessor::<i32>::read_only(move || value))
    }

    fn registry() -> Registry {
        Registry::with_config(RegistryConfig::builtin())
    }

    #[test]
    fn test_register_and_find() {
        let reg = registry();
        let h = reg
            .register("demo/a", false, int_table(1), "demo")
            .expect("register");
        assert_eq!(reg.find("demo/a"), Ok(h));
        assert_eq!(reg.lookup("demo/missing"), None);
        assert_eq!(
            reg.find("demo/missing"),
            Err(Error::NotFound("demo/missing".into()))
        );
        assert_eq!(reg.count(), 1);
        assert!(reg.is_good(h));
        assert_eq!(reg.capabilities(h), Capabilities::INT);
        assert_eq!(reg.owner(h), Some(Owner::new("demo")));
        assert_eq!(reg.name(h).as_deref(), Some("demo/a"));
    }

    #[test]
    fn test_duplicate_active_name_rejected() {
        let reg = registry();
        reg.register("demo/a", false, int_table(1), "one")
            .expect("register");
        let err = reg
            .register("demo/a", false, int_table(2), "two")
            .unwrap_err();
        assert_eq!(err, Error::DuplicateName("demo/a".into()));
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_empty_capabilities_rejected() {
        let reg = registry();
        let err = reg
            .register("demo/a", true, AccessorTable::new(), "demo")
            .unwrap_err();
        assert_eq!(err, Error::EmptyCapabilities("demo/a".into()));
        assert_eq!(reg.lookup("demo/a"), None);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let reg = registry();
        for bad in ["", "a//b", "/a", "a/"] {
            assert_eq!(
                reg.register(bad, false, int_table(0), "demo"),
                Err(Error::InvalidName(bad.into()))
            );
        }
    }

    #[test]
    fn test_reserved_prefix_warns_by_default_and_rejects_when_strict() {
        let lenient = registry();
        assert!(lenient
            .register("sim/cockpit/x", false, int_table(0), "plugin")
            .is_ok());

        let strict = Registry::builder()
            .config(RegistryConfig::builtin())
            .strict_prefixes(true)
            .build();
        assert_eq!(
            strict.register("sim/cockpit/x", false, int_table(0), "plugin"),
            Err(Error::ReservedName("sim/cockpit/x".into()))
        );
    }

    #[test]
    fn test_unregister_keeps_identity_and_reregister_reuses_it() {
        let reg = registry();
        let h = reg
            .register("demo/a", false, int_table(1), "one")
            .expect("register");

        assert!(reg.unregister(h));
        assert!(!reg.unregister(h));
        assert_eq!(reg.state(h), HandleState::Orphaned);
        assert_eq!(reg.find("demo/a"), Ok(h));
        assert_eq!(reg.capabilities(h), Capabilities::INT);

        let again = reg
            .register("demo/a", true, int_table(2), "two")
            .expect("re-register");
        assert_eq!(again, h);
        assert!(reg.is_good(h));
        assert!(reg.is_writable(h));
        assert_eq!(reg.owner(h), Some(Owner::new("two")));
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_enumerate_pages_in_registration_order() {
        let reg = registry();
        let handles: Vec<_> = (0..5)
            .map(|i| {
                reg.register(&format!("demo/v{}", i), false, int_table(i), "demo")
                    .expect("register")
            })
            .collect();
        assert_eq!(reg.enumerate(0, 2), handles[0..2].to_vec());
        assert_eq!(reg.enumerate(2, 2), handles[2..4].to_vec());
        assert_eq!(reg.enumerate(4, 2), handles[4..5].to_vec());
        assert!(reg.enumerate(5, 2).is_empty());
        assert!(reg.enumerate(0, 0).is_empty());
    }

    #[test]
    fn test_orphan_owner() {
        let reg = registry();
        let a = reg.register("p/a", false, int_table(1), "p").unwrap();
        let b = reg.register("p/b", false, int_table(2), "p").unwrap();
        let c = reg.register("q/c", false, int_table(3), "q").unwrap();

        assert_eq!(reg.orphan_owner(&Owner::new("p")), 2);
        assert!(!reg.is_good(a));
        assert!(!reg.is_good(b));
        assert!(reg.is_good(c));
        assert_eq!(reg.orphan_owner(&Owner::new("p")), 0);
    }

    #[test]
    fn test_purge_orphans() {
        let reg = registry();
        let a = reg.register("demo/a", false, int_table(1), "demo").unwrap();
        let b = reg.register("demo/b", false, int_table(2), "demo").unwrap();
        reg.unregister(a);

        assert_eq!(reg.purge_orphans(), 1);
        assert_eq!(reg.count(), 1);
        assert_eq!(reg.enumerate(0, 10), vec![b]);
        assert_eq!(reg.lookup("demo/a"), None);
        assert_eq!(reg.state(a), HandleState::Orphaned);

        let fresh = reg.register("demo/a", false, int_table(3), "demo").unwrap();
        assert_ne!(fresh, a);
        assert!(!reg.is_good(a));
        assert_eq!(reg.purge_orphans(), 0);
    }

    #[test]
    fn test_generation_counts_reactivations() {
        let reg = registry();
        let h = reg.register("demo/a", false, int_table(1), "demo").unwrap();
        for expected in 1..=3 {
            reg.unregister(h);
            reg.register("demo/a", false, int_table(1), "demo").unwrap();
            assert_eq!(reg.record(h).unwrap().binding.load().generation, expected);
        }
    }
}
