// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Introspection: handle snapshots and lifecycle events.
//!
//! Tools that browse the registry page through [`Registry::enumerate`] and
//! snapshot each handle with [`Registry::info`]. Tools that need to follow
//! the registry as owners come and go register an observer instead of
//! polling.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::registry::Registry;
use crate::types::{Capabilities, DataRef, HandleState, Owner};

/// Lifecycle event delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A new handle was allocated for `name`.
    Registered { data_ref: DataRef, name: Arc<str> },
    /// An Orphaned handle was registered again.
    Reactivated { data_ref: DataRef, name: Arc<str> },
    /// The owner unregistered the handle (or was torn down).
    Orphaned { data_ref: DataRef, name: Arc<str> },
    /// The name was removed by an explicit purge.
    Purged { data_ref: DataRef, name: Arc<str> },
}

impl RegistryEvent {
    pub fn data_ref(&self) -> DataRef {
        match self {
            RegistryEvent::Registered { data_ref, .. }
            | RegistryEvent::Reactivated { data_ref, .. }
            | RegistryEvent::Orphaned { data_ref, .. }
            | RegistryEvent::Purged { data_ref, .. } => *data_ref,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RegistryEvent::Registered { name, .. }
            | RegistryEvent::Reactivated { name, .. }
            | RegistryEvent::Orphaned { name, .. }
            | RegistryEvent::Purged { name, .. } => name,
        }
    }
}

/// Observer callback. Receives the registry so it can query it re-entrantly.
pub type ObserverFn = Arc<dyn Fn(&Registry, &RegistryEvent) + Send + Sync>;

/// Token returned by [`Registry::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub(crate) struct Observer {
    id: ObserverId,
    callback: ObserverFn,
}

/// Point-in-time description of one handle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataRefInfo {
    pub data_ref: DataRef,
    pub name: Arc<str>,
    pub capabilities: Capabilities,
    pub writable: bool,
    pub owner: Owner,
    pub state: HandleState,
    /// Re-registrations seen so far (0 for a never-orphaned handle).
    pub generation: u32,
    /// A shared-data slot is attached.
    pub shared: bool,
}

impl Registry {
    /// Subscribe to lifecycle events.
    ///
    /// Events are delivered synchronously, after the state change, over a
    /// snapshot of the observer list.
    pub fn observe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&Registry, &RegistryEvent) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push(Observer {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|observer| observer.id != id);
        observers.len() != before
    }

    pub(crate) fn emit(&self, event: &RegistryEvent) {
        let snapshot: Vec<ObserverFn> = self
            .observers
            .lock()
            .iter()
            .map(|observer| Arc::clone(&observer.callback))
            .collect();
        for callback in snapshot {
            callback(self, event);
        }
    }

    /// Snapshot one handle. `None` only for a handle this registry never
    /// issued.
    pub fn info(&self, data_ref: DataRef) -> Option<DataRefInfo> {
        let record = self.record(data_ref)?;
        let binding = record.binding.load();
        Some(DataRefInfo {
            data_ref,
            name: Arc::clone(&record.name),
            capabilities: binding.capabilities,
            writable: binding.writable,
            owner: binding.owner.clone(),
            state: binding.state,
            generation: binding.generation,
            shared: record.slot.load().is_some(),
        })
    }

    /// Snapshot every enumerable handle, in registration order.
    pub fn infos(&self) -> Vec<DataRefInfo> {
        self.enumerate(0, usize::MAX)
            .into_iter()
            .filter_map(|data_ref| self.info(data_ref))
            .collect()
    }
}
