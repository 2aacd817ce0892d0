// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared data.
//!
//! A shared slot turns a name into a reference-counted, mono-typed
//! publish/subscribe channel. Every participant calls [`Registry::share`]
//! with the same name and type; every write reaching the backing handle
//! through the normal `set_*` path fans out to the slot's subscribers.
//!
//! ```text
//! SharedHub
//! +-- slots: Mutex<HashMap<name, Arc<SharedSlot>>>
//!
//! SharedSlot
//! +-- tag            one TypeTag, fixed at creation
//! +-- data_ref       backing handle (adopted or created)
//! +-- owns_backing   created by the hub -> orphaned on last unshare
//! +-- generation     hub's registration of the backing; a later owner's
//! |                  registration of the name is never orphaned
//! +-- subscribers    refcount == subscribers.len()
//! ```
//!
//! Notification runs over a snapshot of the subscriber list taken when the
//! write completes. A callback may read the new value, write other handles,
//! or unshare itself; every subscriber in the snapshot is invoked exactly
//! once regardless.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::accessor::{AccessorTable, ArrayAccessor, Extent, ScalarAccessor};
use crate::error::{Error, Result};
use crate::introspection::RegistryEvent;
use crate::registry::Registry;
use crate::types::{Capabilities, DataRef, HandleState, Owner, TypeTag};

/// Change callback. Receives the registry so it can call back into it.
pub type ShareCallback = Arc<dyn Fn(&Registry, &ChangeNotice) + Send + Sync>;

/// Identifies one `share` call; handed back to `unshare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Delivered to a subscriber after a write to its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub name: Arc<str>,
    pub data_ref: DataRef,
    pub tag: TypeTag,
    /// The subscription being notified.
    pub subscription: SubscriptionId,
    /// Writer excluded from this round, if the write went through an
    /// [`OriginWriter`](crate::OriginWriter).
    pub origin: Option<SubscriptionId>,
}

/// Returned by [`Registry::share`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    data_ref: DataRef,
    id: SubscriptionId,
    name: Arc<str>,
    tag: TypeTag,
}

impl Subscription {
    /// Backing handle; read and write the shared value through it.
    pub fn data_ref(&self) -> DataRef {
        self.data_ref
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }
}

/// Point-in-time view of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SharedSlotInfo {
    pub name: Arc<str>,
    pub tag: TypeTag,
    pub data_ref: DataRef,
    pub refcount: usize,
    /// The backing handle is currently the hub's own registration and is
    /// orphaned on teardown.
    pub owns_backing: bool,
}

// ---------------------------------------------------------------------------
// SharedSlot / SharedHub
// ---------------------------------------------------------------------------

struct Subscriber {
    id: SubscriptionId,
    callback: Option<ShareCallback>,
}

pub(crate) struct SharedSlot {
    name: Arc<str>,
    tag: TypeTag,
    data_ref: DataRef,
    /// The hub registered the backing handle (not adopted).
    owns_backing: bool,
    /// Generation of the hub's registration; only meaningful when
    /// `owns_backing`. Teardown orphans the handle only while this is still
    /// the live registration.
    generation: AtomicU32,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SharedSlot {
    /// Invoke every subscriber except `origin`, in share order.
    pub(crate) fn notify(&self, registry: &Registry, origin: Option<SubscriptionId>) {
        let snapshot: Vec<(SubscriptionId, ShareCallback)> = self
            .subscribers
            .lock()
            .iter()
            .filter(|subscriber| Some(subscriber.id) != origin)
            .filter_map(|subscriber| {
                subscriber
                    .callback
                    .as_ref()
                    .map(|callback| (subscriber.id, Arc::clone(callback)))
            })
            .collect();

        for (subscription, callback) in snapshot {
            let notice = ChangeNotice {
                name: Arc::clone(&self.name),
                data_ref: self.data_ref,
                tag: self.tag,
                subscription,
                origin,
            };
            callback(registry, &notice);
        }
    }

    /// The hub's own registration is still the live one.
    fn holds_backing(&self, registry: &Registry) -> bool {
        self.owns_backing
            && registry.active_generation(self.data_ref)
                == Some(self.generation.load(Ordering::Acquire))
    }

    fn info(&self, registry: &Registry) -> SharedSlotInfo {
        SharedSlotInfo {
            name: Arc::clone(&self.name),
            tag: self.tag,
            data_ref: self.data_ref,
            refcount: self.subscribers.lock().len(),
            owns_backing: self.holds_backing(registry),
        }
    }
}

/// Slot table owned by a [`Registry`].
pub(crate) struct SharedHub {
    slots: Mutex<HashMap<Arc<str>, Arc<SharedSlot>>>,
    next_subscription: AtomicU64,
}

impl SharedHub {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }
}

/// Storage-backed accessors for a handle the hub creates itself.
fn storage_table(tag: TypeTag) -> AccessorTable {
    let table = AccessorTable::new();
    match tag {
        TypeTag::Int => table.scalar(ScalarAccessor::backed_by(Arc::new(RwLock::new(0i32)))),
        TypeTag::Float => table.scalar(ScalarAccessor::backed_by(Arc::new(RwLock::new(0f32)))),
        TypeTag::Double => table.scalar(ScalarAccessor::backed_by(Arc::new(RwLock::new(0f64)))),
        TypeTag::IntArray => table.array(ArrayAccessor::backed_by(
            Arc::new(RwLock::new(Vec::<i32>::new())),
            Extent::Growable,
        )),
        TypeTag::FloatArray => table.array(ArrayAccessor::backed_by(
            Arc::new(RwLock::new(Vec::<f32>::new())),
            Extent::Growable,
        )),
        TypeTag::Bytes => table.array(ArrayAccessor::backed_by(
            Arc::new(RwLock::new(Vec::<u8>::new())),
            Extent::Growable,
        )),
    }
}

// ---------------------------------------------------------------------------
// Registry API
// ---------------------------------------------------------------------------

impl Registry {
    /// Join (or create) the shared slot for `name`.
    ///
    /// The first share creates the slot. If `name` is already published by
    /// an Active owner with a compatible type, that handle is adopted and
    /// stays the owner's. Otherwise the hub registers a storage-backed,
    /// writable handle of type `tag`, which it orphans again when the last
    /// subscriber unshares.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeConflict`] if the slot exists with another type, or the
    ///   Active handle cannot serve `tag`
    /// - [`Error::InvalidName`] / [`Error::ReservedName`] when the hub has to
    ///   create the handle and the name is rejected
    pub fn share<F>(&self, name: &str, tag: TypeTag, callback: F) -> Result<Subscription>
    where
        F: Fn(&Registry, &ChangeNotice) + Send + Sync + 'static,
    {
        self.share_inner(name, tag, Some(Arc::new(callback)))
    }

    /// Join a slot without a callback. Counts toward the refcount only.
    pub fn share_silent(&self, name: &str, tag: TypeTag) -> Result<Subscription> {
        self.share_inner(name, tag, None)
    }

    fn share_inner(
        &self,
        name: &str,
        tag: TypeTag,
        callback: Option<ShareCallback>,
    ) -> Result<Subscription> {
        let mut event = None;
        let subscription;
        {
            let mut slots = self.hub.slots.lock();
            let id = SubscriptionId(self.hub.next_subscription.fetch_add(1, Ordering::Relaxed));
            let subscriber = Subscriber { id, callback };

            if let Some(slot) = slots.get(name) {
                if slot.tag != tag {
                    return Err(Error::TypeConflict {
                        name: name.to_string(),
                        existing: Capabilities::from_tag(slot.tag),
                        requested: tag,
                    });
                }
                event = self.ensure_backing(slot)?;
                let refcount = {
                    let mut subscribers = slot.subscribers.lock();
                    subscribers.push(subscriber);
                    subscribers.len()
                };
                log::debug!(
                    "[Registry::share] {} joined '{}' ({}), refcount {}",
                    id,
                    name,
                    tag,
                    refcount
                );
                subscription = Subscription {
                    data_ref: slot.data_ref,
                    id,
                    name: Arc::clone(&slot.name),
                    tag,
                };
            } else {
                let adopted = self
                    .lookup(name)
                    .and_then(|data_ref| self.record(data_ref))
                    .filter(|record| record.is_active());

                let (data_ref, owns_backing, generation) = match adopted {
                    Some(record) => {
                        let capabilities = record.binding.load().capabilities;
                        if !capabilities.contains_tag(tag) {
                            return Err(Error::TypeConflict {
                                name: name.to_string(),
                                existing: capabilities,
                                requested: tag,
                            });
                        }
                        (record.id, false, 0)
                    }
                    None => {
                        let owner = Owner::shared();
                        self.validate_name(name, &owner)?;
                        let (data_ref, generation, registered) =
                            self.bind(name, true, storage_table(tag), owner)?;
                        event = Some(registered);
                        (data_ref, true, generation)
                    }
                };

                let record = self
                    .record(data_ref)
                    .ok_or_else(|| Error::NotFound(name.to_string()))?;
                let slot = Arc::new(SharedSlot {
                    name: Arc::clone(&record.name),
                    tag,
                    data_ref,
                    owns_backing,
                    generation: AtomicU32::new(generation),
                    subscribers: Mutex::new(vec![subscriber]),
                });
                record.slot.store(Some(Arc::clone(&slot)));
                slots.insert(Arc::clone(&slot.name), slot);

                log::info!(
                    "[Registry::share] created slot '{}' ({}) on {} ({})",
                    name,
                    tag,
                    data_ref,
                    if owns_backing { "hub-owned" } else { "adopted" }
                );
                subscription = Subscription {
                    data_ref,
                    id,
                    name: Arc::clone(&record.name),
                    tag,
                };
            }
        }

        if let Some(event) = event {
            self.emit(&event);
        }
        Ok(subscription)
    }

    /// Leave a slot.
    ///
    /// The last unshare destroys the slot and, if the hub created the
    /// backing handle and its registration is still the live one, orphans
    /// it. The name keeps resolving to that handle.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no slot of type `tag` exists for `name`, or
    /// `id` is not subscribed to it.
    pub fn unshare(&self, name: &str, tag: TypeTag, id: SubscriptionId) -> Result<()> {
        let released = {
            let mut slots = self.hub.slots.lock();
            let Some(slot) = slots.get(name).filter(|slot| slot.tag == tag).cloned() else {
                return Err(Error::NotFound(name.to_string()));
            };

            let remaining = {
                let mut subscribers = slot.subscribers.lock();
                let Some(position) = subscribers.iter().position(|s| s.id == id) else {
                    return Err(Error::NotFound(name.to_string()));
                };
                subscribers.remove(position);
                subscribers.len()
            };
            if remaining > 0 {
                log::debug!(
                    "[Registry::unshare] {} left '{}', refcount {}",
                    id,
                    name,
                    remaining
                );
                return Ok(());
            }

            slots.remove(name);
            if let Some(record) = self.record(slot.data_ref) {
                record.slot.store(None);
            }
            slot
        };

        log::info!(
            "[Registry::unshare] destroyed slot '{}' ({}) on {}",
            name,
            tag,
            released.data_ref
        );
        if released.owns_backing {
            let generation = released.generation.load(Ordering::Acquire);
            if !self.unregister_generation(released.data_ref, generation) {
                log::debug!(
                    "[Registry::unshare] backing of '{}' re-registered elsewhere, left as is",
                    name
                );
            }
        }
        Ok(())
    }

    /// Check that a slot being joined can still serve its type.
    ///
    /// An Active backing handle must still carry the slot's tag (its owner
    /// may have re-registered with another table). A hub-created handle that
    /// was orphaned behind the hub's back is registered again with fresh
    /// storage; an adopted one is left for its owner to bring back.
    fn ensure_backing(&self, slot: &SharedSlot) -> Result<Option<RegistryEvent>> {
        let record = self
            .record(slot.data_ref)
            .ok_or_else(|| Error::NotFound(slot.name.to_string()))?;
        let binding = record.binding.load_full();

        if binding.state == HandleState::Active {
            if !binding.capabilities.contains_tag(slot.tag) {
                return Err(Error::TypeConflict {
                    name: slot.name.to_string(),
                    existing: binding.capabilities,
                    requested: slot.tag,
                });
            }
            return Ok(None);
        }
        if !slot.owns_backing {
            return Ok(None);
        }

        let (_, generation, event) =
            self.bind(&slot.name, true, storage_table(slot.tag), Owner::shared())?;
        slot.generation.store(generation, Ordering::Release);
        log::info!(
            "[Registry::share] re-registered orphaned backing {} of slot '{}' ({})",
            slot.data_ref,
            slot.name,
            slot.tag
        );
        Ok(Some(event))
    }

    /// Snapshot of the slot for `name`, if one exists.
    pub fn shared_slot_info(&self, name: &str) -> Option<SharedSlotInfo> {
        let slot = self.hub.slots.lock().get(name).cloned()?;
        Some(slot.info(self))
    }

    /// Number of live shared slots.
    pub fn shared_count(&self) -> usize {
        self.hub.slots.lock().len()
    }
}
