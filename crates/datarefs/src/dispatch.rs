// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed access dispatch.
//!
//! Every typed read or write goes through here, never straight to an
//! accessor. The dispatch layer owns the soft-failure rules:
//!
//! | Situation                         | Get*         | Set*    |
//! |-----------------------------------|--------------|---------|
//! | handle Orphaned (or purged)       | zero value   | no-op   |
//! | type not in capabilities          | zero value   | no-op   |
//! | accessor has no reader / writer   | zero value   | no-op   |
//! | handle declared read-only         | (normal)     | no-op   |
//! | negative array offset             | InvalidOffset error    |
//! | growable write past current end   | (n/a)        | InvalidOffset |
//!
//! The orphan check happens before any accessor is touched, so a stale
//! accessor can never be reached through a handle whose owner is gone.
//!
//! A write that reaches an owner's setter on a handle backing a shared slot
//! notifies that slot's subscribers before returning.

use std::sync::Arc;

use crate::accessor::{ArrayElement, Extent, ScalarValue};
use crate::error::{Error, Result};
use crate::registry::{Binding, Record, Registry};
use crate::shared::SubscriptionId;
use crate::types::{DataRef, HandleState};

impl Registry {
    /// Active record and binding, or `None` for a soft failure.
    fn live(&self, data_ref: DataRef) -> Option<(Arc<Record>, Arc<Binding>)> {
        let record = self.record(data_ref)?;
        let binding = record.binding.load_full();
        if binding.state != HandleState::Active {
            log::trace!("[dispatch] {} is orphaned", data_ref);
            return None;
        }
        Some((record, binding))
    }

    fn notify_write(&self, record: &Record, origin: Option<SubscriptionId>) {
        if let Some(slot) = record.slot.load_full() {
            slot.notify(self, origin);
        }
    }

    // -----------------------------------------------------------------------
    // Generic scalar access
    // -----------------------------------------------------------------------

    /// Read a scalar; zero value on any soft failure.
    pub fn get<T: ScalarValue>(&self, data_ref: DataRef) -> T {
        let Some((_, binding)) = self.live(data_ref) else {
            return T::default();
        };
        match binding.accessors.scalar_for::<T>().and_then(|a| a.get.as_ref()) {
            Some(get) => get(),
            None => T::default(),
        }
    }

    /// Write a scalar; no-op on any soft failure.
    pub fn set<T: ScalarValue>(&self, data_ref: DataRef, value: T) {
        self.set_from(data_ref, value, None);
    }

    fn set_from<T: ScalarValue>(&self, data_ref: DataRef, value: T, origin: Option<SubscriptionId>) {
        let Some((record, binding)) = self.live(data_ref) else {
            return;
        };
        if !binding.writable {
            log::trace!("[dispatch] {} is read-only", data_ref);
            return;
        }
        let Some(set) = binding.accessors.scalar_for::<T>().and_then(|a| a.set.clone()) else {
            return;
        };
        drop(binding);
        set(value);
        self.notify_write(&record, origin);
    }

    // -----------------------------------------------------------------------
    // Generic array access
    // -----------------------------------------------------------------------

    /// Read a sub-range of an array (or byte range).
    ///
    /// - `out == None`: size query, returns the declared length and copies
    ///   nothing (`offset` and `max` are ignored beyond validation).
    /// - otherwise copies `min(max, out.len(), len - offset)` elements
    ///   starting at `offset` and returns that count; `offset >= len`
    ///   copies nothing and returns 0.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOffset`] if `offset` is negative.
    pub fn read_array<T: ArrayElement>(
        &self,
        data_ref: DataRef,
        out: Option<&mut [T]>,
        offset: i32,
        max: usize,
    ) -> Result<usize> {
        let offset = checked_offset(offset)?;
        let Some((_, binding)) = self.live(data_ref) else {
            return Ok(0);
        };
        let Some(read) = binding.accessors.array_for::<T>().and_then(|a| a.read.clone()) else {
            return Ok(0);
        };
        drop(binding);

        let available = read(None, 0);
        let Some(out) = out else {
            return Ok(available);
        };
        if offset >= available {
            return Ok(0);
        }
        let n = max.min(out.len()).min(available - offset);
        if n == 0 {
            return Ok(0);
        }
        let copied = read(Some(&mut out[..n]), offset);
        Ok(copied.min(n))
    }

    /// Write a sub-range of an array (or byte range).
    ///
    /// Values beyond the declared length are dropped unless the accessor is
    /// [`Extent::Growable`], which may append but never leave a gap: a
    /// growable write starts at or inside the current length. Returns the
    /// number of elements handed to the owner.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOffset`] if `offset` is negative, or past the current
    /// end of a growable array.
    pub fn write_array<T: ArrayElement>(
        &self,
        data_ref: DataRef,
        values: &[T],
        offset: i32,
    ) -> Result<usize> {
        self.write_array_from(data_ref, values, offset, None)
    }

    fn write_array_from<T: ArrayElement>(
        &self,
        data_ref: DataRef,
        values: &[T],
        offset: i32,
        origin: Option<SubscriptionId>,
    ) -> Result<usize> {
        let requested = offset;
        let offset = checked_offset(offset)?;
        let Some((record, binding)) = self.live(data_ref) else {
            return Ok(0);
        };
        if !binding.writable {
            log::trace!("[dispatch] {} is read-only", data_ref);
            return Ok(0);
        }
        let Some(accessor) = binding.accessors.array_for::<T>().cloned() else {
            return Ok(0);
        };
        drop(binding);
        let Some(write) = accessor.write else {
            return Ok(0);
        };

        let n = match (accessor.extent, accessor.read) {
            (Extent::Declared, Some(read)) => {
                let available = read(None, 0);
                if offset >= available {
                    return Ok(0);
                }
                values.len().min(available - offset)
            }
            (Extent::Growable, Some(read)) => {
                if offset > read(None, 0) {
                    return Err(Error::InvalidOffset(requested));
                }
                values.len()
            }
            (_, None) => values.len(),
        };
        if n == 0 {
            return Ok(0);
        }

        write(&values[..n], offset);
        self.notify_write(&record, origin);
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Named entry points
    // -----------------------------------------------------------------------

    pub fn get_int(&self, data_ref: DataRef) -> i32 {
        self.get::<i32>(data_ref)
    }

    pub fn set_int(&self, data_ref: DataRef, value: i32) {
        self.set::<i32>(data_ref, value);
    }

    pub fn get_float(&self, data_ref: DataRef) -> f32 {
        self.get::<f32>(data_ref)
    }

    pub fn set_float(&self, data_ref: DataRef, value: f32) {
        self.set::<f32>(data_ref, value);
    }

    pub fn get_double(&self, data_ref: DataRef) -> f64 {
        self.get::<f64>(data_ref)
    }

    pub fn set_double(&self, data_ref: DataRef, value: f64) {
        self.set::<f64>(data_ref, value);
    }

    pub fn get_int_array(
        &self,
        data_ref: DataRef,
        out: Option<&mut [i32]>,
        offset: i32,
        max: usize,
    ) -> Result<usize> {
        self.read_array::<i32>(data_ref, out, offset, max)
    }

    pub fn set_int_array(&self, data_ref: DataRef, values: &[i32], offset: i32) -> Result<usize> {
        self.write_array::<i32>(data_ref, values, offset)
    }

    pub fn get_float_array(
        &self,
        data_ref: DataRef,
        out: Option<&mut [f32]>,
        offset: i32,
        max: usize,
    ) -> Result<usize> {
        self.read_array::<f32>(data_ref, out, offset, max)
    }

    pub fn set_float_array(&self, data_ref: DataRef, values: &[f32], offset: i32) -> Result<usize> {
        self.write_array::<f32>(data_ref, values, offset)
    }

    pub fn get_bytes(
        &self,
        data_ref: DataRef,
        out: Option<&mut [u8]>,
        offset: i32,
        max: usize,
    ) -> Result<usize> {
        self.read_array::<u8>(data_ref, out, offset, max)
    }

    pub fn set_bytes(&self, data_ref: DataRef, values: &[u8], offset: i32) -> Result<usize> {
        self.write_array::<u8>(data_ref, values, offset)
    }

    /// Writer whose writes do not notify subscription `origin`.
    ///
    /// Used by a shared-data participant to publish a value without being
    /// called back for its own change.
    pub fn writer(&self, origin: SubscriptionId) -> OriginWriter<'_> {
        OriginWriter {
            registry: self,
            origin,
        }
    }
}

fn checked_offset(offset: i32) -> Result<usize> {
    usize::try_from(offset).map_err(|_| Error::InvalidOffset(offset))
}

/// Write path that skips one subscriber's notification.
///
/// ```rust
/// use datarefs::{Registry, TypeTag};
///
/// let registry = Registry::new();
/// let me = registry.share_silent("demo/flaps", TypeTag::Float).unwrap();
/// let _other = registry
///     .share("demo/flaps", TypeTag::Float, |_, notice| println!("{} changed", notice.name))
///     .unwrap();
///
/// // `_other` is called back, `me` is not.
/// registry.writer(me.id()).set(me.data_ref(), 0.5f32);
/// ```
#[derive(Clone, Copy)]
pub struct OriginWriter<'a> {
    registry: &'a Registry,
    origin: SubscriptionId,
}

impl OriginWriter<'_> {
    pub fn origin(&self) -> SubscriptionId {
        self.origin
    }

    pub fn set<T: ScalarValue>(&self, data_ref: DataRef, value: T) {
        self.registry.set_from(data_ref, value, Some(self.origin));
    }

    pub fn write_array<T: ArrayElement>(
        &self,
        data_ref: DataRef,
        values: &[T],
        offset: i32,
    ) -> Result<usize> {
        self.registry
            .write_array_from(data_ref, values, offset, Some(self.origin))
    }
}
