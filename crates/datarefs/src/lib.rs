// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # datarefs - Typed data-reference registry
//!
//! A string-keyed registry of opaque [`DataRef`] handles. Each handle exposes
//! a polymorphic set of typed accessors (int, float, double, int array,
//! float array, bytes) supplied by whichever component owns the value, and
//! survives that owner going away and coming back.
//!
//! On top of the registry, shared data turns any name into a
//! reference-counted publish/subscribe channel with synchronous change
//! notification.
//!
//! ## Quick Start
//!
//! ```rust
//! use datarefs::{AccessorTable, Registry, Result, ScalarAccessor, TypeTag};
//! use parking_lot::RwLock;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let registry = Registry::new();
//!
//!     // Owner side: publish a value.
//!     let altitude = Arc::new(RwLock::new(0.0f32));
//!     registry.register(
//!         "demo/altitude",
//!         true,
//!         AccessorTable::new().scalar(ScalarAccessor::backed_by(altitude)),
//!         "demo",
//!     )?;
//!
//!     // Consumer side: resolve once, access often.
//!     let handle = registry.find("demo/altitude")?;
//!     registry.set_float(handle, 1500.0);
//!     assert_eq!(registry.get_float(handle), 1500.0);
//!
//!     // Shared data: two participants on one channel.
//!     let a = registry.share("demo/rpm", TypeTag::Float, |reg, notice| {
//!         let _rpm = reg.get_float(notice.data_ref);
//!     })?;
//!     let b = registry.share_silent("demo/rpm", TypeTag::Float)?;
//!     registry.set_float(b.data_ref(), 2400.0);
//!
//!     registry.unshare("demo/rpm", TypeTag::Float, a.id())?;
//!     registry.unshare("demo/rpm", TypeTag::Float, b.id())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Consumers            get_* / set_* / read_array / write_array |
//! +---------------------------------------------------------------+
//! |  Dispatch             orphan check, type check, offset rules   |
//! +---------------------------------------------------------------+
//! |  Registry             name -> DataRef, lifecycle, observers    |
//! |  Shared data          slots, refcount, change fan-out          |
//! +---------------------------------------------------------------+
//! |  Owners               AccessorTable (closures over own state)  |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Name map, handle lifecycle, typed dispatch, shared data |
//! | [`DataRef`] | Stable handle; never invalidated while the registry lives |
//! | [`AccessorTable`] | One optional accessor per [`TypeTag`] |
//! | [`Capabilities`] | Bitmask of the types a handle serves |
//! | [`Subscription`] | Membership in a shared slot |
//!
//! ## Failure model
//!
//! Structural mistakes (duplicate names, empty accessor tables, type
//! conflicts on shared slots, negative offsets) are [`Error`]s. Routine
//! mismatches are not: reading the wrong type or an orphaned handle yields
//! the zero value, and writing to a read-only or orphaned handle is a no-op.

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Accessor closures and tables supplied by owners.
pub mod accessor;
/// Registry configuration (reserved prefixes, name limits).
pub mod config;
/// Typed get/set dispatch.
pub mod dispatch;
/// Error types.
pub mod error;
/// Lifecycle events and handle snapshots.
pub mod introspection;
/// Name map and handle lifecycle.
pub mod registry;
/// Reference-counted shared data slots.
pub mod shared;
/// Type tags, capabilities, handles and owners.
pub mod types;

pub use accessor::{
    Accessor, AccessorTable, ArrayAccessor, ArrayElement, Extent, ScalarAccessor, ScalarValue,
};
pub use config::RegistryConfig;
pub use dispatch::OriginWriter;
pub use error::{Error, Result};
pub use introspection::{DataRefInfo, ObserverId, RegistryEvent};
pub use registry::{Registry, RegistryBuilder};
pub use shared::{ChangeNotice, SharedSlotInfo, Subscription, SubscriptionId};
pub use types::{Capabilities, DataRef, HandleState, Owner, TypeTag};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_public_types_are_send_sync() {
        assert_send_sync::<Registry>();
        assert_send_sync::<AccessorTable>();
        assert_send_sync::<Subscription>();
        assert_send_sync::<RegistryEvent>();
    }
}
