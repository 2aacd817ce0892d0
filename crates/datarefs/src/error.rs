// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for registry and shared-data operations.
//!
//! Only structural mistakes are errors. Routine mismatches (wrong-type
//! access, writes to read-only handles, access to orphaned handles) are
//! defined soft failures and never surface here.

use crate::types::{Capabilities, TypeTag};

/// Errors returned by registry and shared-data operations.
///
/// # Example
///
/// ```rust
/// use datarefs::{AccessorTable, Error, Owner, Registry};
///
/// let registry = Registry::new();
/// let result = registry.register("demo/empty", false, AccessorTable::new(), Owner::new("demo"));
///
/// match result {
///     Err(Error::EmptyCapabilities(name)) => assert_eq!(name, "demo/empty"),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// Name already maps to an Active handle.
    DuplicateName(String),
    /// Accessor table provides no type at all.
    EmptyCapabilities(String),
    /// Name is empty, has an empty path segment, or exceeds the maximum length.
    InvalidName(String),
    /// Name uses a reserved prefix and strict prefix enforcement is on.
    ReservedName(String),
    /// Handle space exhausted (`u32::MAX` handles already issued).
    RegistryFull(String),

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// Unknown name (find) or unknown subscription (unshare).
    NotFound(String),

    // ========================================================================
    // Shared Data Errors
    // ========================================================================
    /// Share requested with a type the existing slot or handle cannot serve.
    TypeConflict {
        name: String,
        existing: Capabilities,
        requested: TypeTag,
    },

    // ========================================================================
    // Access Errors
    // ========================================================================
    /// Array or byte access with a negative offset.
    InvalidOffset(i32),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateName(name) => write!(f, "Dataref already registered: {}", name),
            Error::EmptyCapabilities(name) => {
                write!(f, "Dataref registered without any accessor: {}", name)
            }
            Error::InvalidName(name) => write!(f, "Invalid dataref name: {:?}", name),
            Error::ReservedName(name) => write!(f, "Dataref name uses a reserved prefix: {}", name),
            Error::RegistryFull(name) => {
                write!(f, "Dataref handle space exhausted, cannot register {}", name)
            }
            Error::NotFound(name) => write!(f, "Dataref not found: {}", name),
            Error::TypeConflict {
                name,
                existing,
                requested,
            } => write!(
                f,
                "Type conflict on {}: available as {}, requested {}",
                name, existing, requested
            ),
            Error::InvalidOffset(offset) => write!(f, "Invalid array offset: {}", offset),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;
