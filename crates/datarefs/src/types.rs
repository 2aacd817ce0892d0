// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core value types: type tags, capability masks, handles and owners.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

/// One of the fixed representations a dataref can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeTag {
    Int,
    Float,
    Double,
    IntArray,
    FloatArray,
    Bytes,
}

impl TypeTag {
    /// Every tag, in wire-bit order.
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::IntArray,
        TypeTag::FloatArray,
        TypeTag::Bytes,
    ];

    /// Single-bit wire value (Int=1, Float=2, Double=4, IntArray=8,
    /// FloatArray=16, Bytes=32).
    pub const fn wire_value(self) -> u32 {
        match self {
            TypeTag::Int => 1,
            TypeTag::Float => 2,
            TypeTag::Double => 4,
            TypeTag::IntArray => 8,
            TypeTag::FloatArray => 16,
            TypeTag::Bytes => 32,
        }
    }

    /// Decode a single-bit wire value.
    pub fn from_wire(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.wire_value() == value)
    }

    /// True for the offset/length addressed representations.
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            TypeTag::IntArray | TypeTag::FloatArray | TypeTag::Bytes
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::IntArray => "int[]",
            TypeTag::FloatArray => "float[]",
            TypeTag::Bytes => "data",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of [`TypeTag`]s a dataref supports. Bits match the wire values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const INT = 1;
        const FLOAT = 2;
        const DOUBLE = 4;
        const INT_ARRAY = 8;
        const FLOAT_ARRAY = 16;
        const BYTES = 32;
    }
}

impl Capabilities {
    pub const fn from_tag(tag: TypeTag) -> Self {
        Self::from_bits_retain(tag.wire_value())
    }

    pub fn contains_tag(self, tag: TypeTag) -> bool {
        self.contains(Self::from_tag(tag))
    }

    /// Decode a wire mask. Unknown bits are rejected.
    pub fn from_wire(mask: u32) -> Option<Self> {
        Self::from_bits(mask)
    }

    pub fn wire_value(self) -> u32 {
        self.bits()
    }

    /// Tags present in this mask, in wire-bit order.
    pub fn tags(self) -> impl Iterator<Item = TypeTag> {
        TypeTag::ALL
            .into_iter()
            .filter(move |tag| self.contains_tag(*tag))
    }
}

impl From<TypeTag> for Capabilities {
    fn from(tag: TypeTag) -> Self {
        Self::from_tag(tag)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in self.tags() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(tag.as_str())?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Capabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

/// Lifecycle state of a dataref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HandleState {
    /// Backed by its owner's accessors.
    Active,
    /// Owner went away; reads yield zero values, writes are dropped.
    Orphaned,
}

/// Opaque reference to a registered dataref.
///
/// Stable for the lifetime of the [`Registry`](crate::Registry) that issued
/// it: unregistering flips the handle to [`HandleState::Orphaned`] but never
/// invalidates the reference, and re-registering the same name hands back
/// the very same `DataRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataRef(pub(crate) u32);

impl DataRef {
    /// Arena index (registration order).
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataref#{}", self.0)
    }
}

/// Identity of the component that registered a dataref.
///
/// Used for diagnostics and bulk teardown only, never for access control.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Owner(Arc<str>);

impl Owner {
    /// Label used for handles the shared-data hub creates itself.
    pub const SHARED: &'static str = "<shared>";

    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self(label.into())
    }

    pub fn shared() -> Self {
        Self::new(Self::SHARED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({})", self.0)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Owner {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Owner {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Owner {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
