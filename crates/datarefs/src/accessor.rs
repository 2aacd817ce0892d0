// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accessor tables.
//!
//! An owner publishes a dataref by handing the registry one [`Accessor`]
//! per representation it supports. Each accessor is a pair of optional
//! closures; whatever context the owner needs (a cell, a struct field, a
//! device handle) is captured by the closure itself, and the read and write
//! closures may capture different contexts.
//!
//! # Array contract
//!
//! Array readers are dual-purpose, mirroring the public dispatch API:
//!
//! ```text
//! reader(None, _)              -> total declared length, nothing copied
//! reader(Some(out), offset)    -> elements copied into out[..n]
//! ```
//!
//! The dispatch layer validates offsets and clips `out` before calling the
//! reader, so owners never see a request that overruns their data.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{Capabilities, TypeTag};

/// Scalar read closure.
pub type ScalarGetter<T> = Arc<dyn Fn() -> T + Send + Sync>;
/// Scalar write closure.
pub type ScalarSetter<T> = Arc<dyn Fn(T) + Send + Sync>;
/// Dual-purpose array read closure (`None` buffer = size query).
pub type ArrayReader<T> = Arc<dyn Fn(Option<&mut [T]>, usize) -> usize + Send + Sync>;
/// Array write closure, `(values, offset)`.
pub type ArrayWriter<T> = Arc<dyn Fn(&[T], usize) + Send + Sync>;

// ---------------------------------------------------------------------------
// ScalarAccessor
// ---------------------------------------------------------------------------

/// Get/set pair for a single value.
pub struct ScalarAccessor<T> {
    pub(crate) get: Option<ScalarGetter<T>>,
    pub(crate) set: Option<ScalarSetter<T>>,
}

impl<T> Clone for ScalarAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<T: Copy + Default + Send + Sync + 'static> ScalarAccessor<T> {
    /// Readable and writable accessor.
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            get: Some(Arc::new(get)),
            set: Some(Arc::new(set)),
        }
    }

    pub fn read_only<G>(get: G) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            get: Some(Arc::new(get)),
            set: None,
        }
    }

    pub fn write_only<S>(set: S) -> Self
    where
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            get: None,
            set: Some(Arc::new(set)),
        }
    }

    /// Accessor reading and writing a shared cell.
    pub fn backed_by(cell: Arc<RwLock<T>>) -> Self {
        let read_cell = cell.clone();
        Self::new(move || *read_cell.read(), move |value| *cell.write() = value)
    }

    pub fn has_reader(&self) -> bool {
        self.get.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.set.is_some()
    }
}

// ---------------------------------------------------------------------------
// ArrayAccessor
// ---------------------------------------------------------------------------

/// How writes relate to the declared length of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extent {
    /// Writes are clipped to the length the reader declares.
    #[default]
    Declared,
    /// Writes may extend the array past its current length.
    Growable,
}

/// Reader/writer pair for an offset-addressed array (or byte range).
pub struct ArrayAccessor<T> {
    pub(crate) read: Option<ArrayReader<T>>,
    pub(crate) write: Option<ArrayWriter<T>>,
    pub(crate) extent: Extent,
}

impl<T> Clone for ArrayAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            write: self.write.clone(),
            extent: self.extent,
        }
    }
}

impl<T: Copy + Default + Send + Sync + 'static> ArrayAccessor<T> {
    /// Readable and writable array with a declared length.
    pub fn new<R, W>(read: R, write: W) -> Self
    where
        R: Fn(Option<&mut [T]>, usize) -> usize + Send + Sync + 'static,
        W: Fn(&[T], usize) + Send + Sync + 'static,
    {
        Self {
            read: Some(Arc::new(read)),
            write: Some(Arc::new(write)),
            extent: Extent::Declared,
        }
    }

    pub fn read_only<R>(read: R) -> Self
    where
        R: Fn(Option<&mut [T]>, usize) -> usize + Send + Sync + 'static,
    {
        Self {
            read: Some(Arc::new(read)),
            write: None,
            extent: Extent::Declared,
        }
    }

    /// Write-only array. Without a reader there is no declared length, so
    /// writes are handed to the owner unclipped.
    pub fn write_only<W>(write: W) -> Self
    where
        W: Fn(&[T], usize) + Send + Sync + 'static,
    {
        Self {
            read: None,
            write: Some(Arc::new(write)),
            extent: Extent::Declared,
        }
    }

    /// Accessor over a shared vector.
    ///
    /// With [`Extent::Growable`] a write starting at or inside the current
    /// length may extend the vector. A write starting past the end is
    /// dropped; the vector never grows a gap.
    pub fn backed_by(cell: Arc<RwLock<Vec<T>>>, extent: Extent) -> Self {
        let read_cell = cell.clone();
        let read = move |out: Option<&mut [T]>, offset: usize| -> usize {
            let data = read_cell.read();
            match out {
                None => data.len(),
                Some(out) => {
                    let n = out.len().min(data.len().saturating_sub(offset));
                    if n > 0 {
                        out[..n].copy_from_slice(&data[offset..offset + n]);
                    }
                    n
                }
            }
        };
        let write = move |values: &[T], offset: usize| {
            let mut data = cell.write();
            if offset > data.len() {
                return;
            }
            let end = offset.saturating_add(values.len());
            if extent == Extent::Growable && end > data.len() {
                data.resize(end, T::default());
            }
            let end = end.min(data.len());
            if offset < end {
                data[offset..end].copy_from_slice(&values[..end - offset]);
            }
        };
        Self::new(read, write).with_extent(extent)
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn has_reader(&self) -> bool {
        self.read.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.write.is_some()
    }
}

// ---------------------------------------------------------------------------
// Accessor / AccessorTable
// ---------------------------------------------------------------------------

/// One accessor, tagged by the representation it serves.
#[derive(Clone)]
pub enum Accessor {
    Int(ScalarAccessor<i32>),
    Float(ScalarAccessor<f32>),
    Double(ScalarAccessor<f64>),
    IntArray(ArrayAccessor<i32>),
    FloatArray(ArrayAccessor<f32>),
    Bytes(ArrayAccessor<u8>),
}

impl Accessor {
    pub fn tag(&self) -> TypeTag {
        match self {
            Accessor::Int(_) => TypeTag::Int,
            Accessor::Float(_) => TypeTag::Float,
            Accessor::Double(_) => TypeTag::Double,
            Accessor::IntArray(_) => TypeTag::IntArray,
            Accessor::FloatArray(_) => TypeTag::FloatArray,
            Accessor::Bytes(_) => TypeTag::Bytes,
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            Accessor::Int(a) => a.has_writer(),
            Accessor::Float(a) => a.has_writer(),
            Accessor::Double(a) => a.has_writer(),
            Accessor::IntArray(a) => a.has_writer(),
            Accessor::FloatArray(a) => a.has_writer(),
            Accessor::Bytes(a) => a.has_writer(),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accessor({})", self.tag())
    }
}

/// Per-dataref table holding at most one accessor per [`TypeTag`].
///
/// The table is immutable once registered; re-registration replaces it
/// wholesale.
#[derive(Clone, Default)]
pub struct AccessorTable {
    int: Option<ScalarAccessor<i32>>,
    float: Option<ScalarAccessor<f32>>,
    double: Option<ScalarAccessor<f64>>,
    int_array: Option<ArrayAccessor<i32>>,
    float_array: Option<ArrayAccessor<f32>>,
    bytes: Option<ArrayAccessor<u8>>,
}

impl AccessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `accessor`, replacing any previous one of the same type.
    pub fn with(mut self, accessor: Accessor) -> Self {
        self.insert(accessor);
        self
    }

    pub fn insert(&mut self, accessor: Accessor) {
        match accessor {
            Accessor::Int(a) => self.int = Some(a),
            Accessor::Float(a) => self.float = Some(a),
            Accessor::Double(a) => self.double = Some(a),
            Accessor::IntArray(a) => self.int_array = Some(a),
            Accessor::FloatArray(a) => self.float_array = Some(a),
            Accessor::Bytes(a) => self.bytes = Some(a),
        }
    }

    /// Typed convenience over [`with`](Self::with).
    pub fn scalar<T: ScalarValue>(self, accessor: ScalarAccessor<T>) -> Self {
        self.with(T::wrap(accessor))
    }

    /// Typed convenience over [`with`](Self::with).
    pub fn array<T: ArrayElement>(self, accessor: ArrayAccessor<T>) -> Self {
        self.with(T::wrap(accessor))
    }

    /// Types present in the table.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::INT, self.int.is_some());
        caps.set(Capabilities::FLOAT, self.float.is_some());
        caps.set(Capabilities::DOUBLE, self.double.is_some());
        caps.set(Capabilities::INT_ARRAY, self.int_array.is_some());
        caps.set(Capabilities::FLOAT_ARRAY, self.float_array.is_some());
        caps.set(Capabilities::BYTES, self.bytes.is_some());
        caps
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities().is_empty()
    }

    /// True when at least one accessor carries a writer.
    pub fn has_any_writer(&self) -> bool {
        self.int.as_ref().is_some_and(ScalarAccessor::has_writer)
            || self.float.as_ref().is_some_and(ScalarAccessor::has_writer)
            || self.double.as_ref().is_some_and(ScalarAccessor::has_writer)
            || self.int_array.as_ref().is_some_and(ArrayAccessor::has_writer)
            || self
                .float_array
                .as_ref()
                .is_some_and(ArrayAccessor::has_writer)
            || self.bytes.as_ref().is_some_and(ArrayAccessor::has_writer)
    }

    pub(crate) fn scalar_for<T: ScalarValue>(&self) -> Option<&ScalarAccessor<T>> {
        T::slot(self).as_ref()
    }

    pub(crate) fn array_for<T: ArrayElement>(&self) -> Option<&ArrayAccessor<T>> {
        T::slot(self).as_ref()
    }
}

impl FromIterator<Accessor> for AccessorTable {
    fn from_iter<I: IntoIterator<Item = Accessor>>(iter: I) -> Self {
        iter.into_iter()
            .fold(AccessorTable::new(), |table, accessor| table.with(accessor))
    }
}

impl fmt::Debug for AccessorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorTable")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Rust type <-> TypeTag binding
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for u8 {}
}

/// Rust types served by scalar accessors (`i32`, `f32`, `f64`).
pub trait ScalarValue: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    const TAG: TypeTag;

    #[doc(hidden)]
    fn slot(table: &AccessorTable) -> &Option<ScalarAccessor<Self>>;

    #[doc(hidden)]
    fn wrap(accessor: ScalarAccessor<Self>) -> Accessor;
}

/// Element types served by array accessors (`i32`, `f32`, `u8`).
pub trait ArrayElement: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    const TAG: TypeTag;

    #[doc(hidden)]
    fn slot(table: &AccessorTable) -> &Option<ArrayAccessor<Self>>;

    #[doc(hidden)]
    fn wrap(accessor: ArrayAccessor<Self>) -> Accessor;
}

macro_rules! scalar_value {
    ($ty:ty, $tag:ident, $field:ident) => {
        impl ScalarValue for $ty {
            const TAG: TypeTag = TypeTag::$tag;

            fn slot(table: &AccessorTable) -> &Option<ScalarAccessor<Self>> {
                &table.$field
            }

            fn wrap(accessor: ScalarAccessor<Self>) -> Accessor {
                Accessor::$tag(accessor)
            }
        }
    };
}

macro_rules! array_element {
    ($ty:ty, $tag:ident, $field:ident) => {
        impl ArrayElement for $ty {
            const TAG: TypeTag = TypeTag::$tag;

            fn slot(table: &AccessorTable) -> &Option<ArrayAccessor<Self>> {
                &table.$field
            }

            fn wrap(accessor: ArrayAccessor<Self>) -> Accessor {
                Accessor::$tag(accessor)
            }
        }
    };
}

scalar_value!(i32, Int, int);
scalar_value!(f32, Float, float);
scalar_value!(f64, Double, double);
array_element!(i32, IntArray, int_array);
array_element!(f32, FloatArray, float_array);
array_element!(u8, Bytes, bytes);
