//! Sample element types
//!
//! libsndfile reads and writes four fixed-width element types. The closed
//! set is modelled by [`SampleKind`]; the sealed [`Sample`] trait maps each
//! Rust type onto its kind, and [`Items`] / [`ItemsMut`] are the tagged
//! slice views handed across the native boundary.
//!
//! The width mapping is what keeps the native library inside the buffer:
//! a native call is always sized as `count * kind.byte_width()`.

use std::fmt;
use std::str::FromStr;

use bytemuck::Pod;
use num_traits::NumCast;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SndError};

/// Element type tag with its fixed native width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// `short` (16-bit signed integer)
    Int16,
    /// `int` (32-bit signed integer)
    Int32,
    /// `float` (32-bit IEEE float)
    Float32,
    /// `double` (64-bit IEEE float)
    Float64,
}

impl SampleKind {
    pub const ALL: [SampleKind; 4] = [
        SampleKind::Int16,
        SampleKind::Int32,
        SampleKind::Float32,
        SampleKind::Float64,
    ];

    /// Size of one element in bytes
    pub const fn byte_width(self) -> usize {
        match self {
            SampleKind::Int16 => 2,
            SampleKind::Int32 => 4,
            SampleKind::Float32 => 4,
            SampleKind::Float64 => 8,
        }
    }

    /// The C type name libsndfile uses for this kind
    pub fn c_name(self) -> &'static str {
        match self {
            SampleKind::Int16 => "short",
            SampleKind::Int32 => "int",
            SampleKind::Float32 => "float",
            SampleKind::Float64 => "double",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

impl FromStr for SampleKind {
    type Err = SndError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "short" | "i16" | "int16" => Ok(SampleKind::Int16),
            "int" | "i32" | "int32" => Ok(SampleKind::Int32),
            "float" | "f32" | "float32" => Ok(SampleKind::Float32),
            "double" | "f64" | "float64" => Ok(SampleKind::Float64),
            other => Err(SndError::invalid_argument(
                "kind",
                format!("unknown sample kind '{}'", other),
            )),
        }
    }
}

/// Typed buffer descriptor: kind, element size and element count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    kind: SampleKind,
    count: usize,
}

impl BufferDescriptor {
    /// Describe a buffer of `count` elements; `count` must be at least 1
    pub fn new(kind: SampleKind, count: i64) -> Result<Self> {
        if count <= 0 {
            return Err(SndError::invalid_argument(
                "count",
                format!("element count must be positive, got {}", count),
            ));
        }
        let count = usize::try_from(count)
            .map_err(|_| SndError::out_of_range("count", count, "count fits in usize"))?;
        Ok(Self { kind, count })
    }

    pub fn for_sample<T: Sample>(count: i64) -> Result<Self> {
        Self::new(T::KIND, count)
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn element_size(&self) -> usize {
        self.kind.byte_width()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Total size in bytes, or `None` on overflow
    pub fn byte_len(&self) -> Option<usize> {
        self.count.checked_mul(self.element_size())
    }
}

/// Borrowed, tagged view of a sample slice passed to a native write
#[derive(Debug, Clone, Copy)]
pub enum Items<'a> {
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Float32(&'a [f32]),
    Float64(&'a [f64]),
}

impl Items<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            Items::Int16(_) => SampleKind::Int16,
            Items::Int32(_) => SampleKind::Int32,
            Items::Float32(_) => SampleKind::Float32,
            Items::Float64(_) => SampleKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Items::Int16(s) => s.len(),
            Items::Int32(s) => s.len(),
            Items::Float32(s) => s.len(),
            Items::Float64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().byte_width()
    }
}

/// Borrowed, tagged view of a sample slice filled by a native read
#[derive(Debug)]
pub enum ItemsMut<'a> {
    Int16(&'a mut [i16]),
    Int32(&'a mut [i32]),
    Float32(&'a mut [f32]),
    Float64(&'a mut [f64]),
}

impl ItemsMut<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            ItemsMut::Int16(_) => SampleKind::Int16,
            ItemsMut::Int32(_) => SampleKind::Int32,
            ItemsMut::Float32(_) => SampleKind::Float32,
            ItemsMut::Float64(_) => SampleKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ItemsMut::Int16(s) => s.len(),
            ItemsMut::Int32(s) => s.len(),
            ItemsMut::Float32(s) => s.len(),
            ItemsMut::Float64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().byte_width()
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// A fixed-width numeric element libsndfile can read and write
pub trait Sample:
    sealed::Sealed + Pod + NumCast + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: SampleKind;

    fn items(buffer: &[Self]) -> Items<'_>;

    fn items_mut(buffer: &mut [Self]) -> ItemsMut<'_>;
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const KIND: SampleKind = SampleKind::$variant;

            fn items(buffer: &[Self]) -> Items<'_> {
                Items::$variant(buffer)
            }

            fn items_mut(buffer: &mut [Self]) -> ItemsMut<'_> {
                ItemsMut::$variant(buffer)
            }
        }
    };
}

impl_sample!(i16, Int16);
impl_sample!(i32, Int32);
impl_sample!(f32, Float32);
impl_sample!(f64, Float64);
