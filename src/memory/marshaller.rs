//! Typed data movement between Rust values and unmanaged memory
//!
//! The marshaller never calls into libsndfile. It sizes blocks from the
//! element type, copies slices in, and copies arrays or scalars back out.

use bytemuck::Pod;

use crate::error::{Result, SndError};
use crate::memory::handle::UnmanagedMemoryHandle;
use crate::sample::BufferDescriptor;
use crate::sample::Sample;

/// Allocates and copies typed unmanaged buffers
#[derive(Debug, Clone, Copy, Default)]
pub struct Marshaller;

impl Marshaller {
    pub fn new() -> Self {
        Marshaller
    }

    /// Reserve room for `count` elements of `T`
    ///
    /// # Errors
    /// * `InvalidArgument` - If `count` is zero or negative
    /// * `OutOfMemory` - If the block cannot be allocated
    pub fn allocate<T: Pod>(&self, count: i64) -> Result<UnmanagedMemoryHandle> {
        if count <= 0 {
            return Err(SndError::invalid_argument(
                "count",
                format!("element count must be positive, got {}", count),
            ));
        }
        let bytes = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(std::mem::size_of::<T>()))
            .ok_or_else(|| SndError::out_of_range("count", count, "count * element size fits in memory"))?;

        UnmanagedMemoryHandle::allocate(bytes)
    }

    /// Reserve room for a single `T`
    pub fn allocate_scalar<T: Pod>(&self) -> Result<UnmanagedMemoryHandle> {
        self.allocate::<T>(1)
    }

    /// Reserve a block described by a typed buffer descriptor
    pub fn allocate_described(&self, descriptor: &BufferDescriptor) -> Result<UnmanagedMemoryHandle> {
        let bytes = descriptor.byte_len().ok_or(SndError::OutOfMemory { bytes: usize::MAX })?;
        UnmanagedMemoryHandle::allocate(bytes)
    }

    /// Copy `values` into the start of `handle`
    ///
    /// # Errors
    /// * `InvalidArgument` - If `values` is empty
    /// * `Bounds` - If the handle is smaller than `values`
    pub fn write_array_to_handle<T: Pod>(
        &self,
        handle: &mut UnmanagedMemoryHandle,
        values: &[T],
    ) -> Result<()> {
        if values.is_empty() {
            return Err(SndError::invalid_argument(
                "values",
                "cannot marshal an empty array",
            ));
        }

        let source: &[u8] = bytemuck::cast_slice(values);
        let capacity = handle.len();
        if source.len() > capacity {
            return Err(SndError::Bounds {
                required: source.len(),
                capacity,
            });
        }

        handle.as_bytes_mut()[..source.len()].copy_from_slice(source);
        Ok(())
    }

    /// Copy `count` elements out of `handle` into a new vector
    ///
    /// The returned vector always has exactly `count` elements.
    pub fn handle_to_array<T: Pod>(
        &self,
        handle: &UnmanagedMemoryHandle,
        count: usize,
    ) -> Result<Vec<T>> {
        let width = std::mem::size_of::<T>();
        let required = count
            .checked_mul(width)
            .ok_or(SndError::Bounds {
                required: usize::MAX,
                capacity: handle.len(),
            })?;
        if required > handle.len() {
            return Err(SndError::Bounds {
                required,
                capacity: handle.len(),
            });
        }

        Ok(handle.as_bytes()[..required]
            .chunks_exact(width)
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect())
    }

    /// Copy exactly one `T` out of the start of `handle`
    pub fn handle_to_scalar<T: Pod>(&self, handle: &UnmanagedMemoryHandle) -> Result<T> {
        let width = std::mem::size_of::<T>();
        if handle.len() < width {
            return Err(SndError::Bounds {
                required: width,
                capacity: handle.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(&handle.as_bytes()[..width]))
    }

    /// Read a NUL-terminated C string out of `handle`
    pub fn handle_to_string(&self, handle: &UnmanagedMemoryHandle) -> String {
        let bytes = handle.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    /// Copy a typed sample slice into a freshly allocated block
    pub fn samples_to_handle<T: Sample>(&self, values: &[T]) -> Result<UnmanagedMemoryHandle> {
        let mut handle = self.allocate::<T>(values.len() as i64)?;
        self.write_array_to_handle(&mut handle, values)?;
        Ok(handle)
    }
}
