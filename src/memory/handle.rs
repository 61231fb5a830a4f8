//! Owned blocks of unmanaged memory
//!
//! An [`UnmanagedMemoryHandle`] is the only way this crate hands writable
//! memory to libsndfile. The block is zeroed on allocation and freed exactly
//! once, either by an explicit [`release`](UnmanagedMemoryHandle::release)
//! or when the handle is dropped.

use std::alloc::{self, Layout};
use std::ffi::c_void;
use std::ptr::NonNull;

use tracing::trace;

use crate::error::{Result, SndError};

/// Alignment of every block; large enough for the widest sample type
pub const BLOCK_ALIGN: usize = std::mem::align_of::<f64>();

/// An exclusively owned block of zeroed unmanaged memory
#[derive(Debug)]
pub struct UnmanagedMemoryHandle {
    ptr: Option<NonNull<u8>>,
    len: usize,
}

impl UnmanagedMemoryHandle {
    /// Reserve `byte_len` zeroed bytes
    ///
    /// # Errors
    /// * `InvalidArgument` - If `byte_len` is zero
    /// * `OutOfMemory` - If the allocator cannot satisfy the request
    pub fn allocate(byte_len: usize) -> Result<Self> {
        if byte_len == 0 {
            return Err(SndError::invalid_argument(
                "byte_len",
                "cannot allocate an empty block",
            ));
        }

        let layout = Layout::from_size_align(byte_len, BLOCK_ALIGN)
            .map_err(|_| SndError::OutOfMemory { bytes: byte_len })?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(SndError::OutOfMemory { bytes: byte_len })?;

        trace!(bytes = byte_len, "allocated unmanaged block");

        Ok(Self {
            ptr: Some(ptr),
            len: byte_len,
        })
    }

    /// Capacity in bytes; zero once released
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_released(&self) -> bool {
        self.ptr.is_none()
    }

    /// Byte length as the `int` libsndfile's command call expects
    pub fn native_len(&self) -> Result<i32> {
        i32::try_from(self.len)
            .map_err(|_| SndError::out_of_range("byte_len", self.len as i64, "fits in a C int"))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.ptr {
            // SAFETY: ptr points at `len` initialised bytes owned by self
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self.ptr {
            // SAFETY: ptr points at `len` initialised bytes exclusively owned by self
            Some(ptr) => unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Address for a native call; null once released
    pub(crate) fn as_mut_ptr(&mut self) -> *mut c_void {
        self.ptr
            .map_or(std::ptr::null_mut(), |ptr| ptr.as_ptr().cast::<c_void>())
    }

    /// Free the block. Calling this again is a no-op.
    pub fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: the same size/alignment was validated in `allocate`
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.len, BLOCK_ALIGN);
                alloc::dealloc(ptr.as_ptr(), layout);
            }
            trace!(bytes = self.len, "released unmanaged block");
            self.len = 0;
        }
    }
}

impl Drop for UnmanagedMemoryHandle {
    fn drop(&mut self) {
        self.release();
    }
}
