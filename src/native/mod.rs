//! Native Boundary Module
//!
//! This module provides:
//! - `SndfileNative` trait, the capability surface of libsndfile's C API
//! - `NativeLibrary`, the real library loaded at runtime
//! - `InMemoryLibrary`, a WAV-backed stand-in for tests and tooling
//!
//! Implementations return raw native results (handles, counts, status
//! codes) without interpretation. Validation and error translation live in
//! [`crate::api`] and [`crate::command`].

mod fake;
mod library;
mod types;

use std::ffi::CStr;

pub use fake::InMemoryLibrary;
pub use library::{NativeLibrary, DEFAULT_LIBRARY_NAMES};
pub use types::{
    Endian, Format, MajorFormat, NativeErrorCode, OpenMode, SfInfo, SndFileHandle, SubFormat,
    Whence, SNDFILE,
};

use crate::command::Command;
use crate::memory::UnmanagedMemoryHandle;
use crate::sample::{Items, ItemsMut};

/// The libsndfile C API as a capability interface
///
/// Every method maps onto one `sf_*` function. Handles passed in must have
/// been returned by `open`/`open_fd` on the same implementation and not yet
/// closed. Read and write calls never touch more elements than the given
/// slice holds, whatever count is requested.
pub trait SndfileNative {
    /// `sf_open`; returns the null handle on failure
    fn open(&self, path: &CStr, mode: OpenMode, info: &mut SfInfo) -> SndFileHandle;

    /// `sf_open_fd`; returns the null handle on failure
    fn open_fd(&self, fd: i32, mode: OpenMode, info: &mut SfInfo, close_desc: bool)
        -> SndFileHandle;

    /// `sf_close`; returns a native error code
    fn close(&self, sndfile: SndFileHandle) -> i32;

    /// `sf_format_check`; non-zero when the format is valid
    fn format_check(&self, info: &SfInfo) -> i32;

    /// `sf_seek`; returns the new frame offset or -1
    fn seek(&self, sndfile: SndFileHandle, frames: i64, whence: Whence) -> i64;

    /// `sf_write_sync`
    fn write_sync(&self, sndfile: SndFileHandle);

    /// `sf_read_{short,int,float,double}`; returns items read
    fn read_items(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, items: i64) -> i64;

    /// `sf_write_{short,int,float,double}`; returns items written
    fn write_items(&self, sndfile: SndFileHandle, buffer: Items<'_>, items: i64) -> i64;

    /// `sf_readf_{short,int,float,double}`; returns frames read
    fn read_frames(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, frames: i64) -> i64;

    /// `sf_writef_{short,int,float,double}`; returns frames written
    fn write_frames(&self, sndfile: SndFileHandle, buffer: Items<'_>, frames: i64) -> i64;

    /// `sf_command`; `data` is passed as NULL when absent
    fn command(
        &self,
        sndfile: SndFileHandle,
        command: Command,
        data: Option<&mut UnmanagedMemoryHandle>,
        datasize: i32,
    ) -> i32;

    /// `sf_error`
    fn error(&self, sndfile: SndFileHandle) -> i32;

    /// `sf_strerror`; pass the null handle for the last open failure
    fn error_string(&self, sndfile: SndFileHandle) -> String;

    /// `sf_error_number`
    fn error_number(&self, errnum: i32) -> String;

    /// `sf_version_string`
    fn version_string(&self) -> String;
}
