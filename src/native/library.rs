//! libsndfile loaded at runtime
//!
//! Symbols are resolved once when the library is loaded and kept as plain
//! function pointers next to the `Library` that owns them.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use super::types::{OpenMode, SfInfo, SndFileHandle, Whence, SNDFILE};
use super::SndfileNative;
use crate::command::Command;
use crate::config::SndfileConfig;
use crate::error::{Result, SndError};
use crate::memory::UnmanagedMemoryHandle;
use crate::sample::{Items, ItemsMut};

/// Library names tried, in order, when no explicit path is configured
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libsndfile.so.1",
    "libsndfile.so",
    "libsndfile.1.dylib",
    "libsndfile.dylib",
    "sndfile.dll",
    "libsndfile-1.dll",
];

type SfOpen = unsafe extern "C" fn(*const c_char, c_int, *mut SfInfo) -> *mut SNDFILE;
type SfOpenFd = unsafe extern "C" fn(c_int, c_int, *mut SfInfo, c_int) -> *mut SNDFILE;
type SfClose = unsafe extern "C" fn(*mut SNDFILE) -> c_int;
type SfFormatCheck = unsafe extern "C" fn(*const SfInfo) -> c_int;
type SfSeek = unsafe extern "C" fn(*mut SNDFILE, i64, c_int) -> i64;
type SfWriteSync = unsafe extern "C" fn(*mut SNDFILE);
type SfCommand = unsafe extern "C" fn(*mut SNDFILE, c_int, *mut c_void, c_int) -> c_int;
type SfError = unsafe extern "C" fn(*mut SNDFILE) -> c_int;
type SfStrError = unsafe extern "C" fn(*mut SNDFILE) -> *const c_char;
type SfErrorNumber = unsafe extern "C" fn(c_int) -> *const c_char;
type SfVersionString = unsafe extern "C" fn() -> *const c_char;
type SfRead<T> = unsafe extern "C" fn(*mut SNDFILE, *mut T, i64) -> i64;
type SfWrite<T> = unsafe extern "C" fn(*mut SNDFILE, *const T, i64) -> i64;

struct Symbols {
    open: SfOpen,
    open_fd: SfOpenFd,
    close: SfClose,
    format_check: SfFormatCheck,
    seek: SfSeek,
    write_sync: SfWriteSync,
    command: SfCommand,
    error: SfError,
    strerror: SfStrError,
    error_number: SfErrorNumber,
    version_string: SfVersionString,
    read_short: SfRead<i16>,
    read_int: SfRead<i32>,
    read_float: SfRead<f32>,
    read_double: SfRead<f64>,
    readf_short: SfRead<i16>,
    readf_int: SfRead<i32>,
    readf_float: SfRead<f32>,
    readf_double: SfRead<f64>,
    write_short: SfWrite<i16>,
    write_int: SfWrite<i32>,
    write_float: SfWrite<f32>,
    write_double: SfWrite<f64>,
    writef_short: SfWrite<i16>,
    writef_int: SfWrite<i32>,
    writef_float: SfWrite<f32>,
    writef_double: SfWrite<f64>,
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    // SAFETY: each alias above matches the prototype in sndfile.h
    let sym = unsafe { library.get::<T>(name.as_bytes()) }
        .map_err(|source| SndError::MissingSymbol { symbol: name, source })?;
    Ok(*sym)
}

impl Symbols {
    fn resolve(library: &Library) -> Result<Self> {
        Ok(Symbols {
            open: symbol(library, "sf_open")?,
            open_fd: symbol(library, "sf_open_fd")?,
            close: symbol(library, "sf_close")?,
            format_check: symbol(library, "sf_format_check")?,
            seek: symbol(library, "sf_seek")?,
            write_sync: symbol(library, "sf_write_sync")?,
            command: symbol(library, "sf_command")?,
            error: symbol(library, "sf_error")?,
            strerror: symbol(library, "sf_strerror")?,
            error_number: symbol(library, "sf_error_number")?,
            version_string: symbol(library, "sf_version_string")?,
            read_short: symbol(library, "sf_read_short")?,
            read_int: symbol(library, "sf_read_int")?,
            read_float: symbol(library, "sf_read_float")?,
            read_double: symbol(library, "sf_read_double")?,
            readf_short: symbol(library, "sf_readf_short")?,
            readf_int: symbol(library, "sf_readf_int")?,
            readf_float: symbol(library, "sf_readf_float")?,
            readf_double: symbol(library, "sf_readf_double")?,
            write_short: symbol(library, "sf_write_short")?,
            write_int: symbol(library, "sf_write_int")?,
            write_float: symbol(library, "sf_write_float")?,
            write_double: symbol(library, "sf_write_double")?,
            writef_short: symbol(library, "sf_writef_short")?,
            writef_int: symbol(library, "sf_writef_int")?,
            writef_float: symbol(library, "sf_writef_float")?,
            writef_double: symbol(library, "sf_writef_double")?,
        })
    }
}

/// The system libsndfile, resolved through `libloading`
pub struct NativeLibrary {
    path: PathBuf,
    symbols: Symbols,
    // Keeps the function pointers in `symbols` valid
    _library: Library,
}

impl NativeLibrary {
    /// Load libsndfile as configured, falling back to the platform defaults
    pub fn load(config: &SndfileConfig) -> Result<Self> {
        match &config.library_path {
            Some(path) => Self::load_from(path),
            None => Self::load_default(),
        }
    }

    /// Load libsndfile from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading libsndfile runs its initialisers, which have no
        // preconditions on our side
        let library = unsafe { Library::new(&path) }.map_err(|e| SndError::LibraryLoad {
            reason: format!("could not open '{}'", path.display()),
            source: Some(e),
        })?;
        let symbols = Symbols::resolve(&library)?;

        debug!(path = %path.display(), "loaded libsndfile");

        Ok(Self {
            path,
            symbols,
            _library: library,
        })
    }

    fn load_default() -> Result<Self> {
        let mut last_error = None;
        for name in DEFAULT_LIBRARY_NAMES {
            match Self::load_from(name) {
                Ok(library) => return Ok(library),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| SndError::LibraryLoad {
            reason: "no candidate library names".to_string(),
            source: None,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Channel count of an open stream, used to bound frame calls
    fn channels(&self, sndfile: SndFileHandle) -> Option<i64> {
        let mut info = SfInfo::default();
        // SAFETY: info is a valid SF_INFO of the size passed
        let status = unsafe {
            (self.symbols.command)(
                sndfile.as_ptr(),
                Command::GetCurrentSfInfo.code(),
                (&mut info as *mut SfInfo).cast::<c_void>(),
                std::mem::size_of::<SfInfo>() as c_int,
            )
        };
        (status == 0 && info.channels > 0).then(|| i64::from(info.channels))
    }
}

fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: libsndfile returns NUL-terminated static or per-handle strings
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn clamp(requested: i64, available: usize) -> i64 {
    requested.clamp(0, available as i64)
}

/// Whole frames of `requested` that fit in `available` items; zero when
/// the channel count is unknown
fn frames_that_fit(requested: i64, available: usize, channels: Option<i64>) -> i64 {
    match channels {
        Some(channels) if channels > 0 => requested.clamp(0, available as i64 / channels),
        _ => 0,
    }
}

impl SndfileNative for NativeLibrary {
    fn open(&self, path: &CStr, mode: OpenMode, info: &mut SfInfo) -> SndFileHandle {
        // SAFETY: path is NUL-terminated and info is a valid SF_INFO
        let raw = unsafe { (self.symbols.open)(path.as_ptr(), mode.as_raw(), info) };
        // SAFETY: raw was just returned by sf_open
        unsafe { SndFileHandle::from_raw(raw) }
    }

    fn open_fd(
        &self,
        fd: i32,
        mode: OpenMode,
        info: &mut SfInfo,
        close_desc: bool,
    ) -> SndFileHandle {
        // SAFETY: info is a valid SF_INFO; fd ownership follows close_desc
        let raw =
            unsafe { (self.symbols.open_fd)(fd, mode.as_raw(), info, c_int::from(close_desc)) };
        // SAFETY: raw was just returned by sf_open_fd
        unsafe { SndFileHandle::from_raw(raw) }
    }

    fn close(&self, sndfile: SndFileHandle) -> i32 {
        // SAFETY: handle invariant of SndfileNative
        unsafe { (self.symbols.close)(sndfile.as_ptr()) }
    }

    fn format_check(&self, info: &SfInfo) -> i32 {
        // SAFETY: info is a valid SF_INFO
        unsafe { (self.symbols.format_check)(info) }
    }

    fn seek(&self, sndfile: SndFileHandle, frames: i64, whence: Whence) -> i64 {
        // SAFETY: handle invariant of SndfileNative
        unsafe { (self.symbols.seek)(sndfile.as_ptr(), frames, whence.as_raw()) }
    }

    fn write_sync(&self, sndfile: SndFileHandle) {
        // SAFETY: handle invariant of SndfileNative
        unsafe { (self.symbols.write_sync)(sndfile.as_ptr()) }
    }

    fn read_items(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, items: i64) -> i64 {
        let s = &self.symbols;
        let f = sndfile.as_ptr();
        // SAFETY: the count is clamped to the slice length
        unsafe {
            match buffer {
                ItemsMut::Int16(b) => (s.read_short)(f, b.as_mut_ptr(), clamp(items, b.len())),
                ItemsMut::Int32(b) => (s.read_int)(f, b.as_mut_ptr(), clamp(items, b.len())),
                ItemsMut::Float32(b) => (s.read_float)(f, b.as_mut_ptr(), clamp(items, b.len())),
                ItemsMut::Float64(b) => (s.read_double)(f, b.as_mut_ptr(), clamp(items, b.len())),
            }
        }
    }

    fn write_items(&self, sndfile: SndFileHandle, buffer: Items<'_>, items: i64) -> i64 {
        let s = &self.symbols;
        let f = sndfile.as_ptr();
        // SAFETY: the count is clamped to the slice length
        unsafe {
            match buffer {
                Items::Int16(b) => (s.write_short)(f, b.as_ptr(), clamp(items, b.len())),
                Items::Int32(b) => (s.write_int)(f, b.as_ptr(), clamp(items, b.len())),
                Items::Float32(b) => (s.write_float)(f, b.as_ptr(), clamp(items, b.len())),
                Items::Float64(b) => (s.write_double)(f, b.as_ptr(), clamp(items, b.len())),
            }
        }
    }

    fn read_frames(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, frames: i64) -> i64 {
        let frames = frames_that_fit(frames, buffer.len(), self.channels(sndfile));
        if frames == 0 {
            return 0;
        }
        let s = &self.symbols;
        let f = sndfile.as_ptr();
        // SAFETY: frames * channels never exceeds the slice length
        unsafe {
            match buffer {
                ItemsMut::Int16(b) => (s.readf_short)(f, b.as_mut_ptr(), frames),
                ItemsMut::Int32(b) => (s.readf_int)(f, b.as_mut_ptr(), frames),
                ItemsMut::Float32(b) => (s.readf_float)(f, b.as_mut_ptr(), frames),
                ItemsMut::Float64(b) => (s.readf_double)(f, b.as_mut_ptr(), frames),
            }
        }
    }

    fn write_frames(&self, sndfile: SndFileHandle, buffer: Items<'_>, frames: i64) -> i64 {
        let frames = frames_that_fit(frames, buffer.len(), self.channels(sndfile));
        if frames == 0 {
            return 0;
        }
        let s = &self.symbols;
        let f = sndfile.as_ptr();
        // SAFETY: frames * channels never exceeds the slice length
        unsafe {
            match buffer {
                Items::Int16(b) => (s.writef_short)(f, b.as_ptr(), frames),
                Items::Int32(b) => (s.writef_int)(f, b.as_ptr(), frames),
                Items::Float32(b) => (s.writef_float)(f, b.as_ptr(), frames),
                Items::Float64(b) => (s.writef_double)(f, b.as_ptr(), frames),
            }
        }
    }

    fn command(
        &self,
        sndfile: SndFileHandle,
        command: Command,
        data: Option<&mut UnmanagedMemoryHandle>,
        datasize: i32,
    ) -> i32 {
        let (ptr, size) = match data {
            Some(handle) => {
                let capacity = i32::try_from(handle.len()).unwrap_or(i32::MAX);
                (handle.as_mut_ptr(), datasize.clamp(0, capacity))
            }
            None => (std::ptr::null_mut(), datasize),
        };
        // SAFETY: ptr is null or a live block of at least `size` bytes
        unsafe { (self.symbols.command)(sndfile.as_ptr(), command.code(), ptr, size) }
    }

    fn error(&self, sndfile: SndFileHandle) -> i32 {
        // SAFETY: handle invariant of SndfileNative; null is accepted
        unsafe { (self.symbols.error)(sndfile.as_ptr()) }
    }

    fn error_string(&self, sndfile: SndFileHandle) -> String {
        // SAFETY: handle invariant of SndfileNative; null is accepted
        c_string(unsafe { (self.symbols.strerror)(sndfile.as_ptr()) })
    }

    fn error_number(&self, errnum: i32) -> String {
        // SAFETY: sf_error_number accepts any integer
        c_string(unsafe { (self.symbols.error_number)(errnum) })
    }

    fn version_string(&self) -> String {
        // SAFETY: no arguments; returns a static string
        c_string(unsafe { (self.symbols.version_string)() })
    }
}
