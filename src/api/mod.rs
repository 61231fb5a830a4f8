//! Typed Stream API
//!
//! `SndfileApi` validates every argument before a native call is made and
//! turns raw native results into [`SndError`]s. Reads and writes are generic
//! over the four sample types; the element width always comes from
//! [`Sample::KIND`], never from the caller.
//!
//! Short reads and writes are results, not errors: the returned count is
//! authoritative.

mod stream;

use std::ffi::CString;
use std::path::Path;

use tracing::debug;

pub use stream::OpenStream;

use crate::command::CommandApi;
use crate::config::SndfileConfig;
use crate::error::{Result, SndError};
use crate::native::{
    NativeErrorCode, NativeLibrary, OpenMode, SfInfo, SndFileHandle, SndfileNative, Whence,
};
use crate::sample::Sample;

/// Validated access to a native libsndfile implementation
pub struct SndfileApi<N: SndfileNative> {
    native: N,
}

impl SndfileApi<NativeLibrary> {
    /// Load the system libsndfile
    pub fn load(config: &SndfileConfig) -> Result<Self> {
        Ok(Self::new(NativeLibrary::load(config)?))
    }
}

pub(crate) fn ensure_handle(sndfile: SndFileHandle) -> Result<()> {
    if sndfile.is_null() {
        return Err(SndError::invalid_argument("sndfile", "handle must be valid"));
    }
    Ok(())
}

fn ensure_positive(name: &'static str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(SndError::out_of_range(name, value, "must be greater than zero"));
    }
    Ok(())
}

fn buffer_len(name: &'static str, count: i64) -> Result<usize> {
    usize::try_from(count).map_err(|_| SndError::out_of_range(name, count, "fits in memory"))
}

impl<N: SndfileNative> SndfileApi<N> {
    pub fn new(native: N) -> Self {
        Self { native }
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    /// `sf_command` queries against the same library
    pub fn commands(&self) -> CommandApi<'_, N> {
        CommandApi::new(&self.native)
    }

    /// Open a sound file
    ///
    /// For `OpenMode::Write`, `info` must describe the stream to create.
    /// On return `info` holds what the library reports about the stream.
    ///
    /// # Errors
    /// * `InvalidArgument` - If the path is not valid UTF-8 or contains a NUL byte
    /// * `Native` - If libsndfile refuses the file
    pub fn open(&self, path: &Path, mode: OpenMode, info: &mut SfInfo) -> Result<SndFileHandle> {
        let text = path
            .to_str()
            .ok_or_else(|| SndError::invalid_argument("path", "path must be valid UTF-8"))?;
        let c_path = CString::new(text)
            .map_err(|_| SndError::invalid_argument("path", "path must not contain NUL bytes"))?;

        let sndfile = self.native.open(&c_path, mode, info);
        if sndfile.is_null() {
            return Err(self.open_error());
        }

        debug!(path = %path.display(), ?mode, channels = info.channels, "opened sound file");
        Ok(sndfile)
    }

    /// Open a sound file on an existing file descriptor
    pub fn open_fd(
        &self,
        fd: i32,
        mode: OpenMode,
        info: &mut SfInfo,
        close_desc: bool,
    ) -> Result<SndFileHandle> {
        if fd < 0 {
            return Err(SndError::out_of_range("fd", i64::from(fd), "fd >= 0"));
        }

        let sndfile = self.native.open_fd(fd, mode, info, close_desc);
        if sndfile.is_null() {
            return Err(self.open_error());
        }

        debug!(fd, ?mode, "opened sound file descriptor");
        Ok(sndfile)
    }

    /// Open a file and wrap the handle so it is closed on drop
    pub fn open_stream(&self, path: &Path, mode: OpenMode, info: SfInfo) -> Result<OpenStream<'_, N>> {
        let mut info = info;
        let sndfile = self.open(path, mode, &mut info)?;
        Ok(OpenStream::new(self, sndfile, info))
    }

    fn open_error(&self) -> SndError {
        SndError::Native {
            code: self.native.error(SndFileHandle::NULL),
            message: self.native.error_string(SndFileHandle::NULL),
        }
    }

    fn stream_error(&self, sndfile: SndFileHandle) -> SndError {
        SndError::Native {
            code: self.native.error(sndfile),
            message: self.native.error_string(sndfile),
        }
    }

    /// Close a stream
    pub fn close(&self, sndfile: SndFileHandle) -> Result<()> {
        ensure_handle(sndfile)?;

        let code = NativeErrorCode::from_raw(self.native.close(sndfile));
        if code.is_error() {
            return Err(SndError::Native {
                code: code.as_raw(),
                message: self.native.error_number(code.as_raw()),
            });
        }

        debug!(?sndfile, "closed sound file");
        Ok(())
    }

    /// Whether libsndfile accepts the format described by `info` for writing
    pub fn format_check(&self, info: &SfInfo) -> bool {
        self.native.format_check(info) != 0
    }

    /// Move the read/write position, returning the new frame offset
    pub fn seek(&self, sndfile: SndFileHandle, frames: i64, whence: Whence) -> Result<i64> {
        ensure_handle(sndfile)?;

        let position = self.native.seek(sndfile, frames, whence);
        if position < 0 {
            return Err(self.stream_error(sndfile));
        }
        Ok(position)
    }

    /// Flush pending writes to disk
    pub fn write_sync(&self, sndfile: SndFileHandle) -> Result<()> {
        ensure_handle(sndfile)?;
        self.native.write_sync(sndfile);
        Ok(())
    }

    /// Read up to `count` items into a new buffer of exactly `count` elements
    ///
    /// # Returns
    /// The buffer and the number of items the library actually read, which
    /// is less than `count` at end of stream.
    ///
    /// # Errors
    /// * `InvalidArgument` - If the handle is null
    /// * `OutOfRange` - If `count` is not positive
    pub fn read_items<T: Sample>(&self, sndfile: SndFileHandle, count: i64) -> Result<(Vec<T>, i64)> {
        ensure_handle(sndfile)?;
        ensure_positive("count", count)?;

        let mut buffer = vec![T::default(); buffer_len("count", count)?];
        let read = self.native.read_items(sndfile, T::items_mut(&mut buffer), count);
        Ok((buffer, read))
    }

    /// Read up to `items` items into a caller-provided buffer
    pub fn read_items_into<T: Sample>(
        &self,
        sndfile: SndFileHandle,
        buffer: &mut [T],
        items: i64,
    ) -> Result<i64> {
        ensure_handle(sndfile)?;
        if buffer.is_empty() {
            return Err(SndError::NullArgument { name: "buffer" });
        }
        if items < 0 || items as u64 > buffer.len() as u64 {
            return Err(SndError::out_of_range("items", items, "0 <= items <= buffer length"));
        }

        Ok(self.native.read_items(sndfile, T::items_mut(buffer), items))
    }

    /// Write `items_requested` items from `buffer`
    ///
    /// # Returns
    /// The number of items written, which may be less than requested.
    ///
    /// # Errors
    /// * `InvalidArgument` - If the handle is null
    /// * `NullArgument` - If `buffer` is empty
    /// * `OutOfRange` - If `items_requested` is negative or larger than `buffer`
    pub fn write_items<T: Sample>(
        &self,
        sndfile: SndFileHandle,
        buffer: &[T],
        items_requested: i64,
    ) -> Result<i64> {
        ensure_handle(sndfile)?;
        if buffer.is_empty() {
            return Err(SndError::NullArgument { name: "buffer" });
        }
        if items_requested < 0 {
            return Err(SndError::out_of_range("items", items_requested, "items >= 0"));
        }
        if items_requested as u64 > buffer.len() as u64 {
            return Err(SndError::out_of_range(
                "items",
                items_requested,
                "items <= buffer length",
            ));
        }

        Ok(self.native.write_items(sndfile, T::items(buffer), items_requested))
    }

    /// Read up to `frames` frames of `channels` interleaved items each
    ///
    /// The buffer always holds `frames * channels` elements; the returned
    /// count is in frames.
    pub fn read_frames<T: Sample>(
        &self,
        sndfile: SndFileHandle,
        frames: i64,
        channels: i32,
    ) -> Result<(Vec<T>, i64)> {
        ensure_handle(sndfile)?;
        ensure_positive("frames", frames)?;
        ensure_positive("channels", i64::from(channels))?;

        let items = frames
            .checked_mul(i64::from(channels))
            .ok_or_else(|| SndError::out_of_range("frames", frames, "frames * channels fits in i64"))?;
        let mut buffer = vec![T::default(); buffer_len("frames", items)?];
        let read = self.native.read_frames(sndfile, T::items_mut(&mut buffer), frames);
        Ok((buffer, read))
    }

    /// Write `frames` frames of `channels` interleaved items each
    pub fn write_frames<T: Sample>(
        &self,
        sndfile: SndFileHandle,
        buffer: &[T],
        frames: i64,
        channels: i32,
    ) -> Result<i64> {
        ensure_handle(sndfile)?;
        if buffer.is_empty() {
            return Err(SndError::NullArgument { name: "buffer" });
        }
        if frames < 0 {
            return Err(SndError::out_of_range("frames", frames, "frames >= 0"));
        }
        ensure_positive("channels", i64::from(channels))?;

        let needed = (frames as u64).saturating_mul(channels as u64);
        if needed > buffer.len() as u64 {
            return Err(SndError::out_of_range(
                "frames",
                frames,
                "frames * channels <= buffer length",
            ));
        }

        Ok(self.native.write_frames(sndfile, T::items(buffer), frames))
    }

    /// Error text for a stream, or for the last failed open when `sndfile` is null
    pub fn error_string(&self, sndfile: SndFileHandle) -> String {
        self.native.error_string(sndfile)
    }

    /// Version string of the loaded library
    pub fn version(&self) -> String {
        self.native.version_string()
    }
}
