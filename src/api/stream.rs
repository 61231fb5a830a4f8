//! Scoped stream handle

use tracing::warn;

use super::SndfileApi;
use crate::error::Result;
use crate::native::{SfInfo, SndFileHandle, SndfileNative, Whence};
use crate::sample::Sample;

/// An open stream that is closed when dropped
///
/// Prefer [`OpenStream::close`] when the close status matters; the drop
/// path can only log a failure.
pub struct OpenStream<'a, N: SndfileNative> {
    api: &'a SndfileApi<N>,
    sndfile: SndFileHandle,
    info: SfInfo,
    closed: bool,
}

impl<'a, N: SndfileNative> OpenStream<'a, N> {
    pub(crate) fn new(api: &'a SndfileApi<N>, sndfile: SndFileHandle, info: SfInfo) -> Self {
        Self {
            api,
            sndfile,
            info,
            closed: false,
        }
    }

    pub fn handle(&self) -> SndFileHandle {
        self.sndfile
    }

    /// Stream description as reported when the file was opened
    pub fn info(&self) -> &SfInfo {
        &self.info
    }

    pub fn read_items<T: Sample>(&self, count: i64) -> Result<(Vec<T>, i64)> {
        self.api.read_items(self.sndfile, count)
    }

    pub fn write_items<T: Sample>(&self, buffer: &[T]) -> Result<i64> {
        self.api.write_items(self.sndfile, buffer, buffer.len() as i64)
    }

    pub fn read_frames<T: Sample>(&self, frames: i64) -> Result<(Vec<T>, i64)> {
        self.api.read_frames(self.sndfile, frames, self.info.channels)
    }

    pub fn write_frames<T: Sample>(&self, buffer: &[T]) -> Result<i64> {
        let channels = self.info.channels.max(1);
        let frames = buffer.len() as i64 / i64::from(channels);
        self.api.write_frames(self.sndfile, buffer, frames, channels)
    }

    pub fn seek(&self, frames: i64, whence: Whence) -> Result<i64> {
        self.api.seek(self.sndfile, frames, whence)
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.api.close(self.sndfile)
    }
}

impl<N: SndfileNative> Drop for OpenStream<'_, N> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.api.close(self.sndfile) {
            warn!(error = %e, "failed to close sound file on drop");
        }
    }
}
