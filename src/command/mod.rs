//! Command Result Decoder
//!
//! `sf_command` reports through two channels at once: an integer status and
//! a caller-supplied buffer. `CommandApi` allocates that buffer, invokes the
//! command and turns the pair into a typed result.
//!
//! Fixed-size queries succeed only on status 0:
//! - negative status becomes [`SndError::CommandFailed`]
//! - positive status becomes [`SndError::UnexpectedResult`]
//! - an empty payload becomes [`SndError::UnexpectedResult`]
//!
//! Flag commands return the native boolean and string commands return the
//! string length, so each family has its own decode path.

mod codes;

use bytemuck::Pod;
use tracing::debug;

pub use codes::Command;

use crate::api::ensure_handle;
use crate::error::{Result, SndError};
use crate::memory::{Marshaller, UnmanagedMemoryHandle};
use crate::native::{SfInfo, SndFileHandle, SndfileNative};

/// Room reserved for string results
const STRING_CAPACITY: usize = 4096;

/// Decodes `sf_command` results for one native library
pub struct CommandApi<'a, N: SndfileNative> {
    native: &'a N,
    marshaller: Marshaller,
}

fn decode_status(command: Command, status: i32) -> Result<()> {
    match status {
        0 => Ok(()),
        s if s < 0 => Err(SndError::CommandFailed { command, status: s }),
        s => Err(SndError::unexpected(
            command,
            format!("expected status 0, library returned {}", s),
        )),
    }
}

fn ensure_count(name: &'static str, count: i32) -> Result<()> {
    if count <= 0 {
        return Err(SndError::out_of_range(name, i64::from(count), "must be greater than zero"));
    }
    Ok(())
}

impl<'a, N: SndfileNative> CommandApi<'a, N> {
    pub fn new(native: &'a N) -> Self {
        Self {
            native,
            marshaller: Marshaller::new(),
        }
    }

    fn invoke(
        &self,
        sndfile: SndFileHandle,
        command: Command,
        data: Option<&mut UnmanagedMemoryHandle>,
        datasize: i32,
    ) -> i32 {
        let status = self.native.command(sndfile, command, data, datasize);
        debug!(?command, code = command.code(), datasize, status, "sf_command");
        status
    }

    fn query_scalar<T: Pod>(&self, sndfile: SndFileHandle, command: Command) -> Result<T> {
        let mut data = self.marshaller.allocate_scalar::<T>()?;
        let datasize = data.native_len()?;

        let status = self.invoke(sndfile, command, Some(&mut data), datasize);
        decode_status(command, status)?;

        self.marshaller.handle_to_scalar(&data)
    }

    fn query_array<T: Pod>(
        &self,
        sndfile: SndFileHandle,
        command: Command,
        count: i32,
    ) -> Result<Vec<T>> {
        let mut data = self.marshaller.allocate::<T>(i64::from(count))?;
        let datasize = data.native_len()?;

        let status = self.invoke(sndfile, command, Some(&mut data), datasize);
        decode_status(command, status)?;

        let values: Vec<T> = self.marshaller.handle_to_array(&data, count as usize)?;
        if values.is_empty() {
            return Err(SndError::unexpected(command, "empty result"));
        }
        Ok(values)
    }

    fn query_string(&self, sndfile: SndFileHandle, command: Command) -> Result<String> {
        let mut data = UnmanagedMemoryHandle::allocate(STRING_CAPACITY)?;
        let datasize = data.native_len()?;

        let status = self.invoke(sndfile, command, Some(&mut data), datasize);
        if status < 0 {
            return Err(SndError::CommandFailed { command, status });
        }

        let text = self.marshaller.handle_to_string(&data);
        if text.is_empty() {
            return Err(SndError::unexpected(command, "empty result"));
        }
        Ok(text)
    }

    fn flag(&self, sndfile: SndFileHandle, command: Command, value: bool) -> Result<bool> {
        ensure_handle(sndfile)?;

        let status = self.invoke(sndfile, command, None, i32::from(value));
        if status < 0 {
            return Err(SndError::CommandFailed { command, status });
        }
        Ok(status != 0)
    }

    fn status_only(&self, sndfile: SndFileHandle, command: Command, value: Option<i64>) -> Result<()> {
        ensure_handle(sndfile)?;

        let status = match value {
            Some(v) => {
                let mut data = self.marshaller.allocate_scalar::<i64>()?;
                self.marshaller.write_array_to_handle(&mut data, &[v])?;
                let datasize = data.native_len()?;
                self.invoke(sndfile, command, Some(&mut data), datasize)
            }
            None => self.invoke(sndfile, command, None, 0),
        };

        if status != 0 {
            return Err(SndError::CommandFailed { command, status });
        }
        Ok(())
    }

    /// Peak sample value recorded in the file's PEAK chunk
    ///
    /// libsndfile answers this query with status 1 when the file has a PEAK
    /// chunk and with status 0, leaving the buffer untouched, when it has
    /// none. Against the real library this call therefore reports
    /// `UnexpectedResult` for files with a PEAK chunk and returns 0.0 for
    /// files without one; use [`calc_norm_signal_max`](Self::calc_norm_signal_max)
    /// to scan the samples instead.
    ///
    /// # Errors
    /// * `InvalidArgument` - If the handle is null
    /// * `CommandFailed` - If the library reports a negative status
    /// * `UnexpectedResult` - If the library reports a positive status
    pub fn signal_max(&self, sndfile: SndFileHandle) -> Result<f64> {
        ensure_handle(sndfile)?;
        self.query_scalar(sndfile, Command::GetSignalMax)
    }

    /// Per-channel peaks recorded in the file's PEAK chunk
    ///
    /// The result has exactly `channels` elements. The same PEAK chunk
    /// caveat as [`signal_max`](Self::signal_max) applies.
    ///
    /// # Errors
    /// * `InvalidArgument` - If the handle is null
    /// * `OutOfRange` - If `channels` is not positive
    /// * `CommandFailed` - If the library reports a negative status
    /// * `UnexpectedResult` - If the library reports a positive status or no data
    pub fn max_all_channels(&self, sndfile: SndFileHandle, channels: i32) -> Result<Vec<f64>> {
        ensure_handle(sndfile)?;
        ensure_count("channels", channels)?;
        self.query_array(sndfile, Command::GetMaxAllChannels, channels)
    }

    /// Scan the stream for its peak value, in the file's integer scale
    pub fn calc_signal_max(&self, sndfile: SndFileHandle) -> Result<f64> {
        ensure_handle(sndfile)?;
        self.query_scalar(sndfile, Command::CalcSignalMax)
    }

    /// Scan the stream for its peak value, normalized to 1.0
    pub fn calc_norm_signal_max(&self, sndfile: SndFileHandle) -> Result<f64> {
        ensure_handle(sndfile)?;
        self.query_scalar(sndfile, Command::CalcNormSignalMax)
    }

    pub fn calc_max_all_channels(&self, sndfile: SndFileHandle, channels: i32) -> Result<Vec<f64>> {
        ensure_handle(sndfile)?;
        ensure_count("channels", channels)?;
        self.query_array(sndfile, Command::CalcMaxAllChannels, channels)
    }

    pub fn calc_norm_max_all_channels(
        &self,
        sndfile: SndFileHandle,
        channels: i32,
    ) -> Result<Vec<f64>> {
        ensure_handle(sndfile)?;
        ensure_count("channels", channels)?;
        self.query_array(sndfile, Command::CalcNormMaxAllChannels, channels)
    }

    /// Current stream description; same layout as the one filled in by open
    pub fn current_info(&self, sndfile: SndFileHandle) -> Result<SfInfo> {
        ensure_handle(sndfile)?;
        let command = Command::GetCurrentSfInfo;

        let mut data = UnmanagedMemoryHandle::allocate(std::mem::size_of::<SfInfo>())?;
        let datasize = data.native_len()?;
        let status = self.invoke(sndfile, command, Some(&mut data), datasize);
        decode_status(command, status)?;

        SfInfo::from_native_bytes(data.as_bytes())
            .ok_or_else(|| SndError::unexpected(command, "short SF_INFO"))
    }

    // Library-wide queries accept the null handle.

    pub fn format_major_count(&self) -> Result<i32> {
        self.query_scalar(SndFileHandle::NULL, Command::GetFormatMajorCount)
    }

    pub fn format_subtype_count(&self) -> Result<i32> {
        self.query_scalar(SndFileHandle::NULL, Command::GetFormatSubtypeCount)
    }

    pub fn simple_format_count(&self) -> Result<i32> {
        self.query_scalar(SndFileHandle::NULL, Command::GetSimpleFormatCount)
    }

    /// Version string as reported through `sf_command`
    pub fn lib_version(&self) -> Result<String> {
        self.query_string(SndFileHandle::NULL, Command::GetLibVersion)
    }

    /// The library's parse log for this stream
    pub fn log_info(&self, sndfile: SndFileHandle) -> Result<String> {
        ensure_handle(sndfile)?;
        self.query_string(sndfile, Command::GetLogInfo)
    }

    pub fn norm_double(&self, sndfile: SndFileHandle) -> Result<bool> {
        self.flag(sndfile, Command::GetNormDouble, false)
    }

    pub fn norm_float(&self, sndfile: SndFileHandle) -> Result<bool> {
        self.flag(sndfile, Command::GetNormFloat, false)
    }

    /// Returns the previous setting
    pub fn set_norm_double(&self, sndfile: SndFileHandle, enabled: bool) -> Result<bool> {
        self.flag(sndfile, Command::SetNormDouble, enabled)
    }

    /// Returns the previous setting
    pub fn set_norm_float(&self, sndfile: SndFileHandle, enabled: bool) -> Result<bool> {
        self.flag(sndfile, Command::SetNormFloat, enabled)
    }

    pub fn set_update_header_auto(&self, sndfile: SndFileHandle, enabled: bool) -> Result<bool> {
        self.flag(sndfile, Command::SetUpdateHeaderAuto, enabled)
    }

    pub fn set_add_peak_chunk(&self, sndfile: SndFileHandle, enabled: bool) -> Result<bool> {
        self.flag(sndfile, Command::SetAddPeakChunk, enabled)
    }

    pub fn set_clipping(&self, sndfile: SndFileHandle, enabled: bool) -> Result<bool> {
        self.flag(sndfile, Command::SetClipping, enabled)
    }

    pub fn clipping(&self, sndfile: SndFileHandle) -> Result<bool> {
        self.flag(sndfile, Command::GetClipping, false)
    }

    /// Rewrite the file header with the current stream state
    pub fn update_header_now(&self, sndfile: SndFileHandle) -> Result<()> {
        self.status_only(sndfile, Command::UpdateHeaderNow, None)
    }

    /// Truncate the stream to `frames` frames
    pub fn file_truncate(&self, sndfile: SndFileHandle, frames: i64) -> Result<()> {
        if frames < 0 {
            return Err(SndError::out_of_range("frames", frames, "frames >= 0"));
        }
        self.status_only(sndfile, Command::FileTruncate, Some(frames))
    }

    /// Byte offset of audio data in a headerless file
    pub fn set_raw_start_offset(&self, sndfile: SndFileHandle, offset: i64) -> Result<()> {
        self.status_only(sndfile, Command::SetRawStartOffset, Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{Format, InMemoryLibrary};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn stereo(lib: &InMemoryLibrary, samples: Vec<f64>) -> SndFileHandle {
        lib.insert_stream(SfInfo::for_write(44100, 2, Format::wav_pcm16()), samples)
    }

    #[test_case(-1 ; "negative status")]
    #[test_case(-42 ; "other negative status")]
    fn test_signal_max_negative_status(status: i32) {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        lib.script_command(Command::GetSignalMax, status, &[0.0f64]);

        let err = CommandApi::new(&lib).signal_max(handle).unwrap_err();
        assert!(matches!(err, SndError::CommandFailed { command: Command::GetSignalMax, .. }));
        assert_eq!(err.native_status(), Some(status));
    }

    #[test]
    fn test_signal_max_positive_status() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        lib.script_command(Command::GetSignalMax, 1, &[0.5f64]);

        let err = CommandApi::new(&lib).signal_max(handle).unwrap_err();
        assert!(matches!(err, SndError::UnexpectedResult { .. }));
    }

    #[test]
    fn test_signal_max_success() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        lib.script_command(Command::GetSignalMax, 0, &[0.875f64]);

        assert_eq!(CommandApi::new(&lib).signal_max(handle).unwrap(), 0.875);
    }

    #[test]
    fn test_signal_max_zero_handle() {
        let lib = InMemoryLibrary::new();
        let err = CommandApi::new(&lib).signal_max(SndFileHandle::NULL).unwrap_err();
        assert!(matches!(err, SndError::InvalidArgument { .. }));
        assert_eq!(lib.native_calls(), 0);
    }

    #[test]
    fn test_max_all_channels_two_channels() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        lib.script_command(Command::GetMaxAllChannels, 0, &[1.0f64, 2.0]);

        let peaks = CommandApi::new(&lib).max_all_channels(handle, 2).unwrap();
        assert_eq!(peaks, vec![1.0, 2.0]);
    }

    #[test_case(-1, true ; "negative status fails")]
    #[test_case(1, false ; "positive status is unexpected")]
    fn test_max_all_channels_status(status: i32, failed: bool) {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        lib.script_command(Command::GetMaxAllChannels, status, &[1.0f64, 2.0]);

        let err = CommandApi::new(&lib).max_all_channels(handle, 2).unwrap_err();
        if failed {
            assert!(matches!(err, SndError::CommandFailed { status: -1, .. }));
        } else {
            assert!(matches!(err, SndError::UnexpectedResult { .. }));
        }
    }

    #[test_case(0)]
    #[test_case(-1)]
    fn test_max_all_channels_non_positive_channels(channels: i32) {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 4]);
        let err = CommandApi::new(&lib).max_all_channels(handle, channels).unwrap_err();
        assert!(matches!(err, SndError::OutOfRange { name: "channels", .. }));
        assert_eq!(lib.native_calls(), 0);
    }

    #[test]
    fn test_calc_norm_max_all_channels_from_stream() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.5, -0.25, -0.75, 0.125]);

        let api = CommandApi::new(&lib);
        assert_eq!(api.calc_norm_max_all_channels(handle, 2).unwrap(), vec![0.75, 0.25]);
        assert_eq!(api.calc_norm_signal_max(handle).unwrap(), 0.75);
        assert_eq!(api.calc_signal_max(handle).unwrap(), 0.75 * 32768.0);
    }

    #[test]
    fn test_max_all_channels_too_small_for_stream() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.5; 4]);
        let err = CommandApi::new(&lib).calc_max_all_channels(handle, 1).unwrap_err();
        assert!(matches!(err, SndError::CommandFailed { status: -1, .. }));
    }

    #[test]
    fn test_library_wide_counts() {
        let lib = InMemoryLibrary::new();
        let api = CommandApi::new(&lib);
        assert_eq!(api.format_major_count().unwrap(), 1);
        assert_eq!(api.format_subtype_count().unwrap(), 5);
        assert_eq!(api.simple_format_count().unwrap(), 5);
    }

    #[test]
    fn test_current_info() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 6]);
        let info = CommandApi::new(&lib).current_info(handle).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.frames, 3);
        assert_eq!(info.samplerate, 44100);
    }

    #[test]
    fn test_strings() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 2]);
        let api = CommandApi::new(&lib);

        assert!(api.lib_version().unwrap().starts_with("libsndfile"));
        assert!(api.log_info(handle).unwrap().contains("Channels : 2"));
    }

    #[test]
    fn test_string_command_failure() {
        let lib = InMemoryLibrary::new();
        lib.script_command::<u8>(Command::GetLibVersion, -1, &[]);
        let err = CommandApi::new(&lib).lib_version().unwrap_err();
        assert!(matches!(err, SndError::CommandFailed { .. }));
    }

    #[test]
    fn test_flags_return_previous_value() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 2]);
        let api = CommandApi::new(&lib);

        assert!(api.norm_double(handle).unwrap());
        assert!(api.set_norm_double(handle, false).unwrap());
        assert!(!api.norm_double(handle).unwrap());
        assert!(api.set_norm_float(handle, true).unwrap());
        assert!(api.set_clipping(handle, true).unwrap());
        assert!(api.clipping(handle).unwrap());
        assert!(api.set_add_peak_chunk(handle, false).unwrap());
        assert!(api.set_update_header_auto(handle, true).unwrap());
    }

    #[test]
    fn test_flag_requires_handle() {
        let lib = InMemoryLibrary::new();
        let err = CommandApi::new(&lib).set_clipping(SndFileHandle::NULL, true).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_file_truncate() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.25; 10]);
        let api = CommandApi::new(&lib);

        api.file_truncate(handle, 2).unwrap();
        assert_eq!(lib.samples(handle).unwrap().len(), 4);

        let err = api.file_truncate(handle, 50).unwrap_err();
        assert!(matches!(err, SndError::CommandFailed { status: 1, .. }));
        assert!(matches!(
            api.file_truncate(handle, -1),
            Err(SndError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_raw_start_offset_and_header() {
        let lib = InMemoryLibrary::new();
        let handle = stereo(&lib, vec![0.0; 2]);
        let api = CommandApi::new(&lib);

        api.set_raw_start_offset(handle, 44).unwrap();
        assert!(api.log_info(handle).unwrap().contains("Start Offset : 44"));
        api.update_header_now(handle).unwrap();
    }

    #[test]
    fn test_status_command_on_unknown_stream() {
        let lib = InMemoryLibrary::new();
        // SAFETY: the in-memory library treats handles as keys
        let handle = unsafe { SndFileHandle::from_token(77) };
        let err = CommandApi::new(&lib).update_header_now(handle).unwrap_err();
        assert_eq!(err.native_status(), Some(-1));
    }
}
