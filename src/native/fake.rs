//! In-memory implementation of the native API
//!
//! `InMemoryLibrary` behaves like libsndfile for WAV streams without needing
//! the shared library: files are decoded with `hound` on open and encoded on
//! close, samples live in memory as normalized `f64`. Command results can be
//! scripted per command so error paths can be driven from tests, and every
//! native call is counted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CStr;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::types::{
    Format, MajorFormat, NativeErrorCode, OpenMode, SfInfo, SndFileHandle, SubFormat, Whence,
};
use super::SndfileNative;
use crate::command::Command;
use crate::memory::UnmanagedMemoryHandle;
use crate::sample::{Items, ItemsMut, Sample, SampleKind};

const VERSION: &str = "libsndfile-1.2.2-inmemory";

/// Error code reported for handles the library does not know
const BAD_HANDLE: i32 = 10;

/// Error code reported for a seek outside the stream
const BAD_SEEK: i32 = 11;

#[derive(Debug, Clone)]
struct ScriptedCommand {
    status: i32,
    payload: Vec<u8>,
}

#[derive(Debug)]
struct Stream {
    path: Option<PathBuf>,
    mode: OpenMode,
    info: SfInfo,
    /// Interleaved, normalized to [-1.0, 1.0]
    samples: Vec<f64>,
    /// Current position in items
    position: usize,
    norm_double: bool,
    norm_float: bool,
    update_header_auto: bool,
    add_peak_chunk: bool,
    clipping: bool,
    raw_start_offset: i64,
    error: i32,
    log: String,
}

impl Stream {
    fn new(path: Option<PathBuf>, mode: OpenMode, info: SfInfo, samples: Vec<f64>) -> Self {
        Stream {
            path,
            mode,
            info,
            samples,
            position: 0,
            norm_double: true,
            norm_float: true,
            update_header_auto: false,
            add_peak_chunk: true,
            clipping: false,
            raw_start_offset: 0,
            error: 0,
            log: String::new(),
        }
    }

    fn channels(&self) -> usize {
        self.info.channels.max(1) as usize
    }

    fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    /// Integer full scale of the stream's encoding
    fn full_scale(&self) -> f64 {
        match self.info.format().subtype {
            SubFormat::PcmS8 | SubFormat::PcmU8 => 128.0,
            SubFormat::Pcm24 => 8_388_608.0,
            SubFormat::Pcm32 => 2_147_483_648.0,
            _ => 32_768.0,
        }
    }

    /// Scale applied when converting to `kind`
    fn scale_for(&self, kind: SampleKind) -> f64 {
        match kind {
            SampleKind::Int16 => 32_768.0,
            SampleKind::Int32 => 2_147_483_648.0,
            SampleKind::Float32 if self.norm_float => 1.0,
            SampleKind::Float64 if self.norm_double => 1.0,
            _ => self.full_scale(),
        }
    }

    fn read_into<T: Sample>(&mut self, out: &mut [T], items: usize) -> usize {
        let start = self.position;
        let available = self.samples.len().saturating_sub(start);
        let count = items.min(out.len()).min(available);
        let scale = self.scale_for(T::KIND);

        for (dst, &src) in out.iter_mut().zip(&self.samples[start..start + count]) {
            *dst = to_sample(src * scale, T::KIND);
        }

        self.position = start + count;
        count
    }

    fn write_from<T: Sample>(&mut self, input: &[T], items: usize) -> usize {
        let count = items.min(input.len());
        let scale = self.scale_for(T::KIND);
        let start = self.position;
        let end = start + count;
        if self.samples.len() < end {
            self.samples.resize(end, 0.0);
        }

        for (dst, src) in self.samples[start..end].iter_mut().zip(input) {
            let value: f64 = num_traits::NumCast::from(*src).unwrap_or(0.0);
            *dst = value / scale;
        }

        self.position = end;
        self.info.frames = self.frames() as i64;
        count
    }

    fn channel_peaks(&self) -> Vec<f64> {
        let channels = self.channels();
        let mut peaks = vec![0.0f64; channels];
        for (i, sample) in self.samples.iter().enumerate() {
            let peak = &mut peaks[i % channels];
            *peak = peak.max(sample.abs());
        }
        peaks
    }
}

fn to_sample<T: Sample>(value: f64, kind: SampleKind) -> T {
    let value = match kind {
        SampleKind::Int16 => value.round().clamp(i16::MIN as f64, i16::MAX as f64),
        SampleKind::Int32 => value.round().clamp(i32::MIN as f64, i32::MAX as f64),
        SampleKind::Float32 | SampleKind::Float64 => value,
    };
    num_traits::NumCast::from(value).unwrap_or_default()
}

#[derive(Debug, Default)]
struct State {
    next_token: usize,
    streams: HashMap<usize, Stream>,
    scripted: HashMap<Command, ScriptedCommand>,
    native_calls: usize,
    last_open_error: i32,
}

impl State {
    fn insert(&mut self, stream: Stream) -> SndFileHandle {
        self.next_token += 1;
        let token = self.next_token;
        self.streams.insert(token, stream);
        // SAFETY: tokens only ever come back to this library
        unsafe { SndFileHandle::from_token(token) }
    }
}

/// WAV-backed stand-in for libsndfile
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: RefCell<State>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-open stream holding `samples` (interleaved, normalized)
    pub fn insert_stream(&self, info: SfInfo, samples: Vec<f64>) -> SndFileHandle {
        let mut info = info;
        info.channels = info.channels.max(1);
        info.frames = (samples.len() / info.channels as usize) as i64;
        info.sections = 1;
        info.seekable = 1;
        self.state
            .borrow_mut()
            .insert(Stream::new(None, OpenMode::ReadWrite, info, samples))
    }

    /// Make every later `command` call return `status`, copying `payload`
    /// into the caller's buffer first
    pub fn script_command<T: bytemuck::Pod>(&self, command: Command, status: i32, payload: &[T]) {
        self.state.borrow_mut().scripted.insert(
            command,
            ScriptedCommand {
                status,
                payload: bytemuck::cast_slice(payload).to_vec(),
            },
        );
    }

    pub fn clear_scripts(&self) {
        self.state.borrow_mut().scripted.clear();
    }

    /// Number of native API calls made so far
    pub fn native_calls(&self) -> usize {
        self.state.borrow().native_calls
    }

    /// Current samples of an open stream, normalized
    pub fn samples(&self, sndfile: SndFileHandle) -> Option<Vec<f64>> {
        self.state
            .borrow()
            .streams
            .get(&sndfile.token())
            .map(|s| s.samples.clone())
    }

    pub fn is_open(&self, sndfile: SndFileHandle) -> bool {
        self.state.borrow().streams.contains_key(&sndfile.token())
    }

    fn count_call(&self) {
        self.state.borrow_mut().native_calls += 1;
    }

    fn with_stream<R>(
        &self,
        sndfile: SndFileHandle,
        missing: R,
        f: impl FnOnce(&mut Stream) -> R,
    ) -> R {
        self.count_call();
        let mut state = self.state.borrow_mut();
        match state.streams.get_mut(&sndfile.token()) {
            Some(stream) => f(stream),
            None => missing,
        }
    }
}

fn load_wav(path: &Path) -> std::result::Result<(SfInfo, Vec<f64>), hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let subtype = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => SubFormat::Float,
        (SampleFormat::Int, 8) => SubFormat::PcmU8,
        (SampleFormat::Int, 16) => SubFormat::Pcm16,
        (SampleFormat::Int, 24) => SubFormat::Pcm24,
        (SampleFormat::Int, _) => SubFormat::Pcm32,
    };

    let channels = i32::from(spec.channels.max(1));
    let info = SfInfo {
        frames: (samples.len() / channels as usize) as i64,
        samplerate: spec.sample_rate as i32,
        channels,
        format: Format::new(MajorFormat::Wav, subtype).bits(),
        sections: 1,
        seekable: 1,
    };
    Ok((info, samples))
}

fn save_wav(path: &Path, info: &SfInfo, samples: &[f64]) -> std::result::Result<(), hound::Error> {
    let subtype = info.format().subtype;
    let float = matches!(subtype, SubFormat::Float | SubFormat::Double);
    let spec = WavSpec {
        channels: info.channels.max(1) as u16,
        sample_rate: info.samplerate.max(1) as u32,
        bits_per_sample: if float {
            32
        } else {
            subtype.bits_per_sample().unwrap_or(16)
        },
        sample_format: if float {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    if float {
        for &sample in samples {
            writer.write_sample(sample as f32)?;
        }
    } else {
        let max = ((1u64 << (spec.bits_per_sample - 1)) - 1) as f64;
        let min = -max - 1.0;
        for &sample in samples {
            let scaled = (sample * (max + 1.0)).round().clamp(min, max) as i32;
            writer.write_sample(scaled)?;
        }
    }
    writer.finalize()
}

fn is_writable_wav(info: &SfInfo) -> bool {
    let format = info.format();
    format.major == MajorFormat::Wav
        && matches!(
            format.subtype,
            SubFormat::PcmU8 | SubFormat::Pcm16 | SubFormat::Pcm24 | SubFormat::Pcm32 | SubFormat::Float
        )
        && info.channels > 0
        && info.samplerate > 0
}

fn write_scalar<T: bytemuck::Pod>(data: Option<&mut UnmanagedMemoryHandle>, value: T) -> bool {
    write_bytes(data, bytemuck::bytes_of(&value))
}

fn write_bytes(data: Option<&mut UnmanagedMemoryHandle>, bytes: &[u8]) -> bool {
    match data {
        Some(handle) if handle.len() >= bytes.len() => {
            handle.as_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
            true
        }
        _ => false,
    }
}

impl SndfileNative for InMemoryLibrary {
    fn open(&self, path: &CStr, mode: OpenMode, info: &mut SfInfo) -> SndFileHandle {
        self.count_call();
        let mut state = self.state.borrow_mut();
        let path = match path.to_str() {
            Ok(p) => PathBuf::from(p),
            Err(_) => {
                state.last_open_error = NativeErrorCode::System.as_raw();
                return SndFileHandle::NULL;
            }
        };

        let loaded = match mode {
            OpenMode::Read => Some(load_wav(&path)),
            OpenMode::ReadWrite if path.exists() => Some(load_wav(&path)),
            _ => None,
        };

        let stream = match loaded {
            Some(Ok((file_info, samples))) => {
                *info = file_info;
                Stream::new(Some(path), mode, file_info, samples)
            }
            Some(Err(hound::Error::IoError(_))) => {
                state.last_open_error = NativeErrorCode::System.as_raw();
                return SndFileHandle::NULL;
            }
            Some(Err(_)) => {
                state.last_open_error = NativeErrorCode::UnrecognisedFormat.as_raw();
                return SndFileHandle::NULL;
            }
            None => {
                if !is_writable_wav(info) {
                    state.last_open_error = NativeErrorCode::UnsupportedEncoding.as_raw();
                    return SndFileHandle::NULL;
                }
                info.frames = 0;
                info.sections = 1;
                info.seekable = 1;
                Stream::new(Some(path), mode, *info, Vec::new())
            }
        };

        state.last_open_error = 0;
        state.insert(stream)
    }

    fn open_fd(
        &self,
        _fd: i32,
        _mode: OpenMode,
        _info: &mut SfInfo,
        _close_desc: bool,
    ) -> SndFileHandle {
        self.count_call();
        self.state.borrow_mut().last_open_error = NativeErrorCode::System.as_raw();
        SndFileHandle::NULL
    }

    fn close(&self, sndfile: SndFileHandle) -> i32 {
        self.count_call();
        let stream = self.state.borrow_mut().streams.remove(&sndfile.token());
        let Some(stream) = stream else {
            return BAD_HANDLE;
        };

        match (&stream.path, stream.mode.can_write()) {
            (Some(path), true) => match save_wav(path, &stream.info, &stream.samples) {
                Ok(()) => 0,
                Err(_) => NativeErrorCode::System.as_raw(),
            },
            _ => 0,
        }
    }

    fn format_check(&self, info: &SfInfo) -> i32 {
        self.count_call();
        i32::from(is_writable_wav(info))
    }

    fn seek(&self, sndfile: SndFileHandle, frames: i64, whence: Whence) -> i64 {
        self.with_stream(sndfile, -1, |stream| {
            let base = match whence {
                Whence::Set => 0,
                Whence::Current => (stream.position / stream.channels()) as i64,
                Whence::End => stream.frames() as i64,
            };
            let target = base + frames;
            if target < 0 || target > stream.frames() as i64 {
                stream.error = BAD_SEEK;
                return -1;
            }
            stream.position = target as usize * stream.channels();
            target
        })
    }

    fn write_sync(&self, sndfile: SndFileHandle) {
        self.with_stream(sndfile, (), |_| ());
    }

    fn read_items(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, items: i64) -> i64 {
        let items = items.max(0) as usize;
        self.with_stream(sndfile, 0, |stream| {
            if !stream.mode.can_read() {
                return 0;
            }
            let read = match buffer {
                ItemsMut::Int16(b) => stream.read_into(b, items),
                ItemsMut::Int32(b) => stream.read_into(b, items),
                ItemsMut::Float32(b) => stream.read_into(b, items),
                ItemsMut::Float64(b) => stream.read_into(b, items),
            };
            read as i64
        })
    }

    fn write_items(&self, sndfile: SndFileHandle, buffer: Items<'_>, items: i64) -> i64 {
        let items = items.max(0) as usize;
        self.with_stream(sndfile, 0, |stream| {
            if !stream.mode.can_write() {
                return 0;
            }
            let written = match buffer {
                Items::Int16(b) => stream.write_from(b, items),
                Items::Int32(b) => stream.write_from(b, items),
                Items::Float32(b) => stream.write_from(b, items),
                Items::Float64(b) => stream.write_from(b, items),
            };
            written as i64
        })
    }

    fn read_frames(&self, sndfile: SndFileHandle, buffer: ItemsMut<'_>, frames: i64) -> i64 {
        let frames = frames.max(0) as usize;
        self.with_stream(sndfile, 0, |stream| {
            if !stream.mode.can_read() {
                return 0;
            }
            let channels = stream.channels();
            let items = frames.saturating_mul(channels);
            let read = match buffer {
                ItemsMut::Int16(b) => stream.read_into(b, items),
                ItemsMut::Int32(b) => stream.read_into(b, items),
                ItemsMut::Float32(b) => stream.read_into(b, items),
                ItemsMut::Float64(b) => stream.read_into(b, items),
            };
            (read / channels) as i64
        })
    }

    fn write_frames(&self, sndfile: SndFileHandle, buffer: Items<'_>, frames: i64) -> i64 {
        let frames = frames.max(0) as usize;
        self.with_stream(sndfile, 0, |stream| {
            if !stream.mode.can_write() {
                return 0;
            }
            let channels = stream.channels();
            // Whole frames only
            let fit = buffer.len() / channels;
            let items = frames.min(fit) * channels;
            let written = match buffer {
                Items::Int16(b) => stream.write_from(b, items),
                Items::Int32(b) => stream.write_from(b, items),
                Items::Float32(b) => stream.write_from(b, items),
                Items::Float64(b) => stream.write_from(b, items),
            };
            (written / channels) as i64
        })
    }

    fn command(
        &self,
        sndfile: SndFileHandle,
        command: Command,
        data: Option<&mut UnmanagedMemoryHandle>,
        datasize: i32,
    ) -> i32 {
        self.count_call();
        let mut state = self.state.borrow_mut();

        if let Some(script) = state.scripted.get(&command) {
            write_bytes(data, &script.payload);
            return script.status;
        }

        // Library-wide queries, no stream required
        match command {
            Command::GetLibVersion => {
                let mut bytes = VERSION.as_bytes().to_vec();
                bytes.push(0);
                return if write_bytes(data, &bytes) {
                    VERSION.len() as i32
                } else {
                    0
                };
            }
            Command::GetSimpleFormatCount | Command::GetFormatSubtypeCount => {
                return if write_scalar(data, 5i32) { 0 } else { -1 };
            }
            Command::GetFormatMajorCount => {
                return if write_scalar(data, 1i32) { 0 } else { -1 };
            }
            _ => {}
        }

        let Some(stream) = state.streams.get_mut(&sndfile.token()) else {
            return -1;
        };

        match command {
            Command::GetLogInfo => {
                stream.log = format!(
                    "File : {}\nChannels : {}\nSample Rate : {}\nFrames : {}\nStart Offset : {}\n",
                    stream
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<memory>".to_string()),
                    stream.info.channels,
                    stream.info.samplerate,
                    stream.info.frames,
                    stream.raw_start_offset
                );
                let mut bytes = stream.log.as_bytes().to_vec();
                bytes.push(0);
                let len = stream.log.len() as i32;
                if write_bytes(data, &bytes) {
                    len
                } else {
                    0
                }
            }
            Command::GetCurrentSfInfo => {
                let info = stream.info;
                let bytes = [
                    &info.frames.to_ne_bytes()[..],
                    &info.samplerate.to_ne_bytes(),
                    &info.channels.to_ne_bytes(),
                    &info.format.to_ne_bytes(),
                    &info.sections.to_ne_bytes(),
                    &info.seekable.to_ne_bytes(),
                ]
                .concat();
                if write_bytes(data, &bytes) {
                    0
                } else {
                    -1
                }
            }
            Command::GetNormDouble => i32::from(stream.norm_double),
            Command::GetNormFloat => i32::from(stream.norm_float),
            Command::SetNormDouble => {
                let previous = stream.norm_double;
                stream.norm_double = datasize != 0;
                i32::from(previous)
            }
            Command::SetNormFloat => {
                let previous = stream.norm_float;
                stream.norm_float = datasize != 0;
                i32::from(previous)
            }
            Command::SetUpdateHeaderAuto => {
                stream.update_header_auto = datasize != 0;
                i32::from(stream.update_header_auto)
            }
            Command::SetAddPeakChunk => {
                let previous = stream.add_peak_chunk;
                stream.add_peak_chunk = datasize != 0;
                i32::from(previous)
            }
            Command::SetClipping => {
                stream.clipping = datasize != 0;
                i32::from(stream.clipping)
            }
            Command::GetClipping => i32::from(stream.clipping),
            Command::UpdateHeaderNow => 0,
            Command::CalcSignalMax | Command::CalcNormSignalMax | Command::GetSignalMax => {
                let peak = stream.channel_peaks().into_iter().fold(0.0f64, f64::max);
                let scale = if command == Command::CalcSignalMax {
                    stream.full_scale()
                } else {
                    1.0
                };
                if write_scalar(data, peak * scale) {
                    0
                } else {
                    -1
                }
            }
            Command::CalcMaxAllChannels
            | Command::CalcNormMaxAllChannels
            | Command::GetMaxAllChannels => {
                let scale = if command == Command::CalcMaxAllChannels {
                    stream.full_scale()
                } else {
                    1.0
                };
                let peaks: Vec<f64> = stream.channel_peaks().iter().map(|p| p * scale).collect();
                let needed = (peaks.len() * std::mem::size_of::<f64>()) as i32;
                if datasize < needed {
                    return -1;
                }
                if write_bytes(data, bytemuck::cast_slice(&peaks)) {
                    0
                } else {
                    -1
                }
            }
            Command::FileTruncate => {
                let Some(handle) = data else {
                    return 1;
                };
                if datasize as usize != std::mem::size_of::<i64>() || handle.len() < 8 {
                    return 1;
                }
                let frames: i64 = bytemuck::pod_read_unaligned(&handle.as_bytes()[..8]);
                if frames < 0 || frames as usize > stream.frames() {
                    return 1;
                }
                stream.samples.truncate(frames as usize * stream.channels());
                stream.info.frames = frames;
                stream.position = stream.position.min(stream.samples.len());
                0
            }
            Command::SetRawStartOffset => {
                let Some(handle) = data else {
                    return 1;
                };
                if handle.len() < 8 {
                    return 1;
                }
                stream.raw_start_offset = bytemuck::pod_read_unaligned(&handle.as_bytes()[..8]);
                0
            }
            _ => -1,
        }
    }

    fn error(&self, sndfile: SndFileHandle) -> i32 {
        if sndfile.is_null() {
            self.count_call();
            return self.state.borrow().last_open_error;
        }
        self.with_stream(sndfile, BAD_HANDLE, |stream| stream.error)
    }

    fn error_string(&self, sndfile: SndFileHandle) -> String {
        let code = self.error(sndfile);
        NativeErrorCode::from_raw(code).description().to_string()
    }

    fn error_number(&self, errnum: i32) -> String {
        self.count_call();
        NativeErrorCode::from_raw(errnum).description().to_string()
    }

    fn version_string(&self) -> String {
        self.count_call();
        VERSION.to_string()
    }
}
