//! C ABI types shared by every native implementation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque `SNDFILE` struct
#[repr(C)]
pub struct SNDFILE {
    _private: [u8; 0],
}

/// Handle to an open libsndfile stream
///
/// The null handle is representable so callers can be rejected before a
/// native call is made. The handle is neither `Send` nor `Sync`: one stream,
/// one thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SndFileHandle(*mut SNDFILE);

impl SndFileHandle {
    pub const NULL: SndFileHandle = SndFileHandle(std::ptr::null_mut());

    /// # Safety
    ///
    /// `ptr` must be null or a stream returned by the native library that
    /// has not been closed.
    pub unsafe fn from_raw(ptr: *mut SNDFILE) -> Self {
        SndFileHandle(ptr)
    }

    /// Build a handle from an integer token, as the in-memory library does
    ///
    /// # Safety
    ///
    /// A non-zero token must only reach an implementation that treats
    /// handles as opaque keys, such as [`InMemoryLibrary`](crate::native::InMemoryLibrary).
    pub unsafe fn from_token(token: usize) -> Self {
        SndFileHandle(token as *mut SNDFILE)
    }

    pub fn as_ptr(self) -> *mut SNDFILE {
        self.0
    }

    pub fn token(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for SndFileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SndFileHandle({:#x})", self.token())
    }
}

/// `SF_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfInfo {
    pub frames: i64,
    pub samplerate: i32,
    pub channels: i32,
    pub format: i32,
    pub sections: i32,
    pub seekable: i32,
}

impl SfInfo {
    /// Info describing a stream to be written
    pub fn for_write(samplerate: i32, channels: i32, format: Format) -> Self {
        SfInfo {
            samplerate,
            channels,
            format: format.bits(),
            ..SfInfo::default()
        }
    }

    /// Decode an `SF_INFO` laid out in native byte order
    pub fn from_native_bytes(bytes: &[u8]) -> Option<Self> {
        let i32_at = |offset: usize| {
            bytes
                .get(offset..offset + 4)
                .map(bytemuck::pod_read_unaligned::<i32>)
        };
        Some(SfInfo {
            frames: bytemuck::pod_read_unaligned(bytes.get(0..8)?),
            samplerate: i32_at(8)?,
            channels: i32_at(12)?,
            format: i32_at(16)?,
            sections: i32_at(20)?,
            seekable: i32_at(24)?,
        })
    }

    pub fn format(&self) -> Format {
        Format::from_bits(self.format)
    }

    /// Duration in seconds, if the sample rate is known
    pub fn duration_secs(&self) -> Option<f64> {
        (self.samplerate > 0).then(|| self.frames as f64 / self.samplerate as f64)
    }
}

/// Stream open mode (`SFM_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpenMode {
    Read = 0x10,
    Write = 0x20,
    ReadWrite = 0x30,
}

impl OpenMode {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn can_read(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::ReadWrite)
    }
}

/// Seek origin (`SEEK_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    Set = 0,
    Current = 1,
    End = 2,
}

impl Whence {
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Error codes returned by `sf_error` and `sf_close`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorCode {
    NoError,
    UnrecognisedFormat,
    System,
    MalformedFile,
    UnsupportedEncoding,
    Other(i32),
}

impl NativeErrorCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => NativeErrorCode::NoError,
            1 => NativeErrorCode::UnrecognisedFormat,
            2 => NativeErrorCode::System,
            3 => NativeErrorCode::MalformedFile,
            4 => NativeErrorCode::UnsupportedEncoding,
            other => NativeErrorCode::Other(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            NativeErrorCode::NoError => 0,
            NativeErrorCode::UnrecognisedFormat => 1,
            NativeErrorCode::System => 2,
            NativeErrorCode::MalformedFile => 3,
            NativeErrorCode::UnsupportedEncoding => 4,
            NativeErrorCode::Other(code) => code,
        }
    }

    pub fn is_error(self) -> bool {
        self != NativeErrorCode::NoError
    }

    /// Fallback text when the library itself cannot be asked
    pub fn description(self) -> &'static str {
        match self {
            NativeErrorCode::NoError => "No Error.",
            NativeErrorCode::UnrecognisedFormat => "Format not recognised.",
            NativeErrorCode::System => "System error.",
            NativeErrorCode::MalformedFile => "Supported file format but file is malformed.",
            NativeErrorCode::UnsupportedEncoding => "Supported file format but unsupported encoding.",
            NativeErrorCode::Other(_) => "Unknown error.",
        }
    }
}

/// Container format (`SF_FORMAT_*` major types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MajorFormat {
    Wav,
    Aiff,
    Au,
    Raw,
    W64,
    Flac,
    Ogg,
    Other(i32),
}

impl MajorFormat {
    pub fn bits(self) -> i32 {
        match self {
            MajorFormat::Wav => 0x01_0000,
            MajorFormat::Aiff => 0x02_0000,
            MajorFormat::Au => 0x03_0000,
            MajorFormat::Raw => 0x04_0000,
            MajorFormat::W64 => 0x0B_0000,
            MajorFormat::Flac => 0x17_0000,
            MajorFormat::Ogg => 0x20_0000,
            MajorFormat::Other(bits) => bits,
        }
    }

    pub fn from_bits(bits: i32) -> Self {
        match bits & Format::TYPEMASK {
            0x01_0000 => MajorFormat::Wav,
            0x02_0000 => MajorFormat::Aiff,
            0x03_0000 => MajorFormat::Au,
            0x04_0000 => MajorFormat::Raw,
            0x0B_0000 => MajorFormat::W64,
            0x17_0000 => MajorFormat::Flac,
            0x20_0000 => MajorFormat::Ogg,
            other => MajorFormat::Other(other),
        }
    }
}

/// Sample encoding (`SF_FORMAT_*` subtypes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubFormat {
    PcmS8,
    Pcm16,
    Pcm24,
    Pcm32,
    PcmU8,
    Float,
    Double,
    Vorbis,
    Other(i32),
}

impl SubFormat {
    pub fn bits(self) -> i32 {
        match self {
            SubFormat::PcmS8 => 0x0001,
            SubFormat::Pcm16 => 0x0002,
            SubFormat::Pcm24 => 0x0003,
            SubFormat::Pcm32 => 0x0004,
            SubFormat::PcmU8 => 0x0005,
            SubFormat::Float => 0x0006,
            SubFormat::Double => 0x0007,
            SubFormat::Vorbis => 0x0060,
            SubFormat::Other(bits) => bits,
        }
    }

    pub fn from_bits(bits: i32) -> Self {
        match bits & Format::SUBMASK {
            0x0001 => SubFormat::PcmS8,
            0x0002 => SubFormat::Pcm16,
            0x0003 => SubFormat::Pcm24,
            0x0004 => SubFormat::Pcm32,
            0x0005 => SubFormat::PcmU8,
            0x0006 => SubFormat::Float,
            0x0007 => SubFormat::Double,
            0x0060 => SubFormat::Vorbis,
            other => SubFormat::Other(other),
        }
    }

    /// Bits per sample for PCM and float encodings
    pub fn bits_per_sample(self) -> Option<u16> {
        match self {
            SubFormat::PcmS8 | SubFormat::PcmU8 => Some(8),
            SubFormat::Pcm16 => Some(16),
            SubFormat::Pcm24 => Some(24),
            SubFormat::Pcm32 | SubFormat::Float => Some(32),
            SubFormat::Double => Some(64),
            _ => None,
        }
    }
}

/// Byte order (`SF_ENDIAN_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    File,
    Little,
    Big,
    Cpu,
}

impl Endian {
    pub fn bits(self) -> i32 {
        match self {
            Endian::File => 0x0000_0000,
            Endian::Little => 0x1000_0000,
            Endian::Big => 0x2000_0000,
            Endian::Cpu => 0x3000_0000,
        }
    }

    pub fn from_bits(bits: i32) -> Self {
        match bits & Format::ENDMASK {
            0x1000_0000 => Endian::Little,
            0x2000_0000 => Endian::Big,
            0x3000_0000 => Endian::Cpu,
            _ => Endian::File,
        }
    }
}

/// Packed `format` field of [`SfInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub major: MajorFormat,
    pub subtype: SubFormat,
    pub endian: Endian,
}

impl Format {
    pub const SUBMASK: i32 = 0x0000_FFFF;
    pub const TYPEMASK: i32 = 0x0FFF_0000;
    pub const ENDMASK: i32 = 0x3000_0000;

    pub fn new(major: MajorFormat, subtype: SubFormat) -> Self {
        Format {
            major,
            subtype,
            endian: Endian::File,
        }
    }

    pub fn wav_pcm16() -> Self {
        Format::new(MajorFormat::Wav, SubFormat::Pcm16)
    }

    pub fn wav_float() -> Self {
        Format::new(MajorFormat::Wav, SubFormat::Float)
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn bits(&self) -> i32 {
        self.major.bits() | self.subtype.bits() | self.endian.bits()
    }

    pub fn from_bits(bits: i32) -> Self {
        Format {
            major: MajorFormat::from_bits(bits),
            subtype: SubFormat::from_bits(bits),
            endian: Endian::from_bits(bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sf_info_layout() {
        // sf_count_t followed by five C ints
        assert_eq!(std::mem::size_of::<SfInfo>(), 32);
        assert_eq!(std::mem::align_of::<SfInfo>(), 8);
    }

    #[test]
    fn test_format_bits_round_trip() {
        let format = Format::new(MajorFormat::Wav, SubFormat::Pcm16);
        assert_eq!(format.bits(), 0x01_0002);
        assert_eq!(Format::from_bits(0x01_0002), format);

        let flac = Format::new(MajorFormat::Flac, SubFormat::Pcm24).with_endian(Endian::Little);
        assert_eq!(Format::from_bits(flac.bits()), flac);
    }

    #[test]
    fn test_unknown_format_bits_are_preserved() {
        let format = Format::from_bits(0x0C_0099);
        assert_eq!(format.major, MajorFormat::Other(0x0C_0000));
        assert_eq!(format.subtype, SubFormat::Other(0x0099));
        assert_eq!(format.bits(), 0x0C_0099);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(NativeErrorCode::from_raw(0), NativeErrorCode::NoError);
        assert_eq!(NativeErrorCode::from_raw(3), NativeErrorCode::MalformedFile);
        assert_eq!(NativeErrorCode::from_raw(42).as_raw(), 42);
        assert!(!NativeErrorCode::NoError.is_error());
    }

    #[test]
    fn test_null_handle() {
        assert!(SndFileHandle::NULL.is_null());
        // SAFETY: tokens are only inspected, never passed to a library
        let (one, seven) = unsafe { (SndFileHandle::from_token(1), SndFileHandle::from_token(7)) };
        assert!(!one.is_null());
        assert_eq!(seven.token(), 7);
    }

    #[test]
    fn test_duration() {
        let info = SfInfo {
            frames: 48000,
            samplerate: 48000,
            channels: 2,
            ..SfInfo::default()
        };
        assert_eq!(info.duration_secs(), Some(1.0));
        assert_eq!(SfInfo::default().duration_secs(), None);
    }
}
