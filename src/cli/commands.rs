//! CLI Command Implementations
//!
//! Each command opens what it needs through `SndfileApi`, writes its report
//! to `out` and closes the stream before returning.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::api::SndfileApi;
use crate::error::Result;
use crate::native::{OpenMode, SfInfo, SndfileNative};
use crate::sample::{Sample, SampleKind};

#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    info: SfInfo,
    duration_secs: Option<f64>,
}

/// Print the stream description as JSON.
pub fn info<N: SndfileNative>(api: &SndfileApi<N>, path: &Path, out: &mut impl Write) -> Result<()> {
    info!("Reading stream info: {}", path.display());

    let stream = api.open_stream(path, OpenMode::Read, SfInfo::default())?;
    let report = InfoReport {
        path,
        info: *stream.info(),
        duration_secs: stream.info().duration_secs(),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;

    stream.close()
}

/// Print normalized per-channel peaks.
pub fn peak<N: SndfileNative>(api: &SndfileApi<N>, path: &Path, out: &mut impl Write) -> Result<()> {
    info!("Scanning peaks: {}", path.display());

    let stream = api.open_stream(path, OpenMode::Read, SfInfo::default())?;
    let peaks = api
        .commands()
        .calc_norm_max_all_channels(stream.handle(), stream.info().channels)?;

    for (channel, peak) in peaks.iter().enumerate() {
        let dbfs = if *peak > 0.0 {
            format!("{:.2} dBFS", 20.0 * peak.log10())
        } else {
            "-inf dBFS".to_string()
        };
        writeln!(out, "channel {}: {:.6} ({})", channel, peak, dbfs)?;
    }

    stream.close()
}

/// Print the library version.
pub fn version<N: SndfileNative>(api: &SndfileApi<N>, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", api.version())?;
    let commands = api.commands();
    writeln!(
        out,
        "formats: {} major, {} subtypes",
        commands.format_major_count()?,
        commands.format_subtype_count()?
    )?;
    Ok(())
}

/// Print the first `items` items of a file as `kind`.
pub fn dump<N: SndfileNative>(
    api: &SndfileApi<N>,
    path: &Path,
    kind: SampleKind,
    items: i64,
    out: &mut impl Write,
) -> Result<()> {
    info!("Dumping {} {} items from {}", items, kind, path.display());

    match kind {
        SampleKind::Int16 => dump_items::<N, i16>(api, path, items, out),
        SampleKind::Int32 => dump_items::<N, i32>(api, path, items, out),
        SampleKind::Float32 => dump_items::<N, f32>(api, path, items, out),
        SampleKind::Float64 => dump_items::<N, f64>(api, path, items, out),
    }
}

fn dump_items<N: SndfileNative, T: Sample>(
    api: &SndfileApi<N>,
    path: &Path,
    items: i64,
    out: &mut impl Write,
) -> Result<()> {
    let stream = api.open_stream(path, OpenMode::Read, SfInfo::default())?;
    let (buffer, read) = stream.read_items::<T>(items)?;

    for (index, value) in buffer.iter().take(read as usize).enumerate() {
        writeln!(out, "{:>8} {:?}", index, value)?;
    }
    writeln!(out, "read {} of {} items", read, items)?;

    stream.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::InMemoryLibrary;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("fixture.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for sample in [16384i16, -8192, -16384, 4096] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn run(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_info_prints_json() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let api = SndfileApi::new(InMemoryLibrary::new());

        let text = run(|out| info(&api, &path, out));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["channels"], 2);
        assert_eq!(json["frames"], 2);
        assert_eq!(json["samplerate"], 8000);
    }

    #[test]
    fn test_peak_per_channel() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let api = SndfileApi::new(InMemoryLibrary::new());

        let text = run(|out| peak(&api, &path, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("channel 0: 0.500000"));
        assert!(lines[1].starts_with("channel 1: 0.250000"));
    }

    #[test]
    fn test_dump_shorts() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let api = SndfileApi::new(InMemoryLibrary::new());

        let text = run(|out| dump(&api, &path, SampleKind::Int16, 10, out));
        assert!(text.contains("16384"));
        assert!(text.ends_with("read 4 of 10 items\n"));
    }

    #[test]
    fn test_version() {
        let api = SndfileApi::new(InMemoryLibrary::new());
        let text = run(|out| version(&api, out));
        assert!(text.starts_with("libsndfile"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let api = SndfileApi::new(InMemoryLibrary::new());
        let mut out = Vec::new();
        let err = info(&api, Path::new("/nonexistent/missing.wav"), &mut out).unwrap_err();
        assert_eq!(err.error_code(), "NATIVE_ERROR");
    }
}
