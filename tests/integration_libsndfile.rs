//! Integration tests against the system libsndfile
//!
//! Each test returns early when the shared library cannot be loaded, so the
//! suite passes on machines without libsndfile installed.

use approx::assert_relative_eq;
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use nsndfile::native::Format;
use nsndfile::{NativeLibrary, OpenMode, SfInfo, SndError, SndFileHandle, SndfileApi, SndfileConfig};

fn load_api() -> Option<SndfileApi<NativeLibrary>> {
    match SndfileApi::load(&SndfileConfig::from_env()) {
        Ok(api) => Some(api),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

fn write_fixture(dir: &TempDir, frames: usize) -> std::path::PathBuf {
    let path = dir.path().join("fixture.wav");
    let spec = WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample((i % 100) as i16 * 10).unwrap();
        writer.write_sample(-((i % 100) as i16) * 20).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_version_string() {
    let Some(api) = load_api() else { return };
    assert!(api.version().starts_with("libsndfile"));
    assert!(api.commands().lib_version().unwrap().starts_with("libsndfile"));
    assert!(api.commands().format_major_count().unwrap() > 0);
}

#[test]
fn test_read_fifty_items() {
    let Some(api) = load_api() else { return };
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, 100);

    let mut info = SfInfo::default();
    let handle = api.open(&path, OpenMode::Read, &mut info).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.frames, 100);

    let (buffer, read) = api.read_items::<i16>(handle, 50).unwrap();
    assert_eq!(buffer.len(), 50);
    assert_eq!(read, 50);
    assert_eq!(buffer[2], 10);
    assert_eq!(buffer[3], -20);

    api.close(handle).unwrap();
}

#[test]
fn test_open_missing_file() {
    let Some(api) = load_api() else { return };
    let mut info = SfInfo::default();
    let err = api
        .open(std::path::Path::new("/nonexistent/missing.wav"), OpenMode::Read, &mut info)
        .unwrap_err();
    assert!(matches!(err, SndError::Native { .. }));
}

#[test]
fn test_write_null_handle_rejected() {
    let Some(api) = load_api() else { return };
    let err = api.write_items(SndFileHandle::NULL, &[0i16; 10], 10).unwrap_err();
    assert!(matches!(err, SndError::InvalidArgument { .. }));
}

#[test]
fn test_write_and_scan_peaks() {
    let Some(api) = load_api() else { return };
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("written.wav");

    let mut info = SfInfo::for_write(8000, 2, Format::wav_float());
    assert!(api.format_check(&info));
    let handle = api.open(&path, OpenMode::Write, &mut info).unwrap();
    let data = [0.5f32, -0.25, -0.75, 0.125];
    assert_eq!(api.write_frames(handle, &data, 2, 2).unwrap(), 2);
    api.close(handle).unwrap();

    let mut info = SfInfo::default();
    let handle = api.open(&path, OpenMode::Read, &mut info).unwrap();
    let commands = api.commands();
    let peaks = commands.calc_norm_max_all_channels(handle, info.channels).unwrap();
    assert_relative_eq!(peaks[0], 0.75);
    assert_relative_eq!(peaks[1], 0.25);

    let current = commands.current_info(handle).unwrap();
    assert_eq!(current, info);
    api.close(handle).unwrap();
}
