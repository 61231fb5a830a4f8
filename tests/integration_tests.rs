//! Integration Tests
//!
//! End-to-end tests of the typed API over WAV files, using the in-memory
//! native library.

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use hound::{SampleFormat, WavSpec, WavWriter};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use test_case::test_case;

use nsndfile::native::{Format, Whence};
use nsndfile::{
    Command, InMemoryLibrary, Marshaller, OpenMode, Sample, SfInfo, SndError, SndFileHandle,
    SndfileApi,
};

/// Helper to write a mono 16-bit ramp of `len` samples
fn write_ramp(dir: &TempDir, len: usize) -> PathBuf {
    let path = dir.path().join("ramp.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..len {
        writer.write_sample((i as i16) * 100).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn open_read(api: &SndfileApi<InMemoryLibrary>, path: &Path) -> (SndFileHandle, SfInfo) {
    let mut info = SfInfo::default();
    let handle = api.open(path, OpenMode::Read, &mut info).unwrap();
    (handle, info)
}

// === Item Reads ===

#[test]
fn test_read_fifty_shorts() {
    let dir = TempDir::new().unwrap();
    let path = write_ramp(&dir, 100);
    let api = SndfileApi::new(InMemoryLibrary::new());

    let (handle, info) = open_read(&api, &path);
    assert_eq!(info.frames, 100);

    let (buffer, read) = api.read_items::<i16>(handle, 50).unwrap();
    assert_eq!(buffer.len(), 50);
    assert_eq!(read, 50);
    assert_eq!(buffer[1], 100);
    assert_eq!(buffer[49], 4900);

    api.close(handle).unwrap();
}

fn check_read_length<T: Sample>(requested: i64) {
    let dir = TempDir::new().unwrap();
    let path = write_ramp(&dir, 20);
    let api = SndfileApi::new(InMemoryLibrary::new());
    let (handle, _) = open_read(&api, &path);

    let (buffer, read) = api.read_items::<T>(handle, requested).unwrap();
    assert_eq!(buffer.len() as i64, requested);
    assert!(read <= requested);
    assert_eq!(read, requested.min(20));
}

#[test_case(1)]
#[test_case(20)]
#[test_case(64)]
fn test_read_length_every_kind(requested: i64) {
    check_read_length::<i16>(requested);
    check_read_length::<i32>(requested);
    check_read_length::<f32>(requested);
    check_read_length::<f64>(requested);
}

#[test]
fn test_read_floats_are_normalized() {
    let dir = TempDir::new().unwrap();
    let path = write_ramp(&dir, 4);
    let api = SndfileApi::new(InMemoryLibrary::new());
    let (handle, _) = open_read(&api, &path);

    let (buffer, _) = api.read_items::<f64>(handle, 4).unwrap();
    assert_relative_eq!(buffer[3], 300.0 / 32768.0);
}

#[test]
fn test_seek_then_read() {
    let dir = TempDir::new().unwrap();
    let path = write_ramp(&dir, 10);
    let api = SndfileApi::new(InMemoryLibrary::new());
    let (handle, _) = open_read(&api, &path);

    assert_eq!(api.seek(handle, 8, Whence::Set).unwrap(), 8);
    let (buffer, read) = api.read_items::<i16>(handle, 5).unwrap();
    assert_eq!(read, 2);
    assert_eq!(&buffer[..2], &[800, 900]);
    assert_eq!(&buffer[2..], &[0, 0, 0]);
}

// === Item Writes ===

#[test]
fn test_write_null_handle_makes_no_native_call() {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let shorts = [0i16; 10];

    let err = api.write_items(SndFileHandle::NULL, &shorts, 10).unwrap_err();
    assert!(matches!(err, SndError::InvalidArgument { .. }));
    assert_eq!(api.native().native_calls(), 0);
}

fn check_null_handle_wins<T: Sample>(buffer: &[T], items: i64) {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let err = api.write_items(SndFileHandle::NULL, buffer, items).unwrap_err();
    assert!(matches!(err, SndError::InvalidArgument { .. }));
    assert_eq!(api.native().native_calls(), 0);
}

#[test]
fn test_write_null_handle_regardless_of_buffer_or_count() {
    check_null_handle_wins::<i16>(&[], 5);
    check_null_handle_wins::<i16>(&[0], -1);
    check_null_handle_wins::<i32>(&[], -3);
    check_null_handle_wins::<f32>(&[0.0; 2], 100);
    check_null_handle_wins::<f64>(&[], 0);
}

fn check_empty_buffer<T: Sample>(handle: SndFileHandle, api: &SndfileApi<InMemoryLibrary>) {
    let err = api.write_items::<T>(handle, &[], 10).unwrap_err();
    assert!(matches!(err, SndError::NullArgument { .. }));
}

#[test]
fn test_write_empty_buffer_every_kind() {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let handle = api
        .native()
        .insert_stream(SfInfo::for_write(8000, 1, Format::wav_pcm16()), Vec::new());

    check_empty_buffer::<i16>(handle, &api);
    check_empty_buffer::<i32>(handle, &api);
    check_empty_buffer::<f32>(handle, &api);
    check_empty_buffer::<f64>(handle, &api);
}

#[test]
fn test_write_negative_items() {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let handle = api
        .native()
        .insert_stream(SfInfo::for_write(8000, 1, Format::wav_pcm16()), Vec::new());

    let err = api.write_items(handle, &[0i32; 10], -1).unwrap_err();
    assert!(matches!(err, SndError::OutOfRange { value: -1, .. }));
    assert!(err.is_caller_error());
}

#[test]
fn test_write_file_and_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.wav");
    let api = SndfileApi::new(InMemoryLibrary::new());

    let mut info = SfInfo::for_write(48000, 2, Format::wav_pcm16());
    assert!(api.format_check(&info));
    let handle = api.open(&path, OpenMode::Write, &mut info).unwrap();

    let data: Vec<i16> = vec![1000, -1000, 2000, -2000, 3000, -3000];
    assert_eq!(api.write_items(handle, &data, data.len() as i64).unwrap(), 6);
    api.close(handle).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 48000);
    let written: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(written, data);
}

#[test]
fn test_write_frames_partial_request() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.wav");
    let api = SndfileApi::new(InMemoryLibrary::new());

    let stream = api
        .open_stream(&path, OpenMode::Write, SfInfo::for_write(8000, 2, Format::wav_float()))
        .unwrap();
    let written = api
        .write_frames(stream.handle(), &[0.1f32, 0.2, 0.3, 0.4], 1, 2)
        .unwrap();
    assert_eq!(written, 1);
    stream.close().unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.duration(), 1);
}

// === Commands ===

#[test]
fn test_max_all_channels_scripted_payload() {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let handle = api
        .native()
        .insert_stream(SfInfo::for_write(8000, 2, Format::wav_pcm16()), vec![0.0; 4]);
    api.native()
        .script_command(Command::GetMaxAllChannels, 0, &[1.0f64, 2.0]);

    assert_eq!(
        api.commands().max_all_channels(handle, 2).unwrap(),
        vec![1.0, 2.0]
    );
}

#[test]
fn test_signal_max_status_contract() {
    let api = SndfileApi::new(InMemoryLibrary::new());
    let handle = api
        .native()
        .insert_stream(SfInfo::for_write(8000, 1, Format::wav_pcm16()), vec![0.5; 4]);
    let native = api.native();

    native.script_command(Command::GetSignalMax, -1, &[0.0f64]);
    assert!(matches!(
        api.commands().signal_max(handle),
        Err(SndError::CommandFailed { status: -1, .. })
    ));

    native.script_command(Command::GetSignalMax, 1, &[0.0f64]);
    assert!(matches!(
        api.commands().signal_max(handle),
        Err(SndError::UnexpectedResult { .. })
    ));

    native.clear_scripts();
    assert_relative_eq!(api.commands().signal_max(handle).unwrap(), 0.5);
}

#[test]
fn test_peaks_from_written_file() {
    let dir = TempDir::new().unwrap();
    let path = write_ramp(&dir, 11);
    let api = SndfileApi::new(InMemoryLibrary::new());
    let (handle, info) = open_read(&api, &path);

    let peaks = api
        .commands()
        .calc_norm_max_all_channels(handle, info.channels)
        .unwrap();
    assert_eq!(peaks.len(), 1);
    assert_relative_eq!(peaks[0], 1000.0 / 32768.0);
}

// === Marshalling ===

#[test]
fn test_marshaller_round_trip_samples() {
    let marshaller = Marshaller::new();
    let values = [0.25f32, -0.5, 0.75, 1.0, -1.0];

    let handle = marshaller.samples_to_handle(&values).unwrap();
    assert_eq!(handle.len(), values.len() * 4);

    let back: Vec<f32> = marshaller.handle_to_array(&handle, values.len()).unwrap();
    assert_eq!(back, values.to_vec());
}
