//! NSndfile - Typed bindings over libsndfile
//!
//! NSndfile moves sample data and command results across the libsndfile C
//! boundary:
//! 1. Typed item I/O - `read_items`/`write_items` for i16, i32, f32 and f64
//! 2. Command decoding - `sf_command` queries turned into typed results
//!
//! # Architecture
//!
//! - `memory`: owned unmanaged blocks and the marshaller that fills them
//! - `native`: the `SndfileNative` capability trait, the runtime-loaded
//!   library and a WAV-backed in-memory stand-in
//! - `api` / `command`: argument validation and result translation on top

pub mod api;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod memory;
pub mod native;
pub mod sample;

pub use api::{OpenStream, SndfileApi};
pub use command::{Command, CommandApi};
pub use config::SndfileConfig;
pub use error::{Result, SndError};
pub use memory::{Marshaller, UnmanagedMemoryHandle};
pub use native::{InMemoryLibrary, NativeLibrary, OpenMode, SfInfo, SndFileHandle, SndfileNative};
pub use sample::{BufferDescriptor, Items, ItemsMut, Sample, SampleKind};
