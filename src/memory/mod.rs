//! Unmanaged Memory Module
//!
//! Owned unmanaged blocks and the typed marshaller that fills and drains them.

pub mod handle;
pub mod marshaller;

pub use handle::{UnmanagedMemoryHandle, BLOCK_ALIGN};
pub use marshaller::Marshaller;
