//! # Printer Transport Layer
//!
//! This module gets packed raster bytes onto the printer over BLE GATT.
//!
//! ## Modules
//!
//! - [`chunk`]: split a payload into write-sized [`Chunk`]s
//! - [`device`]: [`DeviceHandle`] / [`DeviceLease`] and the [`GattWriter`] seam
//! - [`link`]: [`Transport`], acknowledged writes with timeout and retry
//! - [`bluetooth`]: btleplug-backed scanning, connecting and writing
//!
//! ## Data Flow
//!
//! ```text
//! Bitmap bytes ──chunk()──► [Chunk 0, Chunk 1, ...]
//!                                │
//!                     Transport::send_chunk (one at a time)
//!                                │
//!                     DeviceLease ──► GattWriter::write_with_response
//! ```

pub mod bluetooth;
pub mod chunk;
pub mod device;
pub mod link;

pub use bluetooth::{DiscoveredDevice, Scanner};
pub use chunk::{Chunk, chunk};
pub use device::{DeviceHandle, DeviceLease, GattWriter};
pub use link::Transport;
