//! # Printer Module
//!
//! This module provides printer-specific configurations.
//!
//! ## Modules
//!
//! - [`config`]: Raster geometry, GATT identifiers and link settings

pub mod config;

pub use config::{PayloadEncoding, PrinterConfig, TransportConfig};
