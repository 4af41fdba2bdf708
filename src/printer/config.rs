//! # Printer Configuration
//!
//! This module defines the hardware and link settings for a BLE thermal label
//! printer.
//!
//! ## Built-in Profile
//!
//! | Model | Width (dots) | Resolution | Service | Characteristic |
//! |-------|--------------|------------|---------|----------------|
//! | Generic 58mm BLE | 384 | 203 DPI | `0x18F0` | `0x2AF1` |
//!
//! ## Loading From a File
//!
//! Every field is optional; missing fields take the built-in default.
//!
//! ```json
//! {
//!   "name": "Shipping labels",
//!   "width_dots": 384,
//!   "threshold": 110,
//!   "transport": { "chunk_size": 180, "backoff_ms": [200, 600] }
//! }
//! ```
//!
//! ## Usage
//!
//! ```
//! use printy::printer::PrinterConfig;
//!
//! let config = PrinterConfig::default().with_chunk_size(180);
//! assert_eq!(config.width_dots, 384);
//! assert_eq!(config.transport.chunk_size, 180);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PrintyError;
use crate::render::dither::{DEFAULT_THRESHOLD, DitherAlgorithm};

/// Generic thermal printer GATT service (`0x18F0`).
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x000018f0_0000_1000_8000_00805f9b34fb);

/// Generic thermal printer write characteristic (`0x2AF1`).
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002af1_0000_1000_8000_00805f9b34fb);

/// Default raster width in dots (58mm paper at 203 DPI).
pub const DEFAULT_WIDTH_DOTS: u32 = 384;

/// Default chunk size in bytes. Must fit in the negotiated MTU minus ATT overhead.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// How chunk payloads are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadEncoding {
    /// Raw bytes
    #[default]
    Raw,
    /// Standard base64 text, for platform write APIs that only take strings
    Base64,
}

/// # Link Settings
///
/// Governs chunking and the per-chunk write policy.
///
/// ## Retry Schedule
///
/// ```text
/// attempt 1 ──fail──► wait backoff[0] ──► attempt 2 ──fail──► wait backoff[1] ──► attempt 3
/// ```
///
/// If there are more attempts than backoff entries, the last entry repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum payload bytes per write
    pub chunk_size: usize,
    /// Per-write acknowledgement timeout (milliseconds)
    pub write_timeout_ms: u64,
    /// Attempts per chunk, including the first
    pub max_attempts: u32,
    /// Delay before each retry (milliseconds)
    pub backoff_ms: Vec<u64>,
    /// Wire encoding of chunk payloads
    pub encoding: PayloadEncoding,
    /// How long a device scan runs (milliseconds)
    pub scan_timeout_ms: u64,
    /// Connection establishment timeout (milliseconds)
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_timeout_ms: 5_000,
            max_attempts: 3,
            backoff_ms: vec![200, 600],
            encoding: PayloadEncoding::Raw,
            scan_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl TransportConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let ms = self
            .backoff_ms
            .get(retry as usize)
            .or(self.backoff_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), PrintyError> {
        if self.chunk_size == 0 {
            return Err(PrintyError::InvalidChunkSize);
        }
        if self.max_attempts == 0 {
            return Err(PrintyError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// # Printer Configuration
///
/// Describes one label printer model and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: String,

    /// Raster width in dots; pages are scaled to this width
    pub width_dots: u32,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// GATT service that carries print data
    pub service_uuid: Uuid,

    /// Characteristic written with response for each chunk
    pub characteristic_uuid: Uuid,

    /// Quantization threshold (ink below this gray level)
    pub threshold: u8,

    /// Rasterization algorithm
    pub dither: DitherAlgorithm,

    /// Link settings
    pub transport: TransportConfig,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::generic_384()
    }
}

impl PrinterConfig {
    /// # Generic 58mm BLE Label Printer
    ///
    /// The common 384-dot print head found in most inexpensive BLE label and
    /// receipt printers.
    ///
    /// ```text
    /// ├── 5mm ──┼────── 48mm printable ──────┼── 5mm ──┤
    /// │ margin  │         384 dots           │ margin  │
    /// ```
    pub fn generic_384() -> Self {
        Self {
            name: "Generic 58mm BLE".to_string(),
            width_dots: DEFAULT_WIDTH_DOTS,
            dpi: 203,
            service_uuid: DEFAULT_SERVICE_UUID,
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            threshold: DEFAULT_THRESHOLD,
            dither: DitherAlgorithm::FloydSteinberg,
            transport: TransportConfig::default(),
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PrintyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PrintyError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, PrintyError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PrintyError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PrintyError> {
        if self.width_dots == 0 {
            return Err(PrintyError::Config("width_dots must be positive".into()));
        }
        self.transport.validate()
    }

    /// Raster row length in bytes.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        (self.width_dots as usize).div_ceil(8)
    }

    /// Calculate dots per millimeter
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    pub fn with_width(mut self, width_dots: u32) -> Self {
        self.width_dots = width_dots;
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_dither(mut self, dither: DitherAlgorithm) -> Self {
        self.dither = dither;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.transport.chunk_size = chunk_size;
        self
    }

    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.transport.encoding = encoding;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
