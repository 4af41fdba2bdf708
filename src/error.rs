//! # Error Types
//!
//! This module defines error types used throughout the printy library.
//!
//! Errors fall into three groups:
//!
//! - **Input errors** (`InvalidDimensions`, `EmptyInput`, `InvalidChunkSize`):
//!   deterministic, raised before any I/O, never retried.
//! - **Link establishment errors** (`PermissionDenied`, `ScanTimeout`,
//!   `Connection`): surfaced from the BLE stack unmodified.
//! - **Transmission errors** (`ChunkWriteFailed`): a single chunk exhausted its
//!   retry budget. Earlier chunks have already reached the printer.

use std::time::Duration;

use thiserror::Error;

/// Cause of a single failed characteristic write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peripheral did not acknowledge the write in time
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    /// Transient link-layer failure reported by the BLE stack
    #[error("link error: {0}")]
    Link(String),

    /// The peripheral is gone; retrying the same write cannot succeed
    #[error("peripheral disconnected")]
    Disconnected,
}

impl TransportError {
    /// Whether the same write may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Link(_))
    }
}

/// Main error type for printy operations
#[derive(Debug, Error)]
pub enum PrintyError {
    /// Pixel buffer or bitmap shape does not match its data
    #[error("Invalid dimensions: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },

    /// Nothing to transmit
    #[error("Empty input: no data to send")]
    EmptyInput,

    /// Chunk size of zero
    #[error("Invalid chunk size: must be greater than zero")]
    InvalidChunkSize,

    /// The OS refused Bluetooth access
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// No matching device showed up before the scan window closed
    #[error("Scan timed out without finding a matching device")]
    ScanTimeout,

    /// Connecting, service discovery or characteristic lookup failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A chunk could not be delivered after all attempts
    #[error("Failed to write chunk {index}: {cause}")]
    ChunkWriteFailed { index: u32, cause: TransportError },

    /// Another job already owns this device
    #[error("Device busy: a print job is already active on this device")]
    DeviceBusy,

    /// The page renderer could not produce a pixel buffer
    #[error("Render error: {0}")]
    Render(String),

    /// Image encoding/decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(TransportError::Link("att error".into()).is_transient());
        assert!(!TransportError::Disconnected.is_transient());
    }

    #[test]
    fn test_chunk_write_failed_message() {
        let err = PrintyError::ChunkWriteFailed {
            index: 2,
            cause: TransportError::Timeout(Duration::from_secs(5)),
        };
        assert_eq!(err.to_string(), "Failed to write chunk 2: write timed out after 5s");
    }
}
