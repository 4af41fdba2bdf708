//! # Acknowledged Chunk Delivery
//!
//! [`Transport`] sends one [`Chunk`] at a time through a leased device, with a
//! per-write timeout and a bounded retry budget.
//!
//! ## Retry Policy
//!
//! ```text
//! write ──ack──────────────────────────────► Ok
//!   │
//!   ├─timeout / link error──► backoff ──► write again (same chunk)
//!   │                                      ... up to max_attempts
//!   │
//!   └─disconnected──────────────────────────► ChunkWriteFailed (no retry)
//! ```
//!
//! Chunks that were already acknowledged are never resent: the printer
//! consumes the stream as it arrives, so a repeated chunk would print twice.
//! A failed job may therefore leave a partial label on the paper.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::chunk::Chunk;
use super::device::DeviceLease;
use crate::error::{PrintyError, TransportError};
use crate::printer::{PayloadEncoding, TransportConfig};

/// Delivers chunks to a leased device.
#[derive(Debug, Clone)]
pub struct Transport {
    config: TransportConfig,
}

impl Transport {
    /// Create a transport with the given link settings.
    pub fn new(config: TransportConfig) -> Result<Self, PrintyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send one chunk, retrying transient failures.
    ///
    /// ## Errors
    ///
    /// `ChunkWriteFailed { index, cause }` with the cause of the last attempt.
    pub async fn send_chunk(
        &self,
        device: &DeviceLease,
        chunk: &Chunk,
    ) -> Result<(), PrintyError> {
        let payload = encode_payload(&chunk.payload, self.config.encoding);
        let write_timeout = self.config.write_timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match timeout(write_timeout, device.write(&payload)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(write_timeout)),
            };

            match result {
                Ok(()) => {
                    debug!(
                        "Chunk {}/{} acknowledged ({} bytes, attempt {})",
                        chunk.index + 1,
                        chunk.total,
                        payload.len(),
                        attempt
                    );
                    return Ok(());
                }
                Err(cause) if cause.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.config.backoff(attempt - 1);
                    warn!(
                        "Chunk {}/{} attempt {} failed: {}; retrying in {:?}",
                        chunk.index + 1,
                        chunk.total,
                        attempt,
                        cause,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(cause) => {
                    warn!(
                        "Chunk {}/{} failed after {} attempt(s): {}",
                        chunk.index + 1,
                        chunk.total,
                        attempt,
                        cause
                    );
                    return Err(PrintyError::ChunkWriteFailed {
                        index: chunk.index,
                        cause,
                    });
                }
            }
        }
    }
}

/// Apply the wire encoding to a chunk payload.
pub fn encode_payload(payload: &[u8], encoding: PayloadEncoding) -> Vec<u8> {
    match encoding {
        PayloadEncoding::Raw => payload.to_vec(),
        PayloadEncoding::Base64 => STANDARD.encode(payload).into_bytes(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
