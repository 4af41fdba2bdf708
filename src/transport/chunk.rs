//! # Chunk Encoding
//!
//! Splits a packed raster into write-sized pieces.
//!
//! ## Problem
//!
//! A BLE characteristic write carries at most `MTU - 3` bytes (often 20 on a
//! fresh link, ~180-500 after MTU negotiation). A single 384-dot label is
//! easily 10-50KB, so it must be delivered as a sequence of writes.
//!
//! ## Format
//!
//! ```text
//! data:   [■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■]
//! chunks: [──── 0 ────][──── 1 ────][──── 2 ────][── 3 ──]
//!          chunk_size   chunk_size   chunk_size   remainder
//! ```
//!
//! No header, sequence number or checksum is added to the payload. Order and
//! completeness come from sending one acknowledged write at a time.

use crate::error::PrintyError;

/// One slice of the payload, sent as one characteristic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the sequence, from 0
    pub index: u32,
    /// Number of chunks in the sequence
    pub total: u32,
    /// Bytes to write
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Split `data` into consecutive chunks of at most `chunk_size` bytes.
///
/// ## Errors
///
/// - `EmptyInput` if `data` is empty: a job must transmit something
/// - `InvalidChunkSize` if `chunk_size` is 0
///
/// ## Example
///
/// ```
/// use printy::transport::chunk::chunk;
///
/// let data: Vec<u8> = (0..300).map(|i| i as u8).collect();
/// let chunks = chunk(&data, 128)?;
///
/// let sizes: Vec<usize> = chunks.iter().map(|c| c.payload.len()).collect();
/// assert_eq!(sizes, vec![128, 128, 44]);
/// assert!(chunks.iter().all(|c| c.total == 3));
/// # Ok::<(), printy::PrintyError>(())
/// ```
pub fn chunk(data: &[u8], chunk_size: usize) -> Result<Vec<Chunk>, PrintyError> {
    if chunk_size == 0 {
        return Err(PrintyError::InvalidChunkSize);
    }
    if data.is_empty() {
        return Err(PrintyError::EmptyInput);
    }

    let total = data.len().div_ceil(chunk_size) as u32;
    Ok(data
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, slice)| Chunk {
            index: i as u32,
            total,
            payload: slice.to_vec(),
        })
        .collect())
}

/// Concatenate chunk payloads in index order.
pub fn reassemble(chunks: &[Chunk]) -> Vec<u8> {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);
    ordered
        .into_iter()
        .flat_map(|c| c.payload.iter().copied())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
