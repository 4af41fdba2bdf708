//! # Pipeline Tests
//!
//! End-to-end print jobs against a scripted peripheral.
//!
//! ## Test Coverage
//!
//! - **Failure**: a chunk that never acknowledges fails the job after three
//!   attempts, and nothing after it is written.
//! - **Cancellation**: a cancel raised mid-transfer stops before the next chunk.
//! - **Exclusivity**: a second job on a busy device is refused; other devices
//!   are unaffected.
//! - **Rasterization**: determinism and the all-white / all-black boundaries.
//!
//! Timing-sensitive tests run with a paused tokio clock, so the 5s write
//! timeouts complete instantly.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use printy::job::{CancelToken, JobOptions, JobState, PrintJobController};
use printy::printer::TransportConfig;
use printy::render::{self, PixelBuffer, dither::DitherAlgorithm};
use printy::transport::{DeviceHandle, GattWriter, Transport};
use printy::{PrintyError, TransportError};

// ============================================================================
// HELPERS
// ============================================================================

/// What the peripheral does with one write.
enum Reply {
    Ack,
    Hang,
}

/// Peripheral that replies from a script and records every attempt.
///
/// Once the script runs out every write is acknowledged. `cancel_on` raises
/// the given token when that write (1-based) arrives.
#[derive(Default)]
struct ScriptedPrinter {
    replies: Mutex<VecDeque<Reply>>,
    attempts: Mutex<Vec<Vec<u8>>>,
    cancel_on: Option<(usize, CancelToken)>,
}

impl ScriptedPrinter {
    fn with_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn cancelling_on(write: usize, token: CancelToken) -> Self {
        Self {
            cancel_on: Some((write, token)),
            ..Default::default()
        }
    }

    fn attempts(&self) -> Vec<Vec<u8>> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GattWriter for ScriptedPrinter {
    async fn write_with_response(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let count = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(payload.to_vec());
            attempts.len()
        };
        if let Some((n, token)) = &self.cancel_on {
            if count == *n {
                token.cancel();
            }
        }

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Ack);
        match reply {
            Reply::Ack => Ok(()),
            Reply::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Peripheral that holds every write until released.
#[derive(Default)]
struct GatedPrinter {
    gate: Notify,
}

#[async_trait]
impl GattWriter for GatedPrinter {
    async fn write_with_response(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        _payload: &[u8],
    ) -> Result<(), TransportError> {
        self.gate.notified().await;
        Ok(())
    }
}

fn handle(writer: Arc<dyn GattWriter>, id: &str) -> DeviceHandle {
    DeviceHandle::new(id, writer, Uuid::nil(), Uuid::nil())
}

/// Controller sending one byte per chunk.
fn byte_per_chunk() -> PrintJobController {
    let config = TransportConfig {
        chunk_size: 1,
        ..Default::default()
    };
    PrintJobController::new(Transport::new(config).unwrap())
}

/// A solid black page `rows` rows tall, packing to one byte per row.
fn black_rows(rows: u32) -> PixelBuffer {
    PixelBuffer::filled(8, rows, 0).unwrap()
}

// ============================================================================
// FAILURE AND CANCELLATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_chunk_fails_job() {
    // Chunks 0 and 1 ack, chunk 2 hangs on every attempt
    let printer = Arc::new(ScriptedPrinter::with_replies(vec![
        Reply::Ack,
        Reply::Ack,
        Reply::Hang,
        Reply::Hang,
        Reply::Hang,
    ]));
    let device = handle(printer.clone(), "printer");

    let report = byte_per_chunk()
        .print(&device, &black_rows(4), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.chunks_sent, 2);
    assert_eq!(report.chunks_total, 4);
    assert!(report.partial_output());
    assert_eq!(report.failed_chunk(), Some(2));
    match report.error {
        Some(PrintyError::ChunkWriteFailed { index, cause }) => {
            assert_eq!(index, 2);
            assert_eq!(cause, TransportError::Timeout(Duration::from_secs(5)));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Two single writes, three attempts at chunk 2, nothing for chunk 3
    assert_eq!(printer.attempts().len(), 5);
    assert!(!device.is_busy());
}

#[tokio::test]
async fn test_cancel_stops_before_next_chunk() {
    let cancel = CancelToken::new();
    let printer = Arc::new(ScriptedPrinter::cancelling_on(3, cancel.clone()));
    let device = handle(printer.clone(), "printer");

    let report = byte_per_chunk()
        .print(&device, &black_rows(5), &cancel)
        .await
        .unwrap();

    // The write in flight when cancel was raised still completes
    assert_eq!(report.state, JobState::Cancelled);
    assert_eq!(report.chunks_sent, 3);
    assert_eq!(report.chunks_total, 5);
    assert!(report.error.is_none());
    assert!(!report.partial_output());
    assert_eq!(printer.attempts().len(), 3);
    assert!(!device.is_busy());
}

#[tokio::test]
async fn test_chunks_arrive_in_order() {
    let printer = Arc::new(ScriptedPrinter::default());
    let device = handle(printer.clone(), "printer");
    // Row y is black in its first y+1 dots: 0x80, 0xC0, 0xE0
    let mut pixels = vec![255u8; 24];
    for y in 0..3 {
        for x in 0..=y {
            pixels[y * 8 + x] = 0;
        }
    }
    let page = PixelBuffer::new(8, 3, pixels).unwrap();

    let report = byte_per_chunk()
        .print(&device, &page, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(
        printer.attempts(),
        vec![vec![0x80], vec![0xC0], vec![0xE0]]
    );
}

// ============================================================================
// DEVICE EXCLUSIVITY
// ============================================================================

#[tokio::test]
async fn test_second_job_on_busy_device_is_refused() {
    let printer = Arc::new(GatedPrinter::default());
    let device = handle(printer.clone(), "printer");
    let controller = byte_per_chunk();

    let first = tokio::spawn({
        let controller = controller.clone();
        let device = device.clone();
        async move {
            controller
                .print(&device, &black_rows(1), &CancelToken::new())
                .await
        }
    });
    while !device.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = controller
        .print(&device, &black_rows(1), &CancelToken::new())
        .await;
    assert!(matches!(second, Err(PrintyError::DeviceBusy)));

    // A different device is independent
    let other = handle(Arc::new(ScriptedPrinter::default()), "other");
    let report = controller
        .print(&other, &black_rows(1), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(report.state, JobState::Completed);

    printer.gate.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.state, JobState::Completed);
    assert!(!device.is_busy());
}

#[tokio::test]
async fn test_device_reusable_after_each_outcome() {
    let printer = Arc::new(ScriptedPrinter::default());
    let device = handle(printer.clone(), "printer");
    let controller = byte_per_chunk();

    let cancelled = CancelToken::new();
    cancelled.cancel();
    let report = controller
        .print(&device, &black_rows(2), &cancelled)
        .await
        .unwrap();
    assert_eq!(report.state, JobState::Cancelled);

    let report = controller
        .print_with(
            &device,
            &black_rows(2),
            &CancelToken::new(),
            JobOptions::default().with_copies(0),
        )
        .await
        .unwrap();
    assert_eq!(report.state, JobState::Failed);

    let report = controller
        .print(&device, &black_rows(2), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(report.state, JobState::Completed);
    assert_eq!(printer.attempts().len(), 2);
}

// ============================================================================
// RASTERIZATION
// ============================================================================

#[test]
fn test_dithering_is_deterministic() {
    let pixels: Vec<u8> = (0..64u32 * 16).map(|i| (i * 7 % 256) as u8).collect();
    let page = PixelBuffer::new(64, 16, pixels).unwrap();

    let a = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128).unwrap();
    let b = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128).unwrap();
    assert_eq!(a.bits(), b.bits());
}

#[test]
fn test_white_page_has_no_ink() {
    let page = PixelBuffer::filled(384, 10, 255).unwrap();
    let bitmap = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128).unwrap();
    assert_eq!(bitmap.bits().len(), 48 * 10);
    assert!(bitmap.bits().iter().all(|&b| b == 0x00));
}

#[test]
fn test_black_page_is_solid_with_zero_padding() {
    // 10 dots wide: 2 bytes per row, last 6 bits padding
    let page = PixelBuffer::filled(10, 3, 0).unwrap();
    let bitmap = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128).unwrap();
    assert_eq!(bitmap.bits(), &[0xFF, 0xC0, 0xFF, 0xC0, 0xFF, 0xC0]);
}

#[test]
fn test_mid_gray_is_roughly_half_ink() {
    let page = PixelBuffer::filled(64, 64, 128).unwrap();
    let bitmap = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128).unwrap();
    let ink: u32 = bitmap.bits().iter().map(|b| b.count_ones()).sum();
    let total = 64 * 64;
    assert!(
        ink > total * 2 / 5 && ink < total * 3 / 5,
        "{} of {} dots inked",
        ink,
        total
    );

    // Plain thresholding of the same page leaves it blank
    let flat = render::rasterize(&page, DitherAlgorithm::Threshold, 128).unwrap();
    assert!(flat.bits().iter().all(|&b| b == 0));
}
