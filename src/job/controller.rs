//! # Print Job Controller
//!
//! Runs one print job against one device:
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌─────────┐   ┌──────────┐   ┌──────────────┐
//! │ Rendering │──►│ Dithering │──►│ Packing │──►│ Chunking │──►│ Transmitting │
//! └───────────┘   └───────────┘   └─────────┘   └──────────┘   └──────────────┘
//!   Renderer        dither.rs       pack.rs       chunk.rs       Transport
//!   └──────────────── synchronous, CPU only ───────────────┘     sequential I/O
//! ```
//!
//! The device is leased for the whole job, so a second job on the same
//! device fails with `DeviceBusy` instead of interleaving writes. Jobs on
//! different devices share nothing and can run concurrently.
//!
//! Cancellation is checked before each chunk is sent. A write already in
//! flight always completes (or exhausts its retries) first.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{CancelToken, JobProgress, JobReport, JobState, PrintJob};
use crate::error::PrintyError;
use crate::printer::PrinterConfig;
use crate::render::dither::{self, DEFAULT_THRESHOLD, DitherAlgorithm};
use crate::render::{Renderer, pack};
use crate::transport::{DeviceHandle, DeviceLease, Transport, chunk};

/// Per-job options.
#[derive(Debug)]
pub struct JobOptions {
    /// Number of times the label is sent back-to-back; 0 fails the job
    pub copies: u32,
    /// Receives a snapshot after every state change and acknowledged chunk
    pub progress: Option<watch::Sender<JobProgress>>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            copies: 1,
            progress: None,
        }
    }
}

impl JobOptions {
    pub fn with_copies(mut self, copies: u32) -> Self {
        self.copies = copies;
        self
    }

    pub fn with_progress(mut self, sender: watch::Sender<JobProgress>) -> Self {
        self.progress = Some(sender);
        self
    }
}

/// Drives print jobs through the pipeline.
#[derive(Debug, Clone)]
pub struct PrintJobController {
    transport: Transport,
    threshold: u8,
    dither: DitherAlgorithm,
}

impl PrintJobController {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            threshold: DEFAULT_THRESHOLD,
            dither: DitherAlgorithm::FloydSteinberg,
        }
    }

    /// Controller with the threshold, algorithm and link settings of `config`.
    pub fn from_config(config: &PrinterConfig) -> Result<Self, PrintyError> {
        config.validate()?;
        Ok(Self::new(Transport::new(config.transport.clone())?)
            .with_threshold(config.threshold)
            .with_dither(config.dither))
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_dither(mut self, dither: DitherAlgorithm) -> Self {
        self.dither = dither;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Print one copy of the page produced by `renderer`.
    pub async fn print<R: Renderer + ?Sized>(
        &self,
        device: &DeviceHandle,
        renderer: &R,
        cancel: &CancelToken,
    ) -> Result<JobReport, PrintyError> {
        self.print_with(device, renderer, cancel, JobOptions::default())
            .await
    }

    /// Run a print job.
    ///
    /// ## Returns
    ///
    /// - `Err(DeviceBusy)` if another job holds `device`; no job is created.
    /// - `Ok(report)` otherwise, with `report.state` one of `Completed`,
    ///   `Failed` (and `report.error` set) or `Cancelled`.
    pub async fn print_with<R: Renderer + ?Sized>(
        &self,
        device: &DeviceHandle,
        renderer: &R,
        cancel: &CancelToken,
        options: JobOptions,
    ) -> Result<JobReport, PrintyError> {
        let lease = device.acquire()?;
        let mut job = PrintJob::new();
        info!("Job {} started on device {}", job.id, device.id());

        let result = self.run(&mut job, &lease, renderer, cancel, &options).await;

        let error = match result {
            Ok(end) => {
                advance(&mut job, end, &options);
                None
            }
            Err(e) => {
                advance(&mut job, JobState::Failed, &options);
                Some(e)
            }
        };
        drop(lease);

        match &error {
            None => info!(
                "Job {} {} ({}/{} chunks)",
                job.id, job.state, job.chunks_sent, job.chunks_total
            ),
            Some(e) => warn!(
                "Job {} failed after {}/{} chunks: {}",
                job.id, job.chunks_sent, job.chunks_total, e
            ),
        }

        Ok(JobReport {
            id: job.id,
            state: job.state,
            chunks_sent: job.chunks_sent,
            chunks_total: job.chunks_total,
            error,
        })
    }

    /// Pipeline body. Returns the terminal state on success.
    async fn run<R: Renderer + ?Sized>(
        &self,
        job: &mut PrintJob,
        lease: &DeviceLease,
        renderer: &R,
        cancel: &CancelToken,
        options: &JobOptions,
    ) -> Result<JobState, PrintyError> {
        advance(job, JobState::Rendering, options);
        let source = renderer.render()?;

        advance(job, JobState::Dithering, options);
        let grid = dither::rasterize(&source, self.dither, self.threshold)?;
        job.source = Some(source);

        advance(job, JobState::Packing, options);
        let bitmap = pack::pack(&grid)?;

        advance(job, JobState::Chunking, options);
        let chunks = chunk(bitmap.bits(), self.transport.config().chunk_size)?;
        job.bitmap = Some(bitmap);
        if options.copies == 0 {
            return Err(PrintyError::EmptyInput);
        }
        job.chunks_total = u32::try_from(chunks.len())
            .ok()
            .and_then(|n| n.checked_mul(options.copies))
            .ok_or_else(|| {
                PrintyError::Config(format!(
                    "{} copies of {} chunks is too many to send",
                    options.copies,
                    chunks.len()
                ))
            })?;

        advance(job, JobState::Transmitting, options);
        for copy in 0..options.copies {
            for c in &chunks {
                if cancel.is_cancelled() {
                    info!("Job {} cancelled before chunk {}", job.id, c.index);
                    return Ok(JobState::Cancelled);
                }
                self.transport.send_chunk(lease, c).await?;
                job.chunks_sent += 1;
                publish(job, options);
                if c.is_last() && options.copies > 1 {
                    debug!("Job {} sent copy {}/{}", job.id, copy + 1, options.copies);
                }
            }
        }

        Ok(JobState::Completed)
    }
}

fn advance(job: &mut PrintJob, next: JobState, options: &JobOptions) {
    let from = job.state;
    if job.transition(next) {
        debug!("Job {} {} -> {}", job.id, from, next);
        publish(job, options);
    } else {
        warn!("Job {} ignored illegal transition {} -> {}", job.id, from, next);
    }
}

fn publish(job: &PrintJob, options: &JobOptions) {
    if let Some(sender) = &options.progress {
        sender.send_replace(job.progress());
    }
}

// ============================================================================
// TESTS
// ============================================================================
