//! Print job states, progress and results.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::PrintyError;
use crate::render::{Bitmap, PixelBuffer};

/// Where a job is in the pipeline.
///
/// ```text
/// Idle → Rendering → Dithering → Packing → Chunking → Transmitting → Completed
///            │           │          │          │            │
///            └───────────┴──────────┴──────────┴────────────┴──────► Failed
///                                                           └──────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Idle,
    Rendering,
    Dithering,
    Packing,
    Chunking,
    Transmitting,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Idle, Rendering)
            | (Rendering, Dithering)
            | (Dithering, Packing)
            | (Packing, Chunking)
            | (Chunking, Transmitting)
            | (Transmitting, Completed) => true,
            (from, Failed | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Rendering => "rendering",
            Self::Dithering => "dithering",
            Self::Packing => "packing",
            Self::Chunking => "chunking",
            Self::Transmitting => "transmitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One print request, owned by the controller while it runs.
#[derive(Debug)]
pub struct PrintJob {
    pub id: Uuid,
    pub state: JobState,
    /// Page pulled from the renderer; `None` until rendering has run
    pub source: Option<PixelBuffer>,
    pub bitmap: Option<Bitmap>,
    pub chunks_sent: u32,
    pub chunks_total: u32,
}

impl PrintJob {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: JobState::Idle,
            source: None,
            bitmap: None,
            chunks_sent: 0,
            chunks_total: 0,
        }
    }

    /// Move to `next`. Returns `false` (and stays put) if the move is illegal.
    pub fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    pub fn progress(&self) -> JobProgress {
        JobProgress {
            job_id: self.id,
            state: self.state,
            chunks_sent: self.chunks_sent,
            chunks_total: self.chunks_total,
        }
    }
}

impl Default for PrintJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot published while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub state: JobState,
    pub chunks_sent: u32,
    pub chunks_total: u32,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            job_id: Uuid::nil(),
            state: JobState::Idle,
            chunks_sent: 0,
            chunks_total: 0,
        }
    }
}

impl JobProgress {
    /// Fraction of chunks acknowledged, 0.0 to 1.0.
    pub fn fraction(&self) -> f32 {
        if self.chunks_total == 0 {
            0.0
        } else {
            self.chunks_sent as f32 / self.chunks_total as f32
        }
    }
}

/// Final result of a job.
#[derive(Debug)]
pub struct JobReport {
    pub id: Uuid,
    /// Always terminal
    pub state: JobState,
    pub chunks_sent: u32,
    pub chunks_total: u32,
    /// Set when `state` is `Failed`
    pub error: Option<PrintyError>,
}

impl JobReport {
    /// Whether the printer may hold a partially printed label.
    ///
    /// True when the job failed after at least one chunk was acknowledged.
    pub fn partial_output(&self) -> bool {
        self.state == JobState::Failed && self.chunks_sent > 0
    }

    /// Index of the chunk that failed to send, if that is why the job failed.
    pub fn failed_chunk(&self) -> Option<u32> {
        match &self.error {
            Some(PrintyError::ChunkWriteFailed { index, .. }) => Some(*index),
            _ => None,
        }
    }
}

/// Cooperative cancellation signal, checked between chunk writes.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
