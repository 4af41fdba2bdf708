//! # Print Jobs
//!
//! This module ties the pipeline together into a job with a lifecycle.
//!
//! ## Modules
//!
//! - [`state`]: `JobState`, `PrintJob`, progress snapshots, reports, cancellation
//! - [`controller`]: `PrintJobController`, which runs a job end to end

pub mod controller;
pub mod state;

pub use controller::{JobOptions, PrintJobController};
pub use state::{CancelToken, JobProgress, JobReport, JobState, PrintJob};
