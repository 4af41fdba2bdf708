//! # Printy - BLE Thermal Label Printing
//!
//! Printy takes a rendered label page and gets it onto a Bluetooth Low Energy
//! thermal printer. It provides:
//!
//! - **Rasterization**: Floyd–Steinberg dithering of grayscale pages
//! - **Bit packing**: the 1-bit, MSB-first row format printer firmware consumes
//! - **Chunking**: payloads split to fit BLE write limits
//! - **Transport**: acknowledged GATT writes with timeout and retry
//! - **Jobs**: a cancellable state machine, one job per device at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use printy::{
//!     job::{CancelToken, PrintJobController},
//!     printer::PrinterConfig,
//!     render::ImageRenderer,
//!     transport::Scanner,
//! };
//!
//! # async fn example() -> Result<(), printy::PrintyError> {
//! let config = PrinterConfig::default();
//!
//! // Find and connect to the printer
//! let scanner = Scanner::new(config.transport.clone()).await?;
//! let found = scanner.find("MX-06").await?;
//! let device = scanner
//!     .connect(&found, config.service_uuid, config.characteristic_uuid)
//!     .await?;
//!
//! // Print a label image
//! let controller = PrintJobController::from_config(&config)?;
//! let page = ImageRenderer::from_path("label.png", config.width_dots);
//! let report = controller.print(&device, &page, &CancelToken::new()).await?;
//!
//! println!("{}: {}/{} chunks", report.state, report.chunks_sent, report.chunks_total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`render`] | Pixel buffers, dithering, bit packing, image ingestion |
//! | [`transport`] | Chunking, device leases, retrying writes, BLE adapter |
//! | [`job`] | Print job state machine and controller |
//! | [`printer`] | Printer configurations |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Any BLE printer that accepts raw 1-bit raster rows on a write
//! characteristic. The default profile targets the common 384-dot (58mm)
//! heads on service `0x18F0` / characteristic `0x2AF1`; other models can be
//! described with a JSON [`PrinterConfig`].

pub mod error;
pub mod job;
pub mod printer;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use error::{PrintyError, TransportError};
pub use job::{CancelToken, JobReport, JobState, PrintJobController};
pub use printer::PrinterConfig;
pub use transport::{DeviceHandle, Transport};
