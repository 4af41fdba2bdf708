//! # Printy CLI
//!
//! Command-line interface for BLE thermal label printing.
//!
//! ## Usage
//!
//! ```bash
//! # List nearby printers
//! printy scan
//!
//! # Print an image to the first printer whose name contains "MX"
//! printy print label.png --device MX
//!
//! # Print three copies with plain thresholding
//! printy print label.png --device 11:22:33:44:55:66 --copies 3 --dither threshold
//!
//! # Preview the dithered label without printing
//! printy preview label.png --png out.png
//! ```
//!
//! Set `RUST_LOG=debug` (or pass `-v`) to see per-chunk transport logs.

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use printy::{
    PrintyError,
    job::{CancelToken, JobOptions, JobProgress, JobState, PrintJobController},
    printer::{PayloadEncoding, PrinterConfig},
    render::{self, ImageRenderer, Renderer, dither::DitherAlgorithm, source},
    transport::Scanner,
};

/// Printy - BLE thermal label printer utility
#[derive(Parser, Debug)]
#[command(name = "printy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List nearby BLE printers
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Print an image to a BLE printer
    Print {
        /// Image file to print (PNG, JPEG, ...)
        image: PathBuf,

        /// Printer address (XX:XX:XX:XX:XX:XX) or part of its name
        #[arg(long)]
        device: String,

        /// Number of copies
        #[arg(long, default_value = "1")]
        copies: u32,

        #[command(flatten)]
        settings: Settings,
    },

    /// Dither an image and save the printer's view of it as PNG
    Preview {
        /// Image file to rasterize
        image: PathBuf,

        /// Output PNG file
        #[arg(long, value_name = "FILE")]
        png: PathBuf,

        #[command(flatten)]
        settings: Settings,
    },
}

/// Printer settings shared by `print` and `preview`.
#[derive(Args, Debug)]
struct Settings {
    /// JSON printer configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Raster width in dots
    #[arg(long)]
    width: Option<u32>,

    /// Ink threshold (0-255)
    #[arg(long)]
    threshold: Option<u8>,

    /// Dithering algorithm: floyd-steinberg | threshold
    #[arg(long)]
    dither: Option<DitherAlgorithm>,

    /// Bytes per BLE write
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Send payloads base64-encoded
    #[arg(long)]
    base64: bool,
}

impl Settings {
    /// Load the config file (or built-in profile) and apply flag overrides.
    fn resolve(&self) -> Result<PrinterConfig, PrintyError> {
        let mut config = match &self.config {
            Some(path) => PrinterConfig::load(path)?,
            None => PrinterConfig::default(),
        };
        if let Some(width) = self.width {
            config = config.with_width(width);
        }
        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }
        if let Some(dither) = self.dither {
            config = config.with_dither(dither);
        }
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if self.base64 {
            config = config.with_encoding(PayloadEncoding::Base64);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "printy=debug" } else { "printy=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<(), PrintyError> {
    match command {
        Commands::Scan { timeout } => scan(Duration::from_secs(timeout)).await,
        Commands::Print {
            image,
            device,
            copies,
            settings,
        } => print(image, &device, copies, settings.resolve()?).await,
        Commands::Preview {
            image,
            png,
            settings,
        } => preview(image, png, settings.resolve()?),
    }
}

async fn scan(window: Duration) -> Result<(), PrintyError> {
    let scanner = Scanner::new(PrinterConfig::default().transport).await?;
    println!("Scanning for {}s...", window.as_secs());

    let mut devices = scanner.scan(window).await?;
    let mut count = 0;
    while let Some(device) = devices.next().await {
        let rssi = device
            .rssi
            .map(|r| format!("{}dBm", r))
            .unwrap_or_else(|| "?".to_string());
        println!("  {}  {:<24} {}", device.id, device.name, rssi);
        count += 1;
    }

    if count == 0 {
        println!("No devices found.");
    }
    Ok(())
}

async fn print(
    image: PathBuf,
    query: &str,
    copies: u32,
    config: PrinterConfig,
) -> Result<(), PrintyError> {
    let controller = PrintJobController::from_config(&config)?;
    let renderer = ImageRenderer::from_path(&image, config.width_dots);

    let scanner = Scanner::new(config.transport.clone()).await?;
    println!("Looking for '{}'...", query);
    let found = scanner.find(query).await?;
    println!("Found {} [{}]", found.name, found.id);

    let device = scanner
        .connect(&found, config.service_uuid, config.characteristic_uuid)
        .await?;

    // Ctrl-C stops the job after the chunk in flight
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current chunk...");
            on_interrupt.cancel();
        }
    });

    let (tx, rx) = watch::channel(JobProgress::default());
    let progress = tokio::spawn(show_progress(rx));

    let options = JobOptions::default().with_copies(copies).with_progress(tx);
    let report = controller
        .print_with(&device, &renderer, &cancel, options)
        .await?;
    if let Err(e) = progress.await {
        tracing::warn!("Progress display failed: {}", e);
    }

    if let Err(e) = scanner.disconnect(&found).await {
        tracing::warn!("Disconnect failed: {}", e);
    }

    match report.state {
        JobState::Completed => {
            println!("Printed successfully!");
            Ok(())
        }
        JobState::Cancelled => {
            println!(
                "Cancelled after {}/{} chunks.",
                report.chunks_sent, report.chunks_total
            );
            Ok(())
        }
        _ => {
            if report.partial_output() {
                eprintln!(
                    "Warning: printer received {}/{} chunks; a partial label may have printed.",
                    report.chunks_sent, report.chunks_total
                );
            }
            Err(report
                .error
                .unwrap_or_else(|| PrintyError::Connection("job did not complete".into())))
        }
    }
}

/// Print a progress line until the job reaches a terminal state.
async fn show_progress(mut rx: watch::Receiver<JobProgress>) {
    while rx.changed().await.is_ok() {
        let p = *rx.borrow_and_update();
        if p.state == JobState::Transmitting {
            print!(
                "\rSending {}/{} chunks ({:.0}%)",
                p.chunks_sent,
                p.chunks_total,
                p.fraction() * 100.0
            );
            let _ = std::io::stdout().flush();
        }
        if p.state.is_terminal() {
            println!();
            break;
        }
    }
}

fn preview(image: PathBuf, png: PathBuf, config: PrinterConfig) -> Result<(), PrintyError> {
    let page = ImageRenderer::from_path(&image, config.width_dots).render()?;
    let bitmap = render::rasterize(&page, config.dither, config.threshold)?;
    source::save_png(&png, &bitmap)?;

    println!(
        "Saved {}x{} ({:.1}mm long) {} preview to {} ({} bytes of raster)",
        bitmap.width(),
        bitmap.height(),
        bitmap.height() as f32 / config.dots_per_mm(),
        config.dither,
        png.display(),
        bitmap.bits().len()
    );
    Ok(())
}
