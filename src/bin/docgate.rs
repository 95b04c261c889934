//! CLI binary for docgate.
//!
//! A thin shim over the library crate that runs single pipeline steps
//! against a verification service and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docgate::{
    annotate_preview, HttpBackend, UploadedFile, ValidationConfig, VerificationBackend,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "docgate",
    about = "Validate proof documents and render annotated previews",
    version
)]
struct Cli {
    /// Base URL of the verification service
    #[arg(long, env = "DOCGATE_API_URL", global = true, default_value = "http://localhost:8000")]
    api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a file is really the given document type
    Classify {
        /// Document file (PDF, JPEG or PNG)
        file: PathBuf,
        /// Document type to check against, e.g. "Aadhaar Card"
        #[arg(long)]
        doc_type: String,
    },
    /// Score document quality
    Score {
        file: PathBuf,
    },
    /// Extract labelled fields and print them
    Extract {
        file: PathBuf,
        #[arg(long)]
        doc_type: String,
    },
    /// Extract fields and write an annotated preview next to the input
    Annotate {
        file: PathBuf,
        #[arg(long)]
        doc_type: String,
        /// Output path (default: <input>.annotated.png / .annotated.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// DPI the service rasterised PDF pages at
        #[arg(long, default_value_t = 220)]
        pdf_dpi: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = ValidationConfig::builder()
        .api_timeout_secs(cli.timeout)
        .build()
        .context("Invalid configuration")?;
    let backend = HttpBackend::new(&cli.api_url, &config)
        .context("Cannot build verification client")?;

    match cli.command {
        Command::Classify { file, doc_type } => {
            let file = UploadedFile::from_path(&file).context("Cannot load document")?;
            let is_valid = backend.classify(&file, &doc_type).await?;
            if is_valid {
                println!("{} {} looks like a {}", green("✓"), bold(&file.name), doc_type);
            } else {
                println!("{} {} does not look like a {}", red("✗"), bold(&file.name), doc_type);
                std::process::exit(1);
            }
        }
        Command::Score { file } => {
            let file = UploadedFile::from_path(&file).context("Cannot load document")?;
            let score = backend.score(&file).await?;
            println!("{} quality: {}", bold(&file.name), green(&format!("{score:.0}/100")));
        }
        Command::Extract { file, doc_type } => {
            let file = UploadedFile::from_path(&file).context("Cannot load document")?;
            let fields = backend.extract(&file, &doc_type).await?;
            if fields.is_empty() {
                println!("{}", dim("no fields detected"));
            }
            for field in fields {
                println!(
                    "{:>4}%  {}  {}",
                    field.confidence_percent(),
                    bold(&field.label),
                    field.value.as_deref().unwrap_or(&dim("—")),
                );
            }
        }
        Command::Annotate {
            file,
            doc_type,
            output,
            pdf_dpi,
        } => {
            let config = ValidationConfig::builder()
                .api_timeout_secs(cli.timeout)
                .pdf_raster_dpi(pdf_dpi)
                .build()
                .context("Invalid configuration")?;
            let file = UploadedFile::from_path(&file).context("Cannot load document")?;
            let fields = backend.extract(&file, &doc_type).await?;
            let artifact = annotate_preview(&file, &fields, &config).await?;

            let out_path = output.unwrap_or_else(|| {
                let ext = if file.is_pdf() { "annotated.pdf" } else { "annotated.png" };
                PathBuf::from(format!("{}.{ext}", file.name))
            });
            let mut handle = std::fs::File::create(&out_path)
                .with_context(|| format!("Cannot create {}", out_path.display()))?;
            handle.write_all(&artifact.bytes)?;
            println!(
                "{} {} fields → {}",
                green("✓"),
                fields.len(),
                bold(&out_path.display().to_string()),
            );
        }
    }

    Ok(())
}
