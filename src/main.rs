use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use freehash::config::{self, EngineConfig};
use freehash::models::{VerificationRecord, VerificationStatus};
use freehash::{utils, Algorithm, FileHashEngine, JobEvent, JobState};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "freehash")]
#[command(about = "Free Hash Checker - compute and verify file digests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a file and optionally compare it against a reference digest
    Hash {
        /// File to hash
        file: PathBuf,

        /// Algorithm name (MD5, SHA-1, SHA-256, SHA-384, SHA-512, SHA3-256, BLAKE3)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Reference digest to compare with
        #[arg(short, long, conflicts_with = "expected_file")]
        expected: Option<String>,

        /// Checksum file holding the reference digest
        #[arg(long)]
        expected_file: Option<PathBuf>,

        /// Read chunk size in bytes
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Print a JSON verification record
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Hide the progress bar
        #[arg(long, default_value_t = false)]
        no_progress: bool,
    },

    /// List supported algorithms
    Algorithms,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| writeln!(buf, "{}:{}:{}", record.target(), record.level(), record.args()))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Hash { file, algorithm, expected, expected_file, chunk_size, json, no_progress } => {
            let mut cfg = config::load_config()?;
            if let Some(size) = chunk_size {
                cfg.chunk_size = size;
            }
            let reference = match (expected, expected_file) {
                (Some(e), _) => Some(e),
                (None, Some(p)) => Some(read_reference(&p)?),
                (None, None) => None,
            };
            run_hash(cfg, file, algorithm, reference, json, !no_progress).await
        }
        Commands::Algorithms => {
            for a in Algorithm::all() {
                println!("{:<10} {} hex chars", a.name(), a.digest_len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action: ConfigAction::Show } => {
            let cfg = config::load_config()?;
            println!("# {}", config::default_config_path().display());
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_reference(path: &Path) -> Result<String> {
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("reading checksum file {}", path.display()))?;
    match utils::parse_first_hash_from_text(&txt) {
        Some(h) => Ok(h),
        None => bail!("no digest found in {}", path.display()),
    }
}

async fn run_hash(
    cfg: EngineConfig,
    file: PathBuf,
    algorithm: Option<String>,
    reference: Option<String>,
    json: bool,
    show_progress: bool,
) -> Result<ExitCode> {
    let algorithm = match algorithm {
        Some(name) => name.parse::<Algorithm>()?,
        None => cfg.default_algorithm,
    };
    let engine = FileHashEngine::new(cfg);
    let mut handle = engine.start_with(&file, algorithm)?;
    info!("file selected \"{}\"", file.display());

    let pb = if show_progress { ProgressBar::new(100) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::with_template("{prefix} {bar:40.cyan/blue} {pos:>3}% {wide_msg}")?
            .progress_chars("##-"),
    );
    pb.set_prefix(format!("[{}]", algorithm));

    let canceller = handle.canceller();
    let mut interrupted = false;
    let result = loop {
        let ev = tokio::select! {
            ev = handle.next_event() => ev,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if canceller.cancel() {
                    debug!("cancel requested from terminal");
                }
                continue;
            }
        };
        match ev {
            Some(JobEvent::Progress(p)) => pb.set_position(p.percent as u64),
            Some(JobEvent::Completed(r)) => {
                pb.finish_and_clear();
                break r;
            }
            Some(JobEvent::Failed(err)) => {
                pb.abandon_with_message("failed");
                return Err(err).context("hashing failed");
            }
            Some(JobEvent::Cancelled) | None => {
                pb.abandon_with_message("cancelled");
                eprintln!("cancelled: {}", file.display());
                return Ok(ExitCode::FAILURE);
            }
        }
    };
    debug_assert_eq!(handle.state(), JobState::Completed);
    info!("response received: {}", result.digest);

    let record = VerificationRecord::new(handle.id(), file, result, reference);
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}  {}", record.computed_hash, record.file_path.display());
        match record.status {
            VerificationStatus::Match => println!("OK: digest matches reference"),
            VerificationStatus::Mismatch => {
                println!("MISMATCH: expected {}", record.reference_hash.as_deref().unwrap_or(""))
            }
            VerificationStatus::Unchecked => {}
        }
    }

    Ok(match record.status {
        VerificationStatus::Mismatch => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
