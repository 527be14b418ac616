use clap::{Parser, Subcommand};
use ghostbit::stego;
use ghostbit::QualityMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ghostbit", version = "1.0.0", about = "Hide files in the low bits of PCM audio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audio carrier operations
    Audio {
        #[command(subcommand)]
        op: AudioOp,
    },
}

#[derive(Subcommand)]
enum AudioOp {
    /// Hide one or more secret files in a WAV carrier
    Encode {
        /// Carrier WAV file (integer PCM only)
        #[arg(short, long)]
        input: PathBuf,
        /// Secret file(s) to hide
        #[arg(short, long, required = true, num_args = 1..)]
        secret: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// Quality: high (1 bit/byte), normal (2), low (4)
        #[arg(short, long, default_value = "normal")]
        quality: String,
        /// Encrypt with Argon2id + AES-256-GCM
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Extract hidden files from an encoded carrier
    Decode {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Inspect a carrier without extracting anything
    Analyze {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report how many payload bytes a carrier can hold
    Capacity {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "normal")]
        quality: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), ghostbit::GhostbitError> {
    match Cli::parse().command {
        Commands::Audio { op } => match op {
            // ── Encode ───────────────────────────────────────────────────────
            AudioOp::Encode { input, secret, output, quality, password } => {
                let mode = parse_quality(&quality);
                for path in &secret {
                    let size = std::fs::metadata(path)?.len();
                    println!("  hiding  {} ({} B)", path.display(), size);
                }
                stego::encode(&input, &secret, &output, mode, password.as_deref())?;
                let size = std::fs::metadata(&output)?.len();
                println!(
                    "Encoded {} file(s) → {}  ({} B, quality {})",
                    secret.len(),
                    output.display(),
                    size,
                    mode.name(),
                );
            }

            // ── Decode ───────────────────────────────────────────────────────
            AudioOp::Decode { input, output_dir, password } => {
                let written = stego::decode(&input, &output_dir, password.as_deref(), None)?;
                for path in &written {
                    let size = std::fs::metadata(path)?.len();
                    println!("  recovered  {} ({} B)", path.display(), size);
                }
                println!("Extracted {} file(s) → {}", written.len(), output_dir.display());
            }

            // ── Analyze ──────────────────────────────────────────────────────
            AudioOp::Analyze { input, password, json } => {
                let report = stego::analyze(&input, password.as_deref())?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report).unwrap());
                } else {
                    println!("── Carrier analysis ─────────────────────────────────────");
                    println!("  Path         {}", input.display());
                    println!("  Verdict      {}", report.summary());
                    if let Some(quality) = report.quality {
                        println!("  Quality      {quality}");
                    }
                    if let Some(v) = report.cipher_version {
                        println!("  Cipher       v{v}");
                    }
                    if let Some(len) = report.payload_len {
                        println!("  Payload      {len} B");
                    }
                    if let Some(files) = &report.files {
                        println!("  {:<28} {:>12}  CRC32", "Name", "Size");
                        for f in files {
                            println!("  {:<28} {:>12}  {}", f.name, f.size, f.crc32);
                        }
                    }
                }
            }

            // ── Capacity ─────────────────────────────────────────────────────
            AudioOp::Capacity { input, quality } => {
                let mode = parse_quality(&quality);
                let bytes = stego::capacity(&input, mode)?;
                println!(
                    "{} can hold {} B ({:.2} KiB) at quality {}",
                    input.display(),
                    bytes,
                    bytes as f64 / 1024.0,
                    mode.name(),
                );
            }
        },
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_quality(s: &str) -> QualityMode {
    QualityMode::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown quality '{}', defaulting to normal", s);
        QualityMode::Normal
    })
}
