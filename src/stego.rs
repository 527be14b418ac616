//! Path-level API — the embedding surface for callers that work with files.
//!
//! ```no_run
//! use ghostbit::stego;
//! use ghostbit::QualityMode;
//!
//! stego::encode(
//!     "carrier.wav",
//!     &["secret.pdf".into()],
//!     "innocent.wav",
//!     QualityMode::Normal,
//!     Some("p@ss"),
//! )?;
//!
//! let written = stego::decode("innocent.wav", "out/", Some("p@ss"), None)?;
//! assert_eq!(written.len(), 1);
//! # Ok::<(), ghostbit::GhostbitError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::{analyze_samples, Report};
use crate::capacity::max_payload_bytes;
use crate::container::SecretFile;
use crate::engine::{decode_samples, encode_samples, DecodeOutcome, Silent};
use crate::error::{GhostbitError, Result};
use crate::lsb::QualityMode;
use crate::wav;

// ── Password provider ────────────────────────────────────────────────────────

/// Reply from a [`PasswordProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordReply {
    Provide(String),
    Cancel,
}

/// Callback consulted when encrypted data is found but no password was
/// given.  Returning [`PasswordReply::Cancel`] aborts the decode with
/// [`GhostbitError::Cancelled`].
pub trait PasswordProvider {
    fn request(&mut self) -> PasswordReply;
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Hide `secret_paths` inside the carrier at `carrier_path`, writing the
/// result to `output_path`.
///
/// The output file is byte-identical to the carrier outside the low `k`
/// bits of its sample data.  With a password the payload is sealed with
/// AES-256-GCM.
pub fn encode<P: AsRef<Path>, Q: AsRef<Path>>(
    carrier_path: P,
    secret_paths: &[PathBuf],
    output_path: Q,
    mode: QualityMode,
    password: Option<&str>,
) -> Result<()> {
    let carrier = wav::decode_to_pcm(carrier_path)?;

    let mut files = Vec::with_capacity(secret_paths.len());
    for path in secret_paths {
        let name = path
            .file_name()
            .ok_or_else(|| {
                GhostbitError::Format(format!("{} has no file name", path.display()))
            })?
            .to_string_lossy()
            .into_owned();
        files.push(SecretFile::new(name, fs::read(path)?));
    }

    // Only the data-chunk window is handed to the codec; trailing chunks
    // (if any) ride along untouched.
    let (window, tail) = carrier.bytes.split_at(carrier.data_end);
    let mut encoded = encode_samples(
        window,
        carrier.data_start,
        files,
        mode,
        password,
        &mut Silent,
    )?;
    encoded.extend_from_slice(tail);

    wav::encode_from_pcm(&encoded, output_path)
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Extract hidden files from `encoded_path` into `output_dir`, creating the
/// directory if needed.  Returns the paths written.
///
/// When the stream is encrypted and `password` is `None`, `provider` (if
/// any) is asked once; without a provider the call fails with
/// [`GhostbitError::KeyRequired`].  Each file is staged under a temporary
/// name and renamed into place only after the whole container validated —
/// an auth or format failure writes nothing.
pub fn decode<P: AsRef<Path>, Q: AsRef<Path>>(
    encoded_path: P,
    output_dir: Q,
    password: Option<&str>,
    provider: Option<&mut dyn PasswordProvider>,
) -> Result<Vec<PathBuf>> {
    let carrier = wav::decode_to_pcm(encoded_path)?;
    let window = &carrier.bytes[..carrier.data_end];

    let outcome = match decode_samples(window, carrier.data_start, password, &mut Silent) {
        Err(GhostbitError::KeyRequired) => match provider {
            Some(provider) => match provider.request() {
                PasswordReply::Provide(pw) => {
                    decode_samples(window, carrier.data_start, Some(&pw), &mut Silent)?
                }
                PasswordReply::Cancel => return Err(GhostbitError::Cancelled),
            },
            None => return Err(GhostbitError::KeyRequired),
        },
        other => other?,
    };

    write_files(output_dir.as_ref(), &outcome)
}

fn write_files(output_dir: &Path, outcome: &DecodeOutcome) -> Result<Vec<PathBuf>> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }

    let mut written = Vec::with_capacity(outcome.files.len());
    for file in &outcome.files {
        // Container parsing already rejected separators and NUL; the name is
        // safe to join.
        let target = output_dir.join(&file.name);
        let staged = output_dir.join(format!(".{}.part", file.name));
        fs::write(&staged, &file.data)?;
        fs::rename(&staged, &target)?;
        written.push(target);
    }
    Ok(written)
}

// ── Analyze / capacity ───────────────────────────────────────────────────────

/// Inspect a carrier file without extracting anything.
pub fn analyze<P: AsRef<Path>>(encoded_path: P, password: Option<&str>) -> Result<Report> {
    let carrier = wav::decode_to_pcm(encoded_path)?;
    Ok(analyze_samples(
        &carrier.bytes[..carrier.data_end],
        carrier.data_start,
        password,
    ))
}

/// Advisory payload budget for a carrier in the given mode, assuming one
/// secret file and no encryption.
pub fn capacity<P: AsRef<Path>>(carrier_path: P, mode: QualityMode) -> Result<u64> {
    let carrier = wav::decode_to_pcm(carrier_path)?;
    Ok(max_payload_bytes(carrier.body_len() as u64, mode, 1))
}
