//! Unified error taxonomy for the steganographic pipeline.
//!
//! Every stage (bit cursor, LSB codec, container, envelope, engine, file
//! facade) reports through [`GhostbitError`].  Crypto failures are collapsed
//! into the single [`GhostbitError::Auth`] variant with one fixed message —
//! callers never learn whether the salt, tag, MAC, or padding was at fault.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhostbitError {
    /// Payload (or a bit-cursor operation) exceeds the carrier's capacity.
    #[error("Payload does not fit: need {needed_bits} bits, carrier holds {available_bits}")]
    Capacity { needed_bits: u64, available_bits: u64 },

    /// Malformed container: bad magic, version, CRC, end marker, or an
    /// invalid file name.
    #[error("Malformed container: {0}")]
    Format(String),

    /// Any KDF/decrypt/tag/MAC/padding failure.  The message is uniform —
    /// one variant, no fields — so no oracle about which check failed.
    #[error("Decryption failed — wrong password or corrupted data")]
    Auth,

    /// Encrypted data was found but no password was provided.
    #[error("Carrier is encrypted but no password was provided")]
    KeyRequired,

    /// A progress or password callback requested cancellation.
    #[error("Operation cancelled")]
    Cancelled,

    /// The carrier holds no hidden data.
    #[error("No hidden data found in carrier")]
    NoData,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GhostbitError {
    /// Process exit code for the CLI: 0 is success, the rest per the
    /// documented contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            GhostbitError::Capacity { .. }
            | GhostbitError::Format(_)
            | GhostbitError::NoData => 2,
            GhostbitError::Auth | GhostbitError::KeyRequired => 3,
            GhostbitError::Io(_) => 4,
            GhostbitError::Cancelled => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, GhostbitError>;
