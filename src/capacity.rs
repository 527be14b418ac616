//! Payload budget arithmetic.
//!
//! The public helper returns the generous plaintext (v0) figure: wrapper and
//! container overhead subtracted, envelope overhead and file names excluded.
//! The engine enforces the exact bit-level check at embed time, so the
//! helper is advisory while the enforcement is precise.

use crate::lsb::QualityMode;

/// Bytes consumed by the stream wrapper: VERSION_TAG (1) + TOTAL_LEN (8).
pub const WRAPPER_LEN: usize = 9;

/// Fixed container bytes: MAGIC (4) + VERSION (1) + CIPHER_VERSION (1) +
/// FILE_COUNT (2) + END_MARKER (4).
pub const CONTAINER_FIXED_LEN: usize = 12;

/// Per-file container bytes excluding the name: NAME_LEN (2) +
/// DATA_LEN (8) + CRC32 (4).
pub const CONTAINER_PER_FILE_LEN: usize = 14;

/// v2 envelope bytes: salt (16) + nonce (12) + GCM tag (16).
pub const ENVELOPE_V2_OVERHEAD: usize = 44;

/// v1 envelope bytes excluding PKCS#7 padding: salt (16) + IV (16) +
/// MAC (32).  Padding adds 1..=16 more.
pub const ENVELOPE_V1_OVERHEAD: usize = 64;

/// Container overhead for `files` entries, names excluded.
pub fn container_overhead(files: usize) -> u64 {
    CONTAINER_FIXED_LEN as u64 + files as u64 * CONTAINER_PER_FILE_LEN as u64
}

/// Maximum total payload bytes (sum of secret file sizes) that a body of
/// `body_len` bytes can carry in `mode`, assuming `estimated_files` entries
/// and no encryption.  Saturates at zero; monotonic in `body_len`.
pub fn max_payload_bytes(body_len: u64, mode: QualityMode, estimated_files: usize) -> u64 {
    let raw = body_len * mode.bits_per_byte() as u64 / 8;
    raw.saturating_sub(WRAPPER_LEN as u64)
        .saturating_sub(container_overhead(estimated_files))
}
