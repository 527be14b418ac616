//! # ghostbit — LSB audio steganography engine
//!
//! Format guarantees (frozen in container v1):
//! - All wire integers are big-endian; never negotiated
//! - The bit-stream is self-describing: 1-byte cipher tag, 8-byte total
//!   length, then the envelope or the bare container
//! - Every file in the container carries a mandatory CRC32; corrupt payload
//!   aborts extraction
//! - Only the low `k` bits (k = 1, 2, or 4) of body bytes are ever written;
//!   the audio header and all higher bits survive bit-exact
//! - Encrypted payloads are sealed with Argon2id + AES-256-GCM (v2); the
//!   AES-256-CBC + HMAC format (v1) is decode-only
//! - Every decrypt failure reports the same error — wrong password and
//!   corrupted data are indistinguishable by design of the error surface
//! - Lossy carriers are refused up front; there is no partial extraction
//!   and no fallback

pub mod analyzer;
pub mod bits;
pub mod capacity;
pub mod container;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod lsb;
pub mod stego;
pub mod wav;

// Flat re-exports for the most common types.
pub use analyzer::{analyze_samples, FileSummary, Report};
pub use bits::{BitReader, BitWriter};
pub use capacity::max_payload_bytes;
pub use container::{CipherVersion, Container, SecretFile};
pub use crypto::{derive_key, CryptoError};
pub use engine::{decode_samples, encode_samples, DecodeOutcome, Flow, ProgressSink, Silent};
pub use error::{GhostbitError, Result};
pub use lsb::QualityMode;
pub use stego::{PasswordProvider, PasswordReply};
pub use wav::WavStream;
