//! Encryption envelope — Argon2id key derivation plus two authenticated
//! cipher formats.
//!
//! Blob layouts (sizes in bytes):
//!
//! ```text
//! v2 (AES-256-GCM, read+write):  salt (16) | nonce (12) | ciphertext+tag (n+16)
//! v1 (AES-256-CBC, read-only):   salt (16) | IV (16) | ciphertext (PKCS#7) | HMAC-SHA256 (32)
//! ```
//!
//! Key derivation: Argon2id, memory 64 MiB, 3 iterations, parallelism 4,
//! 32-byte key, fresh random 16-byte salt per seal.  These parameters are
//! frozen for interoperability.
//!
//! The GCM AAD is empty: the envelope travels whole inside the bit-stream,
//! so no container bytes exist in the clear to bind.  The v1 MAC covers
//! `IV || ciphertext` with the same 32-byte key as the cipher, and is
//! verified (constant-time) before any block is decrypted.
//!
//! Every failure on the open path — short blob, bad tag, bad MAC, bad
//! padding — collapses into one uniform [`CryptoError::DecryptionFailed`].
//! Nothing distinguishes a wrong password from corrupted data.

use aes::Aes256;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

use crate::container::CipherVersion;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length (v2).
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length (v2).
pub const TAG_LEN: usize = 16;
/// AES-CBC initialisation vector length (v1).
pub const IV_LEN: usize = 16;
/// HMAC-SHA256 length (v1).
pub const MAC_LEN: usize = 32;

const AES_BLOCK: usize = 16;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

impl From<CryptoError> for crate::error::GhostbitError {
    /// Crypto failures are non-retriable and deliberately featureless at
    /// the boundary.
    fn from(_: CryptoError) -> Self {
        crate::error::GhostbitError::Auth
    }
}

/// Derive a 256-bit key from a password and a 16-byte salt using Argon2id
/// with the frozen parameter set.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params = Params::new(64 * 1024, 3, 4, Some(KEY_LEN))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Seal `plaintext` under `password` as a v2 (AES-256-GCM) blob.
///
/// Returns `salt (16) || nonce (12) || ciphertext || tag (16)`.  New seals
/// are always v2; the v1 format exists only on the open path.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = derive_key(password, &salt)?;
    let result = seal_with_key(&key, &salt, plaintext);
    key.zeroize();
    result
}

fn seal_with_key(
    key: &[u8; KEY_LEN],
    salt: &[u8; SALT_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(salt);
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open an envelope blob of the given version.
///
/// All parse/verify/decrypt failures return the same
/// [`CryptoError::DecryptionFailed`].
pub fn open(
    blob: &[u8],
    password: &str,
    version: CipherVersion,
) -> Result<Vec<u8>, CryptoError> {
    match version {
        CipherVersion::AesGcm => open_v2(blob, password),
        CipherVersion::AesCbcLegacy => open_v1(blob, password),
        // A plaintext stream has no envelope; asking to open one is already
        // a sign of corruption upstream.
        CipherVersion::Plain => Err(CryptoError::DecryptionFailed),
    }
}

fn open_v2(blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let salt = &blob[..SALT_LEN];
    let nonce = &blob[SALT_LEN..SALT_LEN + NONCE_LEN];
    let ciphertext = &blob[SALT_LEN + NONCE_LEN..];

    let mut key = derive_key(password, salt)?;
    let result = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| CryptoError::DecryptionFailed)
        .and_then(|cipher| {
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| CryptoError::DecryptionFailed)
        });
    key.zeroize();
    result
}

fn open_v1(blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    // Smallest valid v1 blob: one padded block of ciphertext.
    if blob.len() < SALT_LEN + IV_LEN + AES_BLOCK + MAC_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let salt = &blob[..SALT_LEN];
    let iv = &blob[SALT_LEN..SALT_LEN + IV_LEN];
    let ciphertext = &blob[SALT_LEN + IV_LEN..blob.len() - MAC_LEN];
    let stored_mac = &blob[blob.len() - MAC_LEN..];
    if ciphertext.len() % AES_BLOCK != 0 {
        return Err(CryptoError::DecryptionFailed);
    }

    let mut key = derive_key(password, salt)?;
    let result = verify_and_decrypt_v1(&key, iv, ciphertext, stored_mac);
    key.zeroize();
    result
}

fn verify_and_decrypt_v1(
    key: &[u8; KEY_LEN],
    iv: &[u8],
    ciphertext: &[u8],
    stored_mac: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    // MAC first; no block is decrypted until the ciphertext authenticates.
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    mac.update(iv);
    mac.update(ciphertext);
    mac.verify_slice(stored_mac)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| CryptoError::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Produce a v1 blob.  The production encoder cannot emit v1; this exists so
/// the decode path can be exercised against known-good legacy input.
#[cfg(test)]
pub(crate) fn seal_legacy(plaintext: &[u8], password: &str) -> Vec<u8> {
    use cbc::cipher::BlockEncryptMut;
    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut key = derive_key(password, &salt).unwrap();
    let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key).unwrap();
    mac.update(&iv);
    mac.update(&ciphertext);
    let tag = mac.finalize().into_bytes();
    key.zeroize();

    let mut out = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len() + MAC_LEN);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    out
}
