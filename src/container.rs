//! Container format — the self-describing bundle embedded into the carrier.
//!
//! # Wire layout (all integers big-endian)
//!
//! ```text
//! MAGIC          4 B   "GBIT"
//! VERSION        1 B   = 1
//! CIPHER_VERSION 1 B   0=plaintext  1=AES-CBC legacy  2=AES-GCM
//! FILE_COUNT     2 B   1..=65535
//! entries        FILE_COUNT ×:
//!     NAME_LEN   2 B   1..=1024
//!     NAME       NAME_LEN B   UTF-8, no '/', '\', NUL
//!     DATA_LEN   8 B   ≤ 2^47
//!     DATA       DATA_LEN B
//!     CRC32      4 B   CRC32 of DATA
//! END_MARKER     4 B   "ENDB"
//! ```
//!
//! # Stream wrapper
//! The container (or its encryption envelope) never enters the carrier bare.
//! The bit-stream is `VERSION_TAG (1 B) | TOTAL_LEN (8 B BE) | blob`, where
//! the tag repeats the cipher version out-of-band so the decoder picks its
//! decrypt path without shape-sniffing the blob.
//!
//! # Validation
//! Parsing is strict: wrong magic, wrong version, unknown cipher version,
//! zero files, an out-of-range length, a CRC mismatch, a bad name, a missing
//! end marker, or trailing bytes all abort with a format error.  Cheap
//! checks run first; no allocation happens for a length the input cannot
//! actually satisfy.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::capacity::WRAPPER_LEN;
use crate::error::{GhostbitError, Result};

pub const MAGIC: &[u8; 4] = b"GBIT";
pub const END_MARKER: &[u8; 4] = b"ENDB";
pub const CONTAINER_VERSION: u8 = 1;
pub const MAX_NAME_LEN: usize = 1024;
pub const MAX_DATA_LEN: u64 = 1 << 47;

// ── Cipher version ───────────────────────────────────────────────────────────

/// Discriminates the encryption envelope around the container.  Written both
/// inside the container and as the out-of-band stream wrapper tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CipherVersion {
    /// No envelope — the container is embedded as-is.
    Plain = 0,
    /// AES-256-CBC + HMAC-SHA256.  Decode-only; new carriers never use it.
    AesCbcLegacy = 1,
    /// AES-256-GCM.  The only version the encoder emits for passwords.
    AesGcm = 2,
}

impl CipherVersion {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CipherVersion::Plain),
            1 => Some(CipherVersion::AesCbcLegacy),
            2 => Some(CipherVersion::AesGcm),
            _ => None,
        }
    }

    #[inline]
    pub fn is_encrypted(self) -> bool {
        !matches!(self, CipherVersion::Plain)
    }
}

// ── Secret file ──────────────────────────────────────────────────────────────

/// One named payload inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SecretFile {
    pub fn new<N: Into<String>>(name: N, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Reject names that could escape the output directory or be unencodable.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GhostbitError::Format("empty file name".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(GhostbitError::Format(format!(
            "file name is {} bytes (max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(GhostbitError::Format(format!(
            "file name {name:?} contains a path separator or NUL"
        )));
    }
    Ok(())
}

// ── Container ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub cipher_version: CipherVersion,
    pub files: Vec<SecretFile>,
}

impl Container {
    /// Build a container, validating every file up front.
    pub fn new(cipher_version: CipherVersion, files: Vec<SecretFile>) -> Result<Self> {
        if files.is_empty() {
            return Err(GhostbitError::Format("container holds zero files".into()));
        }
        if files.len() > u16::MAX as usize {
            return Err(GhostbitError::Format(format!(
                "container holds {} files (max {})",
                files.len(),
                u16::MAX
            )));
        }
        for f in &files {
            validate_name(&f.name)?;
            if f.data.len() as u64 > MAX_DATA_LEN {
                return Err(GhostbitError::Format(format!(
                    "file {:?} is {} bytes (max {MAX_DATA_LEN})",
                    f.name,
                    f.data.len()
                )));
            }
        }
        Ok(Self {
            cipher_version,
            files,
        })
    }

    /// Serialised byte length, exact.
    pub fn serialized_len(&self) -> usize {
        let mut len = MAGIC.len() + 1 + 1 + 2 + END_MARKER.len();
        for f in &self.files {
            len += 2 + f.name.len() + 8 + f.data.len() + 4;
        }
        len
    }

    /// Marshal per the wire layout above.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.serialized_len());
        out.extend_from_slice(MAGIC);
        out.push(CONTAINER_VERSION);
        out.push(self.cipher_version as u8);
        out.write_u16::<BigEndian>(self.files.len() as u16)
            .expect("vec write is infallible");

        for f in &self.files {
            out.write_u16::<BigEndian>(f.name.len() as u16)
                .expect("vec write is infallible");
            out.extend_from_slice(f.name.as_bytes());
            out.write_u64::<BigEndian>(f.data.len() as u64)
                .expect("vec write is infallible");
            out.extend_from_slice(&f.data);

            let mut h = Hasher::new();
            h.update(&f.data);
            out.write_u32::<BigEndian>(h.finalize())
                .expect("vec write is infallible");
        }

        out.extend_from_slice(END_MARKER);
        Ok(out)
    }

    /// Unmarshal and fully validate.  The input must be exactly one
    /// container — trailing bytes are corruption.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        read_exact(&mut cur, &mut magic)?;
        if &magic != MAGIC {
            return Err(GhostbitError::Format(format!(
                "bad magic {:02x?} (expected \"GBIT\")",
                magic
            )));
        }

        let version = cur
            .read_u8()
            .map_err(|_| truncated("container version"))?;
        if version != CONTAINER_VERSION {
            return Err(GhostbitError::Format(format!(
                "unsupported container version {version} (this build handles v{CONTAINER_VERSION})"
            )));
        }

        let cipher_raw = cur.read_u8().map_err(|_| truncated("cipher version"))?;
        let cipher_version = CipherVersion::from_u8(cipher_raw).ok_or_else(|| {
            GhostbitError::Format(format!("unknown cipher version {cipher_raw}"))
        })?;

        let file_count = cur
            .read_u16::<BigEndian>()
            .map_err(|_| truncated("file count"))?;
        if file_count == 0 {
            return Err(GhostbitError::Format("container holds zero files".into()));
        }

        let mut files = Vec::with_capacity(file_count as usize);
        for i in 0..file_count {
            let name_len = cur
                .read_u16::<BigEndian>()
                .map_err(|_| truncated("name length"))? as usize;
            if name_len == 0 || name_len > MAX_NAME_LEN {
                return Err(GhostbitError::Format(format!(
                    "entry {i}: name length {name_len} out of range 1..={MAX_NAME_LEN}"
                )));
            }
            let mut name_buf = vec![0u8; name_len];
            read_exact(&mut cur, &mut name_buf)?;
            let name = String::from_utf8(name_buf).map_err(|_| {
                GhostbitError::Format(format!("entry {i}: file name is not UTF-8"))
            })?;
            validate_name(&name)?;

            let data_len = cur
                .read_u64::<BigEndian>()
                .map_err(|_| truncated("data length"))?;
            if data_len > MAX_DATA_LEN {
                return Err(GhostbitError::Format(format!(
                    "entry {i} ({name:?}): data length {data_len} exceeds {MAX_DATA_LEN}"
                )));
            }
            // Bound the allocation by what the input can actually supply.
            let remaining = bytes.len() as u64 - cur.position();
            if data_len > remaining {
                return Err(truncated("file data"));
            }
            let mut data = vec![0u8; data_len as usize];
            read_exact(&mut cur, &mut data)?;

            let stored_crc = cur
                .read_u32::<BigEndian>()
                .map_err(|_| truncated("data CRC32"))?;
            let mut h = Hasher::new();
            h.update(&data);
            let actual_crc = h.finalize();
            if stored_crc != actual_crc {
                return Err(GhostbitError::Format(format!(
                    "entry {i} ({name:?}): CRC32 mismatch (stored {stored_crc:#010x}, computed {actual_crc:#010x})"
                )));
            }

            files.push(SecretFile { name, data });
        }

        let mut end = [0u8; 4];
        read_exact(&mut cur, &mut end)?;
        if &end != END_MARKER {
            return Err(GhostbitError::Format(format!(
                "bad end marker {:02x?} (expected \"ENDB\")",
                end
            )));
        }
        if (cur.position() as usize) != bytes.len() {
            return Err(GhostbitError::Format(format!(
                "{} trailing bytes after end marker",
                bytes.len() - cur.position() as usize
            )));
        }

        Ok(Self {
            cipher_version,
            files,
        })
    }
}

// ── Stream wrapper ───────────────────────────────────────────────────────────

/// Parsed `VERSION_TAG | TOTAL_LEN` stream prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperHeader {
    pub tag: CipherVersion,
    pub total_len: u64,
}

/// Prefix `blob` with the 9-byte stream wrapper.
pub fn wrap(tag: CipherVersion, blob: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WRAPPER_LEN + blob.len());
    out.push(tag as u8);
    out.write_u64::<BigEndian>(blob.len() as u64)
        .expect("vec write is infallible");
    out.extend_from_slice(blob);
    out
}

/// Parse the 9-byte stream wrapper.  Returns `None` when the bytes cannot be
/// a wrapper at all (unknown tag, zero length) — callers decide whether that
/// means "no hidden data" or corruption.
pub fn parse_wrapper(prefix: &[u8; 9]) -> Option<WrapperHeader> {
    let tag = CipherVersion::from_u8(prefix[0])?;
    let total_len = u64::from_be_bytes(prefix[1..9].try_into().unwrap());
    if total_len == 0 {
        return None;
    }
    Some(WrapperHeader { tag, total_len })
}

fn truncated(what: &str) -> GhostbitError {
    GhostbitError::Format(format!("truncated container while reading {what}"))
}

fn read_exact(cur: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    use std::io::Read;
    cur.read_exact(buf)
        .map_err(|_| truncated("fixed-width field"))
}
