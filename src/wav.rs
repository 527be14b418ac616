//! WAV transcoder — lossless pass-through between a `.wav` file and the
//! codec's linear sample stream.
//!
//! The codec wants raw bytes plus the offset where sample data begins, so
//! this module does not decode samples at all: it walks the RIFF chunk list,
//! validates that the format is uncompressed integer PCM, and hands back the
//! file bytes with the `data` chunk bounds.  Everything outside
//! `data_start..data_end` (the 44-byte canonical header, or any extra
//! chunks) is carried through byte-identical.
//!
//! Lossy and float formats are refused outright — the embedding contract
//! requires a bit-exact round trip, which only integer PCM provides.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{GhostbitError, Result};

/// WAVE format tag for uncompressed integer PCM.
const FORMAT_PCM: u16 = 1;

/// A parsed carrier: the full file plus the sample-data window.
#[derive(Debug, Clone)]
pub struct WavStream {
    /// The entire file, byte for byte.
    pub bytes: Vec<u8>,
    /// Offset of the first sample byte (the codec's `header_len`).
    pub data_start: usize,
    /// Offset one past the last sample byte.
    pub data_end: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavStream {
    /// Bytes available to the LSB codec.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.data_end - self.data_start
    }
}

/// Read and validate a carrier file.
pub fn decode_to_pcm<P: AsRef<Path>>(path: P) -> Result<WavStream> {
    parse(fs::read(path)?)
}

/// Parse WAV bytes.  Fails with a format error on anything that is not
/// uncompressed integer PCM with a well-formed chunk list.
pub fn parse(bytes: Vec<u8>) -> Result<WavStream> {
    if bytes.len() < 12 || &bytes[..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(GhostbitError::Format(
            "not a RIFF/WAVE file".into(),
        ));
    }

    let mut cur = Cursor::new(&bytes[..]);
    cur.set_position(12);

    let mut fmt: Option<(u16, u16, u32, u16)> = None; // tag, channels, rate, bits

    loop {
        let pos = cur.position() as usize;
        if pos + 8 > bytes.len() {
            return Err(GhostbitError::Format(
                "no data chunk before end of file".into(),
            ));
        }
        let id: [u8; 4] = bytes[pos..pos + 4].try_into().unwrap();
        cur.set_position(pos as u64 + 4);
        let size = cur
            .read_u32::<LittleEndian>()
            .map_err(|_| GhostbitError::Format("truncated chunk header".into()))?
            as usize;
        let payload_start = pos + 8;

        match &id {
            b"fmt " => {
                if size < 16 || payload_start + size > bytes.len() {
                    return Err(GhostbitError::Format("malformed fmt chunk".into()));
                }
                cur.set_position(payload_start as u64);
                let tag = cur.read_u16::<LittleEndian>().unwrap_or(0);
                let channels = cur.read_u16::<LittleEndian>().unwrap_or(0);
                let sample_rate = cur.read_u32::<LittleEndian>().unwrap_or(0);
                let _byte_rate = cur.read_u32::<LittleEndian>().unwrap_or(0);
                let _block_align = cur.read_u16::<LittleEndian>().unwrap_or(0);
                let bits = cur.read_u16::<LittleEndian>().unwrap_or(0);
                fmt = Some((tag, channels, sample_rate, bits));
            }
            b"data" => {
                let (tag, channels, sample_rate, bits) = fmt.ok_or_else(|| {
                    GhostbitError::Format("data chunk precedes fmt chunk".into())
                })?;
                if tag != FORMAT_PCM {
                    return Err(GhostbitError::Format(format!(
                        "unsupported WAVE format tag {tag} — only integer PCM carriers are lossless"
                    )));
                }
                if !matches!(bits, 8 | 16 | 24 | 32) {
                    return Err(GhostbitError::Format(format!(
                        "unsupported sample width {bits} (expected 8/16/24/32)"
                    )));
                }
                if channels == 0 || sample_rate == 0 {
                    return Err(GhostbitError::Format(
                        "fmt chunk declares zero channels or sample rate".into(),
                    ));
                }
                if payload_start + size > bytes.len() {
                    return Err(GhostbitError::Format("truncated data chunk".into()));
                }
                return Ok(WavStream {
                    data_start: payload_start,
                    data_end: payload_start + size,
                    sample_rate,
                    channels,
                    bits_per_sample: bits,
                    bytes,
                });
            }
            _ => {}
        }

        // Chunks are word-aligned; odd sizes carry one pad byte.
        let advance = size + (size & 1);
        cur.set_position((payload_start + advance) as u64);
    }
}

/// Write a modified sample stream back to disk.
///
/// The stream is published atomically: bytes land in a `.part` sibling
/// first and are renamed over the target once fully written.
pub fn encode_from_pcm<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
    let path = path.as_ref();
    let staged = staged_path(path);
    fs::write(&staged, bytes)?;
    fs::rename(&staged, path)?;
    Ok(())
}

fn staged_path(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".into());
    path.with_file_name(format!(".{name}.part"))
}
