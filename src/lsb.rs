//! LSB codec — threads a payload bit-stream through the low `k` bits of
//! each carrier byte.
//!
//! # Contract (frozen)
//! - Carrier bytes are visited strictly in order of byte offset.  No stride,
//!   no channel interleaving; multi-byte sample endianness is irrelevant
//!   because every byte is treated independently.
//! - Only the low `k` bits of a visited byte are altered; bits ≥ `k` are
//!   preserved exactly.  Bytes past the end of the payload are not touched
//!   at all.
//! - Payload bits are consumed MSB-first; within one carrier byte the first
//!   consumed bit lands in the highest of the `k` low bits.
//!
//! `k` is 1, 2, or 4 — each divides 8, so one payload byte always spans a
//! whole number of carrier bytes and a `k`-bit group never straddles a
//! payload byte boundary.

use crate::error::{GhostbitError, Result};

/// Embedding density: how many low bits of every carrier byte hold payload.
///
/// Higher quality means fewer bits borrowed per byte — less audible noise,
/// less capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    /// 1 payload bit per carrier byte (ratio 8) — inaudible, smallest capacity.
    High,
    /// 2 payload bits per carrier byte (ratio 4).
    Normal,
    /// 4 payload bits per carrier byte (ratio 2) — audible hiss on quiet audio.
    Low,
}

impl QualityMode {
    /// Probe order used by decode/analyze when the mode is unknown.
    pub const ALL: [QualityMode; 3] = [QualityMode::High, QualityMode::Normal, QualityMode::Low];

    /// Number of low bits used per carrier byte (`k`).
    #[inline]
    pub fn bits_per_byte(self) -> u32 {
        match self {
            QualityMode::High => 1,
            QualityMode::Normal => 2,
            QualityMode::Low => 4,
        }
    }

    /// Carrier bytes consumed per payload bit times eight: 1 payload bit per
    /// `ratio` carrier sample bits.
    #[inline]
    pub fn ratio(self) -> u32 {
        8 / self.bits_per_byte()
    }

    /// Mask selecting the payload bits of a carrier byte.
    #[inline]
    pub fn mask(self) -> u8 {
        ((1u16 << self.bits_per_byte()) - 1) as u8
    }

    /// Human-readable name (for diagnostics and CLI parsing — never stored).
    pub fn name(self) -> &'static str {
        match self {
            QualityMode::High => "high",
            QualityMode::Normal => "normal",
            QualityMode::Low => "low",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(QualityMode::High),
            "normal" => Some(QualityMode::Normal),
            "low" => Some(QualityMode::Low),
            _ => None,
        }
    }
}

/// `k` payload bits starting at `bit_pos`, MSB-first.  `bit_pos` is always a
/// multiple of `k` here, so the group sits inside one payload byte.
#[cfg(feature = "parallel")]
#[inline]
fn payload_group(payload: &[u8], bit_pos: usize, k: u32) -> u8 {
    let byte = payload[bit_pos / 8];
    let offset = (bit_pos % 8) as u32;
    (byte >> (8 - offset - k)) & (((1u16 << k) - 1) as u8)
}

/// Embed `payload` into the low `k` bits of `body`, in place.
///
/// Fails with a capacity error — before any byte is modified — when the
/// payload does not fit.  Carrier bytes past the end of the payload are left
/// untouched; the caller prefixes the payload with its own length so that
/// extraction knows where to stop.
pub fn embed(body: &mut [u8], payload: &[u8], mode: QualityMode) -> Result<()> {
    let k = mode.bits_per_byte();
    let needed_bits = payload.len() as u64 * 8;
    let available_bits = body.len() as u64 * k as u64;
    if needed_bits > available_bits {
        return Err(GhostbitError::Capacity {
            needed_bits,
            available_bits,
        });
    }

    // Carrier bytes actually written: 8/k per payload byte.
    let used = payload.len() * (8 / k as usize);
    let keep = !mode.mask();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        // Each carrier byte depends only on its own index — the loop fans
        // out over disjoint ranges and stays bit-identical to the serial
        // path.
        const CHUNK: usize = 64 * 1024;
        body[..used]
            .par_chunks_mut(CHUNK)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let base = chunk_idx * CHUNK;
                for (i, b) in chunk.iter_mut().enumerate() {
                    let group = payload_group(payload, (base + i) * k as usize, k);
                    *b = (*b & keep) | group;
                }
            });
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut bits = crate::bits::BitReader::new(payload);
        for b in body[..used].iter_mut() {
            let group = bits.read_bits(k)? as u8;
            *b = (*b & keep) | group;
        }
        Ok(())
    }
}

/// Extract `n_bits` payload bits from the low `k` bits of `body`.
///
/// Returns the packed payload bytes (MSB-first, final byte zero-padded when
/// `n_bits` is not a multiple of 8).  Fails with a capacity error when the
/// body cannot hold `n_bits`.
pub fn extract(body: &[u8], mode: QualityMode, n_bits: u64) -> Result<Vec<u8>> {
    let k = mode.bits_per_byte();
    let available_bits = body.len() as u64 * k as u64;
    if n_bits > available_bits {
        return Err(GhostbitError::Capacity {
            needed_bits: n_bits,
            available_bits,
        });
    }

    let out_len = ((n_bits + 7) / 8) as usize;
    let mut out = vec![0u8; out_len];
    let mask = mode.mask();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        // One output byte packs the low-k groups of exactly 8/k carrier
        // bytes, so whole output bytes are independent of each other.  The
        // trailing partial byte (if any) is finished serially below.
        let per_out = (8 / k) as usize;
        let full = (n_bits / 8) as usize;
        const CHUNK: usize = 16 * 1024;
        out[..full]
            .par_chunks_mut(CHUNK)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let base = chunk_idx * CHUNK;
                for (j, o) in chunk.iter_mut().enumerate() {
                    let mut acc = 0u8;
                    let start = (base + j) * per_out;
                    for &b in &body[start..start + per_out] {
                        acc = (acc << k) | (b & mask);
                    }
                    *o = acc;
                }
            });

        let tail_bits = n_bits - full as u64 * 8;
        if tail_bits > 0 {
            let mut acc = 0u8;
            let mut got = 0u64;
            let mut idx = full * per_out;
            while got < tail_bits {
                let take = k.min((tail_bits - got) as u32);
                // Highest `take` of the k low bits come first.
                let group = (body[idx] & mask) >> (k - take);
                acc = (acc << take) | group;
                got += take as u64;
                idx += 1;
            }
            out[full] = acc << (8 - tail_bits % 8) % 8;
        }
        Ok(out)
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut writer = crate::bits::BitWriter::new(&mut out);
        let mut collected = 0u64;
        for &b in body {
            if collected >= n_bits {
                break;
            }
            let take = k.min((n_bits - collected) as u32);
            let group = ((b & mask) >> (k - take)) as u64;
            writer.write_bits(group, take)?;
            collected += take as u64;
        }
        Ok(out)
    }
}
