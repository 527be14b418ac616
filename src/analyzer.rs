//! Carrier inspection — report what is hidden without extracting it.
//!
//! The analyzer shares the decoder's probing logic but never writes payload
//! anywhere and never raises on corruption: a stream that fails structural
//! validation is simply reported as "no hidden data", and an encrypted
//! stream that cannot be opened (no password, or the wrong one) is reported
//! by version and size only.

use serde::Serialize;

use crate::capacity::WRAPPER_LEN;
use crate::container::{CipherVersion, Container};
use crate::crypto;
use crate::engine::wrapper_candidates;
use crate::lsb;

/// Per-file summary: name and size, never contents.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub size: u64,
    pub crc32: String,
}

/// What the analyzer learned about a carrier.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// A structurally plausible hidden stream was found.
    pub hidden: bool,
    /// Detected quality mode name, when a stream was found.
    pub quality: Option<&'static str>,
    /// Cipher version of the stream: 0 plaintext, 1 CBC legacy, 2 GCM.
    pub cipher_version: Option<u8>,
    /// Envelope (or plain container) size in bytes.
    pub payload_len: Option<u64>,
    /// Listed files — absent when the stream is encrypted and could not be
    /// opened.
    pub files: Option<Vec<FileSummary>>,
}

impl Report {
    fn none() -> Self {
        Report {
            hidden: false,
            quality: None,
            cipher_version: None,
            payload_len: None,
            files: None,
        }
    }

    pub fn file_count(&self) -> Option<usize> {
        self.files.as_ref().map(|f| f.len())
    }

    /// Total bytes across listed files.
    pub fn total_size(&self) -> Option<u64> {
        self.files
            .as_ref()
            .map(|f| f.iter().map(|s| s.size).sum())
    }

    /// One-line human verdict.
    pub fn summary(&self) -> String {
        if !self.hidden {
            return "no hidden data".into();
        }
        match (&self.files, self.cipher_version) {
            (Some(files), v) => format!(
                "{} hidden file(s), {} B total, cipher v{}",
                files.len(),
                self.total_size().unwrap_or(0),
                v.unwrap_or(0),
            ),
            (None, Some(v)) => format!(
                "encrypted payload (cipher v{v}, {} B) — password required",
                self.payload_len.unwrap_or(0),
            ),
            (None, None) => "hidden data present".into(),
        }
    }
}

/// Inspect `samples` for a hidden stream.
///
/// Probes the same candidates as the decoder.  All failures downgrade: a
/// carrier with no validating stream yields `hidden: false`, an encrypted
/// stream without a working password yields a version-and-size report.
pub fn analyze_samples(samples: &[u8], header_len: usize, password: Option<&str>) -> Report {
    if header_len > samples.len() {
        return Report::none();
    }
    let body = &samples[header_len..];

    let Ok(candidates) = wrapper_candidates(body) else {
        return Report::none();
    };

    // An encrypted candidate that could not be opened is kept as a fallback
    // verdict while the remaining modes are probed.
    let mut sealed: Option<Report> = None;

    for (mode, header) in candidates {
        let total_bits = (WRAPPER_LEN as u64 + header.total_len) * 8;
        let Ok(stream) = lsb::extract(body, mode, total_bits) else {
            continue;
        };
        let blob = &stream[WRAPPER_LEN..];

        let plaintext = match header.tag {
            CipherVersion::Plain => Some(blob.to_vec()),
            encrypted => password.and_then(|pw| crypto::open(blob, pw, encrypted).ok()),
        };

        match plaintext {
            Some(bytes) => match Container::parse(&bytes) {
                Ok(container) if container.cipher_version == header.tag => {
                    return Report {
                        hidden: true,
                        quality: Some(mode.name()),
                        cipher_version: Some(header.tag as u8),
                        payload_len: Some(header.total_len),
                        files: Some(
                            container
                                .files
                                .iter()
                                .map(|f| FileSummary {
                                    name: f.name.clone(),
                                    size: f.data.len() as u64,
                                    crc32: hex::encode(crc32fast::hash(&f.data).to_be_bytes()),
                                })
                                .collect(),
                        ),
                    };
                }
                // Parsed but inconsistent, or failed to parse: not this k.
                _ => continue,
            },
            // Encrypted and unopenable — report shape only, keep probing for
            // a candidate that validates fully.
            None => {
                sealed.get_or_insert(Report {
                    hidden: true,
                    quality: Some(mode.name()),
                    cipher_version: Some(header.tag as u8),
                    payload_len: Some(header.total_len),
                    files: None,
                });
            }
        }
    }

    sealed.unwrap_or_else(Report::none)
}
