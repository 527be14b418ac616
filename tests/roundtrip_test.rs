use std::fs;
use std::path::{Path, PathBuf};

use ghostbit::stego;
use ghostbit::{GhostbitError, PasswordProvider, PasswordReply, QualityMode};
use tempfile::TempDir;

/// Canonical 44-byte-header WAV: `seconds` of stereo 44.1 kHz 16-bit sine.
fn sine_wav(seconds: f64) -> Vec<u8> {
    let frames = (44_100.0 * seconds) as usize;
    let mut samples = Vec::with_capacity(frames * 4);
    for i in 0..frames {
        let v = ((i as f64 * 0.0587).sin() * 12_000.0) as i16;
        samples.extend_from_slice(&v.to_le_bytes()); // left
        samples.extend_from_slice(&v.to_le_bytes()); // right
    }
    wav_bytes(16, 2, &samples)
}

/// Deterministic noise carrier (no hidden data).
fn noise_wav(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let samples: Vec<u8> = (0..len)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (state >> 33) as u8
        })
        .collect();
    wav_bytes(16, 2, &samples)
}

fn wav_bytes(bits: u16, channels: u16, samples: &[u8]) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut out = Vec::with_capacity(44 + samples.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&44_100u32.to_le_bytes());
    out.extend_from_slice(&(44_100u32 * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    out.extend_from_slice(samples);
    out
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

fn assert_file_eq(path: &Path, expected: &[u8]) {
    assert_eq!(fs::read(path).unwrap(), expected, "{}", path.display());
}

#[test]
fn wav_normal_no_password_round_trip() {
    let fx = Fixture::new();
    let carrier_bytes = sine_wav(10.0);
    let carrier = fx.write("carrier.wav", &carrier_bytes);
    let secret = fx.write("hello.txt", b"Hello, world!\n");
    let encoded = fx.path("encoded.wav");

    stego::encode(&carrier, &[secret], &encoded, QualityMode::Normal, None).unwrap();

    // Length and header preserved exactly.
    let encoded_bytes = fs::read(&encoded).unwrap();
    assert_eq!(encoded_bytes.len(), carrier_bytes.len());
    assert_eq!(&encoded_bytes[..44], &carrier_bytes[..44]);

    let out_dir = fx.path("out");
    let written = stego::decode(&encoded, &out_dir, None, None).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].file_name().unwrap(), "hello.txt");
    assert_file_eq(&written[0], b"Hello, world!\n");
}

#[test]
fn multi_file_high_with_password_round_trip() {
    let fx = Fixture::new();
    let carrier = fx.write("carrier.wav", &sine_wav(10.0));
    let a: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
    let b: Vec<u8> = (0u16..=255).rev().map(|b| b as u8).collect();
    let a_path = fx.write("a.bin", &a);
    let b_path = fx.write("b.bin", &b);
    let encoded = fx.path("encoded.wav");

    stego::encode(
        &carrier,
        &[a_path, b_path],
        &encoded,
        QualityMode::High,
        Some("p@ss"),
    )
    .unwrap();

    // The recovered stream must carry cipher version 2.
    let report = stego::analyze(&encoded, Some("p@ss")).unwrap();
    assert!(report.hidden);
    assert_eq!(report.cipher_version, Some(2));
    assert_eq!(report.file_count(), Some(2));

    let out_dir = fx.path("out");
    let written = stego::decode(&encoded, &out_dir, Some("p@ss"), None).unwrap();
    assert_eq!(written.len(), 2);
    assert_file_eq(&written[0], &a);
    assert_file_eq(&written[1], &b);
}

#[test]
fn capacity_overflow_writes_nothing() {
    let fx = Fixture::new();
    // 100 kB body at k=1 holds ~12.5 kB.
    let carrier = fx.write("carrier.wav", &wav_bytes(16, 2, &vec![0x33u8; 100_000]));
    let secret = fx.write("big.bin", &vec![0xEEu8; 20_000]);
    let encoded = fx.path("encoded.wav");

    let err = stego::encode(&carrier, &[secret], &encoded, QualityMode::High, None).unwrap_err();
    assert!(matches!(err, GhostbitError::Capacity { .. }));
    assert!(!encoded.exists());

    // The advisory figure agrees: body/8 minus overhead is below 20 kB.
    let cap = stego::capacity(&carrier, QualityMode::High).unwrap();
    assert!(cap < 20_000, "capacity {cap}");
    assert!(cap > 12_000, "capacity {cap}");
}

#[test]
fn tampering_with_ciphertext_fails_tampering_with_header_does_not() {
    let fx = Fixture::new();
    let carrier = fx.write("carrier.wav", &sine_wav(2.0));
    let secret = fx.write("secret.txt", b"tamper test payload");
    let encoded = fx.path("encoded.wav");

    stego::encode(&carrier, &[secret], &encoded, QualityMode::High, Some("p@ss")).unwrap();
    let good = fs::read(&encoded).unwrap();

    // Flip a carried bit deep inside the ciphertext region.  At k=1 each
    // stream byte spans 8 carrier bytes; stream byte 50 is past wrapper
    // (9) + salt (16) + nonce (12).
    let mut bad = good.clone();
    bad[44 + 50 * 8] ^= 0x01;
    let tampered = fx.write("tampered.wav", &bad);
    let out_dir = fx.path("out");
    let err = stego::decode(&tampered, &out_dir, Some("p@ss"), None).unwrap_err();
    assert!(matches!(err, GhostbitError::Auth));
    // Fail-fast: nothing was written.
    assert!(!out_dir.exists() || fs::read_dir(&out_dir).unwrap().count() == 0);

    // Flipping a header byte the parser does not depend on (the RIFF size
    // field) leaves the round trip intact — the header is not codec body.
    let mut header_hit = good;
    header_hit[5] ^= 0xFF;
    let header_hit = fx.write("header_hit.wav", &header_hit);
    let written = stego::decode(&header_hit, &fx.path("out2"), Some("p@ss"), None).unwrap();
    assert_file_eq(&written[0], b"tamper test payload");
}

#[test]
fn analyzer_on_clean_noise_reports_no_hidden_data() {
    let fx = Fixture::new();
    let carrier = fx.write("noise.wav", &noise_wav(64 * 1024));
    let report = stego::analyze(&carrier, None).unwrap();
    assert!(!report.hidden);
    assert_eq!(report.summary(), "no hidden data");
}

struct ScriptedProvider {
    reply: PasswordReply,
    asked: usize,
}

impl PasswordProvider for ScriptedProvider {
    fn request(&mut self) -> PasswordReply {
        self.asked += 1;
        self.reply.clone()
    }
}

#[test]
fn password_provider_is_consulted_on_encrypted_streams() {
    let fx = Fixture::new();
    let carrier = fx.write("carrier.wav", &sine_wav(2.0));
    let secret = fx.write("s.txt", b"provider path");
    let encoded = fx.path("encoded.wav");
    stego::encode(&carrier, &[secret], &encoded, QualityMode::Normal, Some("p@ss")).unwrap();

    // No password, no provider: the caller is told a key is required.
    assert!(matches!(
        stego::decode(&encoded, &fx.path("o1"), None, None),
        Err(GhostbitError::KeyRequired)
    ));

    // Provider supplies the password.
    let mut provider = ScriptedProvider {
        reply: PasswordReply::Provide("p@ss".into()),
        asked: 0,
    };
    let written = stego::decode(&encoded, &fx.path("o2"), None, Some(&mut provider)).unwrap();
    assert_eq!(provider.asked, 1);
    assert_file_eq(&written[0], b"provider path");

    // Provider declines: the operation is cancelled, nothing written.
    let mut provider = ScriptedProvider {
        reply: PasswordReply::Cancel,
        asked: 0,
    };
    assert!(matches!(
        stego::decode(&encoded, &fx.path("o3"), None, Some(&mut provider)),
        Err(GhostbitError::Cancelled)
    ));
    assert!(!fx.path("o3").exists());
}

#[test]
fn every_quality_mode_round_trips_on_disk() {
    let fx = Fixture::new();
    let carrier = fx.write("carrier.wav", &sine_wav(1.0));
    let payload: Vec<u8> = (0..2048u32).map(|i| (i * 31 % 251) as u8).collect();
    let secret = fx.write("payload.bin", &payload);

    for mode in [QualityMode::High, QualityMode::Normal, QualityMode::Low] {
        let encoded = fx.path(&format!("encoded-{}.wav", mode.name()));
        stego::encode(&carrier, &[secret.clone()], &encoded, mode, None).unwrap();

        let report = stego::analyze(&encoded, None).unwrap();
        assert_eq!(report.quality, Some(mode.name()));

        let out_dir = fx.path(&format!("out-{}", mode.name()));
        let written = stego::decode(&encoded, &out_dir, None, None).unwrap();
        assert_file_eq(&written[0], &payload);
    }
}

#[test]
fn lossy_or_malformed_carriers_are_refused() {
    let fx = Fixture::new();

    let not_wav = fx.write("song.mp3", b"ID3\x03\x00 definitely not pcm");
    assert!(matches!(
        stego::encode(
            &not_wav,
            &[fx.write("s.txt", b"x")],
            &fx.path("out.wav"),
            QualityMode::Normal,
            None,
        ),
        Err(GhostbitError::Format(_))
    ));

    // IEEE-float WAV: format tag 3.
    let mut float_wav = wav_bytes(32, 1, &[0u8; 256]);
    float_wav[20] = 3;
    let float_wav = fx.write("float.wav", &float_wav);
    assert!(matches!(
        stego::analyze(&float_wav, None),
        Err(GhostbitError::Format(_))
    ));
}
