use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;
use wavcomp::codec::REGISTERED_COMPRESSIONS;
use wavcomp::crypto::REGISTERED_ENCRYPTIONS;
use wavcomp::wavefile::{CompressionChoice, PackOptions, PackOutcome, WaveFile};
use wavcomp::{
    select_best, BestFit, CipherKey, CompressionKind, EncryptionKind, ExtraChunk, TransformOptions,
    Wave, WaveError, WaveFormat,
};

fn keyed() -> TransformOptions {
    TransformOptions::with_key(CipherKey::legacy())
}

/// A slow sweep, quantised to `bits`, interleaved over `channels`.
fn sweep(channels: u16, bits: u16, frames: u32) -> Wave {
    let mut data = Vec::new();
    for i in 0..frames {
        for ch in 0..channels {
            let v = ((i as f64) * 0.013 + ch as f64).sin() * 0.4;
            match bits {
                8 => data.push((128.0 + v * 127.0) as u8),
                16 => data.extend_from_slice(&((v * i16::MAX as f64) as i16).to_le_bytes()),
                32 => data.extend_from_slice(&((v * i32::MAX as f64) as i32).to_le_bytes()),
                _ => unreachable!(),
            }
        }
    }
    Wave::new(WaveFormat::pcm(channels, 22050, bits), data)
}

fn noise(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"wavcomp incompressible payload");
    hasher.finalize_xof().fill(&mut out);
    out
}

fn u32_at(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[test]
fn test_tiny_uncompressed_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.wav");
    let wave = Wave::new(WaveFormat::pcm(1, 8000, 8), vec![10, 20, 30]);
    fs::write(&path, wave.to_plain_bytes().unwrap()).unwrap();

    let opened = WaveFile::open(&path, None).unwrap();
    assert_eq!(opened.wave().data, vec![10, 20, 30]);
    assert_eq!(opened.wave().sample_count, 3);
    assert!((opened.wave().duration_secs() - 0.000375).abs() < 1e-12);
    assert_eq!(opened.wave(), &wave);
}

#[test]
fn test_every_method_pair_roundtrips() {
    let geometries = [(1u16, 8u16), (2, 16), (1, 32)];
    for (channels, bits) in geometries {
        let wave = sweep(channels, bits, 3000);
        for c in REGISTERED_COMPRESSIONS {
            if c == CompressionKind::Flac && bits == 32 {
                continue;
            }
            for e in REGISTERED_ENCRYPTIONS {
                let bytes = wave.to_bytes(c, e, &keyed()).unwrap();
                let back = Wave::from_bytes(&bytes, &keyed()).unwrap();
                assert_eq!(back.data, wave.data, "{bits}-bit {c}/{e}");
                assert_eq!(back.sample_count, wave.sample_count, "{bits}-bit {c}/{e}");
                assert_eq!(back.compression, c);
                assert_eq!(back.encryption, e);
            }
        }
    }
}

#[test]
fn test_flac_rejects_32_bit_samples() {
    let wave = sweep(1, 32, 100);
    let err = wave
        .to_bytes(CompressionKind::Flac, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap_err();
    assert!(matches!(err, WaveError::Codec(_)));
}

#[test]
fn test_extra_chunks_survive_every_pair() {
    let wave = sweep(1, 16, 500)
        .with_chunk(ExtraChunk::new(*b"JUNK", vec![1, 2, 3, 4]))
        .with_chunk(ExtraChunk::new(*b"LIST", Vec::new()));
    for c in REGISTERED_COMPRESSIONS {
        for e in REGISTERED_ENCRYPTIONS {
            let back = Wave::from_bytes(&wave.to_bytes(c, e, &keyed()).unwrap(), &keyed()).unwrap();
            assert_eq!(back.extra_chunks, wave.extra_chunks, "{c}/{e}");
        }
    }
}

#[test]
fn test_best_fit_is_deterministic() {
    let wave = sweep(2, 16, 4000);
    let first = select_best(&wave, &TransformOptions::default());
    let second = select_best(&wave, &TransformOptions::default());
    assert!(matches!(first, BestFit::Chosen { .. }));
    assert_eq!(first, second);
}

#[test]
fn test_best_fit_reports_no_improvement_for_noise() {
    let wave = Wave::new(WaveFormat::pcm(1, 44100, 16), noise(4096));
    match select_best(&wave, &TransformOptions::default()) {
        BestFit::NoImprovement { baseline, smallest } => {
            assert_eq!(baseline, wave.plain_len());
            assert!(smallest.map_or(true, |s| s >= baseline));
        }
        other => panic!("noise should not compress: {other:?}"),
    }
}

#[test]
fn test_pack_best_writes_nothing_without_improvement() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("noise.wav");
    let dst = dir.path().join("noise.packed.wav");
    let wave = Wave::new(WaveFormat::pcm(1, 44100, 16), noise(4096));
    fs::write(&src, wave.to_plain_bytes().unwrap()).unwrap();

    let opts = PackOptions { compression: CompressionChoice::Best, ..PackOptions::default() };
    let outcome = WaveFile::open(&src, None).unwrap().pack_to(&dst, &opts).unwrap();
    assert_eq!(outcome, PackOutcome::NoImprovement);
    assert!(!dst.exists());
}

#[test]
fn test_failed_encode_leaves_no_file() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("in.wav");
    let dst = dir.path().join("out.wav");
    fs::write(&src, sweep(1, 16, 200).to_plain_bytes().unwrap()).unwrap();

    let opts = PackOptions { encryption: EncryptionKind::Aes, ..PackOptions::default() };
    assert!(WaveFile::open(&src, None).unwrap().pack_to(&dst, &opts).is_err());
    assert!(!dst.exists());
}

#[test]
fn test_pack_unpack_files() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("in.wav");
    let packed = dir.path().join("packed.wav");
    let restored = dir.path().join("restored.wav");
    let wave = sweep(2, 16, 2000).with_chunk(ExtraChunk::new(*b"JUNK", vec![9; 4]));
    let plain = wave.to_plain_bytes().unwrap();
    fs::write(&src, &plain).unwrap();

    let key = CipherKey::from_hex(&"ab".repeat(32), &"cd".repeat(16)).unwrap();
    let opts = PackOptions {
        compression: CompressionChoice::Fixed(CompressionKind::Lzma),
        encryption:  EncryptionKind::Aes,
        key:         Some(key.clone()),
        ..PackOptions::default()
    };
    let original = WaveFile::open(&src, None).unwrap();
    let outcome = original.pack_to(&packed, &opts).unwrap();
    let PackOutcome::Packed { bytes, .. } = outcome else { panic!("expected a packed file") };
    assert_eq!(fs::metadata(&packed).unwrap().len(), bytes);

    assert!(WaveFile::open(&packed, None).is_err(), "AES payload needs a key");

    let reopened = WaveFile::open(&packed, Some(key)).unwrap();
    assert_eq!(reopened.file_size(), bytes);
    let info = reopened.info();
    assert_eq!(info.compression, "lzma");
    assert_eq!(info.encryption, "aes");
    assert_eq!(info.extra_chunks, vec!["JUNK".to_owned()]);
    assert_eq!(info.pcm_blake3, original.info().pcm_blake3);

    reopened.unpack_to(&restored).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), plain);
}

#[test]
fn test_oversized_fact_zero_fills() {
    let wave = sweep(1, 16, 1000);
    let mut bytes = wave
        .to_bytes(CompressionKind::GZip, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    assert_eq!(&bytes[64..68], b"fact");
    bytes[72..76].copy_from_slice(&1100u32.to_le_bytes());

    let back = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap();
    assert_eq!(back.sample_count, 1100);
    assert_eq!(back.data.len(), 2200);
    assert_eq!(&back.data[..2000], &wave.data[..]);
    assert!(back.data[2000..].iter().all(|&b| b == 0));
}

#[test]
fn test_truncated_payload_keeps_length() {
    // Every byte non-zero so the zero-filled tail is unambiguous.
    let data: Vec<u8> = noise(8000).into_iter().map(|b| b | 1).collect();
    let wave = Wave::new(WaveFormat::pcm(1, 8000, 8), data);
    let bytes = wave
        .to_bytes(CompressionKind::Deflate, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    assert_eq!(&bytes[76..80], b"data");
    let payload_len = u32_at(&bytes, 80) as usize;
    let truncated = &bytes[..84 + payload_len / 2];

    let back = Wave::from_bytes(truncated, &TransformOptions::default()).unwrap();
    assert_eq!(back.data.len(), wave.data.len());
    let produced = back.data.iter().position(|&b| b == 0).unwrap();
    assert!(produced < wave.data.len());
    assert_eq!(&back.data[..produced], &wave.data[..produced]);
    assert!(back.data[produced..].iter().all(|&b| b == 0));
}

#[test]
fn test_extension_size_must_be_26() {
    let wave = sweep(1, 16, 100);
    let mut bytes = wave
        .to_bytes(CompressionKind::GZip, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    bytes[36..38].copy_from_slice(&28u16.to_le_bytes());
    let err = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap_err();
    assert!(matches!(err, WaveError::Format(_)), "{err}");
}

#[test]
fn test_empty_payload_every_pair() {
    let wave = Wave::new(WaveFormat::pcm(1, 44100, 16), Vec::new());
    for c in REGISTERED_COMPRESSIONS {
        for e in REGISTERED_ENCRYPTIONS {
            match wave.to_bytes(c, e, &keyed()) {
                Ok(bytes) => {
                    let back = Wave::from_bytes(&bytes, &keyed()).unwrap();
                    assert!(back.data.is_empty(), "{c}/{e}");
                    assert_eq!(back.sample_count, 0, "{c}/{e}");
                }
                Err(err) => assert!(matches!(err, WaveError::Codec(_)), "{c}/{e}: {err}"),
            }
        }
    }
}

#[test]
fn test_flac_refuses_empty_payload() {
    let wave = Wave::new(WaveFormat::pcm(1, 44100, 16), Vec::new());
    let err = wave
        .to_bytes(CompressionKind::Flac, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap_err();
    assert!(matches!(err, WaveError::Codec(_)));
}

#[test]
fn test_huge_sample_rate_parses() {
    let wave = sweep(1, 16, 100);
    let mut bytes = wave
        .to_bytes(CompressionKind::GZip, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    bytes[22..24].copy_from_slice(&2u16.to_le_bytes());
    bytes[24..28].copy_from_slice(&0x8000_0000u32.to_le_bytes());
    let back = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap();
    assert_eq!(back.format.byte_rate, u32::MAX);
    assert_eq!(back.data.len(), 400);
}

#[test]
fn test_absurd_fact_count_is_a_format_error() {
    let wave = sweep(1, 16, 4);
    let mut bytes = wave
        .to_bytes(CompressionKind::GZip, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    bytes[22..24].copy_from_slice(&8u16.to_le_bytes());
    bytes[34..36].copy_from_slice(&32000u16.to_le_bytes());
    bytes[72..76].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap_err();
    assert!(matches!(err, WaveError::Format(_)), "{err}");
}

#[test]
fn test_unknown_method_byte_is_unsupported() {
    let wave = sweep(1, 16, 100);
    let mut bytes = wave
        .to_bytes(CompressionKind::GZip, EncryptionKind::Unencrypted, &TransformOptions::default())
        .unwrap();
    bytes[60] = 0x7f;
    let err = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap_err();
    assert!(err.is_unsupported_method());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_uncompressed_roundtrip(
        channels in 1u16..=2,
        wide in any::<bool>(),
        frames in prop::collection::vec(any::<u32>(), 0..300),
        junk in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let bits = if wide { 16 } else { 8 };
        let frame_bytes = (channels * bits / 8) as usize;
        let data: Vec<u8> = frames.iter().flat_map(|f| f.to_le_bytes()[..frame_bytes].to_vec()).collect();
        let wave = Wave::new(WaveFormat::pcm(channels, 44100, bits), data)
            .with_chunk(ExtraChunk::new(*b"JUNK", junk))
            .with_chunk(ExtraChunk::new(*b"LIST", Vec::new()));

        let bytes = wave.to_bytes(CompressionKind::Uncompressed, EncryptionKind::Unencrypted, &TransformOptions::default()).unwrap();
        prop_assert_eq!(bytes.len(), wave.plain_len());
        let back = Wave::from_bytes(&bytes, &TransformOptions::default()).unwrap();
        prop_assert_eq!(back, wave);
    }
}
