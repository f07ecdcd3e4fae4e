//! Compression identities and the built-in codec set.
//!
//! # Identity rules
//! A codec is identified on disk by the single byte stored in the extended
//! `fmt ` chunk.  Those values are frozen; a value is never reused even if a
//! codec is dropped.  Readers MUST fail on an identity they cannot supply
//! rather than guess at the payload.
//!
//! # Streaming shape
//! Encoding is push-style over a complete buffer and ends with an explicit
//! `finish()` on every encoder that has one, so the compressed bytes are
//! final before anything wraps them.  Decoding is pull-style: each codec
//! wraps an input `Read` and hands back a `Read` of decoded PCM.

pub mod flac;
pub mod pcm;

use std::io::{self, Cursor, Read, Write};
use thiserror::Error;
use tracing::debug;

pub use flac::FlacCodec;

/// Default compression level hint (clamped per codec).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

// ── CompressionKind ──────────────────────────────────────────────────────────

/// On-disk compression identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CompressionKind {
    Unknown      = 0,
    Uncompressed = 1,
    GZip         = 2,
    Deflate      = 3,
    Lzma         = 4,
    Bzip2        = 5,
    Flac         = 6,
}

/// Identities a user may pick by name, in best-fit scan order.
///
/// `Deflate` stays registered for reading and library writes but is not
/// offered for selection.
pub const SELECTABLE_COMPRESSIONS: [CompressionKind; 4] = [
    CompressionKind::GZip,
    CompressionKind::Lzma,
    CompressionKind::Bzip2,
    CompressionKind::Flac,
];

/// Every identity with a registered codec.
pub const REGISTERED_COMPRESSIONS: [CompressionKind; 6] = [
    CompressionKind::Uncompressed,
    CompressionKind::GZip,
    CompressionKind::Deflate,
    CompressionKind::Lzma,
    CompressionKind::Bzip2,
    CompressionKind::Flac,
];

impl CompressionKind {
    /// Human-readable name (also the CLI token where one exists).
    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::Unknown      => "unknown",
            CompressionKind::Uncompressed => "none",
            CompressionKind::GZip         => "gzip",
            CompressionKind::Deflate      => "deflate",
            CompressionKind::Lzma         => "lzma",
            CompressionKind::Bzip2        => "bzip2",
            CompressionKind::Flac         => "flac",
        }
    }

    /// Parse a user-selectable CLI token.  `deflate` is deliberately absent.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none"  => Some(CompressionKind::Uncompressed),
            "gzip"  => Some(CompressionKind::GZip),
            "lzma"  => Some(CompressionKind::Lzma),
            "bzip2" => Some(CompressionKind::Bzip2),
            "flac"  => Some(CompressionKind::Flac),
            _       => None,
        }
    }
}

impl From<u8> for CompressionKind {
    fn from(v: u8) -> Self {
        match v {
            1 => CompressionKind::Uncompressed,
            2 => CompressionKind::GZip,
            3 => CompressionKind::Deflate,
            4 => CompressionKind::Lzma,
            5 => CompressionKind::Bzip2,
            6 => CompressionKind::Flac,
            _ => CompressionKind::Unknown,
        }
    }
}

impl std::fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── PcmLayout ────────────────────────────────────────────────────────────────

/// Sample geometry a codec may need to interpret the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub channels:        u16,
    pub sample_rate:     u32,
    pub bits_per_sample: u16,
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    /// The codec cannot represent this sample geometry without loss.
    #[error("Unsupported sample geometry for {codec}: {reason}")]
    UnsupportedGeometry { codec: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn kind(&self) -> CompressionKind;

    /// Compress a complete PCM buffer.  The returned bytes are final.
    fn compress(&self, data: &[u8], layout: &PcmLayout, level: i32) -> Result<Vec<u8>, CodecError>;

    /// Wrap `input` in a reader yielding decoded PCM bytes.
    fn decoder<'a>(
        &self,
        input:  Box<dyn Read + 'a>,
        layout: &PcmLayout,
    ) -> Result<Box<dyn Read + 'a>, CodecError>;
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn kind(&self) -> CompressionKind { CompressionKind::Uncompressed }
    fn compress(&self, data: &[u8], _: &PcmLayout, _: i32) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>, _: &PcmLayout) -> Result<Box<dyn Read + 'a>, CodecError> {
        Ok(input)
    }
}

fn flate_level(level: i32) -> flate2::Compression {
    flate2::Compression::new(level.clamp(0, 9) as u32)
}

pub struct GzipCodec;
impl Codec for GzipCodec {
    fn kind(&self) -> CompressionKind { CompressionKind::GZip }
    fn compress(&self, data: &[u8], _: &PcmLayout, level: i32) -> Result<Vec<u8>, CodecError> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate_level(level));
        enc.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        enc.finish().map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>, _: &PcmLayout) -> Result<Box<dyn Read + 'a>, CodecError> {
        Ok(Box::new(flate2::read::GzDecoder::new(input)))
    }
}

pub struct DeflateCodec;
impl Codec for DeflateCodec {
    fn kind(&self) -> CompressionKind { CompressionKind::Deflate }
    fn compress(&self, data: &[u8], _: &PcmLayout, level: i32) -> Result<Vec<u8>, CodecError> {
        let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate_level(level));
        enc.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        enc.finish().map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>, _: &PcmLayout) -> Result<Box<dyn Read + 'a>, CodecError> {
        Ok(Box::new(flate2::read::DeflateDecoder::new(input)))
    }
}

/// LZMA-alone stream.  The encoder needs the whole plaintext, so both
/// directions are fully buffered.
pub struct LzmaCodec;
impl Codec for LzmaCodec {
    fn kind(&self) -> CompressionKind { CompressionKind::Lzma }
    fn compress(&self, data: &[u8], _: &PcmLayout, _: i32) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(data), &mut out)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        Ok(out)
    }
    fn decoder<'a>(&self, mut input: Box<dyn Read + 'a>, _: &PcmLayout) -> Result<Box<dyn Read + 'a>, CodecError> {
        let mut encoded = Vec::new();
        input.read_to_end(&mut encoded)?;
        let mut out = Vec::new();
        lzma_rs::lzma_decompress(&mut Cursor::new(encoded.as_slice()), &mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(Box::new(Cursor::new(out)))
    }
}

/// Signature every bzip2 stream starts with.  It is not stored on disk.
const BZIP2_MAGIC: &[u8; 2] = b"BZ";

/// Headerless bzip2: the two-byte `BZ` signature is stripped on encode and
/// re-supplied on decode.
pub struct Bzip2Codec;
impl Codec for Bzip2Codec {
    fn kind(&self) -> CompressionKind { CompressionKind::Bzip2 }
    fn compress(&self, data: &[u8], _: &PcmLayout, level: i32) -> Result<Vec<u8>, CodecError> {
        let level = bzip2::Compression::new(level.clamp(1, 9) as u32);
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), level);
        enc.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        let mut out = enc.finish().map_err(|e| CodecError::Compression(e.to_string()))?;
        if !out.starts_with(BZIP2_MAGIC) {
            return Err(CodecError::Compression("bzip2 stream missing signature".into()));
        }
        out.drain(..BZIP2_MAGIC.len());
        Ok(out)
    }
    fn decoder<'a>(&self, input: Box<dyn Read + 'a>, _: &PcmLayout) -> Result<Box<dyn Read + 'a>, CodecError> {
        let framed = (&BZIP2_MAGIC[..]).chain(input);
        Ok(Box::new(bzip2::read::BzDecoder::new(framed)))
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a compression identity to a built-in codec.
///
/// Returns `None` for `Unknown`; the caller MUST NOT fall back to any other
/// codec.
pub fn get_codec(kind: CompressionKind) -> Option<Box<dyn Codec>> {
    let codec: Box<dyn Codec> = match kind {
        CompressionKind::Unknown      => return None,
        CompressionKind::Uncompressed => Box::new(NoneCodec),
        CompressionKind::GZip         => Box::new(GzipCodec),
        CompressionKind::Deflate      => Box::new(DeflateCodec),
        CompressionKind::Lzma         => Box::new(LzmaCodec),
        CompressionKind::Bzip2        => Box::new(Bzip2Codec),
        CompressionKind::Flac         => Box::new(FlacCodec::default()),
    };
    debug!(codec = kind.name(), "resolved codec");
    Some(codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: PcmLayout = PcmLayout { channels: 2, sample_rate: 44100, bits_per_sample: 16 };

    fn decode_all(codec: &dyn Codec, encoded: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        codec
            .decoder(Box::new(encoded), &LAYOUT)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn identities_are_frozen() {
        for v in 0u8..=7 {
            let kind = CompressionKind::from(v);
            if v == 0 || v > 6 {
                assert_eq!(kind, CompressionKind::Unknown);
            } else {
                assert_eq!(kind as u8, v);
            }
        }
    }

    #[test]
    fn byte_codecs_roundtrip() {
        let data: Vec<u8> = (0u16..4000).flat_map(|i| (i % 300).to_le_bytes()).collect();
        for kind in [
            CompressionKind::Uncompressed,
            CompressionKind::GZip,
            CompressionKind::Deflate,
            CompressionKind::Lzma,
            CompressionKind::Bzip2,
        ] {
            let codec = get_codec(kind).unwrap();
            assert_eq!(codec.kind(), kind);
            let encoded = codec.compress(&data, &LAYOUT, DEFAULT_COMPRESSION_LEVEL).unwrap();
            assert_eq!(decode_all(codec.as_ref(), &encoded), data, "{kind} roundtrip");
        }
    }

    #[test]
    fn bzip2_payload_is_headerless() {
        let encoded = Bzip2Codec.compress(b"some pcm bytes", &LAYOUT, 9).unwrap();
        assert!(!encoded.starts_with(b"BZ"));
        assert_eq!(encoded[0], b'h');
        assert_eq!(decode_all(&Bzip2Codec, &encoded), b"some pcm bytes");
    }

    #[test]
    fn unknown_has_no_codec() {
        assert!(get_codec(CompressionKind::Unknown).is_none());
    }

    #[test]
    fn deflate_is_not_selectable() {
        assert_eq!(CompressionKind::from_name("deflate"), None);
        assert!(!SELECTABLE_COMPRESSIONS.contains(&CompressionKind::Deflate));
        assert_eq!(CompressionKind::from_name("BZIP2"), Some(CompressionKind::Bzip2));
    }
}
