//! In-memory WAVE container model.
//!
//! `data` always holds decoded PCM.  `compression` and `encryption` record
//! how the payload was stored on disk when the model came from the reader;
//! the writer takes its own target methods and never mutates the model.

use std::io::Read;

use serde::Serialize;

use crate::chunk::{fourcc_str, ExtraChunk, CHUNK_HEADER_SIZE};
use crate::codec::{CompressionKind, PcmLayout};
use crate::crypto::EncryptionKind;
use crate::error::Result;
use crate::transform::TransformOptions;

/// `WAVE_FORMAT_PCM`.
pub const FORMAT_TAG_PCM: u16 = 0x0001;
/// `WAVE_FORMAT_EXTENSIBLE`, carrier of the compression/encryption header.
pub const FORMAT_TAG_EXTENSIBLE: u16 = 0xFFFE;

/// Size of the legacy `fmt ` payload.
pub const FMT_LEGACY_SIZE: usize = 16;
/// `cbSize` of the extended layout: reserved(2) + reserved(4) + GUID(16) +
/// compression(1) + encryption(1) + original tag(2).
pub const EXTENSION_SIZE: u16 = 26;
/// Smallest extension a reader accepts before checking the GUID.
pub const MIN_EXTENSION_SIZE: u16 = 22;
/// Size of the extended `fmt ` payload.
pub const FMT_EXTENDED_SIZE: usize = FMT_LEGACY_SIZE + 2 + EXTENSION_SIZE as usize;

/// Fixed audio-format fields of the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub format_tag:      u16,
    pub channels:        u16,
    pub sample_rate:     u32,
    pub byte_rate:       u32,
    pub block_align:     u16,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Plain integer PCM with consistent derived fields.
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            format_tag: FORMAT_TAG_PCM,
            channels,
            sample_rate,
            byte_rate: Self::pcm_byte_rate(channels, sample_rate, bits_per_sample),
            block_align: channels.saturating_mul(bits_per_sample / 8),
            bits_per_sample,
        }
    }

    /// Uncompressed bytes per second, saturating at `u32::MAX`.
    pub fn pcm_byte_rate(channels: u16, sample_rate: u32, bits_per_sample: u16) -> u32 {
        let rate = sample_rate as u64 * channels as u64 * bits_per_sample as u64 / 8;
        u32::try_from(rate).unwrap_or(u32::MAX)
    }

    pub fn layout(&self) -> PcmLayout {
        PcmLayout {
            channels:        self.channels,
            sample_rate:     self.sample_rate,
            bits_per_sample: self.bits_per_sample,
        }
    }

    /// Bytes per multi-channel sample frame, computed from the geometry
    /// rather than trusted from `block_align`.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.bits_per_sample as usize / 8
    }
}

/// A parsed (or synthesised) WAVE file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub format:       WaveFormat,
    pub compression:  CompressionKind,
    pub encryption:   EncryptionKind,
    /// Decoded PCM payload.
    pub data:         Vec<u8>,
    /// Samples per channel.
    pub sample_count: u32,
    /// Uninterpreted chunks in file order.
    pub extra_chunks: Vec<ExtraChunk>,
}

impl Wave {
    /// Build an uncompressed model, deriving `sample_count` from the payload.
    pub fn new(format: WaveFormat, data: Vec<u8>) -> Self {
        let sample_count = sample_count_for(&format, data.len());
        Self {
            format,
            compression: CompressionKind::Uncompressed,
            encryption: EncryptionKind::Unencrypted,
            data,
            sample_count,
            extra_chunks: Vec::new(),
        }
    }

    pub fn with_chunk(mut self, chunk: ExtraChunk) -> Self {
        self.extra_chunks.push(chunk);
        self
    }

    /// Parse a WAVE container, decoding the payload if it is packed.
    pub fn read<R: Read>(reader: R, opts: &TransformOptions) -> Result<Self> {
        crate::reader::read_wave(reader, opts)
    }

    pub fn from_bytes(bytes: &[u8], opts: &TransformOptions) -> Result<Self> {
        Self::read(bytes, opts)
    }

    /// Serialise in the plain legacy layout.
    pub fn to_plain_bytes(&self) -> Result<Vec<u8>> {
        crate::writer::write_plain(self)
    }

    /// Serialise with the given methods (plain layout when both are identity).
    pub fn to_bytes(
        &self,
        compression: CompressionKind,
        encryption:  EncryptionKind,
        opts:        &TransformOptions,
    ) -> Result<Vec<u8>> {
        crate::writer::write_wave(self, compression, encryption, opts)
    }

    /// Length of this model written in the plain layout.
    pub fn plain_len(&self) -> usize {
        12 + CHUNK_HEADER_SIZE
            + FMT_LEGACY_SIZE
            + self.extra_chunks.iter().map(ExtraChunk::encoded_len).sum::<usize>()
            + CHUNK_HEADER_SIZE
            + self.data.len()
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 / self.format.sample_rate as f64
    }

    pub fn is_packed(&self) -> bool {
        self.compression != CompressionKind::Uncompressed
            || self.encryption != EncryptionKind::Unencrypted
    }

    /// Summary for display; `file_size` is the on-disk length if known.
    pub fn info(&self, file_size: Option<u64>) -> WaveInfo {
        WaveInfo {
            format_tag:      self.format.format_tag,
            channels:        self.format.channels,
            sample_rate:     self.format.sample_rate,
            bits_per_sample: self.format.bits_per_sample,
            sample_count:    self.sample_count,
            duration_secs:   self.duration_secs(),
            compression:     self.compression.name().to_owned(),
            encryption:      self.encryption.name().to_owned(),
            extra_chunks:    self.extra_chunks.iter().map(|c| fourcc_str(&c.tag)).collect(),
            file_size,
            pcm_blake3:      blake3::hash(&self.data).to_hex().to_string(),
        }
    }
}

/// Samples per channel held by `len` payload bytes.
pub(crate) fn sample_count_for(format: &WaveFormat, len: usize) -> u32 {
    if format.bits_per_sample == 0 || format.channels == 0 {
        return 0;
    }
    let samples = len as u64 * 8 / format.bits_per_sample as u64 / format.channels as u64;
    u32::try_from(samples).unwrap_or(u32::MAX)
}

/// Human/JSON summary of a container.
#[derive(Debug, Clone, Serialize)]
pub struct WaveInfo {
    pub format_tag:      u16,
    pub channels:        u16,
    pub sample_rate:     u32,
    pub bits_per_sample: u16,
    pub sample_count:    u32,
    pub duration_secs:   f64,
    pub compression:     String,
    pub encryption:      String,
    pub extra_chunks:    Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size:       Option<u64>,
    /// BLAKE3 of the decoded PCM; equal for a file and its packed form.
    pub pcm_blake3:      String,
}

impl WaveInfo {
    pub fn format_name(&self) -> String {
        if self.format_tag == FORMAT_TAG_PCM {
            "PCM".to_owned()
        } else {
            format!("0x{:04X}", self.format_tag)
        }
    }
}
