//! High-level [`WaveFile`] API: the path-based embedding surface.
//!
//! ```no_run
//! use wavcomp::wavefile::{CompressionChoice, PackOptions, WaveFile};
//! use wavcomp::crypto::{CipherKey, EncryptionKind};
//!
//! let wav = WaveFile::open("in.wav", None)?;
//! let opts = PackOptions {
//!     compression: CompressionChoice::Best,
//!     encryption:  EncryptionKind::Aes,
//!     key:         Some(CipherKey::derive("correct horse")?),
//!     ..PackOptions::default()
//! };
//! wav.pack_to("out.wav", &opts)?;
//!
//! let packed = WaveFile::open("out.wav", opts.key.clone())?;
//! packed.unpack_to("roundtrip.wav")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Every output is fully encoded in memory before the destination file is
//! created, so a failed encode leaves nothing behind.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::best_fit::{self, BestFit};
use crate::codec::{CompressionKind, DEFAULT_COMPRESSION_LEVEL};
use crate::crypto::{CipherKey, EncryptionKind};
use crate::error::Result;
use crate::transform::TransformOptions;
use crate::wave::{Wave, WaveInfo};

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Which compression to pack with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionChoice {
    Fixed(CompressionKind),
    /// Try every selectable compression and keep the smallest.
    Best,
}

impl CompressionChoice {
    /// Parse a CLI token: a selectable compression name or `best`.
    pub fn from_name(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("best") {
            return Some(CompressionChoice::Best);
        }
        CompressionKind::from_name(s).map(CompressionChoice::Fixed)
    }
}

impl Default for CompressionChoice {
    fn default() -> Self {
        CompressionChoice::Fixed(CompressionKind::Bzip2)
    }
}

/// Configuration for [`WaveFile::pack_to`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub compression: CompressionChoice,
    pub encryption:  EncryptionKind,
    pub level:       i32,
    /// Required when `encryption` is AES.
    pub key:         Option<CipherKey>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compression: CompressionChoice::default(),
            encryption:  EncryptionKind::Unencrypted,
            level:       DEFAULT_COMPRESSION_LEVEL,
            key:         None,
        }
    }
}

impl PackOptions {
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions { level: self.level, key: self.key.clone() }
    }
}

/// Result of [`WaveFile::pack_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    Packed {
        compression: CompressionKind,
        encryption:  EncryptionKind,
        bytes:       u64,
    },
    /// Best-fit found nothing smaller than the input; no file was written.
    NoImprovement,
}

// ── WaveFile ──────────────────────────────────────────────────────────────────

pub struct WaveFile {
    wave:      Wave,
    file_size: u64,
}

impl WaveFile {
    /// Read and parse `path`.  `key` is needed only for AES payloads.
    pub fn open<P: AsRef<Path>>(path: P, key: Option<CipherKey>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let opts = TransformOptions { key, ..TransformOptions::default() };
        let wave = Wave::from_bytes(&bytes, &opts)?;
        debug!(path = %path.display(), size = bytes.len(), "opened");
        Ok(Self { wave, file_size: bytes.len() as u64 })
    }

    pub fn wave(&self) -> &Wave { &self.wave }

    pub fn file_size(&self) -> u64 { self.file_size }

    pub fn info(&self) -> WaveInfo {
        self.wave.info(Some(self.file_size))
    }

    /// Encode with `opts` and write the result to `dest`.
    pub fn pack_to<P: AsRef<Path>>(&self, dest: P, opts: &PackOptions) -> Result<PackOutcome> {
        let topts = opts.transform_options();
        let (compression, bytes) = match opts.compression {
            CompressionChoice::Fixed(c) => (c, self.wave.to_bytes(c, opts.encryption, &topts)?),
            CompressionChoice::Best => {
                match best_fit::select_best_for(&self.wave, opts.encryption, &topts) {
                    BestFit::Chosen { compression, bytes } => (compression, bytes),
                    BestFit::NoImprovement { baseline, smallest } => {
                        info!(baseline, ?smallest, "no compression improves on the input");
                        return Ok(PackOutcome::NoImprovement);
                    }
                }
            }
        };
        fs::write(dest.as_ref(), &bytes)?;
        info!(
            dest = %dest.as_ref().display(),
            codec = compression.name(),
            encryption = opts.encryption.name(),
            bytes = bytes.len(),
            "packed"
        );
        Ok(PackOutcome::Packed {
            compression,
            encryption: opts.encryption,
            bytes: bytes.len() as u64,
        })
    }

    /// Write the plain uncompressed form to `dest`.
    pub fn unpack_to<P: AsRef<Path>>(&self, dest: P) -> Result<u64> {
        let bytes = self.wave.to_plain_bytes()?;
        fs::write(dest.as_ref(), &bytes)?;
        info!(dest = %dest.as_ref().display(), bytes = bytes.len(), "unpacked");
        Ok(bytes.len() as u64)
    }
}
