//! Transform registry: maps a (compression, encryption) pair to an encode or
//! decode pipeline.
//!
//! Encryption is always the outer layer on disk:
//!
//! ```text
//! encode:  PCM ──compress──▶ finish() ──encrypt──▶ payload
//! decode:  payload ──decrypt──▶ plaintext ──decompress (Read)──▶ PCM
//! ```
//!
//! The compressor is finished and its output fully materialised before the
//! cipher sees it, so codecs that must buffer their whole input (LZMA, FLAC)
//! need no special case.

use std::io::{Cursor, Read};

use tracing::debug;

use crate::codec::{get_codec, Codec, CompressionKind, PcmLayout, DEFAULT_COMPRESSION_LEVEL};
use crate::crypto::{self, CipherKey, CryptoError, EncryptionKind};
use crate::error::{Result, WaveError};

/// Parameters shared by every transform in a pipeline.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Compression level hint, clamped per codec.
    pub level: i32,
    /// Key material for AES; required only when AES is in play.
    pub key:   Option<CipherKey>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self { level: DEFAULT_COMPRESSION_LEVEL, key: None }
    }
}

impl TransformOptions {
    pub fn with_key(key: CipherKey) -> Self {
        Self { key: Some(key), ..Self::default() }
    }
}

/// Registered cipher for an encryption identity.
enum Cipher {
    Identity,
    Aes(CipherKey),
}

impl Cipher {
    fn resolve(kind: EncryptionKind, opts: &TransformOptions) -> Result<Self> {
        match kind {
            EncryptionKind::Unencrypted => Ok(Cipher::Identity),
            EncryptionKind::Aes => {
                let key = opts.key.clone().ok_or(CryptoError::MissingKey)?;
                Ok(Cipher::Aes(key))
            }
            EncryptionKind::Unknown => Err(WaveError::UnsupportedMethod(format!(
                "encryption identity {}",
                kind as u8
            ))),
        }
    }
}

fn resolve_codec(kind: CompressionKind) -> Result<Box<dyn Codec>> {
    get_codec(kind).ok_or_else(|| {
        WaveError::UnsupportedMethod(format!("compression identity {}", kind as u8))
    })
}

/// Compress-then-encrypt pipeline.
pub struct Encoder {
    codec:  Box<dyn Codec>,
    cipher: Cipher,
    level:  i32,
}

/// Decrypt-then-decompress pipeline.
pub struct Decoder {
    codec:  Box<dyn Codec>,
    cipher: Cipher,
}

/// Resolve the encode pipeline for `(compression, encryption)`.
pub fn encoder_for(
    compression: CompressionKind,
    encryption:  EncryptionKind,
    opts:        &TransformOptions,
) -> Result<Encoder> {
    Ok(Encoder {
        codec:  resolve_codec(compression)?,
        cipher: Cipher::resolve(encryption, opts)?,
        level:  opts.level,
    })
}

/// Resolve the decode pipeline for `(compression, encryption)`.
pub fn decoder_for(
    compression: CompressionKind,
    encryption:  EncryptionKind,
    opts:        &TransformOptions,
) -> Result<Decoder> {
    Ok(Decoder {
        codec:  resolve_codec(compression)?,
        cipher: Cipher::resolve(encryption, opts)?,
    })
}

impl Encoder {
    /// Run the whole pipeline over `pcm`; the result is the final payload.
    pub fn encode(&self, pcm: &[u8], layout: &PcmLayout) -> Result<Vec<u8>> {
        let compressed = self.codec.compress(pcm, layout, self.level)?;
        let payload = match &self.cipher {
            Cipher::Identity => compressed,
            Cipher::Aes(key) => crypto::encrypt(key, &compressed)?,
        };
        debug!(
            codec = self.codec.kind().name(),
            pcm = pcm.len(),
            payload = payload.len(),
            "payload encoded"
        );
        Ok(payload)
    }
}

impl Decoder {
    /// Return a reader yielding decoded PCM from `payload`.
    pub fn reader<'a>(&self, payload: &'a [u8], layout: &PcmLayout) -> Result<Box<dyn Read + 'a>> {
        let plaintext: Box<dyn Read + 'a> = match &self.cipher {
            Cipher::Identity => Box::new(payload),
            Cipher::Aes(key) => Box::new(Cursor::new(crypto::decrypt(key, payload)?)),
        };
        Ok(self.codec.decoder(plaintext, layout)?)
    }
}
