//! Crate-level error taxonomy.
//!
//! `Format` is always fatal to a parse.  `UnsupportedMethod` is fatal to a
//! single encode/decode attempt; the best-fit selector swallows it per
//! candidate.  I/O errors are passed through unmodified.

use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;

#[derive(Error, Debug)]
pub enum WaveError {
    /// Malformed or unsupported container structure.
    #[error("Invalid WAVE container: {0}")]
    Format(String),
    /// Compression or encryption identity has no registered transform.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WaveError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        WaveError::Format(msg.into())
    }

    pub fn is_unsupported_method(&self) -> bool {
        matches!(self, WaveError::UnsupportedMethod(_))
    }
}

pub type Result<T> = std::result::Result<T, WaveError>;
