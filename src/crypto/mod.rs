//! AES-256-CBC payload encryption and key material handling.
//!
//! Encrypted payload layout: `ciphertext` only, PKCS#7 padded.  The IV is
//! part of the [`CipherKey`], not the payload, so the same key material must
//! be supplied to read a file back.
//!
//! Key sources:
//!   - [`CipherKey::from_hex`]: explicit 256-bit key and 128-bit IV.
//!   - [`CipherKey::derive`]: Argon2id(password, salt = format GUID) → key ‖ IV.
//!   - [`CipherKey::legacy`]: the fixed key/IV older wavcomp builds embedded.
//!     Anyone holding the tool can decrypt these files; use only to exchange
//!     files with those builds.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use crate::chunk::FORMAT_GUID;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN:  usize = 16;

const LEGACY_KEY: [u8; KEY_LEN] = [
    119, 231, 71, 225, 191, 43, 37, 69, 15, 32, 146, 85, 253, 5, 32, 227,
    25, 3, 217, 23, 104, 128, 153, 37, 23, 28, 7, 97, 20, 100, 149, 1,
];
const LEGACY_IV: [u8; IV_LEN] = [
    218, 49, 51, 226, 179, 245, 189, 106, 104, 210, 199, 149, 155, 119, 212, 164,
];

// ── EncryptionKind ───────────────────────────────────────────────────────────

/// On-disk encryption identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EncryptionKind {
    Unknown     = 0,
    Unencrypted = 1,
    Aes         = 2,
}

/// Every identity with a registered cipher (including the identity one).
pub const REGISTERED_ENCRYPTIONS: [EncryptionKind; 2] =
    [EncryptionKind::Unencrypted, EncryptionKind::Aes];

impl EncryptionKind {
    pub fn name(self) -> &'static str {
        match self {
            EncryptionKind::Unknown     => "unknown",
            EncryptionKind::Unencrypted => "none",
            EncryptionKind::Aes         => "aes",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(EncryptionKind::Unencrypted),
            "aes"  => Some(EncryptionKind::Aes),
            _      => None,
        }
    }
}

impl From<u8> for EncryptionKind {
    fn from(v: u8) -> Self {
        match v {
            1 => EncryptionKind::Unencrypted,
            2 => EncryptionKind::Aes,
            _ => EncryptionKind::Unknown,
        }
    }
}

impl std::fmt::Display for EncryptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
    #[error("Payload is encrypted but no decryption key was provided")]
    MissingKey,
}

// ── CipherKey ────────────────────────────────────────────────────────────────

/// AES-256 key plus CBC initialisation vector.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey {
    key: [u8; KEY_LEN],
    iv:  [u8; IV_LEN],
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey").finish_non_exhaustive()
    }
}

impl CipherKey {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// The fixed key/IV of the legacy wire format.
    pub fn legacy() -> Self {
        Self::new(LEGACY_KEY, LEGACY_IV)
    }

    /// Parse a 64-hex-digit key and a 32-hex-digit IV.
    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, CryptoError> {
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        hex::decode_to_slice(key_hex.trim(), &mut key)
            .map_err(|e| CryptoError::InvalidKey(format!("key: {e}")))?;
        hex::decode_to_slice(iv_hex.trim(), &mut iv)
            .map_err(|e| CryptoError::InvalidKey(format!("iv: {e}")))?;
        Ok(Self::new(key, iv))
    }

    /// Derive key and IV from a password with Argon2id.
    ///
    /// The container has nowhere to store a per-file salt, so the format
    /// GUID is used; identical passwords yield identical keys.
    pub fn derive(password: &str) -> Result<Self, CryptoError> {
        let params = Params::new(64 * 1024, 3, 1, Some(KEY_LEN + IV_LEN))
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut okm = [0u8; KEY_LEN + IV_LEN];
        argon2
            .hash_password_into(password.as_bytes(), &FORMAT_GUID, &mut okm)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        key.copy_from_slice(&okm[..KEY_LEN]);
        iv.copy_from_slice(&okm[KEY_LEN..]);
        Ok(Self::new(key, iv))
    }
}

/// Encrypt `plaintext` with AES-256-CBC, PKCS#7 padding.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(&key.key, &key.iv)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt a payload produced by [`encrypt`].
pub fn decrypt(key: &CipherKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcDec::new_from_slices(&key.key, &key.iv)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| CryptoError::DecryptionFailed)
}
