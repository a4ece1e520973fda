//! Key material for the session cookie cipher.
//!
//! The secret length selects the AES-GCM variant: 16 bytes for AES-128, 24 bytes for AES-192
//! and 32 bytes for AES-256.

use std::{fmt, sync::Arc};

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
    aead::{Aead, KeyInit, OsRng, consts::U12, rand_core::RngCore},
    aes::Aes192,
};

use crate::error::ConfigurationError;

type Aes192Gcm = AesGcm<Aes192, U12>;

pub(crate) const NONCE_LEN: usize = 12;
pub(crate) const TAG_LEN: usize = 16;

#[derive(Clone)]
enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// A validated AES-GCM key shared by every request the middleware handles.
#[derive(Clone)]
pub struct Secret {
    cipher: Arc<Cipher>,
    len: usize,
}

impl Secret {
    /// Accepted key lengths in bytes.
    pub const VALID_LENGTHS: [usize; 3] = [16, 24, 32];

    /// Build a secret from raw key bytes.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidSecretLength`] unless the key is 16, 24 or 32 bytes.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, ConfigurationError> {
        let key = key.as_ref();
        let invalid = |_| ConfigurationError::InvalidSecretLength(key.len());
        let cipher = match key.len() {
            16 => Cipher::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid)?),
            24 => Cipher::Aes192(Aes192Gcm::new_from_slice(key).map_err(invalid)?),
            32 => Cipher::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid)?),
            other => return Err(ConfigurationError::InvalidSecretLength(other)),
        };

        Ok(Self {
            cipher: Arc::new(cipher),
            len: key.len(),
        })
    }

    /// Generate a random 256-bit secret from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self {
            cipher: Arc::new(Cipher::Aes256(Aes256Gcm::new(&key.into()))),
            len: key.len(),
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a secret cannot be constructed from an empty key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Seal `plaintext` under a fresh random nonce, returning `nonce || ciphertext || tag`.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::<U12>::from_slice(&nonce_bytes);

        let ciphertext = match self.cipher.as_ref() {
            Cipher::Aes128(c) => c.encrypt(nonce, plaintext)?,
            Cipher::Aes192(c) => c.encrypt(nonce, plaintext)?,
            Cipher::Aes256(c) => c.encrypt(nonce, plaintext)?,
        };

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Verify and decrypt `nonce || ciphertext || tag`. The caller checks the minimum length.
    pub(crate) fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::<U12>::from_slice(nonce_bytes);

        match self.cipher.as_ref() {
            Cipher::Aes128(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes192(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
    }
}

impl TryFrom<&[u8]> for Secret {
    type Error = ConfigurationError;

    fn try_from(key: &[u8]) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("bits", &(self.len * 8))
            .finish_non_exhaustive()
    }
}
