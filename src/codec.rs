//! Password-based sealing and opening of containers
//!
//! This module implements the encryption engine using:
//! - PBKDF2-HMAC-SHA256 (via an injected [`KeyDeriver`]) to turn the
//!   password and a fresh salt into a 256-bit key
//! - AES-256-GCM for authenticated encryption, with no associated data
//!
//! Every seal draws a new 16-byte salt and 12-byte nonce from the OS
//! random source, so a (key, nonce) pair is never reused. See
//! [`crate::container`] for the byte layout.
//!
//! Sealing and opening are synchronous and CPU-bound (the key derivation
//! dominates). Async callers should run them on a blocking worker thread.

use std::time::Instant;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::container::{Container, HEADER_LEN, Header, NONCE_LEN, TAG_LEN, VERSION_1};
use crate::kdf::{DerivedKey, KeyDeriver, Pbkdf2Sha256, SALT_LEN, Salt};

/// Failures surfaced by [`FileCodec`].
///
/// The display strings are safe to show to end users. The three format
/// failures share one message and the variant fields are only logged.
/// [`CodecError::DecryptionFailed`] never says whether the password or
/// the data was at fault.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    #[error("invalid or unsupported file")]
    MalformedContainer { len: usize },

    #[error("invalid or unsupported file")]
    UnrecognizedFormat,

    #[error("invalid or unsupported file")]
    UnsupportedVersion { version: u8 },

    #[error("wrong password or corrupted file")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionError,
}

impl CodecError {
    /// True for errors raised while parsing the header, before any
    /// cryptography runs.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CodecError::MalformedContainer { .. }
                | CodecError::UnrecognizedFormat
                | CodecError::UnsupportedVersion { .. }
        )
    }
}

/// The pieces of a sealed payload, kept apart instead of framed.
///
/// This is the representation for callers that persist salt, nonce and
/// tag in their own storage (for example separate database columns) next
/// to the raw ciphertext. It carries no magic or version, so the caller
/// owns format identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedParts {
    pub salt: Salt,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedParts {
    /// Frames the parts as a version 1 container.
    pub fn to_container(&self) -> Vec<u8> {
        Container {
            header: Header {
                version: VERSION_1,
                salt: self.salt,
                nonce: self.nonce,
                tag: self.tag,
            },
            ciphertext: &self.ciphertext,
        }
        .to_bytes()
    }

    /// Splits a container into its parts, validating the header.
    pub fn from_container(bytes: &[u8]) -> Result<Self, CodecError> {
        let container = Container::parse(bytes)?;
        Ok(Self {
            salt: container.header.salt,
            nonce: container.header.nonce,
            tag: container.header.tag,
            ciphertext: container.ciphertext.to_vec(),
        })
    }
}

/// Seals and opens containers with a password.
///
/// Holds no mutable state, so a single instance can be shared across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct FileCodec<K = Pbkdf2Sha256> {
    deriver: K,
}

impl FileCodec {
    /// A codec using the version 1 key derivation parameters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: KeyDeriver> FileCodec<K> {
    pub fn with_deriver(deriver: K) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &K {
        &self.deriver
    }

    /// Encrypt plaintext with a password using random salt and nonce
    ///
    /// Returns the container: magic(4) + version(1) + salt(16) + nonce(12) + tag(16) + ciphertext
    pub fn seal(&self, plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, CodecError> {
        let (salt, nonce) = fresh_salt_and_nonce();
        self.seal_with(plaintext, password, &salt, &nonce)
    }

    /// Encrypt plaintext with a password using provided salt and nonce
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - always use `seal()` which generates random salt/nonce.
    pub fn seal_with(
        &self,
        plaintext: &[u8],
        password: &[u8],
        salt: &Salt,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(HEADER_LEN + plaintext.len());
        let parts = self.seal_parts_with(plaintext, password, salt, nonce)?;
        Container {
            header: Header {
                version: VERSION_1,
                salt: parts.salt,
                nonce: parts.nonce,
                tag: parts.tag,
            },
            ciphertext: &parts.ciphertext,
        }
        .write_to(&mut out);
        Ok(out)
    }

    /// Like [`FileCodec::seal`], but returns the unframed parts.
    pub fn seal_parts(&self, plaintext: &[u8], password: &[u8]) -> Result<SealedParts, CodecError> {
        let (salt, nonce) = fresh_salt_and_nonce();
        self.seal_parts_with(plaintext, password, &salt, &nonce)
    }

    fn seal_parts_with(
        &self,
        plaintext: &[u8],
        password: &[u8],
        salt: &Salt,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<SealedParts, CodecError> {
        let key = self.derive_key(password, salt);
        let cipher = cipher_for(&key);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|_| {
                buffer.zeroize();
                CodecError::EncryptionError
            })?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);

        debug!(plaintext_len = plaintext.len(), "sealed container");

        Ok(SealedParts {
            salt: *salt,
            nonce: *nonce,
            tag: tag_bytes,
            ciphertext: buffer,
        })
    }

    /// Decrypt a container with a password
    ///
    /// Format problems are reported before any key derivation happens.
    pub fn open(&self, container: &[u8], password: &[u8]) -> Result<Vec<u8>, CodecError> {
        let container = Container::parse(container).inspect_err(|e| {
            debug!(error = ?e, "rejected container header");
        })?;
        debug!(
            version = container.header.version,
            ciphertext_len = container.ciphertext.len(),
            "opening container"
        );
        let Header {
            salt, nonce, tag, ..
        } = container.header;
        self.decrypt(password, &salt, &nonce, &tag, container.ciphertext)
    }

    /// Decrypt parts produced by [`FileCodec::seal_parts`].
    pub fn open_parts(&self, parts: &SealedParts, password: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.decrypt(
            password,
            &parts.salt,
            &parts.nonce,
            &parts.tag,
            &parts.ciphertext,
        )
    }

    fn decrypt(
        &self,
        password: &[u8],
        salt: &Salt,
        nonce: &[u8; NONCE_LEN],
        tag: &[u8; TAG_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        let key = self.derive_key(password, salt);
        let cipher = cipher_for(&key);

        let mut buffer = ciphertext.to_vec();
        if cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .is_err()
        {
            buffer.zeroize();
            debug!("container authentication failed");
            return Err(CodecError::DecryptionFailed);
        }

        Ok(buffer)
    }

    fn derive_key(&self, password: &[u8], salt: &Salt) -> DerivedKey {
        let started = Instant::now();
        let key = self.deriver.derive(password, salt);
        trace!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "derived key"
        );
        key
    }
}

fn cipher_for(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]))
}

fn fresh_salt_and_nonce() -> (Salt, [u8; NONCE_LEN]) {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    (salt, nonce)
}
