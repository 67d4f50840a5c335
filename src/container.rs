//! Container framing
//!
//! The binary format is:
//! - magic: 4 bytes, ASCII `AES2`
//! - version: 1 byte, currently 1
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - auth tag: 16 bytes
//! - ciphertext: remaining bytes, same length as the plaintext
//!
//! There are no multi-byte integer fields, so byte order never matters.

use crate::codec::CodecError;
use crate::kdf::{SALT_LEN, Salt};

/// Magic marker at the start of every container
pub const MAGIC: &[u8; 4] = b"AES2";

/// The only version this build reads and writes
pub const VERSION_1: u8 = 1;

/// Length of AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of AES-GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// magic(4) + version(1) + salt(16) + nonce(12) + tag(16)
pub const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN + TAG_LEN;

const VERSION_OFFSET: usize = MAGIC.len();
const SALT_OFFSET: usize = VERSION_OFFSET + 1;
const NONCE_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const TAG_OFFSET: usize = NONCE_OFFSET + NONCE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub salt: Salt,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

/// A parsed container borrowing its ciphertext from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container<'a> {
    pub header: Header,
    pub ciphertext: &'a [u8],
}

impl<'a> Container<'a> {
    /// Validates and splits a container.
    ///
    /// Checks run in a fixed order (length, magic, version) and the first
    /// failure wins.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::MalformedContainer { len: bytes.len() });
        }

        if &bytes[..VERSION_OFFSET] != MAGIC {
            return Err(CodecError::UnrecognizedFormat);
        }

        let version = bytes[VERSION_OFFSET];
        if version != VERSION_1 {
            return Err(CodecError::UnsupportedVersion { version });
        }

        let (salt, rest) = split_array::<SALT_LEN>(&bytes[SALT_OFFSET..]);
        let (nonce, rest) = split_array::<NONCE_LEN>(rest);
        let (tag, ciphertext) = split_array::<TAG_LEN>(rest);

        Ok(Self {
            header: Header {
                version,
                salt,
                nonce,
                tag,
            },
            ciphertext,
        })
    }

    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.ciphertext.len()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        out.extend_from_slice(MAGIC);
        out.push(self.header.version);
        out.extend_from_slice(&self.header.salt);
        out.extend_from_slice(&self.header.nonce);
        out.extend_from_slice(&self.header.tag);
        out.extend_from_slice(self.ciphertext);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }
}

/// Reads the version byte without validating the rest of the header.
///
/// Returns `None` if the input is too short or the magic does not match.
pub fn read_version(bytes: &[u8]) -> Option<u8> {
    if bytes.len() <= VERSION_OFFSET || &bytes[..VERSION_OFFSET] != MAGIC {
        return None;
    }
    Some(bytes[VERSION_OFFSET])
}

/// Splits a fixed-size array off the front of `bytes`.
///
/// Callers guarantee `bytes.len() >= N` (ensured by the header length check).
fn split_array<const N: usize>(bytes: &[u8]) -> ([u8; N], &[u8]) {
    let (head, tail) = bytes.split_at(N);
    let mut arr = [0u8; N];
    arr.copy_from_slice(head);
    (arr, tail)
}
