//! Password-based key derivation
//!
//! Turns a password and a per-container salt into the 256-bit key that
//! drives AES-256-GCM. The derivation is deliberately slow; everything
//! else about it is a pure function of its inputs.

use std::num::NonZeroU32;

use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// PBKDF2 round count used by format version 1.
pub const DEFAULT_ROUNDS: u32 = 100_000;

const DEFAULT_ROUNDS_NONZERO: NonZeroU32 = NonZeroU32::new(DEFAULT_ROUNDS).unwrap();

pub type Salt = [u8; SALT_LEN];

/// Key material that is wiped from memory when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derives a symmetric key from a password and salt.
///
/// Implementations must be deterministic and must not fail for any
/// password (including the empty one).
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, password: &[u8], salt: &Salt) -> DerivedKey;
}

/// PBKDF2-HMAC-SHA256 with a configurable round count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Sha256 {
    rounds: NonZeroU32,
}

impl Pbkdf2Sha256 {
    /// Round counts below [`DEFAULT_ROUNDS`] produce containers that other
    /// version 1 readers cannot open. Only tests should lower it.
    pub fn with_rounds(rounds: NonZeroU32) -> Self {
        Self { rounds }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds.get()
    }
}

impl Default for Pbkdf2Sha256 {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS_NONZERO,
        }
    }
}

impl KeyDeriver for Pbkdf2Sha256 {
    fn derive(&self, password: &[u8], salt: &Salt) -> DerivedKey {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, self.rounds.get(), &mut key[..]);
        key
    }
}
