//! Lockbox - Password-based file encryption using PBKDF2-SHA256 and AES-256-GCM

#![forbid(unsafe_code)]

pub mod codec;
pub mod container;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;

pub use codec::{CodecError, FileCodec, SealedParts};
pub use kdf::{KeyDeriver, Pbkdf2Sha256};
