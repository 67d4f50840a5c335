use std::error::Error as StdError;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input is shorter than the fixed container header.
    MalformedContainer,
    /// Input does not start with the container magic.
    UnrecognizedFormat,
    /// Input is a container, but of a version this build does not implement.
    UnsupportedVersion,
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption. The two are deliberately not distinguished.
    DecryptionFailed,
    /// The AEAD primitive refused to seal the plaintext.
    EncryptionFailed,
    /// Input exceeds the configured size ceiling.
    InputTooLarge,
    /// An empty password was supplied.
    PassphraseEmpty,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct LockboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl LockboxError {
    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that preserves the originating source error
    /// without tagging a kind.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    ///
    /// Category and kind are carried over so callers can still branch on them.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

impl From<CodecError> for LockboxError {
    fn from(err: CodecError) -> Self {
        let (category, kind) = match err {
            CodecError::MalformedContainer { .. } => {
                (ErrorCategory::User, ErrorKind::MalformedContainer)
            }
            CodecError::UnrecognizedFormat => (ErrorCategory::User, ErrorKind::UnrecognizedFormat),
            CodecError::UnsupportedVersion { .. } => {
                (ErrorCategory::User, ErrorKind::UnsupportedVersion)
            }
            CodecError::DecryptionFailed => (ErrorCategory::User, ErrorKind::DecryptionFailed),
            CodecError::EncryptionError => (ErrorCategory::Internal, ErrorKind::EncryptionFailed),
        };
        Self {
            category,
            kind: Some(kind),
            msg: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LockboxError>;
