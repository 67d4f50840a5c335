//! Where `file_ops` gets the password from
//!
//! The codec takes the password as raw bytes. These readers produce it
//! once per file operation, from the terminal, from stdin, or from a value
//! fixed by the caller.

use crate::error::{ErrorCategory, ErrorKind, LockboxError, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Source of the password for one encrypt, decrypt or update.
pub trait PassphraseReader {
    /// The password bytes, handed to the key deriver as-is. UTF-8 is not
    /// required. The buffer is wiped when the caller drops it.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Rejects passwords the codec would accept but a person almost certainly
/// did not mean to use.
pub fn ensure_not_empty(passphrase: &[u8]) -> Result<()> {
    if passphrase.is_empty() {
        return Err(LockboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphraseEmpty,
            "password must not be empty",
        ));
    }
    Ok(())
}

/// Hands out the same password on every call. Used by library callers
/// that already hold the password, and by tests.
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads the password from a byte stream, normally stdin under
/// `--passphrase-stdin`.
///
/// A single trailing `\n` or `\r\n` is stripped so that `echo pw | lockbox`
/// works as expected. Everything else is kept byte for byte.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            LockboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Prompts on stderr and reads the password from the terminal without echo.
#[derive(Default)]
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Terminal passwords are UTF-8 only; a password with other bytes
    /// has to come in through `--passphrase-stdin`.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(LockboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        io::stderr()
            .write_all(b"Password (lockbox): ")
            .and_then(|()| io::stderr().flush())
            .map_err(|e| {
                LockboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // rpassword hands back a String; move it straight into a zeroizing buffer.
        let passphrase = rpassword::read_password().map_err(|e| {
            LockboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}
