//! File encryption/decryption operations
//!
//! This module provides high-level file operations for encrypting, decrypting,
//! updating and inspecting files using the container format. It is the
//! caller-side policy layer around [`FileCodec`]: size ceilings, password
//! policy, output naming and safe file writes all live here.

use crate::codec::FileCodec;
use crate::container::{self, Container, HEADER_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{ErrorCategory, ErrorKind, LockboxError, Result};
use crate::kdf::{KeyDeriver, Salt};
use crate::passphrase::{PassphraseReader, ensure_not_empty};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Extension appended to encrypted files
pub const ENCRYPTED_EXTENSION: &str = "enc";

/// Default ceiling on plaintext size (100 MiB)
pub const DEFAULT_MAX_INPUT_SIZE: u64 = 100 * 1024 * 1024;

/// Caller-side limits applied before any data reaches the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Largest plaintext accepted, in bytes. Containers may exceed it by
    /// exactly the header length.
    pub max_input_size: u64,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

/// Header fields of a container, as reported by [`inspect_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    pub version: u8,
    pub salt: Salt,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext_len: u64,
}

/// `report.pdf` becomes `report.pdf.enc`.
pub fn default_encrypted_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(ENCRYPTED_EXTENSION);
    PathBuf::from(name)
}

/// `report.pdf.enc` becomes `report.pdf`; anything else gains `.dec`.
pub fn default_decrypted_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == ENCRYPTED_EXTENSION => input.with_extension(""),
        _ => {
            let mut name = input.as_os_str().to_owned();
            name.push(".dec");
            PathBuf::from(name)
        }
    }
}

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, encrypts it using a password from
/// `passphrase_reader`, and writes the container to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file<K: KeyDeriver>(
    codec: &FileCodec<K>,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    options: &FileOptions,
) -> Result<()> {
    let plaintext = read_bounded(input_path, options.max_input_size)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    ensure_not_empty(&passphrase)?;
    let container = codec
        .seal(&plaintext, &passphrase)
        .map_err(|e| LockboxError::from(e).with_context("encryption failed"))?;
    write_file_secure(output_path, &container)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        plaintext_len = plaintext.len(),
        "encrypted file"
    );
    Ok(())
}

/// Decrypt a file with a password
///
/// Reads the container from `input_path`, decrypts it using a password from
/// `passphrase_reader`, and writes the plaintext to `output_path`. The
/// header is validated before the password is requested.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file<K: KeyDeriver>(
    codec: &FileCodec<K>,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    options: &FileOptions,
) -> Result<()> {
    let container = read_container(input_path, options)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    ensure_not_empty(&passphrase)?;
    let plaintext = codec
        .open(&container, &passphrase)
        .map_err(|e| LockboxError::from(e).with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        plaintext_len = plaintext.len(),
        "decrypted file"
    );
    Ok(())
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated password (fresh salt and nonce)
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
///
/// The password validation prevents accidental password changes.
pub fn update_file<K: KeyDeriver>(
    codec: &FileCodec<K>,
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    options: &FileOptions,
) -> Result<()> {
    let existing = read_container(crypt_path, options)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    ensure_not_empty(&passphrase)?;

    // Validate password by decrypting existing file (discard plaintext)
    codec
        .open(&existing, &passphrase)
        .map_err(|e| LockboxError::from(e).with_context("failed to decrypt"))?;

    // Great, let's re-write it (atomically).
    let crypt_dir = match crypt_path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => {
            return Err(LockboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "crypt_path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to create tempfile", e))?;
    let new_plaintext = read_bounded(plain_path, options.max_input_size)?;
    let new_container = codec
        .seal(&new_plaintext, &passphrase)
        .map_err(|e| LockboxError::from(e).with_context("failed to encrypt"))?;

    temp_file
        .write_all(&new_container)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    // Atomically rename temp file to target (persist with restrictive permissions)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| io_error(ErrorCategory::Internal, "failed to get tempfile metadata", e))?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            io_error(
                ErrorCategory::Internal,
                "failed to set tempfile permissions",
                e,
            )
        })?;
    }
    temp_file.persist(crypt_path).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", crypt_path.display()),
            e.error,
        )
    })?;

    info!(
        input = %plain_path.display(),
        output = %crypt_path.display(),
        plaintext_len = new_plaintext.len(),
        "updated file"
    );
    Ok(())
}

/// Read and validate a container header without decrypting anything.
///
/// A file that carries the magic but fails validation is reported with
/// the version it declares.
///
/// Only the header bytes are read; the ciphertext length comes from the
/// file size.
pub fn inspect_file(path: &Path) -> Result<ContainerInfo> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    let file_len = file.metadata().map_err(|e| read_error(path, e))?.len();

    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| read_error(path, e))?;

    let container = Container::parse(&header).map_err(|e| {
        let context = match container::read_version(&header) {
            Some(version) => format!(
                "{} is not valid (declares container version {})",
                path.display(),
                version
            ),
            None => format!("{} is not valid", path.display()),
        };
        LockboxError::from(e).with_context(context)
    })?;

    Ok(ContainerInfo {
        version: container.header.version,
        salt: container.header.salt,
        nonce: container.header.nonce,
        tag: container.header.tag,
        ciphertext_len: file_len.saturating_sub(HEADER_LEN as u64),
    })
}

/// Reads a whole container and validates its header.
fn read_container(path: &Path, options: &FileOptions) -> Result<Vec<u8>> {
    let limit = options.max_input_size.saturating_add(HEADER_LEN as u64);
    let bytes = read_bounded(path, limit)?;
    Container::parse(&bytes)
        .map_err(|e| LockboxError::from(e).with_context(format!("{} is not valid", path.display())))?;
    Ok(bytes)
}

/// Reads a file into memory, refusing anything larger than `limit` bytes.
fn read_bounded(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    let len = file.metadata().map_err(|e| read_error(path, e))?.len();
    if len > limit {
        return Err(too_large(path, limit));
    }

    // The file may grow between the size check and the read.
    let mut data = Vec::with_capacity(len as usize);
    file.take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| read_error(path, e))?;
    if data.len() as u64 > limit {
        return Err(too_large(path, limit));
    }
    Ok(data)
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                io_error(
                    ErrorCategory::User,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            io_error(
                ErrorCategory::Internal,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, contents).map_err(|e| {
            io_error(
                ErrorCategory::User,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> LockboxError {
    LockboxError::with_kind_and_source(category, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> LockboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(category, format!("failed to read from {}", path.display()), err)
}

fn too_large(path: &Path, limit: u64) -> LockboxError {
    LockboxError::with_kind(
        ErrorCategory::User,
        ErrorKind::InputTooLarge,
        format!("{} is larger than the {} byte limit", path.display(), limit),
    )
}
