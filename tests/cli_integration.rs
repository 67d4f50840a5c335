//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Get path to the lockbox binary
fn lockbox_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lockbox"))
}

/// Run lockbox with password from stdin
fn run_lockbox_with_passphrase(args: &[&str], passphrase: &str) -> Output {
    let mut child = Command::new(lockbox_bin())
        .arg("--passphrase-stdin")
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("LOCKBOX_MAX_SIZE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn lockbox");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for lockbox")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Decrypt a container produced by the previous implementation.
#[test]
fn test_decrypt_known_container() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("hello-decrypted.txt");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.enc")),
            "-o",
            path_str(&output),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.txt");
    let encrypted_path = temp_dir.path().join("hello.txt.enc");
    let decrypted_path = temp_dir.path().join("hello-decrypted.txt");

    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext_path),
            "-o",
            path_str(&encrypted_path),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let container = fs::read(&encrypted_path).unwrap();
    assert_eq!(&container[..5], b"AES2\x01");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted_path),
            "-o",
            path_str(&decrypted_path),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let original = fs::read_to_string(&plaintext_path).unwrap();
    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(original, decrypted);
}

#[test]
fn test_default_output_names() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("notes.txt");
    fs::write(&plaintext, "some notes").unwrap();

    let result = run_lockbox_with_passphrase(&["encrypt", "-i", path_str(&plaintext)], "pw");
    assert_success(&result, "encrypt");
    let encrypted = temp_dir.path().join("notes.txt.enc");
    assert!(encrypted.exists());

    fs::remove_file(&plaintext).unwrap();
    let result = run_lockbox_with_passphrase(&["decrypt", "-i", path_str(&encrypted)], "pw");
    assert_success(&result, "decrypt");
    assert_eq!(fs::read_to_string(&plaintext).unwrap(), "some notes");
}

#[test]
fn test_decrypt_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output.txt");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.enc")),
            "-o",
            path_str(&output),
        ],
        "not the password",
    );

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("wrong password or corrupted file"),
        "unexpected error output: {}",
        stderr
    );
    assert!(!output.exists());
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.enc");
    let decrypted = temp_dir.path().join("decrypted.txt");

    fs::write(&plaintext1, "Original content").unwrap();
    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    fs::write(&plaintext2, "Updated content").unwrap();
    let result = run_lockbox_with_passphrase(
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "update");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    assert_eq!(fs::read_to_string(&decrypted).unwrap(), "Updated content");
}

#[test]
fn test_update_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.enc");

    fs::write(&plaintext1, "Original").unwrap();
    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        "correct_password",
    );
    assert_success(&result, "encrypt");
    let before = fs::read(&encrypted).unwrap();

    fs::write(&plaintext2, "Updated").unwrap();
    let result = run_lockbox_with_passphrase(
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        "wrong_password",
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("failed to decrypt"),
        "Expected error message about decryption, got: {}",
        stderr
    );
    assert_eq!(fs::read(&encrypted).unwrap(), before);
}

#[test]
fn test_decrypt_non_container_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output.txt");

    // Plaintext is shorter than a container header.
    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt")),
            "-o",
            path_str(&output),
        ],
        "test",
    );
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("invalid or unsupported file"), "got: {}", stderr);

    // Long enough, but the wrong magic.
    let bogus = temp_dir.path().join("bogus.enc");
    fs::write(&bogus, vec![b'z'; 128]).unwrap();
    let result = run_lockbox_with_passphrase(
        &["decrypt", "-i", path_str(&bogus), "-o", path_str(&output)],
        "test",
    );
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("invalid or unsupported file"), "got: {}", stderr);
    assert!(!output.exists());
}

#[test]
fn test_decrypt_future_version_fails() {
    let temp_dir = TempDir::new().unwrap();
    let future = temp_dir.path().join("future.enc");
    let output = temp_dir.path().join("output.txt");

    let mut container = fs::read(testdata_path("hello.txt.enc")).unwrap();
    container[4] = 99;
    fs::write(&future, &container).unwrap();

    let result = run_lockbox_with_passphrase(
        &["decrypt", "-i", path_str(&future), "-o", path_str(&output)],
        "test",
    );
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("invalid or unsupported file"), "got: {}", stderr);
    assert!(!stderr.contains("version 99"), "got: {}", stderr);
    assert!(!output.exists());
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.enc");
    let output = temp_dir.path().join("output.txt");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&nonexistent),
            "-o",
            path_str(&output),
        ],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_empty_passphrase_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let encrypted = temp_dir.path().join("hello.txt.enc");

    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&testdata_path("hello.txt")),
            "-o",
            path_str(&encrypted),
        ],
        "\n",
    );

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("must not be empty"), "got: {}", stderr);
    assert!(!encrypted.exists());
}

#[test]
fn test_max_size_flag() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("big.bin");
    let encrypted = temp_dir.path().join("big.bin.enc");
    fs::write(&plaintext, vec![0u8; 4096]).unwrap();

    let result = run_lockbox_with_passphrase(
        &[
            "--max-size",
            "1024",
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        "pw",
    );

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("1024 byte limit"), "got: {}", stderr);
    assert!(!encrypted.exists());
}

#[test]
fn test_inspect() {
    let result = Command::new(lockbox_bin())
        .args(["inspect", "-i", path_str(&testdata_path("hello.txt.enc"))])
        .output()
        .unwrap();
    assert_success(&result, "inspect");

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("version: 1"), "got: {}", stdout);
    assert!(stdout.contains("ciphertext length: 12"), "got: {}", stdout);
    assert!(stdout.contains("salt: "), "got: {}", stdout);
}

#[test]
fn test_inspect_future_version_reports_version() {
    let temp_dir = TempDir::new().unwrap();
    let future = temp_dir.path().join("future.enc");

    let mut container = fs::read(testdata_path("hello.txt.enc")).unwrap();
    container[4] = 99;
    fs::write(&future, &container).unwrap();

    let result = Command::new(lockbox_bin())
        .args(["inspect", "-i", path_str(&future)])
        .output()
        .unwrap();
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("declares container version 99"),
        "got: {}",
        stderr
    );
    assert!(stderr.contains("invalid or unsupported file"), "got: {}", stderr);
}

#[test]
fn test_empty_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("empty.txt");
    let encrypted = temp_dir.path().join("empty.txt.enc");
    let decrypted = temp_dir.path().join("empty-decrypted.txt");

    fs::write(&plaintext, b"").unwrap();

    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");
    assert_eq!(fs::read(&encrypted).unwrap().len(), 49);

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("large.bin");
    let encrypted = temp_dir.path().join("large.bin.enc");
    let decrypted = temp_dir.path().join("large-decrypted.bin");

    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&plaintext, &large_content).unwrap();

    let result = run_lockbox_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_lockbox_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), large_content);
}
