//! Lockbox CLI - Password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files using
//! AES-256-GCM with PBKDF2-SHA256 key derivation.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lockbox::FileCodec;
use lockbox::error::{ErrorCategory, LockboxError};
use lockbox::file_ops::{self, DEFAULT_MAX_INPUT_SIZE, FileOptions};
use lockbox::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Largest plaintext accepted, in bytes
    #[arg(long, global = true, env = "LOCKBOX_MAX_SIZE", default_value_t = DEFAULT_MAX_INPUT_SIZE)]
    max_size: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the encrypted file to [default: <input>.enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the encrypted file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the decrypted file to [default: <input> without .enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing encrypted file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the header of an encrypted file without decrypting it
    Inspect {
        /// Path to the encrypted file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error: {}", render_chain(&e));
        process::exit(2);
    }

    let codec = FileCodec::new();
    let options = FileOptions {
        max_input_size: cli.max_size,
    };

    let result = match cli.command {
        Commands::Encrypt { input, output } => {
            let output = output.unwrap_or_else(|| file_ops::default_encrypted_path(&input));
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::encrypt_file(&codec, &input, &output, &mut *reader, &options)
        }
        Commands::Decrypt { input, output } => {
            let output = output.unwrap_or_else(|| file_ops::default_decrypted_path(&input));
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::decrypt_file(&codec, &input, &output, &mut *reader, &options)
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::update_file(&codec, &input, &output, &mut *reader, &options)
        }
        Commands::Inspect { input } => file_ops::inspect_file(&input).map(|info| {
            println!("version: {}", info.version);
            println!("salt: {}", BASE64_STANDARD.encode(info.salt));
            println!("nonce: {}", BASE64_STANDARD.encode(info.nonce));
            println!("tag: {}", BASE64_STANDARD.encode(info.tag));
            println!("ciphertext length: {}", info.ciphertext_len);
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", render_chain(&e));
        let code = match e.category {
            ErrorCategory::User => 1,
            _ => 2,
        };
        process::exit(code);
    }
}

fn init_logging(level: &str) -> Result<(), LockboxError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|e| LockboxError::with_source(ErrorCategory::Internal, "failed to set up logging", e))
}

/// Joins the error and its sources, skipping repeated messages.
fn render_chain(err: &LockboxError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let msg = inner.to_string();
        if parts.last() != Some(&msg) {
            parts.push(msg);
        }
        source = inner.source();
    }
    parts.join(": ")
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}
