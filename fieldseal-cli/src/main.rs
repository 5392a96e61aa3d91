//! Fieldseal CLI tool for one-off field operations.
//!
//! Operator tooling around the same primitives the application uses:
//! encrypt or decrypt a single value, compute the blind index for a manual
//! query against the hash fields, and rewrap legacy envelopes into the
//! current format during a migration pass.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldseal::prelude::*;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fieldseal")]
#[command(about = "Field encryption operator tooling", long_about = None)]
struct Cli {
    /// Operator secret used for key derivation and blind indexes
    #[arg(long, env = "FIELDSEAL_SECRET", hide_env_values = true)]
    secret: String,

    /// Legacy raw key as 64 hex characters, decrypt-only
    #[arg(long, env = "FIELDSEAL_LEGACY_KEY", hide_env_values = true)]
    legacy_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a plaintext value into the current envelope
    Encrypt {
        /// Value to encrypt
        value: String,
    },
    /// Decrypt a stored value (either envelope format)
    Decrypt {
        /// Value to decrypt
        value: String,
    },
    /// Compute the blind index of a query term
    Hash {
        /// Query term
        value: String,
        /// Skip trim/lowercase normalization (byte-exact hash)
        #[arg(long)]
        exact: bool,
    },
    /// Re-encrypt a legacy envelope into the current format
    Rewrap {
        /// Legacy envelope value
        value: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = SealConfig::new(cli.secret);
    if let Some(key) = cli.legacy_key {
        config = config.with_legacy_key(key);
    }
    let keyring = Arc::new(Keyring::new(&config).context("key material initialization failed")?);

    match cli.command {
        Commands::Encrypt { value } => {
            let cipher = FieldCipher::new(keyring);
            println!("{}", cipher.encrypt(&value)?);
        }
        Commands::Decrypt { value } => {
            let cipher = FieldCipher::new(keyring);
            println!("{}", cipher.decrypt(&value)?);
        }
        Commands::Hash { value, exact } => {
            let hash = if exact {
                searchable_hash(&keyring, &value)?
            } else {
                blind_index(&keyring, &value)?
            };
            println!("{hash}");
        }
        Commands::Rewrap { value } => match classify(&value) {
            Format::Legacy => {
                let cipher = FieldCipher::new(keyring);
                let plaintext = cipher.decrypt(&value).context("legacy decrypt failed")?;
                println!("{}", cipher.encrypt(&plaintext)?);
            }
            Format::V1 => println!("{value}"),
            Format::Plain => bail!("value is not encrypted; nothing to rewrap"),
        },
    }

    Ok(())
}
