//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use provenance::store::SqliteStore;
use provenance::{FormatVersion, KernelConfig, SigningKeys};
use provenance_core::DEFAULT_MAX_EVENTS_PER_APPEND;

/// Database path that selects an in-memory SQLite database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// provenance-server - record, seal and verify typed-input sessions
#[derive(Parser, Debug, Clone)]
#[command(name = "provenance-server")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "PROVENANCE_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// SQLite database path (`:memory:` for a throwaway database)
    #[arg(long, env = "PROVENANCE_DATABASE", default_value = "provenance.db")]
    pub database: String,

    /// PKCS#8 PEM private key used to sign finalized sessions
    ///
    /// Without it a random key is generated, and seals made by this process
    /// cannot be verified after a restart.
    #[arg(long, env = "PRIVATE_KEY_PATH")]
    pub private_key: Option<PathBuf>,

    /// SPKI PEM public key; must match the private key
    #[arg(long, env = "PUBLIC_KEY_PATH")]
    pub public_key: Option<PathBuf>,

    /// Canonical format for newly finalized sessions
    #[arg(long, env = "PROVENANCE_FORMAT", default_value_t = FormatVersion::V1)]
    pub format: FormatVersion,

    /// Largest number of events accepted by one append request
    #[arg(long, env = "PROVENANCE_MAX_EVENTS_PER_APPEND", default_value_t = DEFAULT_MAX_EVENTS_PER_APPEND)]
    pub max_events_per_append: usize,

    /// Log filter, used when `RUST_LOG` is unset
    #[arg(long, env = "PROVENANCE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Kernel configuration derived from the arguments.
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig {
            format: self.format,
            max_events_per_append: self.max_events_per_append,
        }
    }

    /// Load the signing keys.
    pub fn signing_keys(&self) -> Result<SigningKeys> {
        match (&self.private_key, &self.public_key) {
            (Some(private), public) => SigningKeys::load(private, public.as_deref())
                .with_context(|| format!("failed to load signing key from {}", private.display())),
            (None, Some(_)) => bail!("--public-key requires --private-key"),
            (None, None) => {
                let keys = SigningKeys::generate();
                tracing::warn!(
                    public_key = %keys.public_key(),
                    "no private key configured, using an ephemeral signing key"
                );
                Ok(keys)
            }
        }
    }

    /// Open the configured database.
    pub fn open_store(&self) -> Result<SqliteStore> {
        if self.database == IN_MEMORY_DATABASE {
            return SqliteStore::open_memory().context("failed to open in-memory database");
        }
        SqliteStore::open(&self.database)
            .with_context(|| format!("failed to open database {}", self.database))
    }
}
