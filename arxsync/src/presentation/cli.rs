use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "arxsync: import directory trees into an ARX overlay", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./arxsync.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// AEAD material for sealed overlays.
#[derive(Args, Clone, Debug, Default)]
pub struct KeyArgs {
    /// 32-byte hex key (XChaCha20-Poly1305) for journal and delta sidecars
    #[arg(long = "key")]
    pub key_hex: Option<String>,

    /// 32-byte hex salt for nonce derivation (defaults to all-zero)
    #[arg(long = "key-salt")]
    pub key_salt_hex: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import files and directories into an archive (created if missing)
    Import {
        archive: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// skip files already stored with the same size and mtime
        #[arg(long)]
        resume: bool,

        /// keep importing changes under the inputs until interrupted
        #[arg(long)]
        live: bool,

        /// min compression gain for zstd before falling back to STORE
        #[arg(long)]
        min_gain: Option<f32>,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// List archive entries
    Ls {
        archive: PathBuf,
        /// only names starting with this prefix (e.g. "photos/")
        #[arg(long)]
        prefix: Option<String>,
        /// show size and mtime, plus totals
        #[arg(long)]
        long: bool,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Stream an entry to stdout
    Cat {
        archive: PathBuf,
        path: String,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Write an entry to an output file
    Get {
        archive: PathBuf,
        path: String,
        out: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Tombstone an entry
    Rm {
        archive: PathBuf,
        path: String,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Re-read every entry and check its frame hashes
    Verify {
        archive: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },
}
