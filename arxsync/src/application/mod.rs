pub mod handlers;

use crate::presentation::cli::Commands;
use crate::settings::Settings;
use arxsync_core::error::Result;

pub fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Import {
            archive,
            inputs,
            resume,
            live,
            min_gain,
            key,
        } => {
            // flags only ever switch a setting on
            let opts = handlers::ImportArgs {
                resume: resume || settings.resume,
                live: live || settings.live,
                min_gain: min_gain.unwrap_or(settings.min_gain),
            };
            handlers::handle_import(archive, inputs, opts, key)
        }
        Commands::Ls {
            archive,
            prefix,
            long,
            key,
        } => handlers::handle_ls(archive, prefix, long, key),
        Commands::Cat { archive, path, key } => handlers::handle_cat(archive, path, key),
        Commands::Get {
            archive,
            path,
            out,
            key,
        } => handlers::handle_get(archive, path, out, key),
        Commands::Rm { archive, path, key } => handlers::handle_rm(archive, path, key),
        Commands::Verify { archive, key } => handlers::handle_verify(archive, key),
    }
}
