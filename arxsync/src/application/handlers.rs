use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use arxsync_core::crud::CrudArchive;
use arxsync_core::crypto::hex::parse_hex_array;
use arxsync_core::error::{ArxError, Result};
use arxsync_core::util::digest::DigestWriter;
use arxsync_core::{ImportEvent, ImportOptions, Importer};

use crate::presentation::cli::KeyArgs;

/// Effective `import` options after merging settings and flags.
#[derive(Clone, Copy, Debug)]
pub struct ImportArgs {
    pub resume: bool,
    pub live: bool,
    pub min_gain: f32,
}

fn open_archive(archive: &Path, key: &KeyArgs) -> Result<CrudArchive> {
    let aead_key = key
        .key_hex
        .as_ref()
        .map(|hex| parse_hex_array::<32>(hex))
        .transpose()?;
    let key_salt = key
        .key_salt_hex
        .as_ref()
        .map(|hex| parse_hex_array::<32>(hex))
        .transpose()?
        .unwrap_or([0u8; 32]);
    CrudArchive::open_with_crypto(archive, aead_key, key_salt)
}

fn print_event(ev: ImportEvent) {
    match ev {
        ImportEvent::FileImported {
            path,
            up_to_date: false,
        } => eprintln!("import: {}", path.display()),
        ImportEvent::FileImported {
            path,
            up_to_date: true,
        } => eprintln!("skip: {} (up to date)", path.display()),
        ImportEvent::Error(e) => eprintln!("error: {e}"),
    }
}

pub fn handle_import(
    archive: PathBuf,
    inputs: Vec<PathBuf>,
    args: ImportArgs,
    key: KeyArgs,
) -> Result<()> {
    if !(0.0..1.0).contains(&args.min_gain) {
        return Err(ArxError::Config(format!(
            "--min-gain must be in [0, 1), got {}",
            args.min_gain
        )));
    }
    let arc = Arc::new(open_archive(&archive, &key)?.with_min_gain(args.min_gain));

    let importer = Importer::new(
        arc,
        ImportOptions {
            live: args.live,
            resume: args.resume,
        },
    );
    let events = importer.status().subscribe();
    let handle = importer.start(inputs)?;

    // senders live as long as the status, so poll for the drain's end
    loop {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(ev) => print_event(ev),
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    events.try_iter().for_each(print_event);

    let status = handle.status().clone();
    if let Err(e) = handle.wait() {
        status.close();
        return Err(e);
    }
    eprintln!(
        "import: {} files, {} bytes -> {}",
        status.file_count(),
        status.total_size(),
        archive.display()
    );

    if status.is_live() {
        eprintln!("live: watching for changes (Ctrl-C to stop)");
        follow(events);
        status.close();
    }
    Ok(())
}

fn follow(events: Receiver<ImportEvent>) {
    for ev in events {
        print_event(ev);
    }
}

pub fn handle_ls(
    archive: PathBuf,
    prefix: Option<String>,
    long: bool,
    key: KeyArgs,
) -> Result<()> {
    let arc = open_archive(&archive, &key)?;
    let entries = arc.entries()?;
    let iter = entries.iter().filter(|(p, _)| match &prefix {
        Some(pref) => p.starts_with(pref.as_str()),
        None => true,
    });
    if long {
        for (p, e) in iter {
            println!("{:>12}  {:>14}  {}", e.size, e.mtime.as_millis(), p);
        }
        let stats = arc.stats()?;
        println!(
            "-- {} files, {} bytes, {} bytes stored (ratio {:.2}), {} puts, {} deletes",
            stats.files,
            stats.logical_bytes,
            stats.physical_bytes_delta,
            stats.compression_ratio(),
            stats.puts,
            stats.deletes
        );
    } else {
        for (p, _) in iter {
            println!("{}", p);
        }
    }
    Ok(())
}

pub fn handle_cat(archive: PathBuf, path: String, key: KeyArgs) -> Result<()> {
    let arc = open_archive(&archive, &key)?;
    let mut r = arc.open_reader(&path)?;
    let mut out = std::io::stdout().lock();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    out.flush()?;
    Ok(())
}

pub fn handle_get(archive: PathBuf, path: String, out: PathBuf, key: KeyArgs) -> Result<()> {
    let arc = open_archive(&archive, &key)?;
    let mut r = arc.open_reader(&path)?;
    let mut sink = DigestWriter::new(std::fs::File::create(&out)?);
    std::io::copy(&mut r, &mut sink)?;
    let (file, digest) = sink.finish();
    file.sync_all()?;
    eprintln!(
        "get: {} -> {} ({} bytes, blake3 {})",
        path,
        out.display(),
        digest.len,
        digest.to_hex()
    );
    Ok(())
}

pub fn handle_rm(archive: PathBuf, path: String, key: KeyArgs) -> Result<()> {
    let arc = open_archive(&archive, &key)?;
    arc.delete_path(&path)?;
    eprintln!("rm: {}", path);
    Ok(())
}

pub fn handle_verify(archive: PathBuf, key: KeyArgs) -> Result<()> {
    let arc = open_archive(&archive, &key)?;
    let n = arc.verify()?;
    eprintln!("verify: OK ({n} entries)");
    Ok(())
}
