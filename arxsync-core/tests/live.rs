mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};

use arxsync_core::{ImportEvent, ImportOptions, Importer, Status};
use common::{MemArchive, wait_for, write_file};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

const LIVE: ImportOptions = ImportOptions {
    live: true,
    resume: true,
};

fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    cond()
}

fn start_live(archive: Arc<MemArchive>, root: PathBuf) -> (Status, std::sync::mpsc::Receiver<ImportEvent>) {
    let importer = Importer::new(archive, LIVE);
    let rx = importer.status().subscribe();
    let handle = importer.start(vec![root]).unwrap();
    let status = handle.status().clone();
    handle.wait().unwrap();
    assert!(status.is_live());
    (status, rx)
}

#[test]
fn file_created_after_the_drain_is_imported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("watched");
    write_file(&root.join("existing.txt"), b"old");
    let archive = MemArchive::new();
    let (status, rx) = start_live(archive.clone(), root.clone());
    assert_eq!(rx.try_iter().count(), 1);

    let fresh = root.join("nested/fresh.txt");
    write_file(&fresh, b"hello live");

    let seen = wait_for(&rx, TIMEOUT, |ev| {
        matches!(ev, ImportEvent::FileImported { path, .. } if *path == fresh)
    });
    assert!(seen.is_some(), "no event for {}", fresh.display());
    // the first event may race the write; the final content must land
    assert!(eventually(|| archive.content("watched/nested/fresh.txt").as_deref() == Some(b"hello live".as_slice())));

    status.close();
}

#[test]
fn source_deletion_leaves_archive_and_counters_alone() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("watched");
    write_file(&root.join("doomed.txt"), b"bye");
    let archive = MemArchive::new();
    let (status, rx) = start_live(archive.clone(), root.clone());
    assert_eq!(rx.try_iter().count(), 1);
    assert_eq!(status.file_count(), 1);

    let doomed = root.join("doomed.txt");
    std::fs::remove_file(&doomed).unwrap();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(status.file_count(), 1);

    // events are handled in order, so once the marker is in the removal was seen
    let marker = root.join("marker");
    write_file(&marker, b"m");
    let mut seen = Vec::new();
    assert!(eventually(|| {
        seen.extend(rx.try_iter());
        let marker_events = seen
            .iter()
            .filter(|ev| matches!(ev, ImportEvent::FileImported { path, .. } if *path == marker))
            .count();
        marker_events > 0 && status.file_count() == 1 + marker_events as u64
    }));
    assert!(seen.iter().all(|ev| match ev {
        ImportEvent::FileImported { path, .. } => *path == marker,
        ImportEvent::Error(_) => false,
    }));
    assert_eq!(archive.content("watched/doomed.txt").as_deref(), Some(b"bye".as_slice()));
    assert!(archive.names().contains(&"watched/marker".to_string()));

    status.close();
}

#[test]
fn close_stops_live_imports() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("watched");
    std::fs::create_dir_all(&root).unwrap();
    let archive = MemArchive::new();
    let (status, rx) = start_live(archive.clone(), root.clone());

    status.close();
    assert!(!status.is_live());
    // closing twice is harmless
    status.close();

    write_file(&root.join("late.txt"), b"too late");
    thread::sleep(Duration::from_millis(500));
    assert!(archive.names().is_empty());
    assert!(rx.try_recv().is_err());
    assert_eq!(archive.writes(), 0);
}

#[test]
fn dropping_the_last_status_handle_stops_the_watcher() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("watched");
    write_file(&root.join("existing.txt"), b"old");
    let archive = MemArchive::new();
    let (status, rx) = start_live(archive.clone(), root.clone());
    assert_eq!(rx.try_iter().count(), 1);

    drop(status);
    // the worker was joined, taking the engine and every event sender with it
    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(1)),
        Err(RecvTimeoutError::Disconnected)
    ));

    write_file(&root.join("late.txt"), b"too late");
    thread::sleep(Duration::from_millis(500));
    assert_eq!(archive.names(), vec!["watched/existing.txt"]);
    assert_eq!(archive.writes(), 1);
}

#[test]
fn drain_only_import_is_not_live() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("a"), b"a");
    let importer = Importer::new(MemArchive::new(), ImportOptions::default());
    let handle = importer.start(vec![dir.path().to_path_buf()]).unwrap();
    let status = handle.status().clone();
    handle.wait().unwrap();
    assert!(!status.is_live());
    assert_eq!(status.file_count(), 1);
}
