#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arxsync_core::{Archive, ArxError, EntryMeta, EntryWriter, ImportEvent, Result, WriteOptions};

/// In-memory archive that counts committed writes.
#[derive(Default)]
pub struct MemArchive {
    entries: Mutex<BTreeMap<String, (EntryMeta, Vec<u8>)>>,
    writes: AtomicUsize,
    fail_name: Mutex<Option<String>>,
}

impl MemArchive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Commits for `name` fail with an I/O error.
    pub fn fail_commits_for(&self, name: &str) {
        *self.fail_name.lock().unwrap() = Some(name.to_string());
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(name).map(|(_, d)| d.clone())
    }
}

impl Archive for MemArchive {
    fn get(&self, name: &str) -> Result<EntryMeta> {
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .map(|(m, _)| m.clone())
            .ok_or_else(|| ArxError::NotFound(name.to_string()))
    }

    fn create_write_stream(&self, opts: WriteOptions) -> Result<Box<dyn EntryWriter + '_>> {
        Ok(Box::new(MemWriter {
            archive: self,
            opts,
            buf: Vec::new(),
        }))
    }
}

struct MemWriter<'a> {
    archive: &'a MemArchive,
    opts: WriteOptions,
    buf: Vec<u8>,
}

impl Write for MemWriter<'_> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl EntryWriter for MemWriter<'_> {
    fn commit(self: Box<Self>) -> Result<u64> {
        let MemWriter { archive, opts, buf } = *self;
        if archive.fail_name.lock().unwrap().as_deref() == Some(opts.name.as_str()) {
            return Err(std::io::Error::other("simulated write failure").into());
        }
        let n = buf.len() as u64;
        let meta = EntryMeta {
            name: opts.name.clone(),
            size: n,
            mtime: opts.mtime,
        };
        archive.entries.lock().unwrap().insert(opts.name, (meta, buf));
        archive.writes.fetch_add(1, Ordering::SeqCst);
        Ok(n)
    }
}

pub fn write_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}

/// All `FileImported` events currently queued; panics on an `Error` event.
pub fn imported(rx: &Receiver<ImportEvent>) -> Vec<(PathBuf, bool)> {
    rx.try_iter()
        .map(|ev| match ev {
            ImportEvent::FileImported { path, up_to_date } => (path, up_to_date),
            ImportEvent::Error(e) => panic!("unexpected error event: {e}"),
        })
        .collect()
}

/// Wait until `pred` accepts an event or the deadline passes.
pub fn wait_for(
    rx: &Receiver<ImportEvent>,
    timeout: Duration,
    mut pred: impl FnMut(&ImportEvent) -> bool,
) -> Option<ImportEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        match rx.recv_timeout(left) {
            Ok(ev) if pred(&ev) => return Some(ev),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}
