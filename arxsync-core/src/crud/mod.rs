use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::codec::{self, DEFAULT_MIN_GAIN};
use crate::container::delta::DeltaStore;
use crate::container::journal::{ChunkRef, EncMode, Journal, LogRecord};
use crate::domain::{EntryMeta, WriteOptions};
use crate::error::{ArxError, Result};
use crate::index::inmem::{Entry, InMemIndex};
use crate::repo::{Archive, EntryWriter};
use crate::stats::Stats;

/// Entries are split into frames of at most this many plaintext bytes.
pub const FRAME_SIZE: usize = 1 << 20;

struct Overlay {
    index: InMemIndex,
    journal: Journal,
    delta: DeltaStore,
}

/// Append-only archive stored as two sidecars next to `base_path`:
/// a journal of put/delete records and a delta store of content frames.
pub struct CrudArchive {
    pub base_path: PathBuf,
    pub log_path: PathBuf,
    pub delta_path: PathBuf,
    min_gain: f32,
    inner: Mutex<Overlay>,
}

impl CrudArchive {
    /// Open overlay; when `aead_key` is Some, both sidecars are AEAD-sealed.
    pub fn open_with_crypto(
        base: &Path,
        aead_key: Option<[u8; 32]>,
        key_salt: [u8; 32],
    ) -> Result<Self> {
        let base_path = base.to_path_buf();
        let log_path = with_ext(base, "arx.log");
        let delta_path = with_ext(base, "arx.delta");

        let enc = if let Some(key) = aead_key {
            EncMode::Aead {
                key,
                salt: key_salt,
            }
        } else {
            EncMode::Plain
        };

        let mut journal = Journal::open(&log_path, enc)?;
        let mut index = InMemIndex::default();
        for rec in journal.iter()? {
            index.apply(&rec?);
        }
        let delta = DeltaStore::open(&delta_path, enc)?;
        tracing::debug!(
            archive = %base_path.display(),
            entries = index.by_path.len(),
            "overlay opened"
        );
        Ok(Self {
            base_path,
            log_path,
            delta_path,
            min_gain: DEFAULT_MIN_GAIN,
            inner: Mutex::new(Overlay {
                index,
                journal,
                delta,
            }),
        })
    }

    pub fn open(base: &Path) -> Result<Self> {
        Self::open_with_crypto(base, None, [0u8; 32])
    }

    /// Minimum saving (fraction) before zstd is preferred over STORE.
    pub fn with_min_gain(mut self, min_gain: f32) -> Self {
        self.min_gain = codec::effective_min_gain(min_gain);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Overlay>> {
        self.inner
            .lock()
            .map_err(|_| ArxError::Format("overlay lock poisoned by a failed writer".into()))
    }

    /// Encode one frame and append it to the delta store.
    fn append_chunk(&self, plain: &[u8]) -> Result<ChunkRef> {
        let hash = *blake3::hash(plain).as_bytes();
        let (codec, frame) = codec::encode_frame(plain, self.min_gain)?;
        let (off, len) = self.lock()?.delta.append_frame(&frame)?;
        Ok(ChunkRef {
            off,
            len,
            codec,
            blake3: hash,
        })
    }

    fn commit_put(&self, opts: &WriteOptions, size: u64, chunks: Vec<ChunkRef>) -> Result<()> {
        let rec = LogRecord::Put {
            path: opts.name.clone(),
            mode: opts.mode,
            mtime: opts.mtime.as_millis(),
            size,
            chunks,
        };
        let mut ov = self.lock()?;
        ov.journal.append(&rec)?;
        ov.index.apply(&rec);
        Ok(())
    }

    /// Stream `src` into the overlay as `opts.name`.
    pub fn put_reader(&self, src: &mut dyn Read, opts: WriteOptions) -> Result<u64> {
        let mut w = self.create_write_stream(opts)?;
        std::io::copy(src, &mut w)?;
        w.commit()
    }

    pub fn delete_path(&self, path: &str) -> Result<()> {
        let mut ov = self.lock()?;
        if !ov.index.by_path.contains_key(path) {
            return Err(ArxError::NotFound(path.to_string()));
        }
        let rec = LogRecord::Delete {
            path: path.to_string(),
        };
        ov.journal.append(&rec)?;
        ov.index.apply(&rec);
        Ok(())
    }

    /// Snapshot of live entries, ordered by path.
    pub fn entries(&self) -> Result<Vec<(String, Entry)>> {
        Ok(self
            .lock()?
            .index
            .by_path
            .iter()
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect())
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(self.lock()?.index.stats.clone())
    }

    /// Open a reader over the content of `path`, checking every frame hash.
    pub fn open_reader(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let ov = self.lock()?;
        let entry = ov
            .index
            .by_path
            .get(path)
            .ok_or_else(|| ArxError::NotFound(path.to_string()))?;

        let mut out = Vec::with_capacity(entry.size as usize);
        for c in &entry.chunks {
            let frame = ov.delta.read_frame(c.off, c.len)?;
            let plain = codec::decode_frame(c.codec, &frame)?;
            if *blake3::hash(&plain).as_bytes() != c.blake3 {
                return Err(ArxError::Integrity(path.to_string()));
            }
            out.extend_from_slice(&plain);
        }
        if out.len() as u64 != entry.size {
            return Err(ArxError::Integrity(path.to_string()));
        }
        Ok(Box::new(Cursor::new(out)))
    }

    /// Re-read every live entry; returns how many were checked.
    pub fn verify(&self) -> Result<usize> {
        let names: Vec<String> = self.lock()?.index.by_path.keys().cloned().collect();
        for name in &names {
            let mut r = self.open_reader(name)?;
            std::io::copy(&mut r, &mut std::io::sink())?;
        }
        Ok(names.len())
    }
}

impl Archive for CrudArchive {
    fn get(&self, name: &str) -> Result<EntryMeta> {
        self.lock()?
            .index
            .by_path
            .get(name)
            .map(|e| e.meta(name))
            .ok_or_else(|| ArxError::NotFound(name.to_string()))
    }

    fn create_write_stream(&self, opts: WriteOptions) -> Result<Box<dyn EntryWriter + '_>> {
        Ok(Box::new(OverlayWriter {
            archive: self,
            opts,
            buf: Vec::with_capacity(64 * 1024),
            chunks: Vec::new(),
            size: 0,
        }))
    }
}

/// Buffers up to [`FRAME_SIZE`] bytes, then spills a frame to the delta store.
/// Spilled frames of an abandoned writer stay unreferenced in the delta file.
struct OverlayWriter<'a> {
    archive: &'a CrudArchive,
    opts: WriteOptions,
    buf: Vec<u8>,
    chunks: Vec<ChunkRef>,
    size: u64,
}

impl OverlayWriter<'_> {
    fn spill(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.archive.append_chunk(&self.buf)?;
        self.chunks.push(chunk);
        self.buf.clear();
        Ok(())
    }
}

impl Write for OverlayWriter<'_> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let room = FRAME_SIZE - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        self.size += n as u64;
        if self.buf.len() == FRAME_SIZE {
            self.spill().map_err(into_io)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl EntryWriter for OverlayWriter<'_> {
    fn commit(mut self: Box<Self>) -> Result<u64> {
        self.spill()?;
        let chunks = std::mem::take(&mut self.chunks);
        self.archive.commit_put(&self.opts, self.size, chunks)?;
        tracing::trace!(name = %self.opts.name, size = self.size, "entry committed");
        Ok(self.size)
    }
}

fn into_io(e: ArxError) -> std::io::Error {
    match e {
        ArxError::Io(e) => e,
        other => std::io::Error::other(other),
    }
}

fn with_ext(base: &Path, ext: &str) -> PathBuf {
    let mut p = PathBuf::from(base);
    if let Some(name) = p.file_name().and_then(|os| os.to_str()) {
        if let Some(stem) = name.strip_suffix(".arx") {
            p.set_file_name(format!("{stem}.{ext}"));
            return p;
        }
    }
    p.set_extension(ext);
    p
}
