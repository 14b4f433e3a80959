use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ImportError;
use crate::import::live::LiveWatcher;

#[derive(Clone, Debug)]
pub enum ImportEvent {
    /// A file was imported, or found already up to date in resume mode.
    FileImported { path: PathBuf, up_to_date: bool },
    /// A failure that no caller is waiting on (live lane, or a failing child
    /// in the live lane's directory walk).
    Error(Arc<ImportError>),
}

/// Counters and subscribers, shared by the caller's [`Status`] and every
/// lane of the engine.
///
/// Counters are bumped the moment a path is classified as a regular file,
/// before any resume decision, so they count files discovered rather than
/// files copied.
#[derive(Default)]
pub(crate) struct Reporter {
    file_count: AtomicU64,
    total_size: AtomicU64,
    subscribers: Mutex<Vec<Sender<ImportEvent>>>,
}

impl Reporter {
    pub(crate) fn subscribe(&self) -> Receiver<ImportEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers().push(tx);
        rx
    }

    pub(crate) fn file_count(&self) -> u64 {
        self.file_count.load(Ordering::SeqCst)
    }

    pub(crate) fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::SeqCst)
    }

    pub(crate) fn record_file(&self, size: u64) {
        self.file_count.fetch_add(1, Ordering::SeqCst);
        self.total_size.fetch_add(size, Ordering::SeqCst);
    }

    pub(crate) fn file_imported(&self, path: PathBuf, up_to_date: bool) {
        self.emit(ImportEvent::FileImported { path, up_to_date });
    }

    pub(crate) fn error(&self, err: ImportError) {
        let err = Arc::new(err);
        let delivered = self.emit(ImportEvent::Error(Arc::clone(&err)));
        if delivered == 0 {
            // nobody listening; keep the failure visible
            tracing::error!(error = %err, "unobserved import error");
        }
    }

    /// Returns how many subscribers received the event.
    fn emit(&self, event: ImportEvent) -> usize {
        let mut subs = self.subscribers();
        if let ImportEvent::Error(err) = &event {
            tracing::debug!(error = %err, subscribers = subs.len(), "emitting error event");
        }
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        subs.len()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<ImportEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// The caller's progress handle over the engine's event reporter.
///
/// The live watcher belongs to the caller's handles only: [`Status::close`]
/// stops it, and so does dropping the last clone of the handle. The engine
/// keeps just the reporter, so a running drain never keeps watching alive.
///
/// Errors emitted while nobody is subscribed are logged at `error` level
/// rather than dropped silently; callers running in live mode should
/// [`subscribe`](Status::subscribe) to observe them.
#[derive(Clone, Default)]
pub struct Status {
    inner: Arc<StatusInner>,
}

#[derive(Default)]
struct StatusInner {
    reporter: Arc<Reporter>,
    watcher: Mutex<Option<LiveWatcher>>,
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event emitted after this call, in emission order.
    pub fn subscribe(&self) -> Receiver<ImportEvent> {
        self.inner.reporter.subscribe()
    }

    pub fn file_count(&self) -> u64 {
        self.inner.reporter.file_count()
    }

    pub fn total_size(&self) -> u64 {
        self.inner.reporter.total_size()
    }

    pub fn is_live(&self) -> bool {
        self.watcher().is_some()
    }

    /// Stop live watching, if active. An in-flight drain is unaffected.
    pub fn close(&self) {
        // take first so the watcher is dropped without the slot locked
        let watcher = self.watcher().take();
        if let Some(w) = watcher {
            tracing::info!("closing live watcher");
            drop(w);
        }
    }

    pub(crate) fn reporter(&self) -> Arc<Reporter> {
        Arc::clone(&self.inner.reporter)
    }

    pub(crate) fn attach_watcher(&self, watcher: LiveWatcher) {
        *self.watcher() = Some(watcher);
    }

    fn watcher(&self) -> MutexGuard<'_, Option<LiveWatcher>> {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StatusInner {
    fn drop(&mut self) {
        let watcher = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if watcher.is_some() {
            tracing::info!("last status handle dropped; closing live watcher");
        }
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Status")
            .field("file_count", &self.file_count())
            .field("total_size", &self.total_size())
            .finish_non_exhaustive()
    }
}
