//! Path import engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use arxsync_core::crud::CrudArchive;
//! use arxsync_core::import::{ImportEvent, ImportOptions, Importer};
//!
//! let archive = Arc::new(CrudArchive::open("backup.arx".as_ref())?);
//! let importer = Importer::new(archive, ImportOptions { resume: true, live: false });
//! let events = importer.status().subscribe();
//! let handle = importer.start(vec!["photos".into(), "notes.txt".into()])?;
//! handle.wait()?;
//! for ev in events.try_iter() {
//!     if let ImportEvent::FileImported { path, up_to_date } = ev {
//!         println!("{} {}", if up_to_date { "skip" } else { "import" }, path.display());
//!     }
//! }
//! # Ok::<(), arxsync_core::error::ArxError>(())
//! ```

pub mod dispatch;
pub mod file;
pub(crate) mod inflight;
pub mod live;
pub mod prefix;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Deserialize;

use crate::error::{ImportError, Result};
use crate::repo::Archive;

pub use dispatch::ErrorPolicy;
pub use file::Outcome;
pub use live::LiveWatcher;
pub use status::{ImportEvent, Status};

use dispatch::{Engine, SourcePath};
use inflight::InFlight;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Keep importing changes under the roots after the initial drain.
    pub live: bool,
    /// Skip files whose archive entry already has the same size and mtime.
    pub resume: bool,
}

/// Configured but not yet started import. Subscribe to [`Importer::status`]
/// before calling [`Importer::start`] to see every event.
pub struct Importer {
    archive: Arc<dyn Archive>,
    opts: ImportOptions,
    status: Status,
}

impl Importer {
    pub fn new(archive: Arc<dyn Archive>, opts: ImportOptions) -> Self {
        Self {
            archive,
            opts,
            status: Status::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status.clone()
    }

    /// Start the drain (and the live watcher, if enabled) in the background.
    ///
    /// Roots are drained in the given order, each completely before the next.
    pub fn start(self, roots: Vec<PathBuf>) -> Result<ImportHandle> {
        if roots.is_empty() {
            return Ok(ImportHandle {
                status: self.status,
                drain: None,
            });
        }

        let roots = roots
            .into_iter()
            .map(|shown| {
                let abs = prefix::normalize(&std::path::absolute(&shown)?);
                Ok(SourcePath { shown, abs })
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        let abs_roots: Vec<PathBuf> = roots.iter().map(|r| r.abs.clone()).collect();
        let prefix = prefix::common_prefix(&abs_roots);

        let engine = Arc::new(Engine {
            archive: self.archive,
            prefix,
            roots,
            resume: self.opts.resume,
            reporter: self.status.reporter(),
            in_flight: InFlight::default(),
        });

        if self.opts.live {
            let watcher = LiveWatcher::spawn(Arc::clone(&engine), &abs_roots)?;
            self.status.attach_watcher(watcher);
        }

        tracing::info!(
            roots = abs_roots.len(),
            prefix = %engine.prefix.display(),
            resume = self.opts.resume,
            live = self.opts.live,
            "import started"
        );

        let drain = thread::Builder::new()
            .name("arxsync-drain".into())
            .spawn(move || drain(&engine))
            .map_err(ImportError::Spawn)?;

        Ok(ImportHandle {
            status: self.status,
            drain: Some(drain),
        })
    }
}

fn drain(engine: &Engine) -> std::result::Result<(), ImportError> {
    for root in &engine.roots {
        engine.dispatch(root, ErrorPolicy::FailFast).inspect_err(|err| {
            tracing::warn!(root = %root.shown.display(), error = %err, "drain aborted");
        })?;
    }
    tracing::info!(
        files = engine.reporter.file_count(),
        bytes = engine.reporter.total_size(),
        "drain finished"
    );
    Ok(())
}

/// A running import.
pub struct ImportHandle {
    status: Status,
    drain: Option<JoinHandle<std::result::Result<(), ImportError>>>,
}

impl ImportHandle {
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// True once the drain thread has returned; [`ImportHandle::wait`] will
    /// then not block.
    pub fn is_finished(&self) -> bool {
        self.drain.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the drain finishes; the first drain error, if any.
    /// Live watching (if enabled) continues until [`Status::close`] or until
    /// the last [`Status`] clone is dropped.
    pub fn wait(self) -> Result<()> {
        match self.drain {
            None => Ok(()),
            Some(h) => match h.join() {
                Ok(res) => Ok(res?),
                Err(_) => Err(ImportError::DrainPanicked.into()),
            },
        }
    }
}

/// Shorthand for `Importer::new(archive, opts).start(roots)`.
pub fn import_paths(
    archive: Arc<dyn Archive>,
    roots: Vec<PathBuf>,
    opts: ImportOptions,
) -> Result<ImportHandle> {
    Importer::new(archive, opts).start(roots)
}
