use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ImportError;
use crate::import::inflight::InFlight;
use crate::import::status::Reporter;
use crate::repo::Archive;

/// What a lane does with a failure below the path it dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failure and return it (drain lane).
    FailFast,
    /// Emit the failure as an `Error` event and carry on with siblings
    /// (live lane).
    Report,
}

/// A path as the caller spelled it, paired with its normalised absolute form.
///
/// Events and errors report `shown`; filesystem access and archive names use
/// `abs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourcePath {
    pub(crate) shown: PathBuf,
    pub(crate) abs: PathBuf,
}

impl SourcePath {
    pub(crate) fn join(&self, name: &OsStr) -> Self {
        Self {
            shown: self.shown.join(name),
            abs: self.abs.join(name),
        }
    }
}

/// State shared by every lane of one import.
pub(crate) struct Engine {
    pub(crate) archive: Arc<dyn Archive>,
    pub(crate) prefix: PathBuf,
    pub(crate) roots: Vec<SourcePath>,
    pub(crate) resume: bool,
    pub(crate) reporter: Arc<Reporter>,
    pub(crate) in_flight: InFlight,
}

impl Engine {
    /// Re-express an absolute path reported by the watcher under the root
    /// the caller gave; paths outside every root are shown as-is.
    pub(crate) fn source_for(&self, abs: PathBuf) -> SourcePath {
        let shown = self
            .roots
            .iter()
            .find_map(|root| {
                let rest = abs.strip_prefix(&root.abs).ok()?;
                Some(if rest.as_os_str().is_empty() {
                    root.shown.clone()
                } else {
                    root.shown.join(rest)
                })
            })
            .unwrap_or_else(|| abs.clone());
        SourcePath { shown, abs }
    }

    /// Route `path` to the directory walker or the file importer.
    pub(crate) fn dispatch(&self, path: &SourcePath, policy: ErrorPolicy) -> Result<(), ImportError> {
        let md = fs::metadata(&path.abs).map_err(|source| ImportError::Stat {
            path: path.shown.clone(),
            source,
        })?;

        if md.is_dir() {
            self.walk_dir(path, policy)
        } else if md.is_file() {
            self.reporter.record_file(md.len());
            self.import_file(path, &md).map(|_| ())
        } else {
            tracing::debug!(path = %path.shown.display(), "skipping special file");
            Ok(())
        }
    }

    /// Depth-first, one child at a time, children in file-name order.
    fn walk_dir(&self, dir: &SourcePath, policy: ErrorPolicy) -> Result<(), ImportError> {
        let enumerate = |source| ImportError::Enumerate {
            path: dir.shown.clone(),
            source,
        };
        let mut children = fs::read_dir(&dir.abs)
            .map_err(enumerate)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(enumerate)?;
        children.sort();

        tracing::trace!(dir = %dir.shown.display(), children = children.len(), "walking");
        for name in children {
            let child = dir.join(&name);
            if let Err(err) = self.dispatch(&child, policy) {
                match policy {
                    ErrorPolicy::FailFast => return Err(err),
                    ErrorPolicy::Report => self.reporter.error(err),
                }
            }
        }
        Ok(())
    }
}
