use std::fs::{File, Metadata};
use std::path::Path;

use crate::domain::{Mtime, WriteOptions, mode_from};
use crate::error::{ArxError, ImportError};
use crate::import::dispatch::{Engine, SourcePath};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Imported,
    /// Resume mode found an entry with the same size and mtime.
    UpToDate,
}

impl Engine {
    pub(crate) fn import_file(
        &self,
        src: &SourcePath,
        md: &Metadata,
    ) -> Result<Outcome, ImportError> {
        let path = &src.shown;
        let name = super::prefix::archive_name(&self.prefix, &src.abs)?;
        let mtime = Mtime::from_metadata(md).map_err(|source| ImportError::Stat {
            path: path.clone(),
            source,
        })?;

        let _guard = self.in_flight.acquire(&name);

        let outcome = if self.resume && self.is_up_to_date(&name, md.len(), mtime) {
            tracing::debug!(path = %path.display(), %name, "up to date");
            Outcome::UpToDate
        } else {
            let written = self
                .copy_into_archive(&src.abs, &name, mtime, mode_from(md))
                .map_err(|source| ImportError::Copy {
                    path: path.clone(),
                    name: name.clone(),
                    source: Box::new(source),
                })?;
            tracing::debug!(path = %path.display(), %name, bytes = written, "imported");
            Outcome::Imported
        };

        self.reporter
            .file_imported(path.clone(), outcome == Outcome::UpToDate);
        Ok(outcome)
    }

    /// Exact size and mtime match; any lookup failure means "import again".
    fn is_up_to_date(&self, name: &str, size: u64, mtime: Mtime) -> bool {
        match self.archive.get(name) {
            Ok(entry) => entry.size == size && entry.mtime == mtime,
            Err(ArxError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!(%name, error = %e, "resume lookup failed; importing again");
                false
            }
        }
    }

    fn copy_into_archive(
        &self,
        path: &Path,
        name: &str,
        mtime: Mtime,
        mode: u32,
    ) -> crate::error::Result<u64> {
        let mut src = File::open(path)?;
        let mut dst = self.archive.create_write_stream(WriteOptions {
            name: name.to_string(),
            mtime,
            mode,
        })?;
        std::io::copy(&mut src, &mut dst)?;
        dst.commit()
    }
}
