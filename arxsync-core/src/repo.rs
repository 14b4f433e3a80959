// arxsync_core/src/repo.rs
use crate::domain::{EntryMeta, WriteOptions};
use crate::error::Result;
use std::io::Write;

/// Destination of an import.
///
/// The engine only ever asks two things of an archive: what it currently
/// holds under a name, and a sink to stream a new version of that name into.
/// Implementations must be shareable across the drain and live lanes.
pub trait Archive: Send + Sync {
    /// Metadata of the live entry called `name`; `ArxError::NotFound` when absent.
    fn get(&self, name: &str) -> Result<EntryMeta>;

    fn create_write_stream(&self, opts: WriteOptions) -> Result<Box<dyn EntryWriter + '_>>;
}

/// Byte sink for one entry. Nothing becomes visible until [`EntryWriter::commit`];
/// dropping the writer abandons the entry.
pub trait EntryWriter: Write + Send {
    /// Returns the number of bytes committed.
    fn commit(self: Box<Self>) -> Result<u64>;
}
