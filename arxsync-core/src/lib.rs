#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod repo;
pub mod stats;

pub mod util {
    pub mod digest;
    pub mod varint;
}

pub mod codec;

pub mod crypto {
    pub mod aead;
    pub mod hex;
}

pub mod container {
    pub mod delta;
    pub mod journal;
}

pub mod index {
    pub mod inmem;
}

pub mod crud;
pub mod import;

// Re-exports: stable API surface
pub use crud::CrudArchive;
pub use domain::{EntryMeta, Mtime, WriteOptions};
pub use error::{ArxError, ImportError, Result};
pub use import::{ImportEvent, ImportHandle, ImportOptions, Importer, Status, import_paths};
pub use repo::{Archive, EntryWriter};
