use std::collections::BTreeMap;

use crate::container::journal::{ChunkRef, LogRecord};
use crate::domain::{EntryMeta, Mtime};
use crate::stats::Stats;

#[derive(Clone, Debug)]
pub struct Entry {
    pub mode: u32,
    pub mtime: Mtime,
    pub size: u64,
    pub chunks: Vec<ChunkRef>,
}

impl Entry {
    pub fn meta(&self, name: &str) -> EntryMeta {
        EntryMeta {
            name: name.to_string(),
            size: self.size,
            mtime: self.mtime,
        }
    }
}

/// Journal replay target: latest version of every live path.
#[derive(Clone, Debug, Default)]
pub struct InMemIndex {
    pub by_path: BTreeMap<String, Entry>,
    pub stats: Stats,
}

impl InMemIndex {
    pub fn apply(&mut self, rec: &LogRecord) {
        match rec {
            LogRecord::Put {
                path,
                mode,
                mtime,
                size,
                chunks,
            } => {
                let e = Entry {
                    mode: *mode,
                    mtime: Mtime(*mtime),
                    size: *size,
                    chunks: chunks.clone(),
                };
                self.stats.puts += 1;
                self.stats.physical_bytes_delta += chunks.iter().map(|c| c.len).sum::<u64>();
                self.stats.logical_bytes += *size;
                if let Some(old) = self.by_path.insert(path.clone(), e) {
                    self.stats.logical_bytes -= old.size;
                } else {
                    self.stats.files += 1;
                }
            }
            LogRecord::Delete { path } => {
                self.stats.deletes += 1;
                if let Some(old) = self.by_path.remove(path) {
                    self.stats.files -= 1;
                    self.stats.logical_bytes -= old.size;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(path: &str, size: u64) -> LogRecord {
        LogRecord::Put {
            path: path.into(),
            mode: 0o644,
            mtime: 5,
            size,
            chunks: Vec::new(),
        }
    }

    #[test]
    fn overwrite_and_delete_keep_stats_consistent() {
        let mut idx = InMemIndex::default();
        idx.apply(&put("a", 10));
        idx.apply(&put("b", 20));
        idx.apply(&put("a", 15));
        assert_eq!(idx.stats.files, 2);
        assert_eq!(idx.stats.logical_bytes, 35);

        idx.apply(&LogRecord::Delete { path: "b".into() });
        idx.apply(&LogRecord::Delete {
            path: "missing".into(),
        });
        assert_eq!(idx.stats.files, 1);
        assert_eq!(idx.stats.logical_bytes, 15);
        assert_eq!(idx.stats.puts, 3);
        assert_eq!(idx.stats.deletes, 2);
        assert_eq!(idx.by_path["a"].meta("a").size, 15);
    }
}
