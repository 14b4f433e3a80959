// arxsync_core/src/domain.rs
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Modification time in whole milliseconds since the Unix epoch.
///
/// Both the archive side and the filesystem side of a resume check go through
/// [`Mtime::from_system_time`], so the comparison is always made at the same
/// precision. Times before the epoch are negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mtime(pub i64);

impl Mtime {
    pub fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Mtime(d.as_millis() as i64),
            Err(e) => {
                // round toward negative infinity so sub-ms pre-epoch times stay ordered
                let d = e.duration();
                let ms = d.as_millis() as i64;
                if d.subsec_nanos() % 1_000_000 == 0 {
                    Mtime(-ms)
                } else {
                    Mtime(-ms - 1)
                }
            }
        }
    }

    pub fn from_metadata(md: &Metadata) -> std::io::Result<Self> {
        md.modified().map(Self::from_system_time)
    }

    pub fn to_system_time(self) -> SystemTime {
        if self.0 >= 0 {
            UNIX_EPOCH + Duration::from_millis(self.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_millis(self.0.unsigned_abs())
        }
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}

/// What the archive knows about one stored entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub name: String,
    pub size: u64,
    pub mtime: Mtime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// archive-relative, `/`-separated
    pub name: String,
    pub mtime: Mtime,
    pub mode: u32,
}

pub fn mode_from(_md: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _md.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        0o100644
    }
}
