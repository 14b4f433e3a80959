use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// live entries
    pub files: u64,
    pub logical_bytes: u64,
    /// bytes held in delta frames, including superseded versions
    pub physical_bytes_delta: u64,
    pub puts: u64,
    pub deletes: u64,
}

impl Stats {
    pub fn compression_ratio(&self) -> f32 {
        if self.physical_bytes_delta == 0 {
            1.0
        } else {
            self.logical_bytes as f32 / self.physical_bytes_delta as f32
        }
    }
}
