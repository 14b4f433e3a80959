use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::container::journal::EncMode;
use crate::crypto::aead::{AeadKey, Region, TAG_LEN, open_frame, seal_frame};
use crate::error::Result;
use crate::util::varint::{put_uvarint, uvarint_len};

/// Append-only store of length-prefixed frames.
pub struct DeltaStore {
    f: File,
    pub path: PathBuf,
    pub next_off: u64,
    enc: EncMode,
}

impl DeltaStore {
    pub fn open(path: &Path, enc: EncMode) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let next_off = f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            next_off,
            enc,
        })
    }

    /// Returns `(payload_off, stored_len)` for the new frame.
    pub fn append_frame(&mut self, frame_plain: &[u8]) -> Result<(u64, u64)> {
        let pos = self.f.seek(SeekFrom::End(0))?;
        let body = match self.enc {
            EncMode::Plain => frame_plain.to_vec(),
            EncMode::Aead { key, salt } => {
                let cipher_len = frame_plain.len() as u64 + TAG_LEN;
                let payload_off = pos + uvarint_len(cipher_len) as u64;
                seal_frame(&AeadKey(key), Region::Delta, &salt, payload_off, frame_plain)?
            }
        };

        let mut lenv = Vec::with_capacity(10);
        put_uvarint(&mut lenv, body.len() as u64);
        self.f.write_all(&lenv)?;
        self.f.write_all(&body)?;
        self.f.flush()?;

        let payload_off = pos + lenv.len() as u64;
        self.next_off = payload_off + body.len() as u64;
        Ok((payload_off, body.len() as u64))
    }

    pub fn read_frame(&self, off: u64, len: u64) -> Result<Vec<u8>> {
        let mut f = self.f.try_clone()?;
        f.seek(SeekFrom::Start(off))?;
        let mut buf = vec![0u8; len as usize];
        f.read_exact(&mut buf)?;

        match self.enc {
            EncMode::Plain => Ok(buf),
            EncMode::Aead { key, salt } => open_frame(&AeadKey(key), Region::Delta, &salt, off, &buf),
        }
    }
}
