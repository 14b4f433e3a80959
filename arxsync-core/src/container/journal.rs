use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::CodecId;
use crate::crypto::aead::{AeadKey, Region, TAG_LEN, open_frame, seal_frame};
use crate::error::{ArxError, Result};
use crate::util::varint::{get_uvarint, put_uvarint, uvarint_len};

const MAGIC: &[u8; 8] = b"ARXLOG\0\0";
const VERSION: u8 = 2;
const FLAG_AEAD: u8 = 0b0000_0001;
const HEADER_LEN: u64 = (MAGIC.len() + 1 + 1 + 32) as u64;

/// One delta frame holding part of an entry's bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChunkRef {
    pub off: u64,
    pub len: u64,
    pub codec: CodecId,
    /// hash of the uncompressed frame
    pub blake3: [u8; 32],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LogRecord {
    Put {
        path: String,
        mode: u32,
        /// milliseconds since the Unix epoch
        mtime: i64,
        size: u64,
        chunks: Vec<ChunkRef>,
    },
    Delete {
        path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncMode {
    Plain,
    Aead { key: [u8; 32], salt: [u8; 32] },
}

impl EncMode {
    pub fn salt(&self) -> [u8; 32] {
        match self {
            EncMode::Plain => [0u8; 32],
            EncMode::Aead { salt, .. } => *salt,
        }
    }

    fn flags(&self) -> u8 {
        match self {
            EncMode::Plain => 0,
            EncMode::Aead { .. } => FLAG_AEAD,
        }
    }
}

pub struct Journal {
    f: File,
    pub path: PathBuf,
    enc: EncMode,
}

pub struct JournalIter<'a> {
    f: &'a mut File,
    enc: EncMode,
}

impl Iterator for JournalIter<'_> {
    type Item = Result<LogRecord>;
    fn next(&mut self) -> Option<Self::Item> {
        read_next_record(self.f, self.enc).transpose()
    }
}

fn read_next_record(f: &mut File, enc: EncMode) -> Result<Option<LogRecord>> {
    let start = f.stream_position()?;
    let len = match get_uvarint(f) {
        Ok(Some(n)) => n,
        Ok(None) => return Ok(None),
        // torn length prefix at the tail
        Err(ArxError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let payload_off = start + uvarint_len(len) as u64;

    let mut buf = vec![0u8; len as usize];
    if let Err(e) = f.read_exact(&mut buf) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e.into());
    }

    let plain = match enc {
        EncMode::Plain => buf,
        EncMode::Aead { key, salt } => {
            open_frame(&AeadKey(key), Region::Journal, &salt, payload_off, &buf)?
        }
    };

    let rec: LogRecord = serde_cbor::from_slice(&plain)
        .map_err(|e| ArxError::Format(format!("journal record decode: {e}")))?;
    Ok(Some(rec))
}

fn write_header(f: &mut File, enc: EncMode) -> Result<()> {
    f.seek(SeekFrom::Start(0))?;
    f.set_len(0)?;
    f.write_all(MAGIC)?;
    f.write_all(&[VERSION, enc.flags()])?;
    f.write_all(&enc.salt())?;
    f.flush()?;
    Ok(())
}

impl Journal {
    pub fn open(path: &Path, enc: EncMode) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if f.metadata()?.len() == 0 {
            write_header(&mut f, enc)?;
        } else {
            let mut magic = [0u8; 8];
            f.read_exact(&mut magic)?;
            if &magic != MAGIC {
                return Err(ArxError::Format(format!(
                    "{} is not an arx journal",
                    path.display()
                )));
            }
            let mut ver_flags = [0u8; 2];
            f.read_exact(&mut ver_flags)?;
            let mut salt = [0u8; 32];
            f.read_exact(&mut salt)?;
            let flags = ver_flags[1];

            // Refuse to read ciphertext as plain records and vice versa
            match enc {
                EncMode::Plain if flags & FLAG_AEAD != 0 => {
                    return Err(ArxError::Config(
                        "journal is AEAD-sealed; provide --key/--key-salt".into(),
                    ));
                }
                EncMode::Aead { .. } if flags & FLAG_AEAD == 0 => {
                    return Err(ArxError::Config(
                        "journal is not sealed; omit --key".into(),
                    ));
                }
                EncMode::Aead { salt: want, .. } if want != salt => {
                    return Err(ArxError::Config(
                        "--key-salt does not match the journal".into(),
                    ));
                }
                _ => {}
            }
        }

        f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            enc,
        })
    }

    /// Append a single record (length-delimited). Partial tails are ignored on read.
    pub fn append(&mut self, rec: &LogRecord) -> Result<()> {
        let mut plain = Vec::with_capacity(256);
        serde_cbor::to_writer(&mut plain, rec)
            .map_err(|e| ArxError::Format(format!("journal record encode: {e}")))?;

        let pos = self.f.seek(SeekFrom::End(0))?;
        let body = match self.enc {
            EncMode::Plain => plain,
            EncMode::Aead { key, salt } => {
                let cipher_len = plain.len() as u64 + TAG_LEN;
                let payload_off = pos + uvarint_len(cipher_len) as u64;
                seal_frame(&AeadKey(key), Region::Journal, &salt, payload_off, &plain)?
            }
        };

        let mut out = Vec::with_capacity(body.len() + 10);
        put_uvarint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
        self.f.write_all(&out)?;
        self.f.flush()?;
        Ok(())
    }

    /// Iterate records from the start, after the header.
    pub fn iter(&mut self) -> Result<JournalIter<'_>> {
        self.f.flush()?;
        self.f.seek(SeekFrom::Start(HEADER_LEN))?;
        Ok(JournalIter {
            f: &mut self.f,
            enc: self.enc,
        })
    }
}
