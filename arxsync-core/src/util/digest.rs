use std::io::{Result, Write};

/// Length and BLAKE3 hash of a byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Digest {
    pub len: u64,
    pub blake3: [u8; 32],
}

impl Digest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.blake3)
    }
}

/// Writer adapter that digests exactly the bytes `inner` accepted.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
    len: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            len: 0,
        }
    }

    pub fn finish(self) -> (W, Digest) {
        let digest = Digest {
            len: self.len,
            blake3: *self.hasher.finalize().as_bytes(),
        };
        (self.inner, digest)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        // short writes: only the accepted prefix counts
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
