use blake3::Hasher;
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::error::{ArxError, Result};

pub const TAG_LEN: u64 = 16;

/// Raw 32-byte key; no KDF is applied.
#[derive(Clone, Copy)]
pub struct AeadKey(pub [u8; 32]);

/// Sidecar regions (domain separation)
#[derive(Clone, Copy, Debug)]
pub enum Region {
    Journal,
    Delta,
}

impl Region {
    fn tag(self) -> &'static [u8] {
        match self {
            Region::Journal => b"arxlog",
            Region::Delta => b"arxdelta",
        }
    }
}

/// nonce = blake3(tag || salt || payload_off || cipher_len).take(24)
///
/// Payload offsets are unique within an append-only sidecar, so every frame
/// gets its own nonce.
pub fn derive_nonce(region: Region, salt: &[u8; 32], payload_off: u64, cipher_len: u64) -> XNonce {
    let mut h = Hasher::new();
    h.update(region.tag());
    h.update(salt);
    h.update(&payload_off.to_le_bytes());
    h.update(&cipher_len.to_le_bytes());
    let out = h.finalize();
    XNonce::from_slice(&out.as_bytes()[..24]).to_owned()
}

pub fn seal_frame(
    key: &AeadKey,
    region: Region,
    salt: &[u8; 32],
    payload_off: u64,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher_len = plaintext.len() as u64 + TAG_LEN;
    let nonce = derive_nonce(region, salt, payload_off, cipher_len);
    let aead = XChaCha20Poly1305::new(Key::from_slice(&key.0));
    aead.encrypt(&nonce, plaintext)
        .map_err(|_| ArxError::Format(format!("{region:?}: aead encrypt failed")))
}

pub fn open_frame(
    key: &AeadKey,
    region: Region,
    salt: &[u8; 32],
    payload_off: u64,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let nonce = derive_nonce(region, salt, payload_off, ciphertext.len() as u64);
    let aead = XChaCha20Poly1305::new(Key::from_slice(&key.0));
    aead.decrypt(&nonce, ciphertext)
        .map_err(|_| ArxError::Format(format!("{region:?}: aead decrypt failed")))
}
