use crate::error::{ArxError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// zstd level used when sealing overlay frames
pub const FRAME_LEVEL: i32 = 3;

/// Default minimum saving before zstd is preferred over STORE.
pub const DEFAULT_MIN_GAIN: f32 = 0.05;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

fn zstd_pack(plain: &[u8]) -> Result<Vec<u8>> {
    let mut enc = zstd::stream::Encoder::new(Vec::with_capacity(plain.len() / 2), FRAME_LEVEL)?;
    enc.include_checksum(true)?;
    enc.write_all(plain)?;
    Ok(enc.finish()?)
}

/// Clamp `min_gain` to a usable value; anything non-positive means default.
pub fn effective_min_gain(min_gain: f32) -> f32 {
    if min_gain <= 0.0 || min_gain >= 1.0 {
        DEFAULT_MIN_GAIN
    } else {
        min_gain
    }
}

fn should_compress(u: usize, c: usize, min_gain: f32) -> bool {
    // true if (u - c) >= u * min_gain  ⇔  c <= u * (1 - min_gain)
    (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}

/// Trial-compress `plain` and keep zstd only when it saves at least `min_gain`.
pub fn encode_frame(plain: &[u8], min_gain: f32) -> Result<(CodecId, Vec<u8>)> {
    if plain.is_empty() {
        return Ok((CodecId::Store, Vec::new()));
    }
    let packed = zstd_pack(plain)?;
    if should_compress(plain.len(), packed.len(), effective_min_gain(min_gain)) {
        Ok((CodecId::Zstd, packed))
    } else {
        Ok((CodecId::Store, plain.to_vec()))
    }
}

pub fn decode_frame(codec: CodecId, frame: &[u8]) -> Result<Vec<u8>> {
    match codec {
        CodecId::Store => Ok(frame.to_vec()),
        CodecId::Zstd => zstd::stream::decode_all(frame)
            .map_err(|e| ArxError::Format(format!("{codec:?} frame decode: {e}"))),
    }
}
