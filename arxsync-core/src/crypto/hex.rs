use crate::error::{ArxError, Result};

/// Parses a fixed-size hex argument such as `--key` or `--key-salt`.
pub fn parse_hex_array<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let bytes =
        hex::decode(hex_str.trim()).map_err(|e| ArxError::Config(format!("invalid hex: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ArxError::Config(format!(
            "expected {N} bytes ({} hex chars), got {}",
            N * 2,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_length() {
        let k: [u8; 4] = parse_hex_array(" deadbeef\n").unwrap();
        assert_eq!(k, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn rejects_wrong_length_and_garbage() {
        assert!(parse_hex_array::<4>("dead").is_err());
        assert!(parse_hex_array::<2>("zzzz").is_err());
    }
}
