//! cp950 text handling.
//!
//! The vendor exports are written in code page 950. `encoding_rs` exposes it
//! through the WHATWG Big5 decoder, which is a superset of cp950 for every
//! character these files contain.

use encoding_rs::BIG5;
use std::fs;
use std::path::Path;
use tainan_traits::{Result, TainanError};

/// Decode cp950 bytes into a UTF-8 string.
///
/// A leading UTF-8 BOM switches the decoder to UTF-8, so re-saved exports
/// still load.
///
/// # Errors
///
/// Returns [`TainanError::Encoding`] on malformed byte sequences.
pub fn decode_cp950(bytes: &[u8]) -> Result<String> {
    let (text, encoding, had_errors) = BIG5.decode(bytes);
    if had_errors {
        return Err(TainanError::Encoding(format!(
            "malformed {} byte sequence in input",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Encode a UTF-8 string as cp950 bytes.
///
/// # Errors
///
/// Returns [`TainanError::Encoding`] if the text contains characters with no
/// cp950 mapping.
pub fn encode_cp950(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, unmappable) = BIG5.encode(text);
    if unmappable {
        return Err(TainanError::Encoding(
            "text contains characters outside cp950".to_string(),
        ));
    }
    Ok(bytes.into_owned())
}

/// Read a cp950 file into a UTF-8 string.
pub fn read_cp950(path: impl AsRef<Path>) -> Result<String> {
    let bytes = fs::read(path.as_ref())?;
    decode_cp950(&bytes)
}

/// Write a UTF-8 string to a file as cp950.
pub fn write_cp950(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let bytes = encode_cp950(text)?;
    fs::write(path.as_ref(), bytes)?;
    Ok(())
}
