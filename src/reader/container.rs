use std::path::Path;

use serde_json::Value;

use crate::error::{ConverterError, Result};

/// Read every article token from an extracted record container.
///
/// The body is a JSON array of articles, or JSON Lines when it does not open
/// with `[`. Read failures are fatal I/O errors; a body that does not parse is a
/// `ContainerDecode` error so the caller can skip the archive.
pub fn parse_container(path: &Path) -> Result<Vec<Value>> {
    let bytes = fs_err::read(path)?;
    parse_container_bytes(&bytes).map_err(|err| ConverterError::ContainerDecode {
        path: path.to_path_buf(),
        reason: err.to_string().into(),
    })
}

fn parse_container_bytes(bytes: &[u8]) -> serde_json::Result<Vec<Value>> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        return serde_json::from_slice(body);
    }
    serde_json::Deserializer::from_slice(body)
        .into_iter::<Value>()
        .collect()
}
