//! On-disk snapshot format of the state log.

use crate::error::{StateError, StateErrorExt};
use mora_domain::StateConfigEntry;
use std::sync::Arc;

const MAGIC: &[u8; 4] = b"MORA";

/// Snapshot header version.
pub(crate) const SNAPSHOT_VERSION_V1: u8 = 1;

/// Header layout: `[magic: 4][version: u8][flags: u8]`
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Flag bit: body was LZ4-compressed after encoding.
const FLAG_COMPRESSED: u8 = 1 << 0;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

pub(crate) fn encode(
    entries: &[Arc<StateConfigEntry>],
    compression: Compression,
) -> Result<Vec<u8>, StateError> {
    let body = postcard::to_stdvec(&entries).context("Encoding state log")?;
    let (flags, body) = match compression {
        Compression::None => (0, body),
        Compression::Lz4 => (FLAG_COMPRESSED, lz4_flex::compress_prepend_size(&body)),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(SNAPSHOT_VERSION_V1);
    out.push(flags);
    out.extend_from_slice(&body);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<StateConfigEntry>, StateError> {
    let Some((header, body)) = bytes.split_at_checked(HEADER_LEN) else {
        return Err(corrupted(format!("snapshot is {} bytes, shorter than its header", bytes.len())));
    };
    let (magic, meta) = header.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(corrupted("missing snapshot magic".to_owned()));
    }
    let (version, flags) = (meta[0], meta[1]);
    if version != SNAPSHOT_VERSION_V1 {
        return Err(corrupted(format!("unsupported snapshot version {version}")));
    }

    if flags & FLAG_COMPRESSED == 0 {
        return postcard::from_bytes(body).context("Decoding state log");
    }
    let raw = lz4_flex::decompress_size_prepended(body).context("Decompressing state log")?;
    postcard::from_bytes(&raw).context("Decoding state log")
}

fn corrupted(message: String) -> StateError {
    StateError::Corrupted { message: message.into(), context: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mora_domain::ValueKind;

    fn sample() -> Vec<Arc<StateConfigEntry>> {
        vec![
            Arc::new(StateConfigEntry::new("custom_image", "test", ValueKind::Secret, "a")),
            Arc::new(StateConfigEntry::new("cloudflared", "email", ValueKind::String, "ops@x.io")),
        ]
    }

    #[test]
    fn compressed_snapshot_sets_flag_and_decodes() {
        let bytes = encode(&sample(), Compression::Lz4).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(bytes[4], SNAPSHOT_VERSION_V1);
        assert_eq!(bytes[5] & FLAG_COMPRESSED, FLAG_COMPRESSED);

        let entries = decode(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].matches("cloudflared", "email"));
    }

    #[test]
    fn foreign_bytes_are_rejected() {
        let err = decode(b"not a snapshot at all").unwrap_err();
        assert!(matches!(err, StateError::Corrupted { .. }));

        let err = decode(b"MO").unwrap_err();
        assert!(matches!(err, StateError::Corrupted { .. }));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = encode(&sample(), Compression::None).unwrap();
        bytes[4] = 9;

        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version 9"), "got: {err}");
    }
}
