//! Page content codec.
//!
//! Content is an open JSON document. It is stored as LZ4 block-compressed
//! JSON (`compress_prepend_size`) inside a tagged `{compression, content}`
//! blob. An empty payload is the placeholder for "no content yet".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Compression tag written by [`compress`].
pub const COMPRESSION_LZ4: &str = "lz4";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unsupported content compression: {0}")]
    UnknownCompression(String),
    #[error("Content decompression failed: {0}")]
    Decompression(String),
    #[error("Content is not valid JSON: {0}")]
    Decoding(String),
}

/// Tagged compressed content blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedContent {
    pub compression: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

impl Default for CompressedContent {
    fn default() -> Self {
        compress(None)
    }
}

impl CompressedContent {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Inverse of [`compress`].
    pub fn extract(&self) -> Result<Option<Value>, CodecError> {
        extract(self)
    }
}

/// Wrap content (or the empty placeholder) into a compressed blob.
pub fn compress(content: Option<&Value>) -> CompressedContent {
    let content = match content {
        Some(value) => lz4_flex::compress_prepend_size(value.to_string().as_bytes()),
        None => Vec::new(),
    };
    CompressedContent {
        compression: COMPRESSION_LZ4.to_string(),
        content,
    }
}

/// Decompress a blob produced by [`compress`].
pub fn extract(blob: &CompressedContent) -> Result<Option<Value>, CodecError> {
    if blob.compression != COMPRESSION_LZ4 {
        return Err(CodecError::UnknownCompression(blob.compression.clone()));
    }
    if blob.content.is_empty() {
        return Ok(None);
    }

    let raw = lz4_flex::decompress_size_prepended(&blob.content)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| CodecError::Decoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_placeholder() {
        let blob = compress(None);
        assert_eq!(blob.compression, COMPRESSION_LZ4);
        assert!(blob.is_empty());
        assert_eq!(extract(&blob).unwrap(), None);
        assert_eq!(CompressedContent::default(), blob);
    }

    #[test]
    fn test_extract_restores_content() {
        let payloads = [
            json!(null),
            json!({}),
            json!("text"),
            json!({"type": "document", "elements": [{"type": "block", "data": {"x": 1}}]}),
        ];
        for payload in payloads {
            let blob = compress(Some(&payload));
            assert_eq!(extract(&blob).unwrap(), Some(payload.clone()));
            // Reading twice does not alter the blob.
            assert_eq!(blob.extract().unwrap(), Some(payload));
        }
    }

    #[test]
    fn test_repetitive_content_compresses() {
        let elements: Vec<Value> = (0..500)
            .map(|i| json!({"type": "paragraph", "text": "lorem ipsum dolor sit amet", "i": i % 3}))
            .collect();
        let payload = json!({ "elements": elements });
        let raw_len = payload.to_string().len();
        let blob = compress(Some(&payload));
        assert!(blob.content.len() * 2 < raw_len);
    }

    #[test]
    fn test_unknown_compression() {
        let blob = CompressedContent {
            compression: "jsonpack".into(),
            content: vec![1, 2, 3],
        };
        assert!(matches!(
            extract(&blob),
            Err(CodecError::UnknownCompression(tag)) if tag == "jsonpack"
        ));
    }

    #[test]
    fn test_corrupt_blob() {
        let mut blob = compress(Some(&json!({"a": "b"})));
        blob.content.truncate(3);
        assert!(matches!(extract(&blob), Err(CodecError::Decompression(_))));

        let not_json = CompressedContent {
            compression: COMPRESSION_LZ4.into(),
            content: lz4_flex::compress_prepend_size(b"{not json"),
        };
        assert!(matches!(extract(&not_json), Err(CodecError::Decoding(_))));
    }
}
