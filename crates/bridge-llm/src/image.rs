//! Base64 data-URI encoding of PNG screenshots — the only "codec"
//! responsibility in the core (design note §9: no image processing beyond
//! this and optional down-scaling).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::LlmError;

/// Read a PNG file and return its base64-encoded bytes (no `data:` prefix;
/// callers add that for whichever transport needs it).
pub async fn encode_png_base64(path: &str) -> Result<String, LlmError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LlmError::FileMissing(format!("{path}: {e}")))?;
    Ok(STANDARD.encode(bytes))
}

/// A full `data:image/png;base64,...` URI, used by the Chat Buffer's
/// screenshot events (spec §3).
pub fn to_data_uri(base64_png: &str) -> String {
    format!("data:image/png;base64,{base64_png}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_file_contents_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let encoded = encode_png_base64(path.to_str().unwrap()).await.unwrap();
        assert_eq!(encoded, STANDARD.encode(b"hello"));
    }

    #[tokio::test]
    async fn missing_file_is_file_missing_error() {
        let result = encode_png_base64("/nonexistent/shot.png").await;
        assert!(matches!(result, Err(LlmError::FileMissing(_))));
    }

    #[test]
    fn data_uri_has_expected_prefix() {
        assert_eq!(to_data_uri("QQ=="), "data:image/png;base64,QQ==");
    }
}
