//! Binary/text conversions / 二进制与文本转换
//!
//! Only used where a text-safe transport is required (JSON bodies, terminal
//! output). Media otherwise travels as raw bytes.

use base64::{engine::general_purpose, Engine as _};
use std::path::{Path, PathBuf};

/// Binary/text conversion or media file failure / 编码或媒体文件错误
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("json encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn base64_to_bytes(text: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(general_purpose::STANDARD.decode(text.trim())?)
}

/// `data:<content_type>;base64,<payload>`, what a browser gets from a blob reader
pub fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, bytes_to_base64(bytes))
}

pub async fn read_media(path: &Path) -> Result<Vec<u8>, EncodingError> {
    tokio::fs::read(path).await.map_err(|source| EncodingError::Io {
        op: "read",
        path: path.to_path_buf(),
        source,
    })
}

/// Write media to disk. The parent directory must already exist.
/// 写入媒体文件，父目录必须已存在。
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), EncodingError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| EncodingError::Io {
            op: "write",
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_known_value() {
        assert_eq!(bytes_to_base64(b"RIFF"), "UklGRg==");
        assert_eq!(base64_to_bytes("UklGRg==").unwrap(), b"RIFF".to_vec());
    }

    #[test]
    fn test_malformed_base64_is_encoding_error() {
        let err = base64_to_bytes("not base64!").unwrap_err();
        assert!(matches!(err, EncodingError::InvalidBase64(_)));
    }

    #[test]
    fn test_data_url() {
        let url = to_data_url("image/jpeg", &[0xFF, 0xD8]);
        assert_eq!(url, "data:image/jpeg;base64,/9g=");
    }

    #[tokio::test]
    async fn test_write_output_requires_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = dir.path().join("out.jpg");
        write_output(&ok_path, &[1, 2, 3]).await.unwrap();
        assert_eq!(read_media(&ok_path).await.unwrap(), vec![1, 2, 3]);

        let missing = dir.path().join("missing").join("out.jpg");
        let err = write_output(&missing, &[1]).await.unwrap_err();
        assert!(matches!(err, EncodingError::Io { op: "write", .. }));
        assert!(err.to_string().contains("missing"));
    }
}
