//! Data URL ユーティリティ
//!
//! プレビューと履歴のサムネイルは "data:image/jpeg;base64,..." 形式で保持する。

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// バイト列から Data URL を作る
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("image/jpeg", b"abc"), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_encode_without_mime_type() {
        assert!(encode("", b"abc").starts_with("data:application/octet-stream;base64,"));
    }
}
