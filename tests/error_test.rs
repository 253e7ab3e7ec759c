//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use emotion_client::error::EmotionError;
use emotion_client::scanner;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 存在しないファイルを指定した場合
#[test]
fn test_collect_nonexistent_path() {
    let result = scanner::collect_images(&[PathBuf::from("/nonexistent/path/12345")], false);
    assert!(matches!(result, Err(EmotionError::FileNotFound(_))));
}

/// 画像のないフォルダを指定した場合
#[test]
fn test_collect_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::collect_images(&[dir.path().to_path_buf()], false);
    assert!(matches!(result, Err(EmotionError::NoImagesFound(_))));
}

/// 存在しない画像を読み込んだ場合
#[test]
fn test_load_missing_image() {
    let result = scanner::load_image(Path::new("/nonexistent/face.png"));
    assert!(matches!(result, Err(EmotionError::FileNotFound(_))));
}

/// EmotionErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        EmotionError::Config("テスト設定エラー".to_string()),
        EmotionError::FileNotFound("face.jpg".to_string()),
        EmotionError::NotAnImage("notes.jpg".to_string()),
        EmotionError::NoImagesFound("フォルダ".to_string()),
        EmotionError::PredictionFailed { failures: 2, total: 5 },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: EmotionError = io_err.into();

    assert!(matches!(err, EmotionError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: EmotionError = json_err.into();

    assert!(matches!(err, EmotionError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let common_err = emotion_common::Error::http(404, None);
    let err: EmotionError = common_err.into();

    assert!(matches!(err, EmotionError::Core(_)));
    assert_eq!(format!("{}", err), "HTTP error! status: 404");
}
