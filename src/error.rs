use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像ではありません: {0}")]
    NotAnImage(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("{failures}/{total}件の推論に失敗しました")]
    PredictionFailed { failures: usize, total: usize },

    #[error("HTTPクライアントエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] emotion_common::Error),
}

pub type Result<T> = std::result::Result<T, EmotionError>;
