//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 2xx以外のレスポンス（サーバーのdetail、なければ汎用メッセージ）
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 接続失敗など、レスポンス自体が得られなかった場合
    #[error("{0}")]
    Network(String),

    /// カメラ取得失敗（ブラウザではDOMExceptionのname）
    #[error("{0}")]
    Camera(String),

    #[error("Frame encode error: {0}")]
    Encode(String),

    #[error("Please select an image first.")]
    NoFileSelected,

    #[error("Could not retrieve full prediction details.")]
    IncompleteData,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTPステータスからエラーを作る（detailがなければ汎用メッセージ）
    pub fn http(status: u16, detail: Option<String>) -> Self {
        let message = detail.unwrap_or_else(|| format!("HTTP error! status: {}", status));
        Error::Http { status, message }
    }
}
