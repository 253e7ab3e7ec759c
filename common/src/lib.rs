//! Face Emotion Client Common Library
//!
//! CLIとWeb(WASM)で共有される型とコンポーネント:
//! - 履歴ストア / ナビゲーション / アップロード推論 / ライブ推論
//! - ブラウザ固有APIを切り出した外部機能インターフェース

pub mod capability;
pub mod data_url;
pub mod error;
pub mod history;
pub mod live;
pub mod navigation;
pub mod parser;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod upload;

pub use capability::{
    CameraSource, CameraStream, ConfirmPrompt, FixedAnswer, FrameEncoder, KeyValueStore,
    MemoryStore, PredictionClient, Resolution,
};
pub use error::{Error, Result};
pub use history::{HistoryCard, HistoryStore, HistoryView};
pub use live::{LiveDisplay, LiveEmotion, LivePredictor, LiveState, SampleOrder};
pub use navigation::{NavigationController, Section, SideEffect, Transition, UrlUpdate};
pub use parser::parse_predict_response;
pub use types::{HistoryEntry, ImageFile, PredictResponse, PredictionResult, Probabilities};
pub use upload::{PredictionReport, ResultView, Submission, UploadPredictor};

/// 推論エンドポイント
pub const DEFAULT_PREDICT_URL: &str = "http://127.0.0.1:8000/predict";

/// これ未満の信頼度(%)でフィードバックボタンを出す
pub const CONFIDENCE_THRESHOLD: f64 = 60.0;

/// ライブ推論の最小送信間隔(ms)
pub const PREDICTION_INTERVAL_MS: f64 = 200.0;

/// 履歴の最大件数
pub const HISTORY_CAPACITY: usize = 20;

/// 履歴の保存キー
pub const HISTORY_KEY: &str = "faceEmotionPredictions";

/// 「顔が検出されない」ことを示す detail
pub const NO_FACE_DETAIL: &str = "No face detected in the image.";
