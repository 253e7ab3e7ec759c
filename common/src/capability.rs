//! 外部機能インターフェース
//!
//! ブラウザ固有API（カメラ、canvasエンコード、localStorage、fetch、confirm）を
//! 細いトレイトとして切り出し、各コンポーネントに注入する。
//! 実装はすべてシングルスレッド前提（`Send` を要求しない）。

#![allow(async_fn_in_trait)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::types::{ImageFile, PredictResponse};

/// キー・バリュー永続化（localStorage / ファイル）
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// 推論エンドポイントへの送信
///
/// 2xx 以外は `Error::Http`、接続失敗は `Error::Network` を返す。
pub trait PredictionClient {
    async fn predict(&self, image: &ImageFile) -> Result<PredictResponse>;
}

/// 映像のネイティブ解像度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// カメラの取得
pub trait CameraSource {
    type Stream: CameraStream;

    /// カメラへのアクセスを要求し、プレビューに接続したストリームを返す
    async fn open(&self) -> Result<Self::Stream>;
}

/// 取得済みのカメラストリーム
pub trait CameraStream {
    /// メタデータ（解像度）が得られるまで待つ
    async fn resolution(&self) -> Result<Resolution>;

    /// フレームを取り出せるだけのデータがあるか
    fn has_enough_data(&self) -> bool;

    /// 全トラックを停止しプレビューから切り離す
    fn stop(&mut self);
}

/// フレームのキャプチャとPNGエンコード
pub trait FrameEncoder<S: CameraStream> {
    /// キャプチャバッファの大きさを合わせる
    fn resize(&self, resolution: Resolution);

    /// 現在のフレームをキャプチャバッファに描画する
    fn capture(&self, stream: &S) -> Result<()>;

    /// キャプチャバッファをPNGにエンコードする
    async fn encode_png(&self) -> Result<Vec<u8>>;

    /// キャプチャバッファの表示内容を消す
    fn clear(&self);
}

/// 確認ダイアログ
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// メモリ上のストア（テスト・一時利用）
///
/// clone は同じ中身を共有する。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// 常に同じ答えを返す確認ダイアログ
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("key").unwrap(), None);

        store.set("key", "value").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("value"));

        store.remove("key").unwrap();
        assert!(!store.contains("key"));
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("shared", "1").unwrap();
        assert_eq!(other.get("shared").unwrap().as_deref(), Some("1"));
    }
}
