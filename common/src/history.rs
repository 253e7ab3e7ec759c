//! 推論履歴ストア
//!
//! 新しい順・最大 [`HISTORY_CAPACITY`](crate::HISTORY_CAPACITY) 件のリストを、
//! 1つのキーに JSON として保存する。
//!
//! 保存形式は `{"version": 1, "entries": [...]}`。旧形式（配列そのもの）も
//! 読み込めるが、それ以外の値やパース失敗は空の履歴として扱う。

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::{ConfirmPrompt, KeyValueStore};
use crate::error::Result;
use crate::types::{format_percent, HistoryEntry};

/// 履歴削除時の確認メッセージ
pub const CLEAR_CONFIRM_MESSAGE: &str = "Are you sure you want to clear your prediction history?";

/// 現在時刻の ISO-8601 文字列（UTC、ミリ秒、Z付き）
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 保存レコード
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRecord {
    /// バージョン（互換性チェック用）
    version: u32,
    entries: Vec<HistoryEntry>,
}

impl HistoryRecord {
    const CURRENT_VERSION: u32 = 1;
}

/// 推論履歴ストア
#[derive(Debug, Clone)]
pub struct HistoryStore<S> {
    store: S,
    key: String,
    capacity: usize,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, crate::HISTORY_CAPACITY)
    }

    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            key: crate::HISTORY_KEY.to_string(),
            capacity,
        }
    }

    /// 現在の履歴（存在しない・壊れている場合は空）
    pub fn read_all(&self) -> Vec<HistoryEntry> {
        self.load().unwrap_or_else(|e| {
            log::warn!("Failed to read prediction history: {}", e);
            Vec::new()
        })
    }

    /// ストア自体の読み込み失敗はエラー、中身の不正は空として扱う
    fn load(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .store
            .get(&self.key)?
            .map(|raw| decode_log(&raw))
            .unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.read_all().is_empty()
    }

    /// 先頭に追加し、容量を超えた分を末尾から捨てて保存する
    ///
    /// 画面更新のため、保存後の履歴を返す。
    pub fn append(&self, entry: HistoryEntry) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.load()?;
        entries.insert(0, entry);
        entries.truncate(self.capacity);

        let record = HistoryRecord {
            version: HistoryRecord::CURRENT_VERSION,
            entries,
        };
        let json = serde_json::to_string(&record)?;
        self.store.set(&self.key, &json)?;

        log::debug!("Saved prediction history ({} entries)", record.entries.len());
        Ok(record.entries)
    }

    /// 確認の上で履歴を丸ごと削除する
    ///
    /// # Returns
    /// * `Ok(true)` - 削除した
    /// * `Ok(false)` - キャンセルされた
    pub fn clear(&self, prompt: &impl ConfirmPrompt) -> Result<bool> {
        if !prompt.confirm(CLEAR_CONFIRM_MESSAGE) {
            return Ok(false);
        }
        self.store.remove(&self.key)?;
        log::info!("Cleared prediction history");
        Ok(true)
    }

    /// ギャラリー表示用のモデル
    pub fn view(&self) -> HistoryView {
        HistoryView::from_entries(&self.read_all())
    }
}

fn decode_log(raw: &str) -> Vec<HistoryEntry> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Discarding unreadable prediction history: {}", e);
            return Vec::new();
        }
    };

    if value.is_null() {
        return Vec::new();
    }

    let decoded = if value.is_array() {
        serde_json::from_value::<Vec<HistoryEntry>>(value)
    } else {
        match serde_json::from_value::<HistoryRecord>(value) {
            Ok(record) if record.version == HistoryRecord::CURRENT_VERSION => Ok(record.entries),
            Ok(record) => {
                log::warn!(
                    "Prediction history version {} is not supported (expected {})",
                    record.version,
                    HistoryRecord::CURRENT_VERSION
                );
                return Vec::new();
            }
            Err(e) => Err(e),
        }
    };

    decoded.unwrap_or_else(|e| {
        log::warn!("Discarding malformed prediction history: {}", e);
        Vec::new()
    })
}

/// 履歴ギャラリーの1枚
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCard {
    pub image_data_url: String,
    pub predicted_class: String,
    pub confidence_text: String,
    pub timestamp_text: String,
    pub probabilities: Vec<(String, String)>,
}

impl HistoryCard {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            image_data_url: entry.image_data_url.clone(),
            predicted_class: entry.predicted_class.clone(),
            confidence_text: entry
                .confidence
                .map(format_percent)
                .unwrap_or_else(|| "N/A".to_string()),
            timestamp_text: local_time_text(&entry.timestamp),
            probabilities: entry
                .all_probabilities
                .as_ref()
                .map(|p| p.lines())
                .unwrap_or_default(),
        }
    }
}

/// 履歴ギャラリー
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    pub cards: Vec<HistoryCard>,
    pub show_empty_message: bool,
}

impl HistoryView {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        Self {
            cards: entries.iter().map(HistoryCard::from_entry).collect(),
            show_empty_message: entries.is_empty(),
        }
    }
}

/// ISO-8601 をローカル時刻の表示文字列にする（解釈できなければそのまま）
fn local_time_text(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FixedAnswer, MemoryStore};
    use crate::types::Probabilities;

    fn entry(class: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: now_timestamp(),
            image_data_url: "data:image/png;base64,AAAA".to_string(),
            predicted_class: class.to_string(),
            confidence: Some(75.0),
            all_probabilities: Some([(class, 75.0)].into_iter().collect()),
        }
    }

    #[test]
    fn test_append_to_missing_key() {
        let store = MemoryStore::new();
        let history = HistoryStore::new(store.clone());

        let entries = history.append(entry("happy")).expect("保存失敗");
        assert_eq!(entries.len(), 1);
        assert_eq!(history.read_all().len(), 1);
        assert!(store.contains(crate::HISTORY_KEY));
    }

    #[test]
    fn test_append_over_malformed_value() {
        let store = MemoryStore::new();
        store.set(crate::HISTORY_KEY, "{not json").unwrap();
        let history = HistoryStore::new(store);

        assert!(history.read_all().is_empty());
        let entries = history.append(entry("sad")).expect("保存失敗");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].predicted_class, "sad");
    }

    /// 読み込みに失敗するストア
    struct UnreadableStore {
        writes: std::cell::Cell<usize>,
    }

    impl KeyValueStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(crate::Error::Storage("SecurityError".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_append_keeps_log_when_store_unreadable() {
        let history = HistoryStore::new(UnreadableStore {
            writes: std::cell::Cell::new(0),
        });

        assert!(history.read_all().is_empty());
        let result = history.append(entry("happy"));
        assert!(matches!(result, Err(crate::Error::Storage(_))));
        // 既存の履歴を1件で上書きしない
        assert_eq!(history.store.writes.get(), 0);
    }

    #[test]
    fn test_append_is_newest_first_and_capped() {
        let history = HistoryStore::new(MemoryStore::new());

        for i in 0..25 {
            let entries = history.append(entry(&format!("class{}", i))).expect("保存失敗");
            assert!(entries.len() <= crate::HISTORY_CAPACITY);
        }

        let entries = history.read_all();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[0].predicted_class, "class24");
        assert_eq!(entries[19].predicted_class, "class5");
    }

    #[test]
    fn test_order_follows_insertion_not_timestamp() {
        let history = HistoryStore::new(MemoryStore::new());

        let mut newer = entry("first");
        newer.timestamp = "2030-01-01T00:00:00.000Z".to_string();
        let mut older = entry("second");
        older.timestamp = "2001-01-01T00:00:00.000Z".to_string();

        history.append(newer).unwrap();
        history.append(older).unwrap();

        let entries = history.read_all();
        assert_eq!(entries[0].predicted_class, "second");
        assert_eq!(entries[1].predicted_class, "first");
    }

    #[test]
    fn test_clear_confirmed() {
        let store = MemoryStore::new();
        let history = HistoryStore::new(store.clone());
        history.append(entry("happy")).unwrap();

        assert!(history.clear(&FixedAnswer(true)).unwrap());
        assert!(history.read_all().is_empty());
        assert!(history.is_empty());
        assert!(!store.contains(crate::HISTORY_KEY));
    }

    #[test]
    fn test_clear_cancelled() {
        let history = HistoryStore::new(MemoryStore::new());
        history.append(entry("happy")).unwrap();

        assert!(!history.clear(&FixedAnswer(false)).unwrap());
        assert_eq!(history.read_all().len(), 1);
    }

    #[test]
    fn test_read_legacy_array() {
        let store = MemoryStore::new();
        let legacy = r#"[{
            "timestamp": "2025-01-18T10:00:00.000Z",
            "image_data_url": "data:image/jpeg;base64,AAAA",
            "predicted_class": "Happy",
            "confidence": 91.2,
            "all_probabilities": {"Happy": 91.2, "Sad": 8.8}
        }]"#;
        store.set(crate::HISTORY_KEY, legacy).unwrap();

        let history = HistoryStore::new(store.clone());
        let entries = history.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].predicted_class, "Happy");

        // 次の書き込みでバージョン付き形式に移行する
        history.append(entry("Sad")).unwrap();
        let raw = store.get(crate::HISTORY_KEY).unwrap().unwrap();
        assert!(raw.starts_with(r#"{"version":1"#));
        assert_eq!(history.read_all().len(), 2);
    }

    #[test]
    fn test_read_unknown_version_is_empty() {
        let store = MemoryStore::new();
        store
            .set(crate::HISTORY_KEY, r#"{"version":99,"entries":[]}"#)
            .unwrap();
        assert!(HistoryStore::new(store).read_all().is_empty());
    }

    #[test]
    fn test_read_foreign_shape_is_empty() {
        let store = MemoryStore::new();
        store.set(crate::HISTORY_KEY, r#"{"theme":"dark"}"#).unwrap();
        assert!(HistoryStore::new(store.clone()).read_all().is_empty());

        store.set(crate::HISTORY_KEY, r#"[1, 2, 3]"#).unwrap();
        assert!(HistoryStore::new(store.clone()).read_all().is_empty());

        store.set(crate::HISTORY_KEY, "null").unwrap();
        assert!(HistoryStore::new(store).read_all().is_empty());
    }

    #[test]
    fn test_view_cards() {
        let history = HistoryStore::new(MemoryStore::new());
        assert!(history.view().show_empty_message);

        let mut probabilities = Probabilities::new();
        probabilities.insert("happy", 82.5);
        probabilities.insert("sad", 17.5);
        history
            .append(HistoryEntry {
                timestamp: "not a timestamp".to_string(),
                image_data_url: "data:image/png;base64,AAAA".to_string(),
                predicted_class: "happy".to_string(),
                confidence: Some(82.5),
                all_probabilities: Some(probabilities),
            })
            .unwrap();

        let view = history.view();
        assert!(!view.show_empty_message);
        let card = &view.cards[0];
        assert_eq!(card.confidence_text, "82.50%");
        assert_eq!(card.timestamp_text, "not a timestamp");
        assert_eq!(card.probabilities[1], ("sad".to_string(), "17.50%".to_string()));
    }

    #[test]
    fn test_card_without_confidence() {
        let card = HistoryCard::from_entry(&HistoryEntry {
            timestamp: "2025-01-18T10:00:00.000Z".to_string(),
            image_data_url: String::new(),
            predicted_class: "Sad".to_string(),
            confidence: None,
            all_probabilities: None,
        });
        assert_eq!(card.confidence_text, "N/A");
        assert!(card.probabilities.is_empty());
        assert!(card.timestamp_text.starts_with("2025/01/1"));
    }

    #[test]
    fn test_now_timestamp_format() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
