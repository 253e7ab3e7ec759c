//! 推論結果・履歴の型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - PredictResponse: /predict のレスポンスボディ（未検証）
//! - PredictionResult: 検証済みの推論結果
//! - HistoryEntry: 履歴に保存される1件

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data_url;

/// クラス名 → 確率(0–100) のマッピング
///
/// サーバーが返したキー順をそのまま保持する（ソートしない）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Probabilities(Vec<(String, f64)>);

impl Probabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: impl Into<String>, value: f64) {
        let class_name = class_name.into();
        match self.0.iter_mut().find(|(name, _)| *name == class_name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((class_name, value)),
        }
    }

    pub fn get(&self, class_name: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == class_name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 表示用の行 ("happy", "82.50%")
    pub fn lines(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(name, value)| (name.to_string(), format_percent(value)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Probabilities {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut probabilities = Probabilities::new();
        for (name, value) in iter {
            probabilities.insert(name, value);
        }
        probabilities
    }
}

impl Serialize for Probabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Probabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProbabilitiesVisitor;

        impl<'de> Visitor<'de> for ProbabilitiesVisitor {
            type Value = Probabilities;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of class name to probability")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut probabilities = Probabilities::new();
                while let Some((name, value)) = access.next_entry::<String, f64>()? {
                    probabilities.insert(name, value);
                }
                Ok(probabilities)
            }
        }

        deserializer.deserialize_map(ProbabilitiesVisitor)
    }
}

/// 百分率を小数点以下2桁で表示 (82.5 → "82.50%")
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// /predict のレスポンスボディ
///
/// 成功時も失敗時もこの形でデコードし、必須フィールドの有無は
/// [`PredictResponse::into_prediction`] で判定する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictResponse {
    pub filename: Option<String>,
    pub predicted_class: Option<String>,
    pub confidence: Option<f64>,
    pub all_probabilities: Option<Probabilities>,
    pub detail: Option<String>,
}

impl PredictResponse {
    /// 「顔が検出されない」応答かどうか
    pub fn is_no_face(&self) -> bool {
        self.detail.as_deref() == Some(crate::NO_FACE_DETAIL)
    }

    /// predicted_class・confidence・all_probabilities が揃っていれば結果を返す
    pub fn into_prediction(self) -> Option<PredictionResult> {
        let predicted_class = self.predicted_class.filter(|c| !c.is_empty())?;
        Some(PredictionResult {
            predicted_class,
            confidence: self.confidence?,
            all_probabilities: self.all_probabilities?,
        })
    }

    /// ライブ表示用: クラスと信頼度だけを取り出す（確率マップは不要）
    pub fn label(&self) -> Option<(&str, f64)> {
        let predicted_class = self.predicted_class.as_deref().filter(|c| !c.is_empty())?;
        Some((predicted_class, self.confidence?))
    }
}

/// 検証済みの推論結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_class: String,
    pub confidence: f64,
    pub all_probabilities: Probabilities,
}

impl PredictionResult {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < crate::CONFIDENCE_THRESHOLD
    }
}

/// 履歴エントリ（作成後は変更しない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub image_data_url: String,
    pub predicted_class: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub all_probabilities: Option<Probabilities>,
}

impl HistoryEntry {
    /// 推論結果と画像から現在時刻のエントリを作る
    pub fn new(image_data_url: String, result: &PredictionResult) -> Self {
        Self {
            timestamp: crate::history::now_timestamp(),
            image_data_url,
            predicted_class: result.predicted_class.clone(),
            confidence: Some(result.confidence),
            all_probabilities: Some(result.all_probabilities.clone()),
        }
    }
}

/// 送信対象の画像ファイル
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// プレビュー・履歴用の Data URL
    pub fn data_url(&self) -> String {
        data_url::encode(&self.mime_type, &self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_keep_server_order() {
        let json = r#"{"sad": 10.1, "happy": 82.5, "angry": 7.4}"#;
        let probabilities: Probabilities = serde_json::from_str(json).expect("デシリアライズ失敗");

        let names: Vec<&str> = probabilities.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sad", "happy", "angry"]);
        assert_eq!(probabilities.get("happy"), Some(82.5));
    }

    #[test]
    fn test_probabilities_serialize_in_order() {
        let probabilities: Probabilities = [("Sad", 30.0), ("Happy", 70.0)].into_iter().collect();
        let json = serde_json::to_string(&probabilities).expect("シリアライズ失敗");
        assert_eq!(json, r#"{"Sad":30.0,"Happy":70.0}"#);
    }

    #[test]
    fn test_probabilities_lines() {
        let probabilities: Probabilities = [("happy", 82.5), ("sad", 10.1)].into_iter().collect();
        assert_eq!(
            probabilities.lines(),
            vec![
                ("happy".to_string(), "82.50%".to_string()),
                ("sad".to_string(), "10.10%".to_string()),
            ]
        );
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(82.5), "82.50%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(100.0), "100.00%");
    }

    #[test]
    fn test_predict_response_complete() {
        let json = r#"{
            "filename": "face.jpg",
            "predicted_class": "happy",
            "confidence": 82.5,
            "all_probabilities": {"happy": 82.5, "sad": 10.1, "angry": 7.4}
        }"#;
        let response: PredictResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        let result = response.into_prediction().expect("必須フィールドが揃っている");

        assert_eq!(result.predicted_class, "happy");
        assert_eq!(result.confidence, 82.5);
        assert_eq!(result.all_probabilities.len(), 3);
        assert!(!result.is_low_confidence());
    }

    #[test]
    fn test_predict_response_missing_probabilities() {
        let json = r#"{"predicted_class": "happy", "confidence": 82.5}"#;
        let response: PredictResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(response.label().is_some());
        assert!(response.into_prediction().is_none());
    }

    #[test]
    fn test_predict_response_empty_class_is_incomplete() {
        let json = r#"{"predicted_class": "", "confidence": 1.0, "all_probabilities": {}}"#;
        let response: PredictResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(response.into_prediction().is_none());
    }

    #[test]
    fn test_predict_response_no_face() {
        let json = r#"{
            "predicted_class": "No Face Detected",
            "confidence": 0.0,
            "all_probabilities": {"Happy": 0.0, "Sad": 0.0},
            "detail": "No face detected in the image."
        }"#;
        let response: PredictResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(response.is_no_face());
    }

    #[test]
    fn test_low_confidence_threshold() {
        let mut result = PredictionResult {
            predicted_class: "sad".to_string(),
            confidence: 45.0,
            all_probabilities: Probabilities::new(),
        };
        assert!(result.is_low_confidence());

        result.confidence = 60.0;
        assert!(!result.is_low_confidence());
    }

    #[test]
    fn test_history_entry_deserialize_without_optional_fields() {
        let json = r#"{
            "timestamp": "2025-01-18T10:00:00.000Z",
            "image_data_url": "data:image/png;base64,AAAA",
            "predicted_class": "Happy"
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(entry.predicted_class, "Happy");
        assert_eq!(entry.confidence, None);
        assert_eq!(entry.all_probabilities, None);
    }

    #[test]
    fn test_image_file_data_url() {
        let file = ImageFile::new("face.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(file.data_url(), "data:image/png;base64,iVBORw==");
    }
}
