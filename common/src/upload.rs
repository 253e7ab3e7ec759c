//! 画像アップロードによる推論
//!
//! ファイル選択 → プレビュー → 送信 → 結果表示 → 履歴保存 の流れを持つ。
//! 送信は `prepare`（同期: 入力チェックと送信中表示）と
//! `finish`（非同期: 送信と結果反映）に分かれている。非同期UIが
//! 送信中表示を描画してからネットワークを待てるようにするため。

use std::cell::RefCell;
use std::fmt;

use crate::capability::{KeyValueStore, PredictionClient};
use crate::error::Error;
use crate::history::HistoryStore;
use crate::types::{format_percent, HistoryEntry, ImageFile, PredictionResult, Probabilities};

/// 信頼度が低いときの案内文
pub const LOW_CONFIDENCE_MESSAGE: &str = "The model had low confidence in this prediction. \
For better results, try a clearer image of a single face, or provide feedback if you think this is a misclassification.";

/// フィードバック送信後の案内文
pub const FEEDBACK_THANKS_MESSAGE: &str =
    "Thank you for your feedback! This feature can be expanded to collect data for model improvement.";

/// 成功時の表示内容
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub predicted_class: String,
    pub confidence: f64,
    pub probabilities: Probabilities,
    /// フィードバックボタンを出すか
    pub show_feedback: bool,
}

impl PredictionReport {
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            predicted_class: result.predicted_class.clone(),
            confidence: result.confidence,
            probabilities: result.all_probabilities.clone(),
            show_feedback: result.is_low_confidence(),
        }
    }

    pub fn confidence_text(&self) -> String {
        format_percent(self.confidence)
    }

    /// "Predicted: happy with 82.50% confidence."
    pub fn headline(&self) -> String {
        format!(
            "Predicted: {} with {} confidence.",
            self.predicted_class,
            self.confidence_text()
        )
    }
}

/// 結果表示エリアの状態
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultView {
    #[default]
    Empty,
    Pending,
    Success(PredictionReport),
    Failure(String),
}

impl ResultView {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultView::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResultView::Failure(_))
    }

    /// CSSクラス (success / error)
    pub fn css_class(&self) -> &'static str {
        match self {
            ResultView::Success(_) => "success",
            ResultView::Failure(_) => "error",
            ResultView::Empty | ResultView::Pending => "",
        }
    }

    fn failure(error: &Error) -> Self {
        match error {
            Error::NoFileSelected => ResultView::Failure(error.to_string()),
            Error::IncompleteData => ResultView::Failure(format!("Error: {}", error)),
            other => ResultView::Failure(format!("Prediction failed: {}", other)),
        }
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultView::Empty => Ok(()),
            ResultView::Pending => f.write_str("Predicting..."),
            ResultView::Failure(message) => f.write_str(message),
            ResultView::Success(report) => {
                writeln!(f, "{}", report.headline())?;
                writeln!(f, "All Probabilities:")?;
                for (name, value) in report.probabilities.lines() {
                    writeln!(f, "  {}: {}", name, value)?;
                }
                if report.show_feedback {
                    writeln!(f, "{}", LOW_CONFIDENCE_MESSAGE)?;
                    writeln!(f, "[Give Feedback]")?;
                }
                Ok(())
            }
        }
    }
}

/// 送信中のリクエスト
#[derive(Debug, Clone)]
pub struct Submission {
    file: ImageFile,
}

impl Submission {
    pub fn file(&self) -> &ImageFile {
        &self.file
    }
}

/// アップロード推論コンポーネント
pub struct UploadPredictor<C, S> {
    client: C,
    history: HistoryStore<S>,
    selected: RefCell<Option<ImageFile>>,
    preview: RefCell<Option<String>>,
    result: RefCell<ResultView>,
    last_prediction: RefCell<Option<PredictionResult>>,
}

impl<C: PredictionClient, S: KeyValueStore> UploadPredictor<C, S> {
    pub fn new(client: C, history: HistoryStore<S>) -> Self {
        Self {
            client,
            history,
            selected: RefCell::new(None),
            preview: RefCell::new(None),
            result: RefCell::new(ResultView::Empty),
            last_prediction: RefCell::new(None),
        }
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// ファイル選択（`None` は選択解除）
    ///
    /// プレビューを差し替え、前回の結果表示を消す。
    pub fn select_file(&self, file: Option<ImageFile>) {
        *self.preview.borrow_mut() = file.as_ref().map(ImageFile::data_url);
        *self.selected.borrow_mut() = file;
        *self.result.borrow_mut() = ResultView::Empty;
        *self.last_prediction.borrow_mut() = None;
    }

    /// プレビュー用 Data URL
    pub fn preview(&self) -> Option<String> {
        self.preview.borrow().clone()
    }

    pub fn result(&self) -> ResultView {
        self.result.borrow().clone()
    }

    /// 入力チェックと送信中表示
    ///
    /// ファイル未選択ならエラー表示にして `None` を返す。
    pub fn prepare(&self) -> Option<Submission> {
        let Some(file) = self.selected.borrow().clone() else {
            *self.result.borrow_mut() = ResultView::failure(&Error::NoFileSelected);
            return None;
        };
        *self.result.borrow_mut() = ResultView::Pending;
        Some(Submission { file })
    }

    /// 送信して結果を反映する
    ///
    /// 成功かつ必須フィールドが揃っている場合のみ履歴に保存する。
    pub async fn finish(&self, submission: Submission) -> ResultView {
        let outcome = self.client.predict(&submission.file).await;

        let view = match outcome {
            Err(e) => {
                log::error!("Prediction failed: {}", e);
                ResultView::failure(&e)
            }
            Ok(response) => match response.into_prediction() {
                None => {
                    log::error!("Incomplete data received for {}", submission.file.name);
                    ResultView::failure(&Error::IncompleteData)
                }
                Some(prediction) => {
                    log::info!(
                        "Prediction result: {} ({:.2}%)",
                        prediction.predicted_class,
                        prediction.confidence
                    );
                    self.record(&submission.file, &prediction);
                    let report = PredictionReport::from_result(&prediction);
                    *self.last_prediction.borrow_mut() = Some(prediction);
                    ResultView::Success(report)
                }
            },
        };

        *self.result.borrow_mut() = view.clone();
        view
    }

    /// `prepare` と `finish` をまとめて実行する
    pub async fn submit(&self) -> ResultView {
        match self.prepare() {
            Some(submission) => self.finish(submission).await,
            None => self.result(),
        }
    }

    /// 低信頼度時のフィードバック（ローカルにログを残すだけ）
    pub fn acknowledge_feedback(&self) -> &'static str {
        let prediction = self.last_prediction.borrow();
        match prediction.as_ref() {
            Some(p) => log::info!(
                "Feedback submitted for: predicted={}, confidence={:.2}, true_label=user_correction_needed, image={}",
                p.predicted_class,
                p.confidence,
                self.preview.borrow().as_deref().map(log_excerpt).unwrap_or("")
            ),
            None => log::info!("Feedback submitted without a current prediction"),
        }
        FEEDBACK_THANKS_MESSAGE
    }

    fn record(&self, file: &ImageFile, prediction: &PredictionResult) {
        let entry = HistoryEntry::new(file.data_url(), prediction);
        if let Err(e) = self.history.append(entry) {
            log::error!("Failed to save prediction history: {}", e);
        }
    }
}

/// ログ用に Data URL の先頭だけを取り出す（文字境界で切る）
fn log_excerpt(url: &str) -> &str {
    const LIMIT: usize = 48;
    url.char_indices()
        .nth(LIMIT)
        .map_or(url, |(end, _)| &url[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MemoryStore;
    use crate::testing::ScriptedClient;
    use futures::executor::block_on;

    fn predictor(client: ScriptedClient) -> UploadPredictor<ScriptedClient, MemoryStore> {
        UploadPredictor::new(client, HistoryStore::new(MemoryStore::new()))
    }

    fn face() -> ImageFile {
        ImageFile::new("face.jpg", "image/jpeg", b"jpeg bytes".to_vec())
    }

    #[test]
    fn test_submit_without_file() {
        let client = ScriptedClient::new();
        let upload = predictor(client.clone());

        let view = block_on(upload.submit());
        assert_eq!(view, ResultView::Failure("Please select an image first.".to_string()));
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_select_file_sets_preview_and_clears_result() {
        let client = ScriptedClient::new();
        client.push_json(200, r#"{"detail":"boom"}"#);
        let upload = predictor(client);

        upload.select_file(Some(face()));
        assert_eq!(
            upload.preview().as_deref(),
            Some("data:image/jpeg;base64,anBlZyBieXRlcw==")
        );

        block_on(upload.submit());
        assert!(upload.result().is_failure());

        upload.select_file(None);
        assert_eq!(upload.preview(), None);
        assert_eq!(upload.result(), ResultView::Empty);
    }

    #[test]
    fn test_prepare_shows_pending() {
        let upload = predictor(ScriptedClient::new());
        upload.select_file(Some(face()));

        let submission = upload.prepare().expect("ファイル選択済み");
        assert_eq!(upload.result(), ResultView::Pending);
        assert_eq!(submission.file().name, "face.jpg");
    }

    #[test]
    fn test_success_renders_and_records_history() {
        let client = ScriptedClient::new();
        client.push_json(
            200,
            r#"{"predicted_class":"happy","confidence":82.5,"all_probabilities":{"happy":82.5,"sad":10.1,"angry":7.4}}"#,
        );
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        let text = view.to_string();
        assert!(text.contains("happy"));
        assert!(text.contains("82.50%"));
        assert!(!text.contains("Give Feedback"));
        assert_eq!(view.css_class(), "success");

        let entries = upload.history().read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].predicted_class, "happy");
        assert_eq!(entries[0].image_data_url, face().data_url());
    }

    #[test]
    fn test_low_confidence_shows_feedback() {
        let client = ScriptedClient::new();
        client.push_json(
            200,
            r#"{"predicted_class":"sad","confidence":45.0,"all_probabilities":{"happy":55.0,"sad":45.0}}"#,
        );
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        match &view {
            ResultView::Success(report) => assert!(report.show_feedback),
            other => panic!("unexpected view: {:?}", other),
        }
        assert!(view.to_string().contains("Give Feedback"));
        assert_eq!(upload.acknowledge_feedback(), FEEDBACK_THANKS_MESSAGE);
    }

    #[test]
    fn test_log_excerpt_respects_char_boundary() {
        let url = format!("data:{}é;base64,AAAA", "x".repeat(42));
        let excerpt = log_excerpt(&url);
        assert_eq!(excerpt.chars().count(), 48);
        assert!(url.starts_with(excerpt));
        assert_eq!(log_excerpt("data:,"), "data:,");
    }

    #[test]
    fn test_feedback_with_multibyte_mime_type() {
        log::set_max_level(log::LevelFilter::Info);

        let client = ScriptedClient::new();
        client.push_json(
            200,
            r#"{"predicted_class":"sad","confidence":45.0,"all_probabilities":{"happy":55.0,"sad":45.0}}"#,
        );
        let upload = predictor(client);
        let mime_type = format!("{}é", "x".repeat(42));
        upload.select_file(Some(ImageFile::new("face.bin", mime_type, b"bytes".to_vec())));

        assert!(block_on(upload.submit()).is_success());
        assert_eq!(upload.acknowledge_feedback(), FEEDBACK_THANKS_MESSAGE);
    }

    #[test]
    fn test_probabilities_render_in_server_order() {
        let client = ScriptedClient::new();
        client.push_json(
            200,
            r#"{"predicted_class":"Sad","confidence":70.0,"all_probabilities":{"Sad":70.0,"Happy":30.0}}"#,
        );
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let text = block_on(upload.submit()).to_string();
        let sad = text.find("Sad: 70.00%").expect("Sad行");
        let happy = text.find("Happy: 30.00%").expect("Happy行");
        assert!(sad < happy);
    }

    #[test]
    fn test_incomplete_body_is_not_recorded() {
        let client = ScriptedClient::new();
        client.push_json(200, r#"{"predicted_class":"happy","confidence":82.5}"#);
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        assert_eq!(
            view,
            ResultView::Failure("Error: Could not retrieve full prediction details.".to_string())
        );
        assert!(upload.history().read_all().is_empty());
    }

    #[test]
    fn test_http_error_uses_detail() {
        let client = ScriptedClient::new();
        client.push_json(400, r#"{"detail":"Uploaded file is not an image."}"#);
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        assert_eq!(
            view,
            ResultView::Failure("Prediction failed: Uploaded file is not an image.".to_string())
        );
        assert!(upload.history().read_all().is_empty());
    }

    #[test]
    fn test_http_error_without_detail() {
        let client = ScriptedClient::new();
        client.push_json(503, "");
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        assert_eq!(
            view,
            ResultView::Failure("Prediction failed: HTTP error! status: 503".to_string())
        );
    }

    #[test]
    fn test_network_error() {
        let client = ScriptedClient::new();
        client.push_error(Error::Network("Failed to fetch".to_string()));
        let upload = predictor(client);
        upload.select_file(Some(face()));

        let view = block_on(upload.submit());
        assert_eq!(view, ResultView::Failure("Prediction failed: Failed to fetch".to_string()));
        assert!(upload.history().is_empty());
    }
}
