//! 画像ファイルの一括推論

use std::path::{Path, PathBuf};
use std::time::Duration;

use emotion_common::{KeyValueStore, PredictionClient, ResultView, UploadPredictor};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{EmotionError, Result};
use crate::scanner;

/// 1ファイル分の結果
#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub path: PathBuf,
    pub view: ResultView,
}

impl PredictOutcome {
    pub fn is_success(&self) -> bool {
        self.view.is_success()
    }
}

/// 画像を1枚ずつ選択・送信する
///
/// 読み込めないファイルも結果（失敗）として返し、残りの処理は続ける。
pub async fn predict_paths<C, S>(
    predictor: &UploadPredictor<C, S>,
    paths: &[PathBuf],
    show_progress: bool,
) -> Vec<PredictOutcome>
where
    C: PredictionClient,
    S: KeyValueStore,
{
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        let spinner = show_progress.then(|| spinner(path));
        let view = predict_one(predictor, path).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        outcomes.push(PredictOutcome {
            path: path.clone(),
            view,
        });
    }

    outcomes
}

/// 1件でも失敗していればエラーにする
pub fn ensure_all_succeeded(outcomes: &[PredictOutcome]) -> Result<()> {
    let failures = outcomes.iter().filter(|o| !o.is_success()).count();
    if failures == 0 {
        Ok(())
    } else {
        Err(EmotionError::PredictionFailed {
            failures,
            total: outcomes.len(),
        })
    }
}

async fn predict_one<C, S>(predictor: &UploadPredictor<C, S>, path: &Path) -> ResultView
where
    C: PredictionClient,
    S: KeyValueStore,
{
    match scanner::load_image(path) {
        Ok(image) => {
            predictor.select_file(Some(image));
            predictor.submit().await
        }
        Err(e) => {
            log::error!("Failed to load {}: {}", path.display(), e);
            predictor.select_file(None);
            ResultView::Failure(format!("Prediction failed: {}", e))
        }
    }
}

fn spinner(path: &Path) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Predicting... {}", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
