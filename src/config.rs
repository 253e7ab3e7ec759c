use crate::error::{EmotionError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 推論エンドポイントの環境変数（設定ファイルより優先）
pub const ENDPOINT_ENV: &str = "EMOTION_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub timeout_seconds: u64,
    /// 履歴の保存先（省略時は設定ディレクトリ）
    pub history_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: emotion_common::DEFAULT_PREDICT_URL.into(),
            timeout_seconds: 30,
            history_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            log::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        log::info!("Saved configuration to {}", config_path.display());
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EmotionError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("emotion-client"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// 履歴の保存ディレクトリ
    pub fn history_dir(&self) -> Result<PathBuf> {
        match &self.history_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("history")),
        }
    }

    /// 実際に使うエンドポイント（環境変数を優先）
    pub fn resolve_endpoint(&self) -> String {
        match std::env::var(ENDPOINT_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.endpoint.clone(),
        }
    }

    pub fn set_endpoint(&mut self, endpoint: String) -> Result<()> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(EmotionError::Config(format!(
                "エンドポイントは http:// または https:// で始めてください: {}",
                endpoint
            )));
        }
        self.endpoint = endpoint;
        self.save()
    }

    pub fn set_timeout(&mut self, seconds: u64) -> Result<()> {
        if seconds == 0 {
            return Err(EmotionError::Config("タイムアウトは1秒以上にしてください".into()));
        }
        self.timeout_seconds = seconds;
        self.save()
    }
}
