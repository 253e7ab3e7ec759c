//! ファイルベースのキー・バリューストアと端末の確認ダイアログ

use std::path::PathBuf;

use emotion_common::{ConfirmPrompt, Error, KeyValueStore};

/// 1キー = 1ファイル (`<dir>/<key>.json`)
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> emotion_common::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> emotion_common::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Storage(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> emotion_common::Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}

/// dialoguer による確認（`--yes` 指定時は確認しない）
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
