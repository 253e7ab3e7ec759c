use crate::error::{EmotionError, Result};
use emotion_common::ImageFile;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

fn is_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 引数のパスから送信対象の画像を集める
///
/// ファイルはそのまま、フォルダは直下（`recursive` なら配下すべて）の画像を
/// ファイル名順に展開する。
pub fn collect_images(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for input in inputs {
        if input.is_file() {
            images.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            return Err(EmotionError::FileNotFound(input.display().to_string()));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_image_extension(p))
            .collect();
        found.sort();
        images.extend(found);
    }

    if images.is_empty() {
        let joined = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(EmotionError::NoImagesFound(joined));
    }

    Ok(images)
}

/// 画像ファイルを読み込む（形式は中身から判定）
pub fn load_image(path: &Path) -> Result<ImageFile> {
    if !path.exists() {
        return Err(EmotionError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)
        .map_err(|_| EmotionError::NotAnImage(path.display().to_string()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    Ok(ImageFile::new(name, format.to_mime_type(), bytes))
}
