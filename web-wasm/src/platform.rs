//! ブラウザAPIによる外部機能の実装
//!
//! localStorage / getUserMedia / canvas.toBlob / fetch / confirm を
//! `emotion-common` の外部機能トレイトに合わせる。`JsValue` のエラーは
//! ここで `emotion_common::Error` に変換する。

use emotion_common::{
    parse_predict_response, CameraSource, CameraStream, ConfirmPrompt, Error, FrameEncoder,
    ImageFile, KeyValueStore, PredictResponse, PredictionClient, Resolution, Result,
};
use futures::channel::oneshot;
use gloo::events::EventListener;
use gloo::storage::{LocalStorage, Storage};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobPropertyBag, CanvasRenderingContext2d, File, FormData, HtmlCanvasElement,
    HtmlVideoElement, MediaStream, MediaStreamConstraints, MediaStreamTrack, Request, RequestInit,
    RequestMode, Response,
};

/// プレビュー用 `<video>` の id
pub const VIDEO_ELEMENT_ID: &str = "webcam-feed";

/// キャプチャ用 `<canvas>` の id
pub const CANVAS_ELEMENT_ID: &str = "webcam-canvas";

/// HTMLMediaElement.HAVE_METADATA
const HAVE_METADATA: u16 = 1;
/// HTMLMediaElement.HAVE_ENOUGH_DATA
const HAVE_ENOUGH_DATA: u16 = 4;

/// JS例外のメッセージ（`Error.message` があればそれ）
pub fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return exception.message();
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// JS例外の名前（`NotAllowedError` など）
fn js_name(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return exception.name();
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.name());
    }
    String::new()
}

fn window() -> std::result::Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("window is not available"))
}

fn element_by_id<T: JsCast>(id: &str) -> std::result::Result<T, JsValue> {
    window()?
        .document()
        .and_then(|doc| doc.get_element_by_id(id))
        .ok_or_else(|| JsValue::from_str(&format!("#{} not found", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{} has an unexpected element type", id)))
}

fn bytes_to_blob(bytes: &[u8], mime_type: &str) -> std::result::Result<Blob, JsValue> {
    let parts = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

async fn blob_bytes(blob: &Blob) -> std::result::Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(blob.array_buffer()).await?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// 選択されたファイルを読み込む
pub async fn read_file(file: &File) -> Result<ImageFile> {
    let bytes = blob_bytes(file)
        .await
        .map_err(|e| Error::Storage(js_message(&e)))?;
    Ok(ImageFile::new(file.name(), file.type_(), bytes))
}

// ============================================
// localStorage
// ============================================

/// localStorage（値は生のJSON文字列のまま保存する）
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| Error::Storage(js_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| Error::Storage(js_message(&e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|e| Error::Storage(js_message(&e)))
    }
}

/// `window.confirm`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConfirm;

impl ConfirmPrompt for BrowserConfirm {
    fn confirm(&self, message: &str) -> bool {
        gloo::dialogs::confirm(message)
    }
}

// ============================================
// fetch
// ============================================

/// multipart/form-data で推論エンドポイントに送る
#[derive(Debug, Clone)]
pub struct FetchClient {
    endpoint: String,
}

impl FetchClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, image: &ImageFile) -> std::result::Result<(u16, String), JsValue> {
        let blob = bytes_to_blob(&image.bytes, &image.mime_type)?;
        let form = FormData::new()?;
        form.append_with_blob_and_filename("file", &blob, &image.name)?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&form.into());

        let request = Request::new_with_str_and_init(&self.endpoint, &opts)?;
        let resp_value = JsFuture::from(window()?.fetch_with_request(&request)).await?;
        let resp: Response = resp_value.dyn_into()?;

        let text = JsFuture::from(resp.text()?).await?;
        Ok((resp.status(), text.as_string().unwrap_or_default()))
    }
}

impl PredictionClient for FetchClient {
    async fn predict(&self, image: &ImageFile) -> Result<PredictResponse> {
        let (status, body) = self
            .post(image)
            .await
            .map_err(|e| Error::Network(js_message(&e)))?;
        log::debug!("POST {} -> {}", self.endpoint, status);
        parse_predict_response(status, &body)
    }
}

// ============================================
// カメラ
// ============================================

/// getUserMedia で取得し `#webcam-feed` に映す
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCamera;

async fn request_camera() -> std::result::Result<MediaStream, JsValue> {
    let devices = window()?.navigator().media_devices()?;
    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&JsValue::TRUE);
    let stream = JsFuture::from(devices.get_user_media_with_constraints(&constraints)?).await?;
    stream.dyn_into()
}

impl CameraSource for BrowserCamera {
    type Stream = VideoStream;

    async fn open(&self) -> Result<VideoStream> {
        let video: HtmlVideoElement =
            element_by_id(VIDEO_ELEMENT_ID).map_err(|e| Error::Camera(js_message(&e)))?;
        let stream = request_camera().await.map_err(|e| {
            log::error!("getUserMedia failed: {}", js_message(&e));
            Error::Camera(js_name(&e))
        })?;
        video.set_src_object(Some(&stream));
        Ok(VideoStream { video, stream })
    }
}

/// プレビューに接続済みのストリーム
pub struct VideoStream {
    video: HtmlVideoElement,
    stream: MediaStream,
}

impl CameraStream for VideoStream {
    async fn resolution(&self) -> Result<Resolution> {
        if self.video.ready_state() < HAVE_METADATA {
            let (tx, rx) = oneshot::channel::<()>();
            let _listener = EventListener::once(&self.video, "loadedmetadata", move |_| {
                let _ = tx.send(());
            });
            rx.await
                .map_err(|_| Error::Camera("video metadata was not loaded".to_string()))?;
        }
        Ok(Resolution {
            width: self.video.video_width(),
            height: self.video.video_height(),
        })
    }

    fn has_enough_data(&self) -> bool {
        self.video.ready_state() >= HAVE_ENOUGH_DATA
    }

    fn stop(&mut self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        self.video.set_src_object(None);
    }
}

// ============================================
// canvas
// ============================================

/// `#webcam-canvas` に描画して PNG にする
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasEncoder;

impl CanvasEncoder {
    fn canvas(&self) -> Result<HtmlCanvasElement> {
        element_by_id(CANVAS_ELEMENT_ID).map_err(|e| Error::Encode(js_message(&e)))
    }

    fn context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
        canvas
            .get_context("2d")
            .map_err(|e| Error::Encode(js_message(&e)))?
            .ok_or_else(|| Error::Encode("2d context is not available".to_string()))?
            .dyn_into()
            .map_err(|_| Error::Encode("unexpected context type".to_string()))
    }

    async fn to_png_blob(canvas: &HtmlCanvasElement) -> std::result::Result<Blob, JsValue> {
        let (tx, rx) = oneshot::channel::<Option<Blob>>();
        let callback = Closure::once(move |blob: JsValue| {
            let _ = tx.send(blob.dyn_into::<Blob>().ok());
        });
        canvas.to_blob_with_type(callback.as_ref().unchecked_ref(), "image/png")?;
        rx.await
            .map_err(|_| JsValue::from_str("toBlob was cancelled"))?
            .ok_or_else(|| JsValue::from_str("toBlob returned no data"))
    }
}

impl FrameEncoder<VideoStream> for CanvasEncoder {
    fn resize(&self, resolution: Resolution) {
        match self.canvas() {
            Ok(canvas) => {
                canvas.set_width(resolution.width);
                canvas.set_height(resolution.height);
            }
            Err(e) => log::warn!("Failed to resize capture canvas: {}", e),
        }
    }

    fn capture(&self, stream: &VideoStream) -> Result<()> {
        let canvas = self.canvas()?;
        let context = Self::context(&canvas)?;
        context
            .draw_image_with_html_video_element_and_dw_and_dh(
                &stream.video,
                0.0,
                0.0,
                f64::from(canvas.width()),
                f64::from(canvas.height()),
            )
            .map_err(|e| Error::Encode(js_message(&e)))
    }

    async fn encode_png(&self) -> Result<Vec<u8>> {
        let canvas = self.canvas()?;
        let blob = Self::to_png_blob(&canvas)
            .await
            .map_err(|e| Error::Encode(js_message(&e)))?;
        blob_bytes(&blob)
            .await
            .map_err(|e| Error::Encode(js_message(&e)))
    }

    fn clear(&self) {
        let Ok(canvas) = self.canvas() else {
            return;
        };
        if let Ok(context) = Self::context(&canvas) {
            context.clear_rect(
                0.0,
                0.0,
                f64::from(canvas.width()),
                f64::from(canvas.height()),
            );
        }
    }
}
