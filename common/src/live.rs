//! Webカメラによるライブ推論
//!
//! 状態は `Idle → Starting → Running → Idle`。フレームごとの `tick` で
//! 送信間隔（[`PREDICTION_INTERVAL_MS`](crate::PREDICTION_INTERVAL_MS)）を守り、
//! 送信中のリクエストは常に1件まで。
//!
//! 停止や再開のたびに世代番号を進め、古い世代のレスポンスは表示に反映しない。

use std::cell::{Cell, RefCell};

use crate::capability::{CameraSource, CameraStream, FrameEncoder, PredictionClient};
use crate::error::{Error, Result};
use crate::types::{format_percent, ImageFile, PredictResponse};

/// ライブ送信時のファイル名
pub const FRAME_FILE_NAME: &str = "webcam_frame.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Starting,
    Running,
}

/// 表示中の感情ラベル
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEmotion {
    NotAvailable,
    Emotion(String),
    NoFace,
    Error,
}

/// ライブセクションの表示状態
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDisplay {
    pub status: String,
    pub emotion: LiveEmotion,
    pub confidence: Option<f64>,
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl LiveDisplay {
    /// セクションに入った直後
    pub fn ready() -> Self {
        Self::idle("Webcam Ready")
    }

    /// 停止後
    pub fn off() -> Self {
        Self::idle("Webcam Off.")
    }

    fn idle(status: &str) -> Self {
        Self {
            status: status.to_string(),
            emotion: LiveEmotion::NotAvailable,
            confidence: None,
            start_enabled: true,
            stop_enabled: false,
        }
    }

    pub fn emotion_text(&self) -> &str {
        match &self.emotion {
            LiveEmotion::NotAvailable => "N/A",
            LiveEmotion::Emotion(name) => name,
            LiveEmotion::NoFace => "No Face",
            LiveEmotion::Error => "Error",
        }
    }

    pub fn confidence_text(&self) -> String {
        self.confidence
            .map(format_percent)
            .unwrap_or_else(|| "N/A".to_string())
    }

    fn set_result(&mut self, emotion: LiveEmotion, confidence: Option<f64>, status: impl Into<String>) {
        self.emotion = emotion;
        self.confidence = confidence;
        self.status = status.into();
    }
}

impl Default for LiveDisplay {
    fn default() -> Self {
        Self::ready()
    }
}

/// `tick` が発行する送信指示
///
/// 発行時の世代を持ち、`sample` はそれが現在の世代と一致する場合だけ動く。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOrder {
    generation: u64,
}

/// ライブ推論セッション
pub struct LivePredictor<C: CameraSource, E, P> {
    camera: C,
    encoder: E,
    client: P,
    stream: RefCell<Option<C::Stream>>,
    state: Cell<LiveState>,
    generation: Cell<u64>,
    last_sample_ms: Cell<Option<f64>>,
    in_flight: Cell<bool>,
    display: RefCell<LiveDisplay>,
    interval_ms: f64,
}

impl<C, E, P> LivePredictor<C, E, P>
where
    C: CameraSource,
    E: FrameEncoder<C::Stream>,
    P: PredictionClient,
{
    pub fn new(camera: C, encoder: E, client: P) -> Self {
        Self::with_interval(camera, encoder, client, crate::PREDICTION_INTERVAL_MS)
    }

    pub fn with_interval(camera: C, encoder: E, client: P, interval_ms: f64) -> Self {
        Self {
            camera,
            encoder,
            client,
            stream: RefCell::new(None),
            state: Cell::new(LiveState::Idle),
            generation: Cell::new(0),
            last_sample_ms: Cell::new(None),
            in_flight: Cell::new(false),
            display: RefCell::new(LiveDisplay::ready()),
            interval_ms,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.get() == LiveState::Running
    }

    pub fn display(&self) -> LiveDisplay {
        self.display.borrow().clone()
    }

    /// セクションに入ったときの初期表示
    pub fn reset_status(&self) {
        if self.state.get() == LiveState::Idle {
            *self.display.borrow_mut() = LiveDisplay::ready();
        }
    }

    /// カメラを取得してサンプリングを始める
    ///
    /// 取得に失敗した場合は停止状態に戻し、エラーを返す。
    /// 取得待ちの間に `stop` された場合は、得られたストリームをすぐ解放する。
    pub async fn start(&self) -> Result<()> {
        if self.state.get() != LiveState::Idle {
            return Ok(());
        }

        let generation = self.advance_generation();
        self.state.set(LiveState::Starting);
        {
            let mut display = self.display.borrow_mut();
            display.status = "Starting webcam...".to_string();
            display.start_enabled = false;
        }

        let mut stream = match self.camera.open().await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail_start(generation, &e);
                return Err(e);
            }
        };
        if generation != self.generation.get() {
            stream.stop();
            return Ok(());
        }

        let resolution = match stream.resolution().await {
            Ok(resolution) => resolution,
            Err(e) => {
                stream.stop();
                self.fail_start(generation, &e);
                return Err(e);
            }
        };
        if generation != self.generation.get() {
            stream.stop();
            return Ok(());
        }

        self.encoder.resize(resolution);
        *self.stream.borrow_mut() = Some(stream);
        self.last_sample_ms.set(None);
        self.in_flight.set(false);
        self.state.set(LiveState::Running);
        {
            let mut display = self.display.borrow_mut();
            display.status = "Webcam On. Predicting...".to_string();
            display.start_enabled = false;
            display.stop_enabled = true;
        }

        log::info!(
            "Webcam started ({}x{})",
            resolution.width,
            resolution.height
        );
        Ok(())
    }

    /// 描画フレームごとに呼ばれる
    ///
    /// 送信間隔内、送信中、映像データ不足のときは何もしない。
    pub fn tick(&self, now_ms: f64) -> Option<SampleOrder> {
        if !self.is_running() || self.in_flight.get() {
            return None;
        }
        if let Some(last) = self.last_sample_ms.get() {
            if now_ms - last < self.interval_ms {
                return None;
            }
        }
        self.last_sample_ms.set(Some(now_ms));

        let ready = self
            .stream
            .borrow()
            .as_ref()
            .is_some_and(|stream| stream.has_enough_data());
        if !ready {
            return None;
        }

        self.in_flight.set(true);
        Some(SampleOrder {
            generation: self.generation.get(),
        })
    }

    /// フレームを取り込み、送信し、結果を表示に反映する
    pub async fn sample(&self, order: SampleOrder) {
        if !self.is_current(order) {
            return;
        }

        let captured = match self.stream.borrow().as_ref() {
            Some(stream) => self.encoder.capture(stream),
            None => return,
        };
        if let Err(e) = captured {
            log::warn!("Failed to capture webcam frame: {}", e);
            self.release(order);
            return;
        }

        let bytes = match self.encoder.encode_png().await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to encode webcam frame: {}", e);
                self.release(order);
                return;
            }
        };
        if !self.is_current(order) {
            return;
        }

        let frame = ImageFile::new(FRAME_FILE_NAME, "image/png", bytes);
        let outcome = self.client.predict(&frame).await;

        if !self.is_current(order) {
            log::debug!("Discarding live prediction from a stopped session");
            return;
        }
        self.in_flight.set(false);
        self.apply(outcome);
    }

    /// ループ停止・カメラ解放・表示初期化（停止中に呼んでもよい）
    pub fn stop(&self) {
        self.advance_generation();
        self.state.set(LiveState::Idle);
        self.in_flight.set(false);
        self.last_sample_ms.set(None);

        let stream = self.stream.borrow_mut().take();
        if let Some(mut stream) = stream {
            stream.stop();
            log::info!("Webcam stopped");
        }
        self.encoder.clear();
        *self.display.borrow_mut() = LiveDisplay::off();
    }

    fn is_current(&self, order: SampleOrder) -> bool {
        self.is_running() && order.generation == self.generation.get()
    }

    fn release(&self, order: SampleOrder) {
        if self.is_current(order) {
            self.in_flight.set(false);
        }
    }

    fn advance_generation(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    fn fail_start(&self, generation: u64, error: &Error) {
        log::error!("Error accessing webcam: {}", error);
        if generation != self.generation.get() {
            return;
        }
        self.state.set(LiveState::Idle);
        let mut display = LiveDisplay::idle(&format!("Error: {}", error));
        if error.to_string().is_empty() {
            display.status = "Error: Failed to access webcam.".to_string();
        }
        *self.display.borrow_mut() = display;
    }

    fn apply(&self, outcome: Result<PredictResponse>) {
        let mut display = self.display.borrow_mut();
        match outcome {
            Ok(response) if response.is_no_face() => {
                display.set_result(LiveEmotion::NoFace, None, "Looking for face...");
            }
            Ok(response) => match response.label() {
                Some((class, confidence)) => {
                    display.set_result(
                        LiveEmotion::Emotion(class.to_string()),
                        Some(confidence),
                        "Predicting...",
                    );
                }
                None => {
                    log::warn!("Unexpected prediction response: {:?}", response);
                    display.set_result(LiveEmotion::Error, None, "Prediction error!");
                }
            },
            Err(Error::Http { ref message, .. }) if message == crate::NO_FACE_DETAIL => {
                display.set_result(LiveEmotion::NoFace, None, "Looking for face...");
            }
            Err(e) => {
                log::error!("Live prediction failed: {}", e);
                display.set_result(LiveEmotion::Error, None, format!("Connection error: {}", e));
            }
        }
    }
}
