//! テスト用の代替実装
//!
//! 外部機能インターフェースのフェイク。ネットワークもカメラも使わずに
//! アップロード・ライブ推論の流れを決定的に再現する。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::capability::{CameraSource, CameraStream, FrameEncoder, PredictionClient, Resolution};
use crate::error::{Error, Result};
use crate::parser::parse_predict_response;
use crate::types::{ImageFile, PredictResponse};

enum Scripted {
    Reply { status: u16, body: String },
    Fail(Error),
}

#[derive(Default)]
struct GateState {
    held: bool,
    wakers: Vec<Waker>,
}

/// `release` されるまで完了しない Future
struct Gate(Rc<RefCell<GateState>>);

impl Future for Gate {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.0.borrow_mut();
        if state.held {
            state.wakers.push(cx.waker().clone());
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// 登録順にレスポンスを返すクライアント
///
/// clone は同じキューとカウンタを共有する。
#[derive(Clone, Default)]
pub struct ScriptedClient {
    responses: Rc<RefCell<VecDeque<Scripted>>>,
    requests: Rc<RefCell<Vec<ImageFile>>>,
    gate: Rc<RefCell<GateState>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// ステータスとボディを登録する
    pub fn push_json(&self, status: u16, body: &str) {
        self.responses.borrow_mut().push_back(Scripted::Reply {
            status,
            body: body.to_string(),
        });
    }

    /// 通信エラーを登録する
    pub fn push_error(&self, error: Error) {
        self.responses.borrow_mut().push_back(Scripted::Fail(error));
    }

    /// 以降のレスポンスを `release` まで保留する
    pub fn hold(&self) {
        self.gate.borrow_mut().held = true;
    }

    pub fn release(&self) {
        let wakers = {
            let mut gate = self.gate.borrow_mut();
            gate.held = false;
            std::mem::take(&mut gate.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// 受け付けたリクエスト数
    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<ImageFile> {
        self.requests.borrow().last().cloned()
    }
}

impl PredictionClient for ScriptedClient {
    async fn predict(&self, image: &ImageFile) -> Result<PredictResponse> {
        self.requests.borrow_mut().push(image.clone());
        Gate(self.gate.clone()).await;

        let next = self.responses.borrow_mut().pop_front();
        match next {
            Some(Scripted::Reply { status, body }) => parse_predict_response(status, &body),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(Error::Network("no scripted response".to_string())),
        }
    }
}

/// フェイクカメラ
#[derive(Clone)]
pub struct FakeCamera {
    resolution: Resolution,
    failure: Option<String>,
    ready: Rc<Cell<bool>>,
    opened: Rc<Cell<usize>>,
    stopped: Rc<Cell<usize>>,
}

impl FakeCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: Resolution { width, height },
            failure: None,
            ready: Rc::new(Cell::new(true)),
            opened: Rc::new(Cell::new(0)),
            stopped: Rc::new(Cell::new(0)),
        }
    }

    /// `open` が常に失敗するカメラ
    pub fn failing(name: &str) -> Self {
        Self {
            failure: Some(name.to_string()),
            ..Self::new(0, 0)
        }
    }

    /// 映像データが十分かどうかを切り替える
    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    /// 停止されたストリーム数
    pub fn stopped(&self) -> usize {
        self.stopped.get()
    }
}

impl CameraSource for FakeCamera {
    type Stream = FakeStream;

    async fn open(&self) -> Result<FakeStream> {
        if let Some(name) = &self.failure {
            return Err(Error::Camera(name.clone()));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(FakeStream {
            resolution: self.resolution,
            ready: self.ready.clone(),
            stopped: self.stopped.clone(),
            live: true,
        })
    }
}

pub struct FakeStream {
    resolution: Resolution,
    ready: Rc<Cell<bool>>,
    stopped: Rc<Cell<usize>>,
    live: bool,
}

impl CameraStream for FakeStream {
    async fn resolution(&self) -> Result<Resolution> {
        Ok(self.resolution)
    }

    fn has_enough_data(&self) -> bool {
        self.live && self.ready.get()
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.stopped.set(self.stopped.get() + 1);
        }
    }
}

/// フェイクエンコーダ（PNGシグネチャだけを返す）
#[derive(Clone, Default)]
pub struct FakeEncoder {
    size: Rc<Cell<Resolution>>,
    captured: Rc<Cell<usize>>,
    cleared: Rc<Cell<usize>>,
}

impl FakeEncoder {
    pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> Resolution {
        self.size.get()
    }

    pub fn captured(&self) -> usize {
        self.captured.get()
    }

    pub fn cleared(&self) -> usize {
        self.cleared.get()
    }
}

impl FrameEncoder<FakeStream> for FakeEncoder {
    fn resize(&self, resolution: Resolution) {
        self.size.set(resolution);
    }

    fn capture(&self, stream: &FakeStream) -> Result<()> {
        if !stream.has_enough_data() {
            return Err(Error::Encode("stream has no frame".to_string()));
        }
        self.captured.set(self.captured.get() + 1);
        Ok(())
    }

    async fn encode_png(&self) -> Result<Vec<u8>> {
        Ok(Self::PNG_SIGNATURE.to_vec())
    }

    fn clear(&self) {
        self.cleared.set(self.cleared.get() + 1);
    }
}
