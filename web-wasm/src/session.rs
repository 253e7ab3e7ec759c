//! ライブ推論セッションと描画ループ
//!
//! `LivePredictor` に requestAnimationFrame のループと表示用シグナルを付ける。
//! ループはトークンで識別し、停止や再開のたびに古いループは次のフレームで終わる。

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::task::Poll;

use emotion_common::{LiveDisplay, LivePredictor};
use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::platform::{BrowserCamera, CanvasEncoder, FetchClient};

pub type WebLivePredictor = LivePredictor<BrowserCamera, CanvasEncoder, FetchClient>;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

pub struct LiveSession {
    predictor: WebLivePredictor,
    display: RwSignal<LiveDisplay>,
    loop_token: Cell<u64>,
}

impl LiveSession {
    pub fn new(client: FetchClient, display: RwSignal<LiveDisplay>) -> Rc<Self> {
        Rc::new(Self {
            predictor: LivePredictor::new(BrowserCamera, CanvasEncoder, client),
            display,
            loop_token: Cell::new(0),
        })
    }

    /// カメラを取得し、成功したら描画ループを回す
    pub fn start(self: &Rc<Self>) {
        let session = Rc::clone(self);
        spawn_local(async move {
            let start = session.predictor.start();
            futures::pin_mut!(start);

            // カメラ許可ダイアログの間も "Starting webcam..." を出す
            let result = match futures::poll!(start.as_mut()) {
                Poll::Ready(result) => result,
                Poll::Pending => {
                    session.refresh();
                    start.await
                }
            };
            session.refresh();

            match result {
                Ok(()) if session.predictor.is_running() => session.run_loop(),
                Ok(()) => log::debug!("Webcam start was superseded"),
                Err(e) => log::error!("Error accessing webcam: {}", e),
            }
        });
    }

    /// ループ停止とカメラ解放
    pub fn stop(&self) {
        self.loop_token.set(self.loop_token.get().wrapping_add(1));
        self.predictor.stop();
        self.refresh();
    }

    /// ライブセクションに入ったときの表示初期化
    pub fn reset(&self) {
        self.predictor.reset_status();
        self.refresh();
    }

    fn refresh(&self) {
        self.display.set(self.predictor.display());
    }

    fn run_loop(self: &Rc<Self>) {
        let token = self.loop_token.get().wrapping_add(1);
        self.loop_token.set(token);

        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let next = Rc::clone(&callback);
        let session = Rc::clone(self);

        *callback.borrow_mut() = Some(Closure::new(move |now: f64| {
            if session.loop_token.get() != token || !session.predictor.is_running() {
                // 自身を解放してループを終える
                let _ = next.borrow_mut().take();
                return;
            }

            if let Some(order) = session.predictor.tick(now) {
                let sampler = Rc::clone(&session);
                spawn_local(async move {
                    sampler.predictor.sample(order).await;
                    sampler.refresh();
                });
            }

            if let Some(closure) = next.borrow().as_ref() {
                request_frame(closure);
            }
        }));

        if let Some(closure) = callback.borrow().as_ref() {
            request_frame(closure);
        };
    }
}

fn request_frame(closure: &Closure<dyn FnMut(f64)>) {
    let requested = web_sys::window()
        .map(|w| w.request_animation_frame(closure.as_ref().unchecked_ref()));
    if !matches!(requested, Some(Ok(_))) {
        log::error!("requestAnimationFrame is not available");
    }
}
