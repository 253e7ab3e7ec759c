//! Webカメラによるライブ推論

use std::rc::Rc;

use emotion_common::{LiveDisplay, LiveEmotion};
use leptos::prelude::*;

use crate::platform::{CANVAS_ELEMENT_ID, VIDEO_ELEMENT_ID};
use crate::session::LiveSession;

#[component]
pub fn LiveSection(
    session: StoredValue<Rc<LiveSession>, LocalStorage>,
    display: ReadSignal<LiveDisplay>,
) -> impl IntoView {
    let emotion = move || {
        let current = display.get();
        match &current.emotion {
            LiveEmotion::Emotion(name) => view! {
                <span class=format!("predicted-emotion {}", name)>{name.clone()}</span>
            }
            .into_any(),
            _ => current.emotion_text().to_string().into_any(),
        }
    };

    view! {
        <h2>"Live Prediction"</h2>
        <div class="webcam-controls">
            <button
                id="start-webcam-btn"
                class="btn"
                disabled=move || !display.with(|d| d.start_enabled)
                on:click=move |_| session.get_value().start()
            >
                "Start Webcam"
            </button>
            <button
                id="stop-webcam-btn"
                class="btn"
                disabled=move || !display.with(|d| d.stop_enabled)
                on:click=move |_| session.get_value().stop()
            >
                "Stop Webcam"
            </button>
        </div>
        <p id="webcam-status">{move || display.with(|d| d.status.clone())}</p>
        <video id=VIDEO_ELEMENT_ID autoplay=true muted=true playsinline=true></video>
        <canvas id=CANVAS_ELEMENT_ID style="display: none;"></canvas>
        <div class="live-result">
            <p>"Emotion: " <span id="live-emotion">{emotion}</span></p>
            <p>
                "Confidence: "
                <span id="live-confidence">{move || display.with(LiveDisplay::confidence_text)}</span>
            </p>
        </div>
    }
}
