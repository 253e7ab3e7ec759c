//! メインアプリケーションコンポーネント

use std::cell::RefCell;
use std::rc::Rc;

use emotion_common::{
    HistoryStore, HistoryView, LiveDisplay, NavigationController, Section, SideEffect,
    Transition, UploadPredictor, UrlUpdate, DEFAULT_PREDICT_URL,
};
use gloo::events::EventListener;
use leptos::prelude::*;
use wasm_bindgen::JsValue;

use crate::components::{
    about_section::AboutSection, header::Header, history_section::HistorySection,
    live_section::LiveSection, upload_section::UploadSection,
};
use crate::platform::{BrowserConfirm, FetchClient, LocalStorageStore};
use crate::session::LiveSession;

fn history_store() -> HistoryStore<LocalStorageStore> {
    HistoryStore::new(LocalStorageStore)
}

/// 現在のURLフラグメント（`#` 付き）
fn current_hash() -> String {
    web_sys::window()
        .and_then(|w| w.location().hash().ok())
        .unwrap_or_default()
}

/// ナビゲーション結果をブラウザ履歴に反映する
fn update_url(update: &UrlUpdate) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    let result = match update {
        UrlUpdate::Keep => Ok(()),
        UrlUpdate::Push(fragment) => history.push_state_with_url(&JsValue::NULL, "", Some(fragment)),
        UrlUpdate::Replace(fragment) => {
            history.replace_state_with_url(&JsValue::NULL, "", Some(fragment))
        }
    };
    if let Err(e) = result {
        log::warn!("Failed to update URL: {:?}", e);
    }
}

/// メインアプリケーションコンポーネント
#[component]
pub fn App() -> impl IntoView {
    let client = FetchClient::new(DEFAULT_PREDICT_URL);

    let (active, set_active) = signal(Section::DEFAULT);
    let (history, set_history) = signal(HistoryView::default());
    let live_display = RwSignal::new(LiveDisplay::ready());

    let nav = StoredValue::new_local(Rc::new(RefCell::new(NavigationController::new())));
    let upload = StoredValue::new_local(Rc::new(UploadPredictor::new(
        client.clone(),
        history_store(),
    )));
    let live = StoredValue::new_local(LiveSession::new(client, live_display));

    // 切り替えの副作用を適用してから表示を切り替える
    let apply = move |transition: Transition| {
        for effect in &transition.effects {
            match effect {
                SideEffect::StopLiveSession => live.get_value().stop(),
                SideEffect::ReloadHistory => set_history.set(history_store().view()),
                SideEffect::ResetLiveStatus => live.get_value().reset(),
            }
        }
        update_url(&transition.url);
        set_active.set(transition.to);
    };

    let on_navigate = move |id: &'static str| {
        let transition = nav.get_value().borrow_mut().navigate(id);
        apply(transition);
    };

    let on_clear = move || match history_store().clear(&BrowserConfirm) {
        Ok(true) => set_history.set(history_store().view()),
        Ok(false) => {}
        Err(e) => log::error!("Failed to clear history: {}", e),
    };

    // 初期表示とブラウザの戻る/進む
    let initial = nav.get_value().borrow_mut().initial(&current_hash());
    apply(initial);
    if let Some(window) = web_sys::window() {
        EventListener::new(&window, "hashchange", move |_| {
            let transition = nav.get_value().borrow_mut().on_hash_change(&current_hash());
            apply(transition);
        })
        .forget();
    }

    let section_class = move |section: Section| {
        move || {
            if active.get() == section {
                "container active"
            } else {
                "container"
            }
        }
    };
    let hidden = move |section: Section| move || active.get() != section;

    view! {
        <Header active=active on_navigate=on_navigate />
        <main class="main-content-wrapper">
            <section
                id=Section::MainPrediction.id()
                class=section_class(Section::MainPrediction)
                hidden=hidden(Section::MainPrediction)
            >
                <UploadSection predictor=upload set_history=set_history />
            </section>
            <section
                id=Section::LivePrediction.id()
                class=section_class(Section::LivePrediction)
                hidden=hidden(Section::LivePrediction)
            >
                <LiveSection session=live display=live_display.read_only() />
            </section>
            <section
                id=Section::PredictionHistory.id()
                class=section_class(Section::PredictionHistory)
                hidden=hidden(Section::PredictionHistory)
            >
                <HistorySection history=history on_clear=on_clear />
            </section>
            <section
                id=Section::About.id()
                class=section_class(Section::About)
                hidden=hidden(Section::About)
            >
                <AboutSection />
            </section>
        </main>
    }
}
