//! 画像アップロードによる推論

use std::rc::Rc;

use emotion_common::upload::LOW_CONFIDENCE_MESSAGE;
use emotion_common::{HistoryView, PredictionReport, ResultView, UploadPredictor};
use leptos::ev::{Event, MouseEvent, SubmitEvent};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;

use crate::platform::{read_file, FetchClient, LocalStorageStore};

pub type WebUploadPredictor = UploadPredictor<FetchClient, LocalStorageStore>;

#[component]
pub fn UploadSection(
    predictor: StoredValue<Rc<WebUploadPredictor>, LocalStorage>,
    set_history: WriteSignal<HistoryView>,
) -> impl IntoView {
    let (preview, set_preview) = signal(None::<String>);
    let (result, set_result) = signal(ResultView::Empty);

    // ファイル選択: プレビュー差し替えと結果クリア
    let on_change = move |ev: Event| {
        let input: HtmlInputElement = event_target(&ev);
        let file = input.files().and_then(|files| files.get(0));
        let predictor = predictor.get_value();

        spawn_local(async move {
            let image = match file {
                Some(file) => match read_file(&file).await {
                    Ok(image) => Some(image),
                    Err(e) => {
                        log::error!("Failed to read {}: {}", file.name(), e);
                        None
                    }
                },
                None => None,
            };
            predictor.select_file(image);
            set_preview.set(predictor.preview());
            set_result.set(predictor.result());
        });
    };

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let predictor = predictor.get_value();

        let submission = predictor.prepare();
        set_result.set(predictor.result());
        let Some(submission) = submission else {
            return;
        };

        spawn_local(async move {
            let view = predictor.finish(submission).await;
            if view.is_success() {
                set_history.set(predictor.history().view());
            }
            set_result.set(view);
        });
    };

    let on_feedback = move |_: MouseEvent| {
        let message = predictor.get_value().acknowledge_feedback();
        gloo::dialogs::alert(message);
    };

    let result_body = move || match result.get() {
        ResultView::Empty => ().into_any(),
        ResultView::Pending => view! {
            "Predicting... "
            <span class="loading-spinner"></span>
        }
        .into_any(),
        ResultView::Failure(message) => view! { {message} }.into_any(),
        ResultView::Success(report) => report_view(report, on_feedback).into_any(),
    };

    view! {
        <h2>"Upload an Image"</h2>
        <form id="upload-form" on:submit=on_submit>
            <input type="file" id="image-upload" accept="image/*" on:change=on_change />
            <button type="submit" class="btn">"Predict Emotion"</button>
        </form>
        <Show when=move || preview.with(Option::is_some)>
            <img
                id="uploaded-image"
                src=move || preview.get().unwrap_or_default()
                alt="Uploaded image preview"
            />
        </Show>
        <div id="result" class=move || result.with(ResultView::css_class)>
            {result_body}
        </div>
    }
}

fn report_view<F>(report: PredictionReport, on_feedback: F) -> impl IntoView
where
    F: Fn(MouseEvent) + Copy + 'static,
{
    let headline = view! {
        "Predicted: "
        <strong class=format!("predicted-emotion {}", report.predicted_class)>
            {report.predicted_class.clone()}
        </strong>
        {format!(" with {} confidence.", report.confidence_text())}
    };

    let probabilities = report
        .probabilities
        .lines()
        .into_iter()
        .map(|(name, value)| view! { <li>{name}": "{value}</li> })
        .collect_view();

    let feedback = report.show_feedback.then(|| {
        view! {
            <div class="feedback-message">
                <p>{LOW_CONFIDENCE_MESSAGE}</p>
                <button class="feedback-button" on:click=on_feedback>"Give Feedback"</button>
            </div>
        }
    });

    view! {
        {headline}
        <div class="probability-details">
            <h3>"All Probabilities:"</h3>
            <ul class="probability-list">{probabilities}</ul>
        </div>
        {feedback}
    }
}
