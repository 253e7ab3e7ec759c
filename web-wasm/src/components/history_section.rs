//! 履歴ギャラリー

use emotion_common::{HistoryCard, HistoryView};
use leptos::prelude::*;

#[component]
pub fn HistorySection<F>(history: ReadSignal<HistoryView>, on_clear: F) -> impl IntoView
where
    F: Fn() + Copy + Send + Sync + 'static,
{
    view! {
        <h2>"Prediction History"</h2>
        <button id="clear-history-btn" class="btn" on:click=move |_| on_clear()>
            "Clear History"
        </button>
        <Show when=move || history.get().show_empty_message>
            <p id="no-history-message" class="text-muted">"No predictions yet."</p>
        </Show>
        <div id="history-gallery" class="history-gallery">
            {move || history.get().cards.into_iter().map(history_card).collect_view()}
        </div>
    }
}

fn history_card(card: HistoryCard) -> impl IntoView {
    let probabilities = (!card.probabilities.is_empty()).then(|| {
        view! {
            <ul class="history-probability-list">
                {card
                    .probabilities
                    .into_iter()
                    .map(|(name, value)| view! { <li>{name}": "{value}</li> })
                    .collect_view()}
            </ul>
        }
    });

    view! {
        <div class="history-item">
            <img src=card.image_data_url alt="Predicted face" />
            <div class="history-details">
                <p>
                    <strong>"Predicted: "</strong>
                    <span class=format!("predicted-emotion {}", card.predicted_class)>
                        {card.predicted_class.clone()}
                    </span>
                </p>
                <p>
                    <strong>"Confidence: "</strong>
                    {card.confidence_text}
                </p>
                <p class="timestamp">{card.timestamp_text}</p>
                {probabilities}
            </div>
        </div>
    }
}
