//! アプリの説明

use leptos::prelude::*;

#[component]
pub fn AboutSection() -> impl IntoView {
    view! {
        <h2>"About"</h2>
        <p>
            "This app sends a face image to the emotion prediction service and shows the \
            predicted emotion with the probability of each class."
        </p>
        <ul>
            <li>"Upload: predict from an image file. Results are kept in History."</li>
            <li>"Live: predict continuously from your webcam. Results are not saved."</li>
            <li>"History: the last 20 uploaded predictions, stored only in this browser."</li>
        </ul>
        <p class="text-muted">
            "For the best results use a clear, front-facing photo of a single face."
        </p>
    }
}
