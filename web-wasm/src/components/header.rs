//! ヘッダーとナビゲーション

use emotion_common::Section;
use leptos::ev::MouseEvent;
use leptos::prelude::*;

#[component]
pub fn Header<F>(active: ReadSignal<Section>, on_navigate: F) -> impl IntoView
where
    F: Fn(&'static str) + Copy + Send + Sync + 'static,
{
    let links = Section::ALL
        .into_iter()
        .map(|section| {
            let on_click = move |ev: MouseEvent| {
                ev.prevent_default();
                on_navigate(section.id());
            };
            view! {
                <li>
                    <a
                        href=section.fragment()
                        data-section=section.id()
                        class=move || if active.get() == section { "active" } else { "" }
                        on:click=on_click
                    >
                        {section.label()}
                    </a>
                </li>
            }
        })
        .collect_view();

    view! {
        <header class="header">
            <h1>"Face Emotion Detector"</h1>
            <nav>
                <ul class="nav-links">{links}</ul>
            </nav>
        </header>
    }
}
