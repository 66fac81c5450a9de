//! Detail popup for the selected city: identity fields immediately, preview
//! content whenever the Wikipedia fetch lands.

use leptos::prelude::*;

use chronopolis_shared::DerivedFeature;

use crate::app::{PreviewContent, Selected, WIKI_LANG, canvas_dimensions};
use crate::viewport::MapView;
use crate::wiki;

#[component]
pub fn CityPopup() -> impl IntoView {
    let Selected(selected) = expect_context();
    let PreviewContent(preview) = expect_context();
    let features: RwSignal<Vec<DerivedFeature>> = expect_context();
    let view: RwSignal<MapView> = expect_context();

    // The feature behind the selection; selection is identifier-keyed, the
    // display fields live on the per-year feature.
    let selected_feature = Memo::new(move |_| {
        let current = selected.get()?;
        features
            .get()
            .iter()
            .find(|f| f.identifier == current.identifier)
            .cloned()
    });

    let anchor = move || {
        let current = selected.get()?;
        let (w, h) = canvas_dimensions();
        let (sx, sy) = view
            .get()
            .world_to_screen(current.coordinate.0, current.coordinate.1, w, h);
        Some((sx, sy))
    };

    view! {
        {move || {
            let Some(feature) = selected_feature.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let Some((sx, sy)) = anchor() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let display_name = feature.display_name();
            let article = feature.wikipedia_article_name.clone();
            let alternates = feature.alternate_names.clone();
            view! {
                <div
                    class="city-popup"
                    style:left=format!("{:.0}px", sx + 14.0)
                    style:top=format!("{:.0}px", sy - 14.0)
                    style="position: absolute; z-index: 40; background: white; border: 1px solid #888; border-radius: 6px; box-shadow: 0 4px 14px rgba(0,0,0,0.35); width: 280px; max-height: 380px; overflow-y: auto; font-size: 0.85rem;"
                >
                    <a
                        href="#"
                        style="position: absolute; top: 4px; right: 10px; text-decoration: none; color: #555; font-size: 1.1rem;"
                        on:click=move |e: web_sys::MouseEvent| {
                            e.prevent_default();
                            selected.set(None);
                        }
                    >
                        "\u{00D7}"
                    </a>
                    <div style="padding: 10px 14px;">
                        <p style="font-weight: 700; margin: 0 14px 6px 0;">{display_name}</p>
                        {(!alternates.is_empty()).then(|| view! {
                            <p style="margin: 0 0 6px 0; color: #555; font-size: 0.78rem;">
                                "Also: "
                                <For
                                    each=move || alternates.clone()
                                    key=|n| n.id
                                    children=move |n| view! {
                                        <span style="margin-right: 6px;">{n.name.clone()}</span>
                                    }
                                />
                            </p>
                        })}
                        {move || {
                            let Some(data) = preview.get() else {
                                return ().into_any();
                            };
                            view! {
                                <div>
                                    {data.img_url.map(|src| view! {
                                        <img src=src style="width: 100%; border-radius: 4px; margin-bottom: 6px;" />
                                    })}
                                    {data.extract_html.map(|html| view! {
                                        <div style="color: #222; line-height: 1.35;" inner_html=html />
                                    })}
                                </div>
                            }
                            .into_any()
                        }}
                        {article.map(|title| view! {
                            <p style="margin: 8px 0 0 0;">
                                <a
                                    href=wiki::article_url(WIKI_LANG, &title)
                                    target="_blank"
                                    rel="noopener"
                                    style="color: #1a5dab;"
                                >
                                    "Read more on Wikipedia"
                                </a>
                            </p>
                        })}
                    </div>
                </div>
            }
            .into_any()
        }}
    }
}
