use std::cell::RefCell;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use chronopolis_shared::era::{EraDesignation, format_display_year};
use chronopolis_shared::{
    CityRecord, DerivedFeature, ParsedDataset, effective_year, parse_cities, resolve_all,
};

use crate::canvas::MapCanvas;
use crate::popup::CityPopup;
use crate::selection::{self, SelectedCity};
use crate::slider::YearSlider;
use crate::viewport::MapView;
use crate::wiki::{self, PreviewData};

pub(crate) const WIKI_LANG: &str = "en";
const DEFAULT_YEAR: i32 = 969;
const YEAR_STORAGE_KEY: &str = "currentYear";
const POSITION_STORAGE_KEY: &str = "mapPosition";
const DATASET_URL: &str = "/city.json";

pub(crate) fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// Newtype wrappers give same-shaped signals distinct types for Leptos
/// context (two `RwSignal<Option<String>>` would overwrite each other).
#[derive(Clone, Copy)]
pub(crate) struct CurrentYear(pub RwSignal<i32>);
#[derive(Clone, Copy)]
pub(crate) struct EraSetting(pub RwSignal<EraDesignation>);
#[derive(Clone, Copy)]
pub(crate) struct ShowGhostCities(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<SelectedCity>>);
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct ClickedCoord(pub RwSignal<Option<(f64, f64)>>);
#[derive(Clone, Copy)]
pub(crate) struct PreviewFetchNonce(pub RwSignal<u64>);
#[derive(Clone, Copy)]
pub(crate) struct PreviewContent(pub RwSignal<Option<PreviewData>>);

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredYear {
    year: i32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredPosition {
    center: [f64; 2],
    zoom: f64,
}

/// Missing or corrupt storage is a cache miss, never an error.
fn load_stored_year() -> i32 {
    let stored: Result<StoredYear, _> = gloo_storage::LocalStorage::get(YEAR_STORAGE_KEY);
    effective_year(stored.map(|s| s.year).unwrap_or(DEFAULT_YEAR))
}

fn load_stored_view() -> MapView {
    let stored: Result<StoredPosition, _> = gloo_storage::LocalStorage::get(POSITION_STORAGE_KEY);
    match stored {
        Ok(pos) => MapView::new((pos.center[0], pos.center[1]), pos.zoom),
        Err(_) => MapView::default(),
    }
}

async fn fetch_cities() -> Result<ParsedDataset, String> {
    let resp = gloo_net::http::Request::get(DATASET_URL)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let raw = resp.text().await.map_err(|e| format!("read error: {e}"))?;
    parse_cities(&raw)
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let cities: RwSignal<Vec<CityRecord>> = RwSignal::new(Vec::new());
    let features: RwSignal<Vec<DerivedFeature>> = RwSignal::new(Vec::new());
    let view: RwSignal<MapView> = RwSignal::new(load_stored_view());
    let current_year: RwSignal<i32> = RwSignal::new(load_stored_year());
    let selected: RwSignal<Option<SelectedCity>> = RwSignal::new(None);
    let hovered: RwSignal<Option<String>> = RwSignal::new(None);
    let mouse_pos: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    let clicked_coord: RwSignal<Option<(f64, f64)>> = RwSignal::new(None);
    let show_ghosts: RwSignal<bool> = RwSignal::new(true);
    let era: RwSignal<EraDesignation> = RwSignal::new(EraDesignation::BceCe);
    let preview: RwSignal<Option<PreviewData>> = RwSignal::new(None);
    let preview_nonce: RwSignal<u64> = RwSignal::new(0);

    provide_context(features);
    provide_context(view);
    provide_context(mouse_pos);
    provide_context(CurrentYear(current_year));
    provide_context(EraSetting(era));
    provide_context(ShowGhostCities(show_ghosts));
    provide_context(Selected(selected));
    provide_context(Hovered(hovered));
    provide_context(ClickedCoord(clicked_coord));
    provide_context(PreviewFetchNonce(preview_nonce));
    provide_context(PreviewContent(preview));

    // Load the dataset once on mount.
    Effect::new(move || {
        spawn_local(async move {
            match fetch_cities().await {
                Ok(parsed) => {
                    if parsed.skipped > 0 {
                        web_sys::console::warn_1(
                            &format!("dataset: skipped {} malformed features", parsed.skipped)
                                .into(),
                        );
                    }
                    cities.set(parsed.cities);
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("dataset load failed: {e}").into());
                }
            }
        });
    });

    // Re-derive the per-year feature set whenever the year or dataset moves.
    Effect::new(move || {
        let year = current_year.get();
        let all = cities.get();
        features.set(resolve_all(&all, year));
    });

    // Persist the slider year and the map position across sessions.
    Effect::new(move || {
        let year = current_year.get();
        let _ = gloo_storage::LocalStorage::set(YEAR_STORAGE_KEY, &StoredYear { year });
    });
    Effect::new(move || {
        let v = view.get();
        let _ = gloo_storage::LocalStorage::set(
            POSITION_STORAGE_KEY,
            &StoredPosition {
                center: [v.center.0, v.center.1],
                zoom: v.zoom,
            },
        );
    });

    // Selection must survive year and zoom changes only while its city still
    // exists and still renders.
    Effect::new(move || {
        let current_features = features.get();
        let resolution = view.get().resolution();
        let ghosts = show_ghosts.get();
        let next = selection::revalidate(
            selected.get_untracked().as_ref(),
            &current_features,
            resolution,
            ghosts,
        );
        if next != selected.get_untracked() {
            selected.set(next);
        }
    });

    // Popup preview follows the selection; deselection dismisses it and
    // invalidates any in-flight fetch.
    let last_article: StoredValue<Option<String>> = StoredValue::new(None);
    Effect::new(move || {
        match selected.get() {
            Some(city) => {
                let article = city.wikipedia_article_name.clone();
                if last_article.get_value() == article {
                    return;
                }
                last_article.set_value(article.clone());
                match article {
                    Some(article) => {
                        wiki::load_preview(WIKI_LANG, article, preview_nonce, preview);
                    }
                    None => {
                        preview_nonce.update(|n| *n = n.wrapping_add(1));
                        preview.set(None);
                    }
                }
            }
            None => {
                if last_article.get_value().is_some() || preview.get_untracked().is_some() {
                    last_article.set_value(None);
                    preview_nonce.update(|n| *n = n.wrapping_add(1));
                    preview.set(None);
                }
            }
        }
    });

    // Global keyboard shortcuts.
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                if target_tag == "INPUT" || target_tag == "TEXTAREA" {
                    return;
                }

                match e.key().as_str() {
                    "Escape" => {
                        selected.set(None);
                        hovered.set(None);
                    }
                    "g" => {
                        show_ghosts.update(|v| *v = !*v);
                    }
                    "e" => {
                        era.update(|v| {
                            *v = match v {
                                EraDesignation::BcAd => EraDesignation::BceCe,
                                EraDesignation::BceCe => EraDesignation::BcAd,
                            }
                        });
                    }
                    "+" | "=" => {
                        e.prevent_default();
                        let (w, h) = canvas_dimensions();
                        view.update(|v| v.zoom_at(-240.0, w / 2.0, h / 2.0, w, h));
                    }
                    "-" => {
                        e.prevent_default();
                        let (w, h) = canvas_dimensions();
                        view.update(|v| v.zoom_at(240.0, w / 2.0, h / 2.0, w, h));
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden;">
            <MapCanvas />
            <YearSlider />
            <CityPopup />
            <OptionsPanel />
            <div
                class="clicked-coord-label"
                style="position: absolute; bottom: 10px; right: 12px; z-index: 20; background: rgba(255,255,255,0.85); border-radius: 4px; padding: 2px 8px; font-size: 0.75rem; font-variant-numeric: tabular-nums; color: #333;"
            >
                {move || {
                    clicked_coord
                        .get()
                        .map(|(lon, lat)| format!("{lon:.5}, {lat:.5}"))
                        .unwrap_or_default()
                }}
            </div>
        </div>
        <Tooltip />
    }
}

/// Display options: ghost markers and era designation.
#[component]
fn OptionsPanel() -> impl IntoView {
    let ShowGhostCities(show_ghosts) = expect_context();
    let EraSetting(era) = expect_context();

    view! {
        <div style="position: absolute; bottom: 10px; left: 12px; z-index: 20; background: rgba(255,255,255,0.92); border: 1px solid #bbb; border-radius: 6px; padding: 8px 12px; font-size: 0.8rem; display: flex; flex-direction: column; gap: 6px;">
            <label style="display: flex; align-items: center; gap: 6px; cursor: pointer;">
                <input
                    type="checkbox"
                    prop:checked=move || show_ghosts.get()
                    on:change=move |_| show_ghosts.update(|v| *v = !*v)
                />
                "Show ghost cities"
            </label>
            <label style="display: flex; align-items: center; gap: 6px;">
                "Era labels"
                <select
                    prop:value=move || {
                        match era.get() {
                            EraDesignation::BcAd => "bcad",
                            EraDesignation::BceCe => "bcece",
                        }
                    }
                    on:change=move |e: web_sys::Event| {
                        let Some(target) = e.target() else {
                            return;
                        };
                        let Ok(sel) = target.dyn_into::<web_sys::HtmlSelectElement>() else {
                            return;
                        };
                        let designation = if sel.value() == "bcad" {
                            EraDesignation::BcAd
                        } else {
                            EraDesignation::BceCe
                        };
                        era.set(designation);
                    }
                >
                    <option value="bcece">"BCE/CE"</option>
                    <option value="bcad">"BC/AD"</option>
                </select>
            </label>
        </div>
    }
}

/// Name tooltip shown while hovering a ghost marker; fully rendered cities
/// already carry a label, so they never get one.
#[component]
fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let features: RwSignal<Vec<DerivedFeature>> = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();
    let CurrentYear(current_year) = expect_context();
    let EraSetting(era) = expect_context();

    let tooltip_info = Memo::new(move |_| {
        let identifier = hovered.get()?;
        let all = features.get();
        let feature = all.iter().find(|f| f.identifier == identifier)?;
        Some((feature.preferred_name.clone(), feature.qualified_identifier()))
    });

    view! {
        {move || {
            let Some((name, qualified)) = tooltip_info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            let year_label = format_display_year(current_year.get(), era.get());
            view! {
                <div
                    style:left=format!("{}px", x + 14.0)
                    style:top=format!("{}px", y - 10.0)
                    style="position: fixed; pointer-events: none; z-index: 60; background: rgba(30,30,30,0.92); color: #f2f0ea; border-radius: 4px; padding: 4px 8px; font-size: 0.78rem; max-width: 220px;"
                >
                    <span style="font-weight: 700;">{name}</span>
                    <span style="color: #b5b0a6; margin-left: 6px; font-size: 0.68rem;">
                        {qualified}
                    </span>
                    <div style="color: #b5b0a6; font-size: 0.68rem;">{year_label}</div>
                </div>
            }
            .into_any()
        }}
    }
}
