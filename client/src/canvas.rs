//! Canvas map host: draws the tile base layer and the styled feature set,
//! and turns pointer events into selection, hover, and view changes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use chronopolis_shared::DerivedFeature;
use chronopolis_shared::projection::mercator_to_lon_lat;

use crate::app::{ClickedCoord, Hovered, Selected, ShowGhostCities, canvas_dimensions};
use crate::selection;
use crate::spatial::FeatureIndex;
use crate::style::{self, StyleSpec};
use crate::tiles::{self, TileCache, TileState};
use crate::viewport::MapView;
use crate::visibility;

struct ResizeBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Pointer slop distinguishing a click from the end of a drag.
const CLICK_TOLERANCE_PX: f64 = 5.0;
/// Extra pixels around an icon that still count as hitting it.
const HIT_SLOP_PX: f64 = 3.0;
const MAX_ICON_RADIUS_PX: f64 = 7.0;
const SELECTION_RING_COLOR: &str = "rgba(26, 93, 171, 0.9)";
const BACKGROUND_FILL: &str = "#e8e4d8";

#[component]
pub fn MapCanvas() -> impl IntoView {
    let features: RwSignal<Vec<DerivedFeature>> = expect_context();
    let view: RwSignal<MapView> = expect_context();
    let Selected(selected) = expect_context();
    let Hovered(hovered) = expect_context();
    let ClickedCoord(clicked_coord) = expect_context();
    let ShowGhostCities(show_ghosts) = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));

    // Hit index, rebuilt whenever the per-year feature set changes.
    let hit_index: Rc<RefCell<FeatureIndex>> = Rc::new(RefCell::new(FeatureIndex::build(&[])));
    let index_for_move = hit_index.clone();
    let index_for_click = hit_index.clone();

    let tile_cache: TileCache = Rc::new(RefCell::new(HashMap::new()));
    let tile_generation: RwSignal<u64> = RwSignal::new(0);

    Effect::new({
        let hit_index = hit_index.clone();
        move || {
            *hit_index.borrow_mut() = FeatureIndex::build(&features.get());
        }
    });

    // Keep the tile cache warm for whatever the view shows.
    Effect::new({
        let tile_cache = tile_cache.clone();
        move || {
            let (w, h) = canvas_dimensions();
            let ids = tiles::visible_tiles(&view.get(), w, h);
            tiles::request_tiles(&tile_cache, &ids, tile_generation);
        }
    });

    // Redraw after window resizes; the frame generation signal doubles as
    // the trigger.
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };
        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });
        let handler = Closure::<dyn Fn()>::new(move || {
            tile_generation.update(|g| *g = g.wrapping_add(1));
        });
        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    // Redraw on any input to the frame.
    Effect::new({
        let tile_cache = tile_cache.clone();
        move || {
            let current_view = view.get();
            let current_features = features.get();
            let current_selected = selected.get();
            let ghosts = show_ghosts.get();
            tile_generation.get();

            let Some(canvas) = canvas_ref.get() else {
                return;
            };
            draw_frame(
                &canvas,
                &current_view,
                &current_features,
                current_selected.as_ref().map(|s| s.identifier.as_str()),
                ghosts,
                &tile_cache.borrow(),
            );
        }
    });

    let world_radius = move |view: &MapView| (MAX_ICON_RADIUS_PX + HIT_SLOP_PX) * view.resolution();

    let hit_feature_at = move |index: &FeatureIndex, sx: f64, sy: f64| -> Option<usize> {
        let (w, h) = canvas_dimensions();
        let current_view = view.get_untracked();
        let (wx, wy) = current_view.screen_to_world(sx, sy, w, h);
        index.find_within(wx, wy, world_radius(&current_view))
    };

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (w, h) = canvas_dimensions();
        let (x, y) = (e.offset_x() as f64, e.offset_y() as f64);
        view.update(|v| v.zoom_at(e.delta_y(), x, y, w, h));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            hovered.set(None);
            let pos = (e.client_x() as f64, e.client_y() as f64);
            drag_start.set(pos);
            last_pos.set(pos);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        let index = index_for_move;
        move |e: PointerEvent| {
            if is_dragging.get() {
                let (lx, ly) = last_pos.get();
                let dx = e.client_x() as f64 - lx;
                let dy = e.client_y() as f64 - ly;
                last_pos.set((e.client_x() as f64, e.client_y() as f64));
                view.update(|v| v.pan(dx, dy));
            } else {
                let hit = hit_feature_at(
                    &index.borrow(),
                    e.offset_x() as f64,
                    e.offset_y() as f64,
                );
                // Tooltips only apply to features without a drawn label.
                let resolution = view.get_untracked().resolution();
                let eligible = hit.and_then(|idx| {
                    let all = features.get_untracked();
                    let feature = all.get(idx)?;
                    visibility::tooltip_eligible(feature.size, resolution)
                        .then(|| feature.identifier.clone())
                });
                if eligible != hovered.get_untracked() {
                    hovered.set(eligible);
                }
                if hovered.get_untracked().is_some() {
                    mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
                }
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_click = {
        let drag_start = drag_start.clone();
        let index = index_for_click;
        move |e: MouseEvent| {
            let (sx0, sy0) = drag_start.get();
            let dx = (e.client_x() as f64 - sx0).abs();
            let dy = (e.client_y() as f64 - sy0).abs();
            if dx >= CLICK_TOLERANCE_PX || dy >= CLICK_TOLERANCE_PX {
                return;
            }

            let (sx, sy) = (e.offset_x() as f64, e.offset_y() as f64);
            let (w, h) = canvas_dimensions();
            let current_view = view.get_untracked();
            let (wx, wy) = current_view.screen_to_world(sx, sy, w, h);
            clicked_coord.set(Some(mercator_to_lon_lat(wx, wy)));

            let all = features.get_untracked();
            let hit = index
                .borrow()
                .find_within(wx, wy, world_radius(&current_view))
                .and_then(|idx| all.get(idx));
            let next = selection::click_hit(hit);
            if next != selected.get_untracked() {
                selected.set(next);
            }
        }
    };

    view! {
        <canvas
            node_ref=canvas_ref
            style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
        />
    }
}

fn draw_frame(
    canvas: &HtmlCanvasElement,
    view: &MapView,
    features: &[DerivedFeature],
    selected_id: Option<&str>,
    ghosts_enabled: bool,
    tile_cache: &HashMap<tiles::TileId, TileState>,
) {
    let (w, h) = canvas_dimensions();
    let dpr = web_sys::window()
        .map(|win| win.device_pixel_ratio())
        .unwrap_or(1.0);

    let px_w = (w * dpr) as u32;
    let px_h = (h * dpr) as u32;
    if canvas.width() != px_w || canvas.height() != px_h {
        canvas.set_width(px_w);
        canvas.set_height(px_h);
    }

    let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|obj| obj.dyn_into::<CanvasRenderingContext2d>().ok())
    else {
        return;
    };

    ctx.reset_transform().ok();
    ctx.scale(dpr, dpr).ok();
    ctx.set_fill_style_str(BACKGROUND_FILL);
    ctx.fill_rect(0.0, 0.0, w, h);

    draw_tiles(&ctx, view, w, h, tile_cache);
    draw_features(&ctx, view, w, h, features, selected_id, ghosts_enabled);
}

fn draw_tiles(
    ctx: &CanvasRenderingContext2d,
    view: &MapView,
    w: f64,
    h: f64,
    cache: &HashMap<tiles::TileId, TileState>,
) {
    for id in tiles::visible_tiles(view, w, h) {
        let Some(TileState::Ready(image)) = cache.get(&id) else {
            continue;
        };
        let (min_x, min_y, max_x, max_y) = tiles::tile_world_bounds(id);
        let (sx, sy) = view.world_to_screen(min_x, max_y, w, h);
        let (ex, ey) = view.world_to_screen(max_x, min_y, w, h);
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
            image,
            sx,
            sy,
            ex - sx,
            ey - sy,
        );
    }
}

fn draw_features(
    ctx: &CanvasRenderingContext2d,
    view: &MapView,
    w: f64,
    h: f64,
    features: &[DerivedFeature],
    selected_id: Option<&str>,
    ghosts_enabled: bool,
) {
    let resolution = view.resolution();

    let mut drawable: Vec<(&DerivedFeature, StyleSpec)> = features
        .iter()
        .filter_map(|f| style::style_for(f, resolution, ghosts_enabled).map(|spec| (f, spec)))
        .collect();
    drawable.sort_by_key(|(_, spec)| spec.z_index);

    for (feature, spec) in &drawable {
        let (sx, sy) = view.world_to_screen(feature.geometry.0, feature.geometry.1, w, h);
        if sx < -50.0 || sy < -50.0 || sx > w + 50.0 || sy > h + 50.0 {
            continue;
        }

        ctx.begin_path();
        let _ = ctx.arc(sx, sy, spec.icon.radius, 0.0, std::f64::consts::TAU);
        ctx.set_fill_style_str(spec.icon.fill);
        ctx.fill();
        if let Some((color, width)) = spec.icon.stroke {
            ctx.set_stroke_style_str(color);
            ctx.set_line_width(width);
            ctx.stroke();
        }

        if selected_id == Some(feature.identifier.as_str()) {
            ctx.begin_path();
            let _ = ctx.arc(sx, sy, spec.icon.radius + 4.0, 0.0, std::f64::consts::TAU);
            ctx.set_stroke_style_str(SELECTION_RING_COLOR);
            ctx.set_line_width(2.0);
            ctx.stroke();
        }

        if let Some(label) = &spec.label {
            ctx.set_font(&format!("{}px sans-serif", label.font_px));
            ctx.set_text_align(label.text_align);
            ctx.set_text_baseline(label.baseline);
            let tx = sx + label.offset_x;
            let ty = sy + label.offset_y;
            ctx.set_stroke_style_str(style::LABEL_HALO);
            ctx.set_line_width(style::LABEL_HALO_WIDTH);
            let _ = ctx.stroke_text(&label.text, tx, ty);
            ctx.set_fill_style_str(style::LABEL_FILL);
            let _ = ctx.fill_text(&label.text, tx, ty);
        }
    }
}
