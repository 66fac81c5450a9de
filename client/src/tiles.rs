#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use chronopolis_shared::projection::HALF_WORLD_M;

use crate::viewport::MapView;

const TILE_SIZE_PX: f64 = 256.0;
const MAX_TILE_ZOOM: u8 = 11;
const LOAD_CONCURRENCY: usize = 6;
/// Hard cap per view so a huge canvas can never request an unbounded grid.
const MAX_VISIBLE_TILES: usize = 64;
const ONLOAD_HANDLE_KEY: &str = "__chronopolisTileOnload";
const ONERROR_HANDLE_KEY: &str = "__chronopolisTileOnerror";

/// Ancient World Mapping Center raster tiles, the base layer the city
/// features draw over.
fn tile_src(id: TileId) -> String {
    format!(
        "https://cawm.lib.uiowa.edu/tiles/{}/{}/{}.png",
        id.z, id.x, id.y
    )
}

/// One slippy-map tile address: zoom level and column/row from the top-left
/// of the EPSG:3857 plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// World-space bounds of a tile: (min_x, min_y, max_x, max_y).
pub fn tile_world_bounds(id: TileId) -> (f64, f64, f64, f64) {
    let tiles_per_side = (1u32 << id.z) as f64;
    let tile_span = 2.0 * HALF_WORLD_M / tiles_per_side;
    let min_x = -HALF_WORLD_M + id.x as f64 * tile_span;
    let max_y = HALF_WORLD_M - id.y as f64 * tile_span;
    (min_x, max_y - tile_span, min_x + tile_span, max_y)
}

/// The tile grid covering the viewport, nearest-to-center first so the
/// middle of the screen fills in before the edges.
pub fn visible_tiles(view: &MapView, width: f64, height: f64) -> Vec<TileId> {
    let z = (view.zoom.round().max(0.0) as u8).min(MAX_TILE_ZOOM);
    let tiles_per_side = 1u32 << z;
    let tile_span = 2.0 * HALF_WORLD_M / tiles_per_side as f64;

    let (min_x, max_y) = view.screen_to_world(0.0, 0.0, width, height);
    let (max_x, min_y) = view.screen_to_world(width, height, width, height);

    let col_of = |x: f64| ((x + HALF_WORLD_M) / tile_span).floor();
    let row_of = |y: f64| ((HALF_WORLD_M - y) / tile_span).floor();
    let clamp = |v: f64| (v.max(0.0) as u32).min(tiles_per_side - 1);

    let (col_lo, col_hi) = (clamp(col_of(min_x)), clamp(col_of(max_x)));
    let (row_lo, row_hi) = (clamp(row_of(max_y)), clamp(row_of(min_y)));

    let mut ids = Vec::new();
    for y in row_lo..=row_hi {
        for x in col_lo..=col_hi {
            ids.push(TileId { z, x, y });
        }
    }

    let center_col = col_of(view.center.0);
    let center_row = row_of(view.center.1);
    ids.sort_by(|a, b| {
        let da = (a.x as f64 - center_col).powi(2) + (a.y as f64 - center_row).powi(2);
        let db = (b.x as f64 - center_col).powi(2) + (b.y as f64 - center_row).powi(2);
        da.total_cmp(&db).then_with(|| a.cmp(b))
    });
    ids.truncate(MAX_VISIBLE_TILES);
    ids
}

#[derive(Clone)]
pub enum TileState {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

pub type TileCache = Rc<RefCell<HashMap<TileId, TileState>>>;

/// Kick off loads for any visible tile not already cached or in flight.
/// `generation` is bumped as each image decodes so the canvas redraws.
pub fn request_tiles(cache: &TileCache, ids: &[TileId], generation: RwSignal<u64>) {
    let mut queue = VecDeque::new();
    {
        let mut cache_ref = cache.borrow_mut();
        for &id in ids {
            if !cache_ref.contains_key(&id) {
                cache_ref.insert(id, TileState::Loading);
                queue.push_back(id);
            }
        }
    }
    if queue.is_empty() {
        return;
    }

    let queue = Rc::new(RefCell::new(queue));
    let in_flight = Rc::new(Cell::new(0usize));
    pump_queue(cache.clone(), queue, in_flight, generation);
}

fn pump_queue(
    cache: TileCache,
    queue: Rc<RefCell<VecDeque<TileId>>>,
    in_flight: Rc<Cell<usize>>,
    generation: RwSignal<u64>,
) {
    while in_flight.get() < LOAD_CONCURRENCY {
        let Some(id) = queue.borrow_mut().pop_front() else {
            break;
        };
        in_flight.set(in_flight.get() + 1);

        let cache_next = cache.clone();
        let queue_next = queue.clone();
        let in_flight_next = in_flight.clone();
        let on_done: Rc<dyn Fn()> = Rc::new(move || {
            in_flight_next.set(in_flight_next.get().saturating_sub(1));
            pump_queue(
                cache_next.clone(),
                queue_next.clone(),
                in_flight_next.clone(),
                generation,
            );
        });

        load_tile(cache.clone(), id, generation, on_done);
    }
}

fn load_tile(cache: TileCache, id: TileId, generation: RwSignal<u64>, on_done: Rc<dyn Fn()>) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            cache.borrow_mut().insert(id, TileState::Failed);
            on_done();
            return;
        }
    };

    let img_for_load = img.clone();
    let cache_for_load = cache.clone();
    let on_done_load = on_done.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        cache_for_load
            .borrow_mut()
            .insert(id, TileState::Ready(img_for_load.clone()));
        generation.update(|g| *g = g.wrapping_add(1));
        on_done_load();
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        cache.borrow_mut().insert(id, TileState::Failed);
        on_done();
    });

    // Park the closures on the element itself so they outlive this call
    // without leaking once the handlers are cleared.
    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(&tile_src(id));
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_zero_tile_spans_the_world() {
        let (min_x, min_y, max_x, max_y) = tile_world_bounds(TileId { z: 0, x: 0, y: 0 });
        assert_eq!(min_x, -HALF_WORLD_M);
        assert_eq!(max_x, HALF_WORLD_M);
        assert_eq!(min_y, -HALF_WORLD_M);
        assert_eq!(max_y, HALF_WORLD_M);
    }

    #[test]
    fn tile_rows_count_down_from_the_north_edge() {
        let top = tile_world_bounds(TileId { z: 1, x: 0, y: 0 });
        let bottom = tile_world_bounds(TileId { z: 1, x: 0, y: 1 });
        assert_eq!(top.3, HALF_WORLD_M);
        assert_eq!(top.1, 0.0);
        assert_eq!(bottom.3, 0.0);
        assert_eq!(bottom.1, -HALF_WORLD_M);
    }

    #[test]
    fn visible_tiles_cover_the_viewport() {
        let view = MapView::default();
        let (w, h) = (1024.0, 768.0);
        let ids = visible_tiles(&view, w, h);
        assert!(!ids.is_empty());
        assert!(ids.len() <= MAX_VISIBLE_TILES);
        assert!(ids.iter().all(|id| id.z == 6));

        // Every screen corner falls inside some returned tile.
        for (sx, sy) in [(0.0, 0.0), (w - 1.0, 0.0), (0.0, h - 1.0), (w - 1.0, h - 1.0)] {
            let (wx, wy) = view.screen_to_world(sx, sy, w, h);
            assert!(ids.iter().any(|&id| {
                let (min_x, min_y, max_x, max_y) = tile_world_bounds(id);
                wx >= min_x && wx <= max_x && wy >= min_y && wy <= max_y
            }));
        }
    }

    #[test]
    fn center_tile_is_requested_first() {
        let view = MapView::default();
        let ids = visible_tiles(&view, 1024.0, 768.0);
        let first = tile_world_bounds(ids[0]);
        assert!(view.center.0 >= first.0 && view.center.0 <= first.2);
        assert!(view.center.1 >= first.1 && view.center.1 <= first.3);
    }

    #[test]
    fn tile_addresses_stay_inside_the_grid_at_extents() {
        let view = MapView::new((-HALF_WORLD_M, HALF_WORLD_M), 2.0);
        for id in visible_tiles(&view, 2048.0, 2048.0) {
            assert!(id.x < (1 << id.z));
            assert!(id.y < (1 << id.z));
        }
    }
}
