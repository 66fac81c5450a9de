//! Year slider: a range input over the signed-year domain with a throttled
//! continuous path while dragging and an unthrottled final apply on release.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use chronopolis_shared::era::{DisplayOptions, display_year_parts, effective_year};

use crate::app::{CurrentYear, EraSetting};

/// One filter/render cycle per interval while dragging; the release handler
/// bypasses the gate entirely.
const THROTTLE_INTERVAL_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ThrottleDecision {
    FireNow,
    /// Wait this many milliseconds, then fire with the latest value.
    Defer(u32),
}

/// Leading-edge throttle gate. The first event fires immediately; events
/// inside the interval are deferred to its end, latest value winning.
#[derive(Debug, Default)]
pub(crate) struct ThrottleGate {
    last_fired_ms: Option<f64>,
}

impl ThrottleGate {
    pub(crate) fn decide(&mut self, now_ms: f64) -> ThrottleDecision {
        match self.last_fired_ms {
            Some(last) if now_ms - last < THROTTLE_INTERVAL_MS => {
                ThrottleDecision::Defer((THROTTLE_INTERVAL_MS - (now_ms - last)).ceil() as u32)
            }
            _ => {
                self.last_fired_ms = Some(now_ms);
                ThrottleDecision::FireNow
            }
        }
    }

    pub(crate) fn mark_fired(&mut self, now_ms: f64) {
        self.last_fired_ms = Some(now_ms);
    }
}

struct SliderThrottle {
    gate: ThrottleGate,
    pending: Option<Timeout>,
}

fn input_year(e: &web_sys::Event) -> Option<i32> {
    let input = e.target()?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
    input.value().parse().ok()
}

#[component]
pub fn YearSlider() -> impl IntoView {
    let CurrentYear(current_year) = expect_context();
    let EraSetting(era) = expect_context();

    let options = DisplayOptions::default();
    let throttle = Rc::new(RefCell::new(SliderThrottle {
        gate: ThrottleGate::default(),
        pending: None,
    }));

    let apply = move |year: i32| {
        // The era scales skip year 0; a zero slider value applies as year 1.
        current_year.set(effective_year(year));
    };

    let on_input = {
        let throttle = Rc::clone(&throttle);
        move |e: web_sys::Event| {
            let Some(year) = input_year(&e) else {
                return;
            };
            let now = js_sys::Date::now();
            let mut state = throttle.borrow_mut();
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            match state.gate.decide(now) {
                ThrottleDecision::FireNow => apply(year),
                ThrottleDecision::Defer(delay_ms) => {
                    let throttle = Rc::clone(&throttle);
                    state.pending = Some(Timeout::new(delay_ms, move || {
                        throttle.borrow_mut().gate.mark_fired(js_sys::Date::now());
                        apply(year);
                    }));
                }
            }
        }
    };

    // `input` misses the final thumb position often enough that the release
    // path must always apply, unthrottled.
    let on_change = {
        let throttle = Rc::clone(&throttle);
        move |e: web_sys::Event| {
            let Some(year) = input_year(&e) else {
                return;
            };
            let mut state = throttle.borrow_mut();
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            state.gate.mark_fired(js_sys::Date::now());
            apply(year);
        }
    };

    let label = move || {
        let (value, postfix) = display_year_parts(current_year.get(), era.get());
        format!("{value} {postfix}")
    };

    view! {
        <div class="year-slider" style="position: absolute; top: 12px; left: 50%; transform: translateX(-50%); z-index: 20; display: flex; align-items: center; gap: 12px; background: rgba(255,255,255,0.92); border: 1px solid #bbb; border-radius: 6px; padding: 8px 14px; min-width: 420px;">
            <label style="font-variant-numeric: tabular-nums; min-width: 72px; text-align: right; font-size: 0.9rem;">
                {label}
            </label>
            <input
                type="range"
                style="flex: 1;"
                min=options.min_year.to_string()
                max=options.max_year.to_string()
                prop:value=move || current_year.get().to_string()
                on:input=on_input
                on:change=on_change
            />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_fires_immediately() {
        let mut gate = ThrottleGate::default();
        assert_eq!(gate.decide(1_000.0), ThrottleDecision::FireNow);
    }

    #[test]
    fn events_inside_the_interval_are_deferred() {
        let mut gate = ThrottleGate::default();
        assert_eq!(gate.decide(1_000.0), ThrottleDecision::FireNow);
        assert_eq!(gate.decide(1_040.0), ThrottleDecision::Defer(60));
        assert_eq!(gate.decide(1_099.0), ThrottleDecision::Defer(1));
    }

    #[test]
    fn fires_again_once_the_interval_has_elapsed() {
        let mut gate = ThrottleGate::default();
        assert_eq!(gate.decide(1_000.0), ThrottleDecision::FireNow);
        assert_eq!(gate.decide(1_100.0), ThrottleDecision::FireNow);
        assert_eq!(gate.decide(1_250.0), ThrottleDecision::FireNow);
    }

    #[test]
    fn trailing_fire_restarts_the_interval() {
        let mut gate = ThrottleGate::default();
        assert_eq!(gate.decide(1_000.0), ThrottleDecision::FireNow);
        assert_eq!(gate.decide(1_050.0), ThrottleDecision::Defer(50));
        // The deferred callback fires at ~1100 and marks itself.
        gate.mark_fired(1_100.0);
        assert_eq!(gate.decide(1_150.0), ThrottleDecision::Defer(50));
        assert_eq!(gate.decide(1_200.0), ThrottleDecision::FireNow);
    }

    #[test]
    fn rapid_drag_then_release_applies_the_released_value() {
        // Simulate the event interleaving: the gate drops intermediates but
        // the release path applies unconditionally.
        let mut gate = ThrottleGate::default();
        let mut applied = Vec::new();
        let mut deferred: Option<i32> = None;

        for (t, year) in [(0.0, 100), (20.0, 200), (40.0, 300), (60.0, 400)] {
            match gate.decide(t) {
                ThrottleDecision::FireNow => applied.push(year),
                ThrottleDecision::Defer(_) => deferred = Some(year),
            }
        }
        assert_eq!(deferred, Some(400));

        // Release at t=70 with the final value: cancels the deferred fire
        // and applies directly.
        deferred = None;
        gate.mark_fired(70.0);
        applied.push(555);

        assert_eq!(deferred, None);
        assert_eq!(applied, vec![100, 555]);
        assert_eq!(*applied.last().unwrap(), 555);
    }
}
