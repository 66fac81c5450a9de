//! Maps (tier, render mode, tag position) to concrete paint parameters for
//! the canvas renderer.

use chronopolis_shared::DerivedFeature;

use crate::visibility::{RenderMode, render_mode, tier_profile};

pub const LABEL_FILL: &str = "black";
pub const LABEL_HALO: &str = "white";
pub const LABEL_HALO_WIDTH: f64 = 2.0;
const GHOST_FILL: &str = "rgba(80, 80, 80, 0.55)";

/// How label text sits relative to its point. The eight slots are laid out
/// compass-style around the marker:
///
/// ```text
/// 2  4  0
/// 6  .  5
/// 3  7  1
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelAnchor {
    pub text_align: &'static str,
    pub baseline: &'static str,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[rustfmt::skip]
pub const LABEL_ANCHORS: [LabelAnchor; 8] = [
    LabelAnchor { text_align: "left",   baseline: "bottom", offset_x: 10.0,  offset_y: 0.0 },
    LabelAnchor { text_align: "left",   baseline: "top",    offset_x: 10.0,  offset_y: 0.0 },
    LabelAnchor { text_align: "right",  baseline: "bottom", offset_x: -10.0, offset_y: 0.0 },
    LabelAnchor { text_align: "right",  baseline: "top",    offset_x: -10.0, offset_y: 0.0 },
    LabelAnchor { text_align: "center", baseline: "bottom", offset_x: 0.0,   offset_y: -7.0 },
    LabelAnchor { text_align: "left",   baseline: "middle", offset_x: 10.0,  offset_y: 0.0 },
    LabelAnchor { text_align: "right",  baseline: "middle", offset_x: -10.0, offset_y: 0.0 },
    LabelAnchor { text_align: "center", baseline: "top",    offset_x: 0.0,   offset_y: 7.0 },
];

pub fn label_anchor(tag_position: u8) -> &'static LabelAnchor {
    &LABEL_ANCHORS[(tag_position as usize) % LABEL_ANCHORS.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub radius: f64,
    pub fill: &'static str,
    pub stroke: Option<(&'static str, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub text: String,
    pub font_px: f64,
    pub text_align: &'static str,
    pub baseline: &'static str,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Drawable output for one feature at one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpec {
    pub icon: IconStyle,
    pub label: Option<LabelStyle>,
    /// Draw order; higher draws later (on top). Ghost bands sit strictly
    /// below every full band so a ghost can never occlude a label.
    pub z_index: i32,
}

const GHOST_BAND: i32 = 0;
const FULL_BAND: i32 = 100;

fn z_index(tier: u8, mode: RenderMode) -> i32 {
    let band = match mode {
        RenderMode::Full => FULL_BAND,
        RenderMode::Ghost => GHOST_BAND,
        RenderMode::Hidden => return i32::MIN,
    };
    // Within a band, more prominent (lower) tiers draw on top.
    band + (4 - tier.min(4)) as i32
}

/// The smallest icon size gets its label tucked in closer; the horizontal
/// offset is halved relative to every other tier.
fn label_offsets(tier: u8, anchor: &LabelAnchor) -> (f64, f64) {
    if tier == 4 {
        (anchor.offset_x / 2.0, anchor.offset_y)
    } else {
        (anchor.offset_x, anchor.offset_y)
    }
}

pub fn style_for(
    feature: &DerivedFeature,
    resolution: f64,
    ghosts_enabled: bool,
) -> Option<StyleSpec> {
    let profile = tier_profile(feature.size);
    match render_mode(feature.size, resolution, ghosts_enabled) {
        RenderMode::Full => {
            let anchor = label_anchor(feature.tag_position);
            let (offset_x, offset_y) = label_offsets(feature.size, anchor);
            Some(StyleSpec {
                icon: IconStyle {
                    radius: profile.icon_radius,
                    fill: profile.icon_fill,
                    stroke: profile.icon_stroke,
                },
                label: Some(LabelStyle {
                    text: feature.preferred_name.clone(),
                    font_px: profile.label_font_px,
                    text_align: anchor.text_align,
                    baseline: anchor.baseline,
                    offset_x,
                    offset_y,
                }),
                z_index: z_index(feature.size, RenderMode::Full),
            })
        }
        RenderMode::Ghost => Some(StyleSpec {
            icon: IconStyle {
                radius: profile.ghost_radius,
                fill: GHOST_FILL,
                stroke: None,
            },
            label: None,
            z_index: z_index(feature.size, RenderMode::Ghost),
        }),
        RenderMode::Hidden => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(size: u8, tag_position: u8) -> DerivedFeature {
        DerivedFeature {
            identifier: "Roma".to_string(),
            prefix: "Pleiades".to_string(),
            base_identifier: "423025".to_string(),
            geometry: (1_389_701.0, 5_145_225.0),
            size,
            preferred_name: "Roma".to_string(),
            tag_position,
            alternate_names: Vec::new(),
            wikipedia_article_name: None,
        }
    }

    #[test]
    fn anchor_table_matches_compass_layout() {
        // Position 0: upper-right of the point.
        assert_eq!(LABEL_ANCHORS[0].text_align, "left");
        assert_eq!(LABEL_ANCHORS[0].baseline, "bottom");
        assert_eq!(
            (LABEL_ANCHORS[0].offset_x, LABEL_ANCHORS[0].offset_y),
            (10.0, 0.0)
        );
        // Position 4: directly above.
        assert_eq!(LABEL_ANCHORS[4].text_align, "center");
        assert_eq!(
            (LABEL_ANCHORS[4].offset_x, LABEL_ANCHORS[4].offset_y),
            (0.0, -7.0)
        );
        // Position 7: directly below.
        assert_eq!(LABEL_ANCHORS[7].baseline, "top");
        assert_eq!(
            (LABEL_ANCHORS[7].offset_x, LABEL_ANCHORS[7].offset_y),
            (0.0, 7.0)
        );
        // Left-column positions align text right, toward the point.
        for pos in [2, 3, 6] {
            assert_eq!(LABEL_ANCHORS[pos].text_align, "right");
            assert_eq!(LABEL_ANCHORS[pos].offset_x, -10.0);
        }
    }

    #[test]
    fn full_style_for_prominent_tier() {
        let spec = style_for(&feature(0, 0), 1_000.0, true).unwrap();
        assert_eq!(spec.icon.radius, 7.0);
        assert_eq!(spec.icon.fill, "white");
        assert_eq!(spec.icon.stroke, Some(("black", 2.0)));
        let label = spec.label.unwrap();
        assert_eq!(label.text, "Roma");
        assert_eq!(label.font_px, 15.0);
        assert_eq!(label.offset_x, 10.0);
    }

    #[test]
    fn tier_four_is_an_unstroked_black_dot_with_halved_offset() {
        let spec = style_for(&feature(4, 0), 1_000.0, true).unwrap();
        assert_eq!(spec.icon.fill, "black");
        assert_eq!(spec.icon.stroke, None);
        let label = spec.label.unwrap();
        assert_eq!(label.font_px, 10.0);
        assert_eq!(label.offset_x, 5.0);
        assert_eq!(label.offset_y, 0.0);

        // Vertical offsets are not halved.
        let above = style_for(&feature(4, 4), 1_000.0, true).unwrap();
        assert_eq!(above.label.unwrap().offset_y, -7.0);
    }

    #[test]
    fn ghost_style_is_icon_only() {
        let spec = style_for(&feature(4, 0), 10_000.0, true).unwrap();
        assert!(spec.label.is_none());
        assert_eq!(spec.icon.radius, 2.0);
        assert_eq!(spec.icon.stroke, None);
    }

    #[test]
    fn hidden_yields_no_style() {
        assert!(style_for(&feature(4, 0), 10_000.0, false).is_none());
    }

    #[test]
    fn ghost_bands_sit_below_all_full_bands() {
        let ghost_top = style_for(&feature(0, 0), 25_000.0, true).unwrap().z_index;
        let full_bottom = style_for(&feature(4, 0), 1_000.0, true).unwrap().z_index;
        assert!(ghost_top < full_bottom);
    }

    #[test]
    fn larger_tiers_draw_above_smaller_within_a_band() {
        let tier0 = style_for(&feature(0, 0), 1_000.0, true).unwrap().z_index;
        let tier4 = style_for(&feature(4, 0), 1_000.0, true).unwrap().z_index;
        assert!(tier0 > tier4);
    }

    #[test]
    fn tag_position_wraps_instead_of_panicking() {
        assert_eq!(*label_anchor(8), LABEL_ANCHORS[0]);
    }
}
