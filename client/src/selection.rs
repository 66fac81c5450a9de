//! Selection state transitions. Pure functions over the per-year feature
//! set; the app shell owns the signal and the popup side effects.

use chronopolis_shared::DerivedFeature;

use crate::visibility::{RenderMode, render_mode};

/// The currently selected city. Matching across year and zoom changes is by
/// identifier; feature objects are recreated on every year change.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCity {
    pub identifier: String,
    pub coordinate: (f64, f64),
    pub wikipedia_article_name: Option<String>,
}

impl SelectedCity {
    pub fn from_feature(feature: &DerivedFeature) -> Self {
        Self {
            identifier: feature.identifier.clone(),
            coordinate: feature.geometry,
            wikipedia_article_name: feature.wikipedia_article_name.clone(),
        }
    }
}

/// A map click selects the hit feature, or clears the selection when the
/// click landed on empty map.
pub fn click_hit(hit: Option<&DerivedFeature>) -> Option<SelectedCity> {
    hit.map(SelectedCity::from_feature)
}

/// Re-check a selection after the feature set or the resolution changed.
///
/// The selection survives only while its identifier still resolves for the
/// current year AND the feature still renders at the current resolution
/// (a ghost counts as rendered). Surviving selections are refreshed from the
/// new feature so stale attributes never leak across years.
pub fn revalidate(
    current: Option<&SelectedCity>,
    features: &[DerivedFeature],
    resolution: f64,
    ghosts_enabled: bool,
) -> Option<SelectedCity> {
    let current = current?;
    let feature = features
        .iter()
        .find(|f| f.identifier == current.identifier)?;
    match render_mode(feature.size, resolution, ghosts_enabled) {
        RenderMode::Hidden => None,
        RenderMode::Full | RenderMode::Ghost => Some(SelectedCity::from_feature(feature)),
    }
}
