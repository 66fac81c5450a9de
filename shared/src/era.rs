use serde::{Deserialize, Serialize};

/// Which pair of era postfixes to display. The underlying data is always a
/// signed year; this only changes presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraDesignation {
    BcAd,
    BceCe,
}

/// Display configuration passed explicitly to the slider and tooltip code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayOptions {
    pub era: EraDesignation,
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            era: EraDesignation::BceCe,
            min_year: -1600,
            max_year: 1600,
        }
    }
}

/// Year 0 does not exist on era scales; a zero slider value is applied as
/// year 1.
pub fn effective_year(year: i32) -> i32 {
    if year == 0 { 1 } else { year }
}

/// The (absolute value, postfix) pair shown for a year.
pub fn display_year_parts(year: i32, era: EraDesignation) -> (i32, &'static str) {
    let year = effective_year(year);
    if year > 0 {
        let postfix = match era {
            EraDesignation::BcAd => "AD",
            EraDesignation::BceCe => "CE",
        };
        (year, postfix)
    } else {
        let postfix = match era {
            EraDesignation::BcAd => "BC",
            EraDesignation::BceCe => "BCE",
        };
        (-year, postfix)
    }
}

pub fn format_display_year(year: i32, era: EraDesignation) -> String {
    let (value, postfix) = display_year_parts(year, era);
    format!("{value} {postfix}")
}
