pub mod city;
pub mod dataset;
pub mod era;
pub mod projection;

pub use city::{AlternateName, CityRecord, DerivedFeature, Period, resolve_all};
pub use dataset::{ParsedDataset, parse_cities};
pub use era::{DisplayOptions, EraDesignation, effective_year, format_display_year};
