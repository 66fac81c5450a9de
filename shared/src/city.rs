use serde::{Deserialize, Serialize};

/// One historical existence-window of a city.
///
/// `start_date`/`end_date` are inclusive signed years. Year 0 is unused by
/// convention (era scales skip it); negative years are BCE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: i32,
    pub end_date: i32,
    /// Size tier 0..=4, 0 = most prominent.
    pub size: u8,
    pub preferred_name: String,
    /// Label anchor slot 0..=7.
    #[serde(default)]
    pub tag_position: u8,
}

impl Period {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start_date && year <= self.end_date
    }
}

/// An alternate name with a generated id used only as a stable render key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateName {
    pub id: u32,
    pub name: String,
}

/// A city as loaded from the dataset. Immutable after load; geometry is in
/// EPSG:3857 meters.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    pub identifier: String,
    pub prefix: String,
    pub base_identifier: String,
    pub geometry: (f64, f64),
    /// Stored order is significant: the first period containing a query year
    /// wins when windows overlap.
    pub periods: Vec<Period>,
    pub alternate_names: Vec<AlternateName>,
    pub wikipedia_article_name: Option<String>,
}

/// A city projected for one specific query year. Recomputed on every year
/// change; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeature {
    pub identifier: String,
    pub prefix: String,
    pub base_identifier: String,
    pub geometry: (f64, f64),
    pub size: u8,
    pub preferred_name: String,
    pub tag_position: u8,
    pub alternate_names: Vec<AlternateName>,
    pub wikipedia_article_name: Option<String>,
}

impl DerivedFeature {
    /// The qualified identifier shown alongside a period name that differs
    /// from it, e.g. "Pleiades 423025".
    pub fn qualified_identifier(&self) -> String {
        format!("{} {}", self.prefix, self.base_identifier)
    }

    pub fn display_name(&self) -> String {
        if self.preferred_name == self.identifier {
            self.preferred_name.clone()
        } else {
            format!("{} ({})", self.preferred_name, self.qualified_identifier())
        }
    }
}

impl CityRecord {
    /// Resolve this city for `year`: the first period (in stored order) whose
    /// window contains the year supplies the display attributes. No matching
    /// period means the city simply does not exist in that year.
    pub fn resolve(&self, year: i32) -> Option<DerivedFeature> {
        let period = self.periods.iter().find(|p| p.contains(year))?;
        Some(DerivedFeature {
            identifier: self.identifier.clone(),
            prefix: self.prefix.clone(),
            base_identifier: self.base_identifier.clone(),
            geometry: self.geometry,
            size: period.size,
            preferred_name: period.preferred_name.clone(),
            tag_position: period.tag_position,
            alternate_names: self.alternate_names.clone(),
            wikipedia_article_name: self.wikipedia_article_name.clone(),
        })
    }
}

/// Project the whole collection for one year, preserving input order.
pub fn resolve_all(cities: &[CityRecord], year: i32) -> Vec<DerivedFeature> {
    cities.iter().filter_map(|c| c.resolve(year)).collect()
}
