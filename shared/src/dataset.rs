use serde::Deserialize;

use crate::city::{AlternateName, CityRecord, Period};
use crate::projection::lon_lat_to_mercator;

/// Result of parsing the city dataset. Features that cannot be interpreted
/// are dropped, not fatal; `skipped` reports how many.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDataset {
    pub cities: Vec<CityRecord>,
    pub skipped: usize,
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    properties: Option<CityProperties>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityProperties {
    identifier: String,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    base_identifier: String,
    #[serde(default)]
    periods: Vec<Period>,
    #[serde(default)]
    alternate_names: Vec<RawAlternateName>,
    #[serde(default)]
    wikipedia_article_name: Option<String>,
}

#[derive(Deserialize)]
struct RawAlternateName {
    name: String,
}

/// Parse a GeoJSON feature collection of cities, reprojecting each point
/// from lon/lat to EPSG:3857 and assigning alternate-name render ids.
pub fn parse_cities(raw: &str) -> Result<ParsedDataset, String> {
    let collection: FeatureCollection =
        serde_json::from_str(raw).map_err(|e| format!("dataset parse error: {e}"))?;
    if collection.kind != "FeatureCollection" {
        return Err(format!(
            "expected a FeatureCollection, got {:?}",
            collection.kind
        ));
    }

    let mut cities = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;
    for feature in collection.features {
        match build_city(feature) {
            Some(city) => cities.push(city),
            None => skipped += 1,
        }
    }
    Ok(ParsedDataset { cities, skipped })
}

fn build_city(feature: Feature) -> Option<CityRecord> {
    let geometry = feature.geometry?;
    if geometry.kind != "Point" || geometry.coordinates.len() < 2 {
        return None;
    }
    let props = feature.properties?;

    let geometry = lon_lat_to_mercator(geometry.coordinates[0], geometry.coordinates[1]);
    let alternate_names = props
        .alternate_names
        .into_iter()
        .enumerate()
        .map(|(ordinal, raw)| AlternateName {
            id: alternate_name_id(&props.identifier, &raw.name, ordinal),
            name: raw.name,
        })
        .collect();

    Some(CityRecord {
        identifier: props.identifier,
        prefix: props.prefix,
        base_identifier: props.base_identifier,
        geometry,
        periods: props.periods,
        alternate_names,
        wikipedia_article_name: props.wikipedia_article_name,
    })
}

/// Stable generated id for an alternate name. A render key only; carries no
/// meaning beyond being unique per (city, name, ordinal).
fn alternate_name_id(identifier: &str, name: &str, ordinal: usize) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(identifier.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update(&(ordinal as u32).to_le_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [12.4839, 41.89474] },
                "properties": {
                    "identifier": "Roma",
                    "prefix": "Pleiades",
                    "baseIdentifier": "423025",
                    "periods": [
                        { "startDate": -500, "endDate": 100, "size": 0, "preferredName": "Roma", "tagPosition": 0 },
                        { "startDate": 101, "endDate": 1200, "size": 2, "preferredName": "Rome", "tagPosition": 4 }
                    ],
                    "alternateNames": [ { "name": "Rome" }, { "name": "Rom" } ],
                    "wikipediaArticleName": "Ancient_Rome"
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [] },
                "properties": { "identifier": "broken" }
            }
        ]
    }"#;

    #[test]
    fn parses_cities_and_skips_malformed_features() {
        let parsed = parse_cities(SAMPLE).unwrap();
        assert_eq!(parsed.cities.len(), 1);
        assert_eq!(parsed.skipped, 1);

        let roma = &parsed.cities[0];
        assert_eq!(roma.identifier, "Roma");
        assert_eq!(roma.base_identifier, "423025");
        assert_eq!(roma.periods.len(), 2);
        assert_eq!(roma.periods[1].tag_position, 4);
        assert_eq!(roma.wikipedia_article_name.as_deref(), Some("Ancient_Rome"));
        // Reprojected out of degree space.
        assert!(roma.geometry.0 > 1_000_000.0);
        assert!(roma.geometry.1 > 5_000_000.0);
    }

    #[test]
    fn alternate_name_ids_are_stable_and_unique() {
        let a = parse_cities(SAMPLE).unwrap();
        let b = parse_cities(SAMPLE).unwrap();
        let ids_a: Vec<u32> = a.cities[0].alternate_names.iter().map(|n| n.id).collect();
        let ids_b: Vec<u32> = b.cities[0].alternate_names.iter().map(|n| n.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_ne!(ids_a[0], ids_a[1]);
    }

    #[test]
    fn duplicate_names_get_distinct_ids() {
        let id_first = alternate_name_id("Roma", "Rome", 0);
        let id_second = alternate_name_id("Roma", "Rome", 1);
        assert_ne!(id_first, id_second);
    }

    #[test]
    fn rejects_non_feature_collections() {
        assert!(parse_cities(r#"{ "type": "Feature" }"#).is_err());
        assert!(parse_cities("not json").is_err());
    }

    #[test]
    fn empty_collection_parses_to_no_cities() {
        let parsed = parse_cities(r#"{ "type": "FeatureCollection", "features": [] }"#).unwrap();
        assert!(parsed.cities.is_empty());
        assert_eq!(parsed.skipped, 0);
    }
}
