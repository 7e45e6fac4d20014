use std::fmt;

use geo::Geometry;
use serde::Deserialize;

use crate::tools::serde::{f64_from_str, identifier_from_any, optional_f64_from_str};

/// Indego reports trips docked at its virtual station under this id. It is an aggregate of
/// events with no physical dock and is never drawn.
pub const VIRTUAL_STATION_ID: &str = "3000";

#[derive(Clone, Debug, PartialEq)]
pub enum StationParseError {
    InvalidPayload(String),
    InvalidGeometry { station_id: String, reason: String },
}

impl fmt::Display for StationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationParseError::InvalidPayload(reason) => {
                write!(f, "invalid popularity payload: {reason}")
            }
            StationParseError::InvalidGeometry { station_id, reason } => {
                write!(f, "invalid geometry for station {station_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for StationParseError {}

/// Wire shape of a popularity row. The geometry arrives as a GeoJSON document embedded in a
/// string, though a plain GeoJSON object is accepted too.
#[derive(Debug, Clone, Deserialize)]
struct RawStationRecord {
    #[serde(deserialize_with = "identifier_from_any")]
    station_id: String,

    #[serde(rename = "P_o", deserialize_with = "f64_from_str")]
    origin_popularity: f64,

    #[serde(rename = "P_d", deserialize_with = "f64_from_str")]
    destination_popularity: f64,

    #[serde(rename = "P", default, deserialize_with = "optional_f64_from_str")]
    combined_popularity: Option<f64>,

    geometry: serde_json::Value,
}

/// Popularity of a single station over a time window, as served by the popularity endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub station_id: String,
    pub origin_popularity: f64,
    pub destination_popularity: f64,
    pub combined_popularity: f64,
    pub geometry: Geometry<f64>,
}

impl StationRecord {
    pub fn new(
        station_id: &str,
        origin_popularity: f64,
        destination_popularity: f64,
        geometry: Geometry<f64>,
    ) -> Self {
        StationRecord {
            station_id: station_id.to_string(),
            origin_popularity,
            destination_popularity,
            combined_popularity: origin_popularity + destination_popularity,
            geometry,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.station_id == VIRTUAL_STATION_ID
    }

    pub fn total_popularity(&self) -> f64 {
        self.origin_popularity.max(self.destination_popularity)
    }

    pub fn from_json(raw_data: &str) -> Result<Vec<StationRecord>, StationParseError> {
        let rows: Vec<RawStationRecord> = serde_json::from_str(raw_data)
            .map_err(|e| StationParseError::InvalidPayload(e.to_string()))?;

        rows.into_iter().map(StationRecord::try_from).collect()
    }
}

impl TryFrom<RawStationRecord> for StationRecord {
    type Error = StationParseError;

    fn try_from(raw: RawStationRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StationParseError::InvalidGeometry {
            station_id: raw.station_id.clone(),
            reason,
        };

        let geojson_geometry: geojson::Geometry = match &raw.geometry {
            serde_json::Value::String(embedded) => serde_json::from_str(embedded),
            other => serde_json::from_value(other.clone()),
        }
        .map_err(|e| invalid(e.to_string()))?;

        let geometry =
            Geometry::<f64>::try_from(geojson_geometry).map_err(|e| invalid(e.to_string()))?;

        Ok(StationRecord {
            combined_popularity: raw
                .combined_popularity
                .unwrap_or(raw.origin_popularity + raw.destination_popularity),
            station_id: raw.station_id,
            origin_popularity: raw.origin_popularity,
            destination_popularity: raw.destination_popularity,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::{point, Geometry};

    use super::*;

    #[test]
    fn parse_station_rows() {
        let raw = r#"[
            {
                "station_id": 3004,
                "geometry": "{\"type\": \"Point\", \"coordinates\": [-75.16374, 39.95378]}",
                "P_o": 12.5,
                "P_d": 9.25,
                "P": 21.75
            },
            {
                "station_id": "3000",
                "geometry": {"type": "Point", "coordinates": [-75.16, 39.95]},
                "P_o": "1.0",
                "P_d": 2
            }
        ]"#;

        let records = StationRecord::from_json(raw).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.station_id, "3004");
        assert!((first.total_popularity() - 12.5).abs() < 1e-9);
        assert!((first.combined_popularity - 21.75).abs() < 1e-9);
        assert_eq!(
            first.geometry,
            Geometry::Point(point! { x: -75.16374, y: 39.95378 })
        );
        assert!(!first.is_virtual());

        let second = &records[1];
        assert!(second.is_virtual());
        assert!((second.combined_popularity - 3.0).abs() < 1e-9);
    }

    #[test]
    fn reject_bad_geometry() {
        let raw = r#"[
            {"station_id": 3010, "geometry": "{\"type\": \"Blob\"}", "P_o": 1, "P_d": 1}
        ]"#;
        let result = StationRecord::from_json(raw);
        assert!(matches!(
            result,
            Err(StationParseError::InvalidGeometry { ref station_id, .. }) if station_id == "3010"
        ));
    }

    #[test]
    fn reject_bad_payload() {
        let raw = r#"{"error": "start_hour must be less than end_hour"}"#;
        let result = StationRecord::from_json(raw);
        assert!(matches!(result, Err(StationParseError::InvalidPayload(_))));
    }
}
