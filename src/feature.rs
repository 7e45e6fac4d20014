use std::fmt;

use geo::Geometry;
use geojson::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

use crate::station::StationRecord;

/// The popularity metrics a feature can be filtered and binned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    OriginPopularity,
    DestinationPopularity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::OriginPopularity, Metric::DestinationPopularity];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::OriginPopularity => "originPopularity",
            Metric::DestinationPopularity => "destinationPopularity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::OriginPopularity => "Origin popularity",
            Metric::DestinationPopularity => "Destination popularity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureId {
    Station { station_id: String },
    Cell { column: i32, row: i32 },
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Station { station_id } => f.write_str(station_id),
            FeatureId::Cell { column, row } => write!(f, "cell-{column}-{row}"),
        }
    }
}

/// A drawable unit: either one station or one grid cell summarizing several
#[derive(Debug, Clone, PartialEq)]
pub struct PopularityFeature {
    pub id: FeatureId,
    pub origin_popularity: f64,
    pub destination_popularity: f64,
    pub total_popularity: f64,
    pub geometry: Geometry<f64>,
}

impl PopularityFeature {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::OriginPopularity => self.origin_popularity,
            Metric::DestinationPopularity => self.destination_popularity,
        }
    }

    pub fn properties(&self) -> JsonObject {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), JsonValue::from(self.id.to_string()));
        properties.insert(
            Metric::OriginPopularity.key().to_string(),
            JsonValue::from(self.origin_popularity),
        );
        properties.insert(
            Metric::DestinationPopularity.key().to_string(),
            JsonValue::from(self.destination_popularity),
        );
        properties.insert(
            "totalPopularity".to_string(),
            JsonValue::from(self.total_popularity),
        );
        properties
    }
}

impl From<&StationRecord> for PopularityFeature {
    fn from(record: &StationRecord) -> Self {
        PopularityFeature {
            id: FeatureId::Station {
                station_id: record.station_id.clone(),
            },
            origin_popularity: record.origin_popularity,
            destination_popularity: record.destination_popularity,
            total_popularity: record.total_popularity(),
            geometry: record.geometry.clone(),
        }
    }
}

impl From<&PopularityFeature> for geojson::Feature {
    fn from(feature: &PopularityFeature) -> Self {
        let geometry = geojson::Geometry::new(geojson::Value::from(&feature.geometry));

        geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: Some(geojson::feature::Id::String(feature.id.to_string())),
            properties: Some(feature.properties()),
            foreign_members: None,
        }
    }
}
