use std::fmt;

use geo::{BoundingRect, Geometry, GeometryCollection, Rect};
use geojson::{FeatureCollection, GeoJson};

#[derive(Clone, Debug, PartialEq)]
pub enum OutlineError {
    InvalidGeoJson(String),
    InvalidGeometry(String),
    Empty,
}

impl fmt::Display for OutlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlineError::InvalidGeoJson(reason) => {
                write!(f, "invalid outline geojson: {reason}")
            }
            OutlineError::InvalidGeometry(reason) => {
                write!(f, "invalid outline geometry: {reason}")
            }
            OutlineError::Empty => f.write_str("outline has no geometry"),
        }
    }
}

impl std::error::Error for OutlineError {}

/// The municipal boundary. It bounds the aggregation grid and is drawn as an overlay.
#[derive(Debug, Clone)]
pub struct ReferenceOutline {
    collection: FeatureCollection,
    bbox: Rect<f64>,
}

impl ReferenceOutline {
    pub fn from_geojson(raw_data: &str) -> Result<Self, OutlineError> {
        let geojson = raw_data
            .parse::<GeoJson>()
            .map_err(|e| OutlineError::InvalidGeoJson(e.to_string()))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => FeatureCollection {
                bbox: None,
                features: vec![feature],
                foreign_members: None,
            },
            GeoJson::Geometry(geometry) => FeatureCollection {
                bbox: None,
                features: vec![geojson::Feature::from(geometry)],
                foreign_members: None,
            },
        };

        ReferenceOutline::from_collection(collection)
    }

    pub fn from_collection(collection: FeatureCollection) -> Result<Self, OutlineError> {
        let geometries = collection
            .features
            .iter()
            .filter_map(|f| f.geometry.clone())
            .map(|g| {
                Geometry::<f64>::try_from(g)
                    .map_err(|e| OutlineError::InvalidGeometry(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bbox = GeometryCollection(geometries)
            .bounding_rect()
            .ok_or(OutlineError::Empty)?;

        Ok(ReferenceOutline { collection, bbox })
    }

    pub fn bbox(&self) -> &Rect<f64> {
        &self.bbox
    }

    pub fn overlay(&self) -> &FeatureCollection {
        &self.collection
    }
}
