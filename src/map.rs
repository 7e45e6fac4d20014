use geojson::{FeatureCollection, JsonValue};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    feature::{FeatureId, PopularityFeature},
    filter::FilterRange,
    style::{feature_style, FeatureStyle, OpacityScale},
};

#[derive(Debug, Clone, PartialEq)]
pub struct StyledFeature {
    pub feature: PopularityFeature,
    pub style: FeatureStyle,
}

impl From<&StyledFeature> for geojson::Feature {
    fn from(styled: &StyledFeature) -> Self {
        let mut feature = geojson::Feature::from(&styled.feature);
        if let Some(properties) = feature.properties.as_mut() {
            properties.insert(
                "fillColor".to_string(),
                JsonValue::from(styled.style.fill_color.hex()),
            );
            properties.insert(
                "fillOpacity".to_string(),
                JsonValue::from(styled.style.fill_opacity),
            );
            properties.insert("balance".to_string(), JsonValue::from(styled.style.balance));
        }
        feature
    }
}

/// Everything currently drawn on the map. A new render replaces it wholesale.
#[derive(Debug, Clone)]
pub struct MapLayer {
    generation: u64,
    features: Vec<StyledFeature>,
    scale: OpacityScale,
}

impl MapLayer {
    /// Increments on every render, so stale handles can be told apart
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    pub fn ids(&self) -> impl Iterator<Item = &FeatureId> {
        self.features.iter().map(|f| &f.feature.id)
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(geojson::Feature::from).collect(),
            foreign_members: None,
        }
    }
}

/// Hover details for a drawn feature, with every number already formatted for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub id: String,
    pub origin_popularity: String,
    pub destination_popularity: String,
    pub total_popularity: String,
    pub percentile: String,
}

impl Tooltip {
    pub fn text(&self) -> String {
        format!(
            "{}\nOrigin popularity: {}\nDestination popularity: {}\nTotal popularity: {} ({}%)",
            self.id,
            self.origin_popularity,
            self.destination_popularity,
            self.total_popularity,
            self.percentile
        )
    }
}

#[derive(Debug, Default)]
pub struct MapRenderer {
    overlay: Option<FeatureCollection>,
    layer: Option<MapLayer>,
    generation: u64,
}

impl MapRenderer {
    pub fn new(overlay: Option<FeatureCollection>) -> Self {
        MapRenderer {
            overlay,
            layer: None,
            generation: 0,
        }
    }

    pub fn overlay(&self) -> Option<&FeatureCollection> {
        self.overlay.as_ref()
    }

    pub fn layer(&self) -> Option<&MapLayer> {
        self.layer.as_ref()
    }

    /// Tears down the current layer and draws the features passing `filter`. Opacity is
    /// scaled against the whole feature set so filtering does not change how features look.
    pub fn render(&mut self, features: &[PopularityFeature], filter: &FilterRange) -> &MapLayer {
        let scale = OpacityScale::for_features(features);
        let drawn = features
            .iter()
            .filter(|f| filter.passes(f))
            .map(|f| StyledFeature {
                feature: f.clone(),
                style: feature_style(f, &scale),
            })
            .collect::<Vec<_>>();

        self.generation += 1;
        debug!(
            "map render {}: drawing {} of {} features",
            self.generation,
            drawn.len(),
            features.len()
        );

        self.layer.insert(MapLayer {
            generation: self.generation,
            features: drawn,
            scale,
        })
    }

    pub fn hover(&self, id: &FeatureId) -> Option<Tooltip> {
        let layer = self.layer.as_ref()?;
        let styled = layer.features.iter().find(|f| &f.feature.id == id)?;
        let feature = &styled.feature;

        let max = layer.scale.max_total_popularity();
        let percentile = if max > 0.0 {
            feature.total_popularity / max * 100.0
        } else {
            0.0
        };

        Some(Tooltip {
            id: feature.id.to_string(),
            origin_popularity: format!("{:.2}", feature.origin_popularity),
            destination_popularity: format!("{:.2}", feature.destination_popularity),
            total_popularity: format!("{:.2}", feature.total_popularity),
            percentile: format!("{:.2}", percentile),
        })
    }
}
