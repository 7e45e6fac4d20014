use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::{Metric, PopularityFeature};

/// Inclusive bounds on one metric. A missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricBounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        MetricBounds { min, max }
    }

    pub fn between(min: f64, max: f64) -> Self {
        MetricBounds {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Metric bounds selected through the histograms. Every bound applies at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRange {
    bounds: BTreeMap<Metric, MetricBounds>,
}

impl FilterRange {
    pub fn new() -> Self {
        FilterRange::default()
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricBounds> {
        self.bounds.get(&metric)
    }

    pub fn set(&mut self, metric: Metric, bounds: MetricBounds) {
        self.bounds.insert(metric, bounds);
    }

    pub fn clear(&mut self, metric: Metric) {
        self.bounds.remove(&metric);
    }

    pub fn clear_all(&mut self) {
        self.bounds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn passes(&self, feature: &PopularityFeature) -> bool {
        self.bounds
            .iter()
            .all(|(metric, bounds)| bounds.contains(feature.value(*metric)))
    }
}
