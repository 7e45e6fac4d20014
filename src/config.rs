use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    builder::DEFAULT_CELL_SIDE_KM, histogram::DEFAULT_BUCKET_COUNT, time_window::TimeWindow,
};

/// Startup settings. They only seed the in-memory dashboard state; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoint: String,
    pub outline_url: String,
    pub hex_cell_side_km: f64,
    pub bucket_count: usize,
    pub slider_debounce_ms: u64,
    pub rerun_delay_ms: u64,
    pub initial_window: TimeWindow,
    pub aggregate: bool,
}

impl DashboardConfig {
    pub fn from_json(raw_data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw_data)
    }

    pub fn slider_debounce(&self) -> Duration {
        Duration::from_millis(self.slider_debounce_ms)
    }

    pub fn rerun_delay(&self) -> Duration {
        Duration::from_millis(self.rerun_delay_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            endpoint: "http://localhost:8080/get_popularity".to_string(),
            outline_url: "http://localhost:8080/philadelphia-city-limits.geojson".to_string(),
            hex_cell_side_km: DEFAULT_CELL_SIDE_KM,
            bucket_count: DEFAULT_BUCKET_COUNT,
            slider_debounce_ms: 250,
            rerun_delay_ms: 100,
            initial_window: TimeWindow::default(),
            aggregate: false,
        }
    }
}
