use std::fs;

use indegors::{
    builder::{FeatureBuilder, DEFAULT_CELL_SIDE_KM},
    feature::{FeatureId, Metric, PopularityFeature},
    histogram::Histogram,
    outline::ReferenceOutline,
    station::{StationRecord, VIRTUAL_STATION_ID},
    style::{balance, balance_color},
};

fn read_mock_data(name: &str) -> String {
    fs::read_to_string(format!("mock/{}", name)).unwrap()
}

fn read_stations() -> Vec<StationRecord> {
    StationRecord::from_json(&read_mock_data("popularity.json")).unwrap()
}

fn read_outline() -> ReferenceOutline {
    ReferenceOutline::from_geojson(&read_mock_data("philadelphia_outline.geojson")).unwrap()
}

#[test]
fn read_popularity_payload() {
    let stations = read_stations();
    assert_eq!(stations.len(), 9);
    assert!(stations.iter().any(|s| s.station_id == VIRTUAL_STATION_ID));

    let busiest = stations.iter().find(|s| s.station_id == "3010").unwrap();
    assert!((busiest.origin_popularity - 21.96).abs() < 1e-9);
    assert!((busiest.combined_popularity - 47.26).abs() < 1e-9);
}

#[test]
fn station_features() {
    let builder = FeatureBuilder::new(&read_outline(), DEFAULT_CELL_SIDE_KM);
    let features = builder.build(read_stations(), false).collect::<Vec<_>>();

    assert_eq!(features.len(), 8);
    assert!(features.iter().all(|f| f.id
        != FeatureId::Station {
            station_id: VIRTUAL_STATION_ID.to_string()
        }));

    for feature in &features {
        assert_eq!(
            feature.total_popularity,
            feature.origin_popularity.max(feature.destination_popularity)
        );
        let b = balance(
            feature.origin_popularity,
            feature.destination_popularity,
            feature.total_popularity,
        );
        assert!((-1.0..=1.0).contains(&b));
    }

    let quiet = features.iter().find(|f| f.id.to_string() == "3032").unwrap();
    assert_eq!(
        balance_color(balance(
            quiet.origin_popularity,
            quiet.destination_popularity,
            quiet.total_popularity
        )),
        balance_color(0.0)
    );
}

#[test]
fn aggregated_features() {
    let stations = read_stations();
    let builder = FeatureBuilder::new(&read_outline(), DEFAULT_CELL_SIDE_KM);

    let station_features = builder.build(stations.clone(), false).collect::<Vec<_>>();
    let cells = builder.build(stations, true).collect::<Vec<_>>();

    assert!(!cells.is_empty());
    assert!(cells.len() <= station_features.len() * 3);
    assert!(cells.iter().all(|c| matches!(c.id, FeatureId::Cell { .. })));

    // The virtual station alone would push a cell past this
    assert!(cells.iter().all(|c| c.origin_popularity < 48.0));

    // Every station lands in at least one cell, stations on a shared edge count for both
    let sum = |features: &[PopularityFeature], metric: Metric| -> f64 {
        features.iter().map(|f| f.value(metric)).sum()
    };
    assert!(
        sum(&cells, Metric::OriginPopularity)
            >= sum(&station_features, Metric::OriginPopularity) - 1e-9
    );
    let station_total: f64 = station_features.iter().map(|f| f.total_popularity).sum();
    let cell_total: f64 = cells.iter().map(|c| c.total_popularity).sum();
    assert!(cell_total >= station_total - 1e-9);
}

#[test]
fn building_twice_matches() {
    let builder = FeatureBuilder::new(&read_outline(), DEFAULT_CELL_SIDE_KM);
    for aggregate in [false, true] {
        let first = builder.build(read_stations(), aggregate).collect::<Vec<_>>();
        let second = builder.build(read_stations(), aggregate).collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}

#[test]
fn histogram_of_station_features() {
    let builder = FeatureBuilder::new(&read_outline(), DEFAULT_CELL_SIDE_KM);
    let features = builder.build(read_stations(), false).collect::<Vec<_>>();

    let histogram = Histogram::from_features(Metric::OriginPopularity, &features, 20);
    assert!((histogram.max - 21.96).abs() < 1e-9);
    assert_eq!(histogram.buckets.iter().map(|b| b.count).sum::<usize>(), features.len());
    assert_eq!(histogram.bucket_for(21.96), Some(19));
    assert_eq!(histogram.buckets[19].count, 1);
}
