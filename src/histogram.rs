use std::{fmt, ops::RangeInclusive};

use log::debug;
use plotters::{
    prelude::{ChartBuilder, Color, IntoDrawingArea, RGBColor, SVGBackend, WHITE},
    series::Histogram as BarSeries,
};
use serde::{Deserialize, Serialize};

use crate::{
    feature::{Metric, PopularityFeature},
    filter::{FilterRange, MetricBounds},
    tools::vector::{equal_width_bin, equal_width_bin_edges, max_with_zero_floor},
};

pub const DEFAULT_BUCKET_COUNT: usize = 20;

const BAR_COLOR: RGBColor = RGBColor(0x72, 0x1f, 0x81);
const SELECTED_BAR_COLOR: RGBColor = RGBColor(0xf1, 0x60, 0x5d);

#[derive(Clone, Debug, PartialEq)]
pub enum HistogramError {
    BucketOutOfRange { index: usize, bucket_count: usize },
    Render(String),
}

impl fmt::Display for HistogramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistogramError::BucketOutOfRange {
                index,
                bucket_count,
            } => write!(f, "bucket {index} is outside of the {bucket_count} histogram buckets"),
            HistogramError::Render(reason) => write!(f, "failed to render histogram: {reason}"),
        }
    }
}

impl std::error::Error for HistogramError {}

fn render_error<E: fmt::Display>(e: E) -> HistogramError {
    HistogramError::Render(e.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal width buckets of one metric spanning `[0, max]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub metric: Metric,
    pub max: f64,
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    pub fn from_features(
        metric: Metric,
        features: &[PopularityFeature],
        bucket_count: usize,
    ) -> Self {
        let bucket_count = bucket_count.max(1);
        let max = max_with_zero_floor(features.iter().map(|f| f.value(metric)));

        let mut buckets = (0..bucket_count)
            .map(|index| {
                let (lower, upper) = equal_width_bin_edges(index, max, bucket_count);
                Bucket {
                    index,
                    lower,
                    upper,
                    count: 0,
                }
            })
            .collect::<Vec<_>>();

        features
            .iter()
            .filter_map(|f| equal_width_bin(f.value(metric), max, bucket_count))
            .for_each(|index| buckets[index].count += 1);

        Histogram {
            metric,
            max,
            buckets,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_for(&self, value: f64) -> Option<usize> {
        equal_width_bin(value, self.max, self.bucket_count())
    }

    pub fn bucket_edges(&self, index: usize) -> Option<(f64, f64)> {
        self.buckets.get(index).map(|b| (b.lower, b.upper))
    }

    /// Bounds covering the buckets `first..=last`
    pub fn range_bounds(
        &self,
        buckets: &RangeInclusive<usize>,
    ) -> Result<MetricBounds, HistogramError> {
        let out_of_range = |index: usize| HistogramError::BucketOutOfRange {
            index,
            bucket_count: self.bucket_count(),
        };

        let (lower, _) = self
            .bucket_edges(*buckets.start())
            .ok_or_else(|| out_of_range(*buckets.start()))?;
        let (_, upper) = self
            .bucket_edges(*buckets.end())
            .ok_or_else(|| out_of_range(*buckets.end()))?;

        Ok(MetricBounds::between(lower, upper))
    }
}

/// One metric's histogram plus the bucket selection driving that metric's filter
#[derive(Debug, Clone)]
pub struct HistogramRenderer {
    metric: Metric,
    histogram: Histogram,
    selection: Option<RangeInclusive<usize>>,
}

impl HistogramRenderer {
    pub fn new(metric: Metric, bucket_count: usize) -> Self {
        HistogramRenderer {
            metric,
            histogram: Histogram::from_features(metric, &[], bucket_count),
            selection: None,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn selection(&self) -> Option<&RangeInclusive<usize>> {
        self.selection.as_ref()
    }

    /// Rebins against a new feature set. Any previous selection no longer applies.
    pub fn update(&mut self, features: &[PopularityFeature]) {
        let bucket_count = self.histogram.bucket_count();
        self.histogram = Histogram::from_features(self.metric, features, bucket_count);
        self.selection = None;
        debug!(
            "{} histogram: {} features over [0, {:.2}]",
            self.metric,
            features.len(),
            self.histogram.max
        );
    }

    pub fn select(
        &mut self,
        bucket: usize,
        filter: &mut FilterRange,
    ) -> Result<MetricBounds, HistogramError> {
        self.select_range(bucket..=bucket, filter)
    }

    /// Selects a contiguous run of buckets and narrows this metric's filter to cover them
    pub fn select_range(
        &mut self,
        buckets: RangeInclusive<usize>,
        filter: &mut FilterRange,
    ) -> Result<MetricBounds, HistogramError> {
        let (first, last) = (*buckets.start(), *buckets.end());
        let buckets = first.min(last)..=first.max(last);

        let bounds = self.histogram.range_bounds(&buckets)?;
        filter.set(self.metric, bounds);
        self.selection = Some(buckets);
        Ok(bounds)
    }

    pub fn deselect(&mut self, filter: &mut FilterRange) {
        filter.clear(self.metric);
        self.selection = None;
    }

    /// Draws the bar chart as an SVG document, selected buckets highlighted
    pub fn to_svg(&self, width: u32, height: u32) -> Result<String, HistogramError> {
        let bucket_count = self.histogram.bucket_count();
        let max_count = self
            .histogram
            .buckets
            .iter()
            .map(|b| b.count)
            .max()
            .unwrap_or(0);
        let is_selected = |index: usize| {
            self.selection
                .as_ref()
                .map_or(false, |selection| selection.contains(&index))
        };

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(4)
                .build_cartesian_2d(0..bucket_count, 0..max_count + 1)
                .map_err(render_error)?;

            for (selected, color) in [(false, BAR_COLOR), (true, SELECTED_BAR_COLOR)] {
                chart
                    .draw_series(
                        BarSeries::vertical(&chart)
                            .style(color.filled())
                            .margin(1)
                            .data(
                                self.histogram
                                    .buckets
                                    .iter()
                                    .filter(|b| is_selected(b.index) == selected)
                                    .map(|b| (b.index, b.count)),
                            ),
                    )
                    .map_err(render_error)?;
            }

            root.present().map_err(render_error)?;
        }

        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use geo::{point, Geometry};

    use super::*;
    use crate::feature::FeatureId;

    fn station(id: &str, origin: f64, destination: f64) -> PopularityFeature {
        PopularityFeature {
            id: FeatureId::Station {
                station_id: id.into(),
            },
            origin_popularity: origin,
            destination_popularity: destination,
            total_popularity: origin.max(destination),
            geometry: Geometry::Point(point! { x: -75.16, y: 39.95 }),
        }
    }

    #[test]
    fn test_binning() {
        let features = vec![
            station("A", 10.0, 2.0),
            station("B", 1.0, 1.0),
            station("C", 0.0, 0.0),
            station("D", 9.5, 0.0),
        ];

        let histogram = Histogram::from_features(Metric::OriginPopularity, &features, 20);
        assert_eq!(histogram.bucket_count(), 20);
        assert_eq!(histogram.max, 10.0);
        assert_eq!(histogram.buckets[0].count, 1);
        assert_eq!(histogram.buckets[2].count, 1);
        assert_eq!(histogram.buckets[19].count, 2);
        assert_eq!(histogram.buckets.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(histogram.bucket_edges(19), Some((9.5, 10.0)));
        assert_eq!(histogram.bucket_for(10.0), Some(19));
        assert_eq!(histogram.bucket_edges(20), None);
    }

    #[test]
    fn test_all_zero_metric() {
        let features = vec![station("A", 0.0, 0.0), station("B", 0.0, 0.0)];
        let histogram = Histogram::from_features(Metric::DestinationPopularity, &features, 20);
        assert_eq!(histogram.max, 0.0);
        assert_eq!(histogram.buckets[0].count, 2);
    }

    #[test]
    fn test_selection_updates_filter() {
        let features = vec![station("A", 10.0, 2.0), station("B", 1.0, 1.0)];
        let mut filter = FilterRange::new();
        let mut origin = HistogramRenderer::new(Metric::OriginPopularity, 20);
        let mut destination = HistogramRenderer::new(Metric::DestinationPopularity, 20);
        origin.update(&features);
        destination.update(&features);

        let bounds = origin.select_range(19..=16, &mut filter).unwrap();
        assert_eq!(bounds, MetricBounds::between(8.0, 10.0));
        assert_eq!(origin.selection(), Some(&(16..=19)));
        assert!(filter.passes(&features[0]));
        assert!(!filter.passes(&features[1]));

        destination.select(0, &mut filter).unwrap();
        assert_eq!(
            filter.get(Metric::OriginPopularity),
            Some(&MetricBounds::between(8.0, 10.0))
        );
        assert!(!filter.passes(&features[0]));

        destination.deselect(&mut filter);
        assert!(filter.get(Metric::DestinationPopularity).is_none());
        assert!(filter.passes(&features[0]));

        assert_eq!(
            origin.select(20, &mut filter),
            Err(HistogramError::BucketOutOfRange {
                index: 20,
                bucket_count: 20
            })
        );
    }

    #[test]
    fn test_update_clears_selection() {
        let features = vec![station("A", 10.0, 2.0)];
        let mut filter = FilterRange::new();
        let mut origin = HistogramRenderer::new(Metric::OriginPopularity, 20);
        origin.update(&features);
        origin.select(3, &mut filter).unwrap();
        origin.update(&features);
        assert!(origin.selection().is_none());
    }

    #[test]
    fn test_svg_output() {
        let features = vec![station("A", 10.0, 2.0), station("B", 1.0, 1.0)];
        let mut filter = FilterRange::new();
        let mut origin = HistogramRenderer::new(Metric::OriginPopularity, 20);
        origin.update(&features);
        origin.select(19, &mut filter).unwrap();

        let svg = origin.to_svg(320, 120).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#F1605D") || svg.contains("#f1605d"));
    }
}
