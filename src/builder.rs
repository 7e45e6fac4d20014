use geo::{ConvexHull, Coord, CoordsIter, Geometry, Intersects, Line, MultiPoint, Point, Rect};
use itertools::{Either, Itertools, MinMaxResult};
use log::debug;

use crate::{
    feature::{FeatureId, PopularityFeature},
    outline::ReferenceOutline,
    station::StationRecord,
    tools::hexgrid::{HexCells, HexGrid},
};

/// Nominal hexagon edge length used when aggregating stations
pub const DEFAULT_CELL_SIDE_KM: f64 = 0.3;

/// Turns fetched station records into drawable features, either one per station or summed
/// into a hexagonal grid over the reference outline.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    bbox: Rect<f64>,
    cell_side_km: f64,
}

impl FeatureBuilder {
    pub fn new(outline: &ReferenceOutline, cell_side_km: f64) -> Self {
        FeatureBuilder {
            bbox: *outline.bbox(),
            cell_side_km,
        }
    }

    /// Builds the features lazily. The returned iterator is consumed once; calling `build`
    /// again with the same records yields the same features in the same order.
    pub fn build(&self, records: Vec<StationRecord>, aggregate: bool) -> Features {
        let stations = records
            .into_iter()
            .filter(|r| !r.is_virtual())
            .collect::<Vec<_>>();

        if !aggregate {
            return Features {
                inner: Either::Left(StationFeatures {
                    records: stations.into_iter(),
                }),
            };
        }

        let stations = stations
            .iter()
            .map(PopularityFeature::from)
            .collect::<Vec<_>>();

        let cells = match (station_hull(&stations), HexGrid::new(&self.bbox, self.cell_side_km)) {
            (Some(hull), Some(grid)) => {
                let (columns, rows) = grid.dimensions();
                debug!(
                    "aggregating {} stations into a {}x{} hex grid",
                    stations.len(),
                    columns,
                    rows
                );
                Some((hull, grid.cells()))
            }
            _ => None,
        };

        Features {
            inner: Either::Right(CellFeatures { stations, cells }),
        }
    }
}

/// Lazy sequence of features produced by [`FeatureBuilder::build`]
pub struct Features {
    inner: Either<StationFeatures, CellFeatures>,
}

impl Iterator for Features {
    type Item = PopularityFeature;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Either::Left(stations) => stations.next(),
            Either::Right(cells) => cells.next(),
        }
    }
}

struct StationFeatures {
    records: std::vec::IntoIter<StationRecord>,
}

impl Iterator for StationFeatures {
    type Item = PopularityFeature;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|r| PopularityFeature::from(&r))
    }
}

struct CellFeatures {
    stations: Vec<PopularityFeature>,
    cells: Option<(Geometry<f64>, HexCells)>,
}

impl Iterator for CellFeatures {
    type Item = PopularityFeature;

    fn next(&mut self) -> Option<Self::Item> {
        let (hull, cells) = self.cells.as_mut()?;

        for cell in cells.by_ref() {
            if !hull.intersects(&cell.polygon) {
                continue;
            }

            let mut matched = self
                .stations
                .iter()
                .filter(|s| s.geometry.intersects(&cell.polygon))
                .peekable();
            if matched.peek().is_none() {
                continue;
            }

            // Totals accumulate per station maxima rather than taking the max of the sums
            let (origin, destination, total) = matched.fold((0.0, 0.0, 0.0), |acc, s| {
                (
                    acc.0 + s.origin_popularity,
                    acc.1 + s.destination_popularity,
                    acc.2 + s.total_popularity,
                )
            });

            return Some(PopularityFeature {
                id: FeatureId::Cell {
                    column: cell.column,
                    row: cell.row,
                },
                origin_popularity: origin,
                destination_popularity: destination,
                total_popularity: total,
                geometry: Geometry::Polygon(cell.polygon),
            });
        }

        None
    }
}

/// Convex hull around every station coordinate. Collapses to a point or a line when the
/// stations have no area between them.
fn station_hull(stations: &[PopularityFeature]) -> Option<Geometry<f64>> {
    let coords = stations
        .iter()
        .flat_map(|s| s.geometry.coords_iter())
        .collect::<Vec<Coord<f64>>>();

    let extremes = coords.iter().copied().minmax_by(|a, b| {
        a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
    });

    match extremes {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(only) => Some(Geometry::Point(Point::from(only))),
        MinMaxResult::MinMax(min, max) => {
            let hull = MultiPoint::from(coords.into_iter().map(Point::from).collect::<Vec<_>>())
                .convex_hull();

            if hull.exterior().0.len() < 4 || geo::Area::unsigned_area(&hull) == 0.0 {
                if min == max {
                    Some(Geometry::Point(Point::from(min)))
                } else {
                    Some(Geometry::Line(Line::new(min, max)))
                }
            } else {
                Some(Geometry::Polygon(hull))
            }
        }
    }
}
