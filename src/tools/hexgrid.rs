use std::f64::consts::PI;

use geo::{coord, Coord, HaversineDistance, LineString, Point, Polygon, Rect};

/// Great circle distance in kilometers between two lng/lat coordinates
fn distance_km(source: Coord<f64>, dest: Coord<f64>) -> f64 {
    Point::from(source).haversine_distance(&Point::from(dest)) / 1000.0
}

/// A single flat-topped hexagon of a [`HexGrid`], addressed by its column and row
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    pub column: i32,
    pub row: i32,
    pub center: Coord<f64>,
    pub polygon: Polygon<f64>,
}

/// Uniform hexagonal tiling of a lng/lat bounding box with a nominal edge length in kilometers.
///
/// The edge length is converted to degrees once at the center of the box, so cells are
/// uniform in degree space. Hexagons are laid out in columns with odd columns shifted half a
/// cell down and the whole lattice centered inside the box.
#[derive(Debug, Clone, Copy)]
pub struct HexGrid {
    west: f64,
    south: f64,
    radius_x: f64,
    radius_y: f64,
    x_interval: f64,
    y_interval: f64,
    x_adjust: f64,
    y_adjust: f64,
    x_count: i32,
    y_count: i32,
    has_offset_y: bool,
}

impl HexGrid {
    pub fn new(bbox: &Rect<f64>, cell_side_km: f64) -> Option<Self> {
        let (west, south) = (bbox.min().x, bbox.min().y);
        let (east, north) = (bbox.max().x, bbox.max().y);
        let box_width = east - west;
        let box_height = north - south;

        if box_width <= 0.0 || box_height <= 0.0 || cell_side_km <= 0.0 {
            return None;
        }

        let center_x = (west + east) / 2.0;
        let center_y = (south + north) / 2.0;

        let x_fraction = (cell_side_km * 2.0)
            / distance_km(coord! { x: west, y: center_y }, coord! { x: east, y: center_y });
        let cell_width = x_fraction * box_width;
        let y_fraction = (cell_side_km * 2.0)
            / distance_km(coord! { x: center_x, y: south }, coord! { x: center_x, y: north });
        let cell_height = y_fraction * box_height;

        let radius = cell_width / 2.0;
        let hex_width = radius * 2.0;
        let hex_height = (3f64.sqrt() / 2.0) * cell_height;

        let x_interval = 0.75 * hex_width;
        let y_interval = hex_height;

        let x_count = ((box_width - hex_width) / (hex_width - radius / 2.0)).floor();
        let x_span = x_count * x_interval - radius / 2.0;
        let x_adjust = (x_span - box_width) / 2.0 - radius / 2.0 + x_interval / 2.0;

        let y_count = ((box_height - hex_height) / hex_height).floor();
        let mut y_adjust = (box_height - y_count * hex_height) / 2.0;

        let has_offset_y = y_count * hex_height - box_height > hex_height / 2.0;
        if has_offset_y {
            y_adjust -= hex_height / 4.0;
        }

        if !x_count.is_finite() || !y_count.is_finite() {
            return None;
        }

        Some(HexGrid {
            west,
            south,
            radius_x: cell_width / 2.0,
            radius_y: cell_height / 2.0,
            x_interval,
            y_interval,
            x_adjust,
            y_adjust,
            x_count: x_count as i32,
            y_count: y_count as i32,
            has_offset_y,
        })
    }

    /// Number of columns and rows in the lattice, before any cells are skipped
    pub fn dimensions(&self) -> (i32, i32) {
        (self.x_count + 1, self.y_count + 1)
    }

    pub fn cells(&self) -> HexCells {
        HexCells {
            grid: *self,
            column: 0,
            row: 0,
        }
    }

    fn cell(&self, column: i32, row: i32) -> Option<HexCell> {
        let is_odd = column % 2 == 1;
        if row == 0 && (is_odd || self.has_offset_y) {
            return None;
        }

        let center_x = column as f64 * self.x_interval + self.west - self.x_adjust;
        let mut center_y = row as f64 * self.y_interval + self.south + self.y_adjust;
        if is_odd {
            center_y -= self.y_interval / 2.0;
        }

        let center = coord! { x: center_x, y: center_y };
        Some(HexCell {
            column,
            row,
            center,
            polygon: hexagon(center, self.radius_x, self.radius_y),
        })
    }
}

/// Column-major walk over the cells of a [`HexGrid`]
#[derive(Debug, Clone)]
pub struct HexCells {
    grid: HexGrid,
    column: i32,
    row: i32,
}

impl Iterator for HexCells {
    type Item = HexCell;

    fn next(&mut self) -> Option<Self::Item> {
        while self.grid.y_count >= 0 && self.column <= self.grid.x_count {
            let (column, row) = (self.column, self.row);

            self.row += 1;
            if self.row > self.grid.y_count {
                self.row = 0;
                self.column += 1;
            }

            if let Some(cell) = self.grid.cell(column, row) {
                return Some(cell);
            }
        }

        None
    }
}

fn hexagon(center: Coord<f64>, radius_x: f64, radius_y: f64) -> Polygon<f64> {
    let vertices = (0..6)
        .map(|i| {
            let angle = (2.0 * PI / 6.0) * i as f64;
            coord! {
                x: center.x + radius_x * angle.cos(),
                y: center.y + radius_y * angle.sin(),
            }
        })
        .collect::<Vec<_>>();

    // Polygon::new closes the ring
    Polygon::new(LineString::from(vertices), vec![])
}

#[cfg(test)]
mod tests {
    use geo::{coord, Area, BoundingRect, Contains, Point, Rect};

    use super::{distance_km, HexGrid};

    fn philadelphia_bbox() -> Rect<f64> {
        Rect::new(coord! { x: -75.28, y: 39.87 }, coord! { x: -74.96, y: 40.14 })
    }

    #[test]
    fn test_distance_km() {
        // City Hall to the Art Museum
        let city_hall = coord! { x: -75.1636, y: 39.9526 };
        let art_museum = coord! { x: -75.1810, y: 39.9656 };
        assert!((distance_km(city_hall, art_museum) - 2.07).abs() < 0.05);

        let degree = distance_km(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 1.0 });
        assert!((degree - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_cells_are_closed_hexagons() {
        let grid = HexGrid::new(&philadelphia_bbox(), 0.3).unwrap();
        let cell = grid.cells().next().unwrap();
        let ring = cell.polygon.exterior();
        assert_eq!(ring.0.len(), 7);
        assert_eq!(ring.0.first(), ring.0.last());
        assert!(cell.polygon.unsigned_area() > 0.0);
    }

    #[test]
    fn test_cell_count_matches_lattice() {
        let grid = HexGrid::new(&philadelphia_bbox(), 0.3).unwrap();
        let (columns, rows) = grid.dimensions();
        let count = grid.cells().count() as i32;
        assert!(count <= columns * rows);
        assert!(count >= columns * (rows - 1));
    }

    #[test]
    fn test_cells_stay_near_bbox() {
        let bbox = philadelphia_bbox();
        let grid = HexGrid::new(&bbox, 0.3).unwrap();
        for cell in grid.cells() {
            let cell_box = cell.polygon.bounding_rect().unwrap();
            assert!(cell_box.min().x >= bbox.min().x - cell_box.width());
            assert!(cell_box.max().x <= bbox.max().x + cell_box.width());
            assert!(cell_box.min().y >= bbox.min().y - cell_box.height());
            assert!(cell_box.max().y <= bbox.max().y + cell_box.height());
        }
    }

    #[test]
    fn test_cell_width_matches_edge_length() {
        let grid = HexGrid::new(&philadelphia_bbox(), 0.3).unwrap();
        let cell = grid.cells().next().unwrap();
        let cell_box = cell.polygon.bounding_rect().unwrap();
        let width_km = distance_km(
            coord! { x: cell_box.min().x, y: cell.center.y },
            coord! { x: cell_box.max().x, y: cell.center.y },
        );
        assert!((width_km - 0.6).abs() < 0.01);
        assert!(cell.polygon.contains(&Point::from(cell.center)));
    }

    #[test]
    fn test_degenerate_bbox() {
        let flat = Rect::new(coord! { x: -75.1, y: 39.9 }, coord! { x: -75.1, y: 40.0 });
        assert!(HexGrid::new(&flat, 0.3).is_none());
        assert!(HexGrid::new(&philadelphia_bbox(), 0.0).is_none());
    }
}
