pub mod color;
pub mod hexgrid;
pub mod serde;
pub mod vector;
