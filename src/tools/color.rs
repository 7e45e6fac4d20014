use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Evenly spaced samples of the magma colormap, dark to light
const MAGMA: [Rgb; 10] = [
    Rgb::new(0x00, 0x00, 0x04),
    Rgb::new(0x18, 0x0f, 0x3e),
    Rgb::new(0x45, 0x10, 0x77),
    Rgb::new(0x72, 0x1f, 0x81),
    Rgb::new(0x9f, 0x2f, 0x7f),
    Rgb::new(0xcd, 0x40, 0x71),
    Rgb::new(0xf1, 0x60, 0x5d),
    Rgb::new(0xfd, 0x95, 0x67),
    Rgb::new(0xfe, 0xca, 0x8d),
    Rgb::new(0xfc, 0xfd, 0xbf),
];

/// Samples the magma ramp at `t` in `[0, 1]`, clamping anything outside. NaN samples the
/// middle of the ramp.
pub fn magma(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (MAGMA.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(MAGMA.len() - 2);
    MAGMA[index].lerp(&MAGMA[index + 1], scaled - index as f64)
}
