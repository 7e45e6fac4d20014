use serde::{Deserialize, Serialize};

use crate::{
    feature::PopularityFeature,
    tools::{
        color::{magma, Rgb},
        vector::{linear_scale, max_with_zero_floor},
    },
};

pub const MIN_OPACITY: f64 = 0.1;
pub const MAX_OPACITY: f64 = 1.0;

/// Where a feature sits between pure origin (-1) and pure destination (+1) usage. Features
/// with no popularity at all are neutral.
pub fn balance(origin_popularity: f64, destination_popularity: f64, total_popularity: f64) -> f64 {
    if total_popularity == 0.0 || !total_popularity.is_finite() {
        return 0.0;
    }

    let balance = (destination_popularity - origin_popularity) / total_popularity;
    if balance.is_nan() {
        0.0
    } else {
        balance.clamp(-1.0, 1.0)
    }
}

/// Color for a balance value, sampling magma over the `[-1, 1]` domain
pub fn balance_color(balance: f64) -> Rgb {
    magma((balance + 1.0) / 2.0)
}

/// Linear opacity ramp from the faintest value at zero popularity to fully opaque at the
/// busiest feature of the current set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityScale {
    max_total_popularity: f64,
}

impl OpacityScale {
    pub fn new(max_total_popularity: f64) -> Self {
        OpacityScale {
            max_total_popularity,
        }
    }

    pub fn for_features<'a, I>(features: I) -> Self
    where
        I: IntoIterator<Item = &'a PopularityFeature>,
    {
        OpacityScale::new(max_with_zero_floor(
            features.into_iter().map(|f| f.total_popularity),
        ))
    }

    pub fn max_total_popularity(&self) -> f64 {
        self.max_total_popularity
    }

    pub fn opacity(&self, total_popularity: f64) -> f64 {
        if self.max_total_popularity <= 0.0 {
            return MIN_OPACITY;
        }

        linear_scale(
            total_popularity,
            (0.0, self.max_total_popularity),
            (MIN_OPACITY, MAX_OPACITY),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStyle {
    pub balance: f64,
    pub fill_color: Rgb,
    pub fill_opacity: f64,
}

pub fn feature_style(feature: &PopularityFeature, scale: &OpacityScale) -> FeatureStyle {
    let balance = balance(
        feature.origin_popularity,
        feature.destination_popularity,
        feature.total_popularity,
    );

    FeatureStyle {
        balance,
        fill_color: balance_color(balance),
        fill_opacity: scale.opacity(feature.total_popularity),
    }
}
