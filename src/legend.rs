use serde::{Deserialize, Serialize};

use crate::{
    style::{balance_color, OpacityScale},
    tools::color::Rgb,
};

const BALANCE_STOPS: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub balance: f64,
    pub label: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpacityStop {
    pub total_popularity: f64,
    pub opacity: f64,
}

/// Key for the map: the balance color ramp and the opacity ramp of the current features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub colors: Vec<ColorStop>,
    pub opacities: Vec<OpacityStop>,
}

impl Legend {
    pub fn new(scale: &OpacityScale) -> Self {
        let colors = BALANCE_STOPS
            .iter()
            .map(|&balance| ColorStop {
                balance,
                label: balance_label(balance).to_string(),
                color: balance_color(balance),
            })
            .collect();

        let max = scale.max_total_popularity();
        let opacities = vec![
            OpacityStop {
                total_popularity: 0.0,
                opacity: scale.opacity(0.0),
            },
            OpacityStop {
                total_popularity: max,
                opacity: scale.opacity(max),
            },
        ];

        Legend { colors, opacities }
    }
}

fn balance_label(balance: f64) -> &'static str {
    if balance <= -1.0 {
        "Mostly trip origins"
    } else if balance >= 1.0 {
        "Mostly trip destinations"
    } else if balance == 0.0 {
        "Balanced"
    } else {
        ""
    }
}
