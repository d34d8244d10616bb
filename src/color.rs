use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

/// Colour for lines that belong to no group, such as a global trend.
pub const NEUTRAL: &str = "#444444";

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues, as
/// `#rrggbb` strings.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: group key → colour
// ---------------------------------------------------------------------------

/// Maps group keys (tokenizers, languages, families, metrics) to distinct
/// colours. Hues are handed out in the order the keys were first given.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, String>,
}

impl ColorMap {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order: Vec<String> = Vec::new();
        for k in keys {
            let k = k.into();
            if !order.contains(&k) {
                order.push(k);
            }
        }
        let mapping = order
            .iter()
            .cloned()
            .zip(generate_palette(order.len()))
            .collect();
        ColorMap { mapping }
    }

    pub fn color_for(&self, key: &str) -> String {
        self.mapping
            .get(key)
            .cloned()
            .unwrap_or_else(|| NEUTRAL.to_string())
    }
}
