//! Document-wide category colours and the fixed semantic-flow taxonomy.

use std::collections::HashMap;

use serde::Serialize;

use crate::schema::{palette, taxonomy};

/// Category value → colour, assigned in first-seen order and never revoked.
///
/// One registry exists per document. Widgets borrow it mutably only for the
/// duration of a rebuild.
#[derive(Debug, Clone)]
pub struct ColorRegistry {
    palette: Vec<String>,
    assigned: HashMap<String, usize>,
    order: Vec<String>,
}

impl Default for ColorRegistry {
    fn default() -> Self {
        Self::with_palette(palette::CATEGORY.iter().map(|c| c.to_string()).collect())
    }
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_palette(palette: Vec<String>) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Colour of `category`, assigning the next palette slot on first sight.
    /// The palette is reused cyclically once exhausted.
    pub fn color_for(&mut self, category: &str) -> String {
        let slot = match self.assigned.get(category) {
            Some(&slot) => slot,
            None => {
                let slot = self.order.len();
                self.assigned.insert(category.to_string(), slot);
                self.order.push(category.to_string());
                slot
            }
        };
        self.palette_color(slot)
    }

    /// Colour already assigned to `category`, without assigning.
    pub fn peek(&self, category: &str) -> Option<String> {
        self.assigned.get(category).map(|&slot| self.palette_color(slot))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn palette_color(&self, slot: usize) -> String {
        if self.palette.is_empty() {
            return palette::CATEGORY[slot % palette::CATEGORY.len()].to_string();
        }
        self.palette[slot % self.palette.len()].clone()
    }
}

/// Node and link colour of one taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxonomyStyle {
    pub node: &'static str,
    pub link: &'static str,
}

pub fn taxonomy_style(kind: &str) -> TaxonomyStyle {
    match kind {
        taxonomy::INPUT => TaxonomyStyle {
            node: "#546e7a",
            link: "#cfd8dc",
        },
        taxonomy::PROFIT => TaxonomyStyle {
            node: "#2e7d32",
            link: "#a5d6a7",
        },
        taxonomy::COST => TaxonomyStyle {
            node: "#c62828",
            link: "#ef9a9a",
        },
        _ => TaxonomyStyle {
            node: "#90a4ae",
            link: "#eceff1",
        },
    }
}

/// Parse a `#rrggbb` colour.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Linear RGB interpolation between two colours, `t` clamped to `[0, 1]`.
pub fn interpolate_rgb(from: (u8, u8, u8), to: (u8, u8, u8), t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    format!(
        "rgb({}, {}, {})",
        mix(from.0, to.0),
        mix(from.1, to.1),
        mix(from.2, to.2)
    )
}
