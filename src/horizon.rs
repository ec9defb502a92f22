//! Ridgeline horizon chart: one row per group, points summed per numeric
//! x position, folded into colour bands.

use serde::Serialize;
use tracing::{debug, warn};

use crate::color::{interpolate_rgb, parse_hex};
use crate::config::{WidgetOptions, XAxisMode};
use crate::parser::Dataset;
use crate::period::PeriodKey;
use crate::schema::horizon;

const WHITE: (u8, u8, u8) = (255, 255, 255);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonPoint {
    pub x: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonRow {
    pub label: String,
    /// Sorted by `x`, one point per distinct position.
    pub points: Vec<HorizonPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonChart {
    pub heading: String,
    pub rows: Vec<HorizonRow>,
    pub x_min: f64,
    pub x_max: f64,
    pub max_value: f64,
    pub row_height: u32,
    /// Fill of band `i`, lightest first.
    pub band_colors: Vec<String>,
    pub x_axis_mode: XAxisMode,
    pub grid: Vec<f64>,
    pub ticks: Vec<AxisTick>,
    pub dropped: usize,
}

impl HorizonChart {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, label: &str) -> Option<&HorizonRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// Band colours sampled from white to `base` over the domain `[-0.5, bands]`.
pub fn band_colors(base: &str, bands: usize) -> Vec<String> {
    let to = parse_hex(base).unwrap_or_else(|| {
        warn!(color = base, "invalid horizon colour, using default");
        parse_hex(horizon::BASE_COLOR).unwrap_or(WHITE)
    });
    let span = bands as f64 + 0.5;
    (0..bands)
        .map(|i| interpolate_rgb(WHITE, to, (i as f64 + 0.5) / span))
        .collect()
}

/// Build the ridgeline of `year`. `y` names the row column and `x` the
/// numeric position column.
pub fn build(
    dataset: &Dataset,
    year: i32,
    y: &str,
    x: &str,
    options: &WidgetOptions,
) -> HorizonChart {
    let mut rows: Vec<(String, Vec<HorizonPoint>)> = Vec::new();
    let mut dropped = 0;

    for row in dataset.rows().iter().filter(|r| r.stamp.year == year) {
        let position = row.field(x).and_then(|v| v.parse::<f64>().ok());
        let (Some(label), Some(position)) = (row.field(y), position) else {
            dropped += 1;
            continue;
        };
        let slot = match rows.iter().position(|(l, _)| l == label) {
            Some(slot) => slot,
            None => {
                rows.push((label.to_string(), Vec::new()));
                rows.len() - 1
            }
        };
        let points = &mut rows[slot].1;
        match points.iter_mut().find(|p| p.x == position) {
            Some(point) => point.value += row.value,
            None => points.push(HorizonPoint {
                x: position,
                value: row.value,
            }),
        }
    }

    let rows: Vec<HorizonRow> = rows
        .into_iter()
        .map(|(label, mut points)| {
            points.sort_by(|a, b| a.x.total_cmp(&b.x));
            HorizonRow { label, points }
        })
        .collect();

    let all = rows.iter().flat_map(|r| r.points.iter());
    let (x_min, x_max, max_value) = all.fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0_f64),
        |(lo, hi, max), p| (lo.min(p.x), hi.max(p.x), max.max(p.value)),
    );
    let (x_min, x_max) = if rows.is_empty() { (0.0, 0.0) } else { (x_min, x_max) };

    let (grid, ticks) = match options.x_axis_mode {
        XAxisMode::Weekly => (
            horizon::WEEKLY_GRID.to_vec(),
            horizon::WEEKLY_TICKS
                .iter()
                .zip(horizon::WEEKDAYS)
                .map(|(&x, day)| AxisTick {
                    x,
                    label: day.to_string(),
                })
                .collect(),
        ),
        XAxisMode::Linear => (Vec::new(), Vec::new()),
    };

    if dropped > 0 {
        warn!(dropped, year, "horizon rows without a row label or numeric position");
    }
    debug!(rows = rows.len(), year, "built horizon chart");

    HorizonChart {
        heading: format!("{} - {}", horizon::HEADING, PeriodKey::whole_year(year).label()),
        rows,
        x_min,
        x_max,
        max_value,
        row_height: options.row_height(),
        band_colors: band_colors(options.base_color(), options.bands()),
        x_axis_mode: options.x_axis_mode,
        grid,
        ticks,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Row;
    use crate::period::YearMonth;

    fn row(year: i32, terminal: &str, hour: &str, value: f64) -> Row {
        Row::new(YearMonth { year, month: 3 }, value)
            .with_field("terminal", terminal)
            .with_field("hour", hour)
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            row(2025, "TPE-1", "30", 5.0),
            row(2025, "TPE-1", "6", 2.0),
            row(2025, "TPE-2", "6", 4.0),
            row(2025, "TPE-1", "30", 1.0),
            row(2025, "TPE-2", "n/a", 9.0),
            row(2024, "TPE-3", "1", 100.0),
        ])
    }

    #[test]
    fn groups_rows_and_sorts_points() {
        let chart = build(&dataset(), 2025, "terminal", "hour", &WidgetOptions::default());
        assert_eq!(chart.heading, "Analyse temporelle - Année 2025");
        assert_eq!(chart.rows.len(), 2);
        let first = chart.row("TPE-1").unwrap();
        assert_eq!(first.points, vec![
            HorizonPoint { x: 6.0, value: 2.0 },
            HorizonPoint { x: 30.0, value: 6.0 },
        ]);
        assert_eq!((chart.x_min, chart.x_max), (6.0, 30.0));
        assert_eq!(chart.max_value, 6.0);
        assert_eq!(chart.dropped, 1);
        assert!(chart.row("TPE-3").is_none());
    }

    #[test]
    fn default_bands_fade_from_white() {
        let colors = band_colors(horizon::BASE_COLOR, 3);
        assert_eq!(colors.len(), 3);
        assert_ne!(colors[0], colors[2]);
        // t = 2.5 / 3.5 for the darkest band: never fully saturated
        assert_ne!(colors[2], "rgb(8, 81, 156)");
    }

    #[test]
    fn weekly_mode_adds_day_ticks() {
        let options = WidgetOptions {
            x_axis_mode: XAxisMode::Weekly,
            ..WidgetOptions::default()
        };
        let chart = build(&dataset(), 2025, "terminal", "hour", &options);
        assert_eq!(chart.grid, vec![24.0, 48.0, 72.0, 96.0, 120.0, 144.0]);
        assert_eq!(chart.ticks.len(), 7);
        assert_eq!(chart.ticks[0].label, "Lun");
        assert_eq!(chart.ticks[6].x, 144.0);
    }

    #[test]
    fn no_rows_is_empty() {
        let chart = build(&dataset(), 2030, "terminal", "hour", &WidgetOptions::default());
        assert!(chart.is_empty());
        assert_eq!(chart.row_height, 40);
    }
}
