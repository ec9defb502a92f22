//! Year-over-year evolution curves: monthly totals of two consecutive years
//! with a percentage delta above every comparable month.

use serde::Serialize;
use tracing::debug;

use crate::aggregation::monthly_totals;
use crate::format;
use crate::parser::Dataset;
use crate::period::Granularity;
use crate::schema::{palette, period};

/// Headroom above the largest value on the y axis.
const Y_HEADROOM: f64 = 1.1;
const EMPTY_Y_MAX: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub month: u32,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub year: i32,
    pub label: String,
    /// Sorted by month; months without rows are absent.
    pub points: Vec<SeriesPoint>,
}

impl Series {
    fn of(dataset: &Dataset, year: i32) -> Self {
        let points = monthly_totals(dataset, year)
            .into_iter()
            .map(|(month, value)| SeriesPoint {
                month,
                label: Granularity::Month.value_label(month),
                value,
            })
            .collect();
        Self {
            year,
            label: format!("{} {year}", period::YEAR_LABEL),
            points,
        }
    }

    pub fn value_at(&self, month: u32) -> Option<f64> {
        self.points.iter().find(|p| p.month == month).map(|p| p.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub month: u32,
    /// Whole percent, rounded half up.
    pub percent: i64,
    pub label: String,
    pub positive: bool,
    pub color: String,
}

impl Delta {
    fn between(month: u32, current: f64, prior: f64) -> Self {
        let pct = (current - prior) / prior * 100.0;
        let percent = format::round_half_up(pct) as i64;
        let sign = if pct > 0.0 { "+" } else { "" };
        let positive = pct >= 0.0;
        Self {
            month,
            percent,
            label: format!("{sign}{percent}%"),
            positive,
            color: if positive { palette::POSITIVE } else { palette::NEGATIVE }.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionChart {
    pub current: Series,
    pub prior: Option<Series>,
    pub deltas: Vec<Delta>,
    pub y_max: f64,
}

impl EvolutionChart {
    pub fn is_empty(&self) -> bool {
        self.current.points.is_empty()
            && self.prior.as_ref().map_or(true, |p| p.points.is_empty())
    }

    pub fn delta(&self, month: u32) -> Option<&Delta> {
        self.deltas.iter().find(|d| d.month == month)
    }
}

/// Build the curves for `year`, plus `year - 1` and the deltas when `yoy`.
pub fn build(dataset: &Dataset, year: i32, yoy: bool) -> EvolutionChart {
    let current = Series::of(dataset, year);
    let prior = yoy.then(|| Series::of(dataset, year - 1));

    let deltas: Vec<Delta> = match &prior {
        Some(prior) => current
            .points
            .iter()
            .filter_map(|point| {
                let before = prior.value_at(point.month)?;
                (before != 0.0).then(|| Delta::between(point.month, point.value, before))
            })
            .collect(),
        None => Vec::new(),
    };

    let max = current
        .points
        .iter()
        .chain(prior.iter().flat_map(|p| p.points.iter()))
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let y_max = if max > 0.0 { max * Y_HEADROOM } else { EMPTY_Y_MAX };

    debug!(year, yoy, deltas = deltas.len(), "built evolution chart");

    EvolutionChart {
        current,
        prior,
        deltas,
        y_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Row;
    use crate::period::YearMonth;

    fn row(year: i32, month: u32, value: f64) -> Row {
        Row::new(YearMonth { year, month }, value)
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            row(2024, 1, 1000.0),
            row(2024, 1, 2000.0),
            row(2024, 1, 500.0),
            row(2024, 2, 1000.0),
            row(2024, 3, 0.0),
            row(2025, 1, 4600.0),
            row(2025, 2, 900.0),
            row(2025, 3, 200.0),
            row(2025, 4, 700.0),
        ])
    }

    #[test]
    fn january_growth_is_positive() {
        let chart = build(&dataset(), 2025, true);
        let january = chart.delta(1).unwrap();
        assert_eq!(january.percent, 31);
        assert_eq!(january.label, "+31%");
        assert!(january.positive);
        assert_eq!(january.color, "#2e7d32");

        let february = chart.delta(2).unwrap();
        assert_eq!(february.label, "-10%");
        assert_eq!(february.color, "#c62828");
    }

    #[test]
    fn deltas_need_a_non_zero_prior() {
        let chart = build(&dataset(), 2025, true);
        assert!(chart.delta(3).is_none());
        assert!(chart.delta(4).is_none());
        assert_eq!(chart.deltas.len(), 2);
    }

    #[test]
    fn series_are_sorted_and_labelled() {
        let chart = build(&dataset(), 2025, true);
        assert_eq!(chart.current.label, "Année 2025");
        let months: Vec<u32> = chart.current.points.iter().map(|p| p.month).collect();
        assert_eq!(months, vec![1, 2, 3, 4]);
        assert_eq!(chart.current.points[0].label, "Janvier");
        assert_eq!(chart.prior.as_ref().unwrap().value_at(1), Some(3500.0));
        assert!((chart.y_max - 4600.0 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn without_yoy_only_the_current_series_remains() {
        let chart = build(&dataset(), 2025, false);
        assert!(chart.prior.is_none());
        assert!(chart.deltas.is_empty());
        assert_eq!(chart.current.points.len(), 4);
    }

    #[test]
    fn empty_years_fall_back_to_a_default_axis() {
        let chart = build(&dataset(), 2030, true);
        assert!(chart.is_empty());
        assert_eq!(chart.y_max, 10.0);
    }
}
