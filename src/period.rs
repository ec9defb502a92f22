//! Time bucketing: month stamps, granularities and period keys.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::schema::period;

/// A `YYYY-MM` stamp carried by every parsed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parse `YYYY-MM`. Anything after the month (a day, a time) is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(3, '-');
        let year = parts.next()?.trim();
        let month = parts.next()?.trim();
        let day = format!("{year}-{month}-01");
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").ok()?;
        Some(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
    Semester,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Semester,
        Granularity::Year,
    ];

    /// Number of selectable values per year.
    pub fn bucket_count(self) -> u32 {
        match self {
            Granularity::Month => 12,
            Granularity::Quarter => 4,
            Granularity::Semester => 2,
            Granularity::Year => 1,
        }
    }

    pub fn months_per_bucket(self) -> u32 {
        12 / self.bucket_count()
    }

    /// Bucket value (1-based) a calendar month falls into.
    pub fn bucket_of(self, month: u32) -> u32 {
        (month.clamp(1, 12) - 1) / self.months_per_bucket() + 1
    }

    /// First calendar month of a bucket.
    pub fn start_month(self, value: u32) -> u32 {
        (value.clamp(1, self.bucket_count()) - 1) * self.months_per_bucket() + 1
    }

    /// Short label of one bucket value (`Janvier`, `T2`, `S1`, `Année`).
    pub fn value_label(self, value: u32) -> String {
        match self {
            Granularity::Month => period::MONTHS
                .get(value.saturating_sub(1) as usize)
                .map(|m| m.to_string())
                .unwrap_or_else(|| value.to_string()),
            Granularity::Quarter => format!("{}{value}", period::QUARTER_PREFIX),
            Granularity::Semester => format!("{}{value}", period::SEMESTER_PREFIX),
            Granularity::Year => period::YEAR_LABEL.to_string(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Month => "Mois",
            Granularity::Quarter => "Trimestre",
            Granularity::Semester => "Semestre",
            Granularity::Year => "Année",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `(year, granularity, value)`; ordered by year then by the first month the
/// period covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodKey {
    pub year: i32,
    pub granularity: Granularity,
    pub value: u32,
}

impl PeriodKey {
    pub fn new(year: i32, granularity: Granularity, value: u32) -> Self {
        let value = value.clamp(1, granularity.bucket_count());
        Self {
            year,
            granularity,
            value,
        }
    }

    pub fn whole_year(year: i32) -> Self {
        Self::new(year, Granularity::Year, 1)
    }

    pub fn of(stamp: YearMonth, granularity: Granularity) -> Self {
        Self::new(stamp.year, granularity, granularity.bucket_of(stamp.month))
    }

    pub fn contains(&self, stamp: YearMonth) -> bool {
        stamp.year == self.year && self.granularity.bucket_of(stamp.month) == self.value
    }

    /// Same period one year earlier.
    pub fn prior_year(&self) -> Self {
        Self {
            year: self.year - 1,
            ..*self
        }
    }

    fn start_month(&self) -> u32 {
        self.granularity.start_month(self.value)
    }

    /// Heading label such as `Janvier 2024`, `T1 2025` or `Année 2024`.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Year => format!("{} {}", period::YEAR_LABEL, self.year),
            g => format!("{} {}", g.value_label(self.value), self.year),
        }
    }
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.start_month(), self.granularity.bucket_count())
            .cmp(&(other.year, other.start_month(), other.granularity.bucket_count()))
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
