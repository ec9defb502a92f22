//! Period aggregator: select the rows of one period and sum their values by
//! category path.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::parser::{Dataset, Row};
use crate::period::PeriodKey;

/// Summed value of all rows sharing one category path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Present prefix of the hierarchy path; shorter than the requested path
    /// when a deeper field was missing.
    pub path: Vec<String>,
    pub value: f64,
    pub rows: usize,
}

/// Result of one aggregation request. Built fresh every time, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub key: PeriodKey,
    groups: Vec<Group>,
}

impl AggregatedBucket {
    pub fn empty(key: PeriodKey) -> Self {
        Self {
            key,
            groups: Vec::new(),
        }
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.value).sum()
    }

    pub fn get(&self, path: &[&str]) -> Option<f64> {
        self.groups
            .iter()
            .find(|g| g.path.iter().map(String::as_str).eq(path.iter().copied()))
            .map(|g| g.value)
    }
}

/// Sorted distinct years present in the dataset.
pub fn available_years(dataset: &Dataset) -> Vec<i32> {
    dataset
        .rows()
        .iter()
        .map(|r| r.stamp.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows whose stamp falls inside `key`, in source order.
pub fn select<'a>(dataset: &'a Dataset, key: &PeriodKey) -> Vec<&'a Row> {
    dataset
        .rows()
        .iter()
        .filter(|r| key.contains(r.stamp))
        .collect()
}

/// Group the rows of one period by their present `path` prefix and sum.
///
/// With an empty `path` every row lands in a single group. Otherwise rows
/// missing the first field cannot be placed and are left out.
pub fn aggregate(dataset: &Dataset, key: &PeriodKey, path: &[String]) -> AggregatedBucket {
    group_rows(select(dataset, key), *key, path)
}

fn group_rows<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    key: PeriodKey,
    path: &[String],
) -> AggregatedBucket {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for row in rows {
        let prefix: Vec<String> = row.prefix(path).into_iter().map(str::to_string).collect();
        if prefix.is_empty() && !path.is_empty() {
            continue;
        }
        let slot = *index.entry(prefix.clone()).or_insert_with(|| {
            groups.push(Group {
                path: prefix,
                value: 0.0,
                rows: 0,
            });
            groups.len() - 1
        });
        groups[slot].value += row.value;
        groups[slot].rows += 1;
    }

    AggregatedBucket { key, groups }
}

/// Month → summed value for one year, months without rows omitted.
pub fn monthly_totals(dataset: &Dataset, year: i32) -> BTreeMap<u32, f64> {
    let mut totals = BTreeMap::new();
    for row in dataset.rows().iter().filter(|r| r.stamp.year == year) {
        *totals.entry(row.stamp.month).or_insert(0.0) += row.value;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{Granularity, YearMonth};

    fn row(year: i32, month: u32, scheme: &str, tsp: &str, value: f64) -> Row {
        Row::new(YearMonth { year, month }, value)
            .with_field("scheme", scheme)
            .with_field("tsp", tsp)
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            row(2024, 1, "Visa", "Worldline", 1000.0),
            row(2024, 1, "CB", "Worldline", 2000.0),
            row(2024, 1, "Mastercard", "Nets", 500.0),
            row(2024, 2, "Visa", "Worldline", 1100.0),
            row(2024, 4, "Visa", "", 300.0),
            row(2024, 7, "CB", "Worldline", 700.0),
            row(2024, 12, "CB", "Worldline", 3000.0),
            row(2025, 1, "Visa", "Worldline", 1500.0),
        ])
    }

    fn levels() -> Vec<String> {
        vec!["scheme".to_string(), "tsp".to_string()]
    }

    #[test]
    fn years_are_sorted_and_distinct() {
        assert_eq!(available_years(&dataset()), vec![2024, 2025]);
        assert!(available_years(&Dataset::default()).is_empty());
    }

    #[test]
    fn month_bucket_sums_by_path() {
        let bucket = aggregate(&dataset(), &PeriodKey::new(2024, Granularity::Month, 1), &levels());
        assert_eq!(bucket.groups().len(), 3);
        assert_eq!(bucket.get(&["Visa", "Worldline"]), Some(1000.0));
        assert_eq!(bucket.total(), 3500.0);
    }

    #[test]
    fn quarter_and_semester_buckets() {
        let ds = dataset();
        let q1 = aggregate(&ds, &PeriodKey::new(2024, Granularity::Quarter, 1), &levels());
        assert_eq!(q1.total(), 4600.0);
        assert_eq!(q1.get(&["Visa", "Worldline"]), Some(2100.0));

        let q2 = aggregate(&ds, &PeriodKey::new(2024, Granularity::Quarter, 2), &levels());
        assert_eq!(q2.get(&["Visa"]), Some(300.0));

        let s2 = aggregate(&ds, &PeriodKey::new(2024, Granularity::Semester, 2), &levels());
        assert_eq!(s2.total(), 3700.0);
    }

    #[test]
    fn empty_period_is_an_empty_bucket() {
        let bucket = aggregate(&dataset(), &PeriodKey::new(2023, Granularity::Month, 1), &levels());
        assert!(bucket.is_empty());
        assert_eq!(bucket.total(), 0.0);
    }

    #[test]
    fn totals_are_conserved_across_granularities() {
        let ds = dataset();
        let year_sum: f64 = ds
            .rows()
            .iter()
            .filter(|r| r.stamp.year == 2024)
            .map(|r| r.value)
            .sum();
        for granularity in Granularity::ALL {
            let total: f64 = (1..=granularity.bucket_count())
                .map(|value| {
                    aggregate(&ds, &PeriodKey::new(2024, granularity, value), &levels()).total()
                })
                .sum();
            assert_eq!(total, year_sum, "{granularity:?}");
        }
    }

    #[test]
    fn monthly_totals_per_year() {
        let totals = monthly_totals(&dataset(), 2024);
        assert_eq!(totals.get(&1), Some(&3500.0));
        assert_eq!(totals.get(&3), None);
        assert_eq!(totals.keys().copied().collect::<Vec<_>>(), vec![1, 2, 4, 7, 12]);
    }
}
