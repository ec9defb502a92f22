//! Tabular parser: delimited text → all-string frame → typed rows.

use std::collections::BTreeMap;
use std::io::Cursor;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::period::YearMonth;

/// The raw delimited text of one host dataset, kept as loaded for export.
#[derive(Debug, Clone)]
pub struct RawTable {
    frame: DataFrame,
}

impl RawTable {
    /// Read delimited text with a header row. Every column is read as a
    /// string; typing happens per widget in [`Dataset::from_table`]. Extra
    /// fields past the header width are cut off, short lines padded with nulls.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self {
                frame: DataFrame::empty(),
            });
        }

        let mut frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
            .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
            .finish()?;

        let trimmed: Vec<String> = frame
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        frame.set_column_names(trimmed.as_slice())?;

        debug!(rows = frame.height(), columns = frame.width(), "parsed dataset");
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names_str()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Re-serialize the raw rows (header included) as CSV.
    pub fn to_csv(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        let mut frame = self.frame.clone();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut frame)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// One observation: a month stamp, a value and the mapped categorical fields
/// that were present (non-empty) on the source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub stamp: YearMonth,
    pub value: f64,
    fields: BTreeMap<String, String>,
}

impl Row {
    pub fn new(stamp: YearMonth, value: f64) -> Self {
        Self {
            stamp,
            value,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.fields.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Leading run of present fields along `path`; stops at the first gap.
    pub fn prefix<'a>(&'a self, path: &[String]) -> Vec<&'a str> {
        path.iter().map_while(|name| self.field(name)).collect()
    }
}

/// Typed rows of one widget, in source order. Never mutated after parse.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    dropped: usize,
    missing_columns: Vec<String>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            dropped: 0,
            missing_columns: Vec::new(),
        }
    }

    /// Type the raw table against a widget mapping.
    ///
    /// Rows whose date is not `YYYY-MM` or whose value is not numeric are
    /// dropped. A mapped dimension missing from the header is treated as
    /// absent on every row.
    pub fn from_table(
        table: &RawTable,
        date_col: &str,
        value_col: &str,
        dimensions: &[String],
    ) -> Result<Self> {
        let mut missing_columns = Vec::new();
        for name in std::iter::once(date_col)
            .chain(std::iter::once(value_col))
            .chain(dimensions.iter().map(String::as_str))
        {
            if !table.has_column(name) && !missing_columns.iter().any(|m| m == name) {
                warn!(column = name, "mapped column absent from dataset header");
                missing_columns.push(name.to_string());
            }
        }

        if !table.has_column(date_col) || !table.has_column(value_col) {
            return Ok(Self {
                rows: Vec::new(),
                dropped: table.height(),
                missing_columns,
            });
        }

        let present: Vec<&str> = dimensions
            .iter()
            .map(String::as_str)
            .filter(|d| table.has_column(d))
            .collect();

        let mut stripped: Vec<&str> = Vec::new();
        for name in [date_col, value_col].into_iter().chain(present.iter().copied()) {
            if !stripped.contains(&name) {
                stripped.push(name);
            }
        }
        let strip: Vec<Expr> = stripped
            .iter()
            .map(|name| col(*name).str().strip_chars(lit(" \t\r\n")))
            .collect();
        let frame = table.frame().clone().lazy().with_columns(strip).collect()?;

        let dates = frame.column(date_col)?.str()?;
        let values = frame.column(value_col)?.str()?;
        let dims = present
            .iter()
            .map(|name| Ok((*name, frame.column(name)?.str()?)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(frame.height());
        let mut dropped = 0;
        for i in 0..frame.height() {
            let stamp = dates.get(i).and_then(YearMonth::parse);
            let value = values.get(i).and_then(|v| v.parse::<f64>().ok());
            let (Some(stamp), Some(value)) = (stamp, value) else {
                dropped += 1;
                continue;
            };
            if !value.is_finite() {
                dropped += 1;
                continue;
            }

            let mut row = Row::new(stamp, value);
            for (name, column) in &dims {
                if let Some(v) = column.get(i) {
                    row = row.with_field(name, v);
                }
            }
            rows.push(row);
        }

        if dropped > 0 {
            warn!(dropped, kept = rows.len(), "dropped unparseable rows");
        }

        Ok(Self {
            rows,
            dropped,
            missing_columns,
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lines that could not be typed and were left out.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn missing_columns(&self) -> &[String] {
        &self.missing_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "mois_annee,scheme,tsp,amount,tech
2024-01,Visa,Worldline,1000,Credit
2024-01, CB ,Worldline,2000,Debit
2024-02,Mastercard,,500,Credit
bad-date,Visa,Worldline,100,Credit
2024-03,Visa,Worldline,n/a,Credit
";

    fn path(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn reads_every_column_as_text() {
        let table = RawTable::parse(CSV).unwrap();
        assert_eq!(table.columns(), vec!["mois_annee", "scheme", "tsp", "amount", "tech"]);
        assert_eq!(table.height(), 5);
    }

    #[test]
    fn drops_rows_with_bad_dates_or_values() {
        let table = RawTable::parse(CSV).unwrap();
        let ds = Dataset::from_table(&table, "mois_annee", "amount", &path(&["scheme", "tsp"]))
            .unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.dropped(), 2);
        assert_eq!(ds.rows()[1].field("scheme"), Some("CB"));
        assert_eq!(ds.rows()[1].value, 2000.0);
    }

    #[test]
    fn empty_fields_end_the_prefix() {
        let table = RawTable::parse(CSV).unwrap();
        let levels = path(&["scheme", "tsp", "tech"]);
        let ds = Dataset::from_table(&table, "mois_annee", "amount", &levels).unwrap();
        let mastercard = &ds.rows()[2];
        assert_eq!(mastercard.prefix(&levels), vec!["Mastercard"]);
        assert_eq!(ds.rows()[0].prefix(&levels), vec!["Visa", "Worldline", "Credit"]);
    }

    #[test]
    fn missing_dimension_degrades_instead_of_failing() {
        let table = RawTable::parse(CSV).unwrap();
        let levels = path(&["scheme", "acquirer", "tech"]);
        let ds = Dataset::from_table(&table, "mois_annee", "amount", &levels).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.missing_columns(), ["acquirer".to_string()]);
        assert_eq!(ds.rows()[0].prefix(&levels), vec!["Visa"]);
    }

    #[test]
    fn missing_value_column_yields_no_rows() {
        let table = RawTable::parse(CSV).unwrap();
        let ds = Dataset::from_table(&table, "mois_annee", "montant", &[]).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn ragged_lines_do_not_sink_the_table() {
        let text = "d,k,v\n2024-01,Visa,10\n2024-01,CB,20,EXTRA\n2024-02,Visa\n2024-02,Visa,5\n";
        let table = RawTable::parse(text).unwrap();
        assert_eq!(table.height(), 4);
        let ds = Dataset::from_table(&table, "d", "v", &path(&["k"])).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.dropped(), 1);
        assert_eq!(ds.rows()[1].field("k"), Some("CB"));
        assert_eq!(ds.rows()[1].value, 20.0);
    }

    #[test]
    fn round_trips_raw_rows_for_export() {
        let table = RawTable::parse("d,v\n2024-01,10\n2024-02,20\n").unwrap();
        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("d,v\n"));
        assert!(csv.contains("2024-02,20"));
    }

    #[test]
    fn blank_text_is_an_empty_table() {
        let table = RawTable::parse("  \n").unwrap();
        assert_eq!(table.height(), 0);
        let ds = Dataset::from_table(&table, "d", "v", &[]).unwrap();
        assert!(ds.is_empty());
    }
}
