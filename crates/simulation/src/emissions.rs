//! Aggregate emissions and the climate hand-off artifact.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use types::Year;

use crate::InputError;

/// World emissions per gas, ordered by year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionsSeries {
    by_gas: BTreeMap<String, BTreeMap<Year, f64>>,
}

impl EmissionsSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the total of a gas in a year.
    pub fn add(&mut self, gas: &str, year: Year, amount: f64) {
        *self
            .by_gas
            .entry(gas.to_string())
            .or_default()
            .entry(year)
            .or_insert(0.0) += amount;
    }

    pub fn total(&self, gas: &str, year: Year) -> Option<f64> {
        self.by_gas.get(gas)?.get(&year).copied()
    }

    pub fn gases(&self) -> impl Iterator<Item = &str> {
        self.by_gas.keys().map(String::as_str)
    }

    /// (year, total) pairs of one gas in year order.
    pub fn series(&self, gas: &str) -> Vec<(Year, f64)> {
        self.by_gas
            .get(gas)
            .map(|years| years.iter().map(|(y, v)| (*y, *v)).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gas.is_empty()
    }

    /// Write `year,gas,total` rows, ordered by year then gas.
    pub fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "year,gas,total")?;
        let mut rows: Vec<(Year, &str, f64)> = self
            .by_gas
            .iter()
            .flat_map(|(gas, years)| years.iter().map(move |(y, v)| (*y, gas.as_str(), *v)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(b.1)));
        for (year, gas, total) in rows {
            writeln!(out, "{year},{gas},{total}")?;
        }
        Ok(())
    }

    /// Write the artifact to `path`, flushed and closed on return.
    pub fn write_csv_file(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_csv(&mut out)?;
        out.flush()
    }

    /// Parse an artifact written by [`write_csv`](Self::write_csv).
    pub fn parse_csv(text: &str) -> Result<Self, InputError> {
        let mut series = Self::new();
        for (index, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |reason: String| InputError::EmissionsParse {
                line: index + 1,
                reason,
            };
            let fields: Vec<&str> = line.split(',').collect();
            let [year, gas, total] = fields.as_slice() else {
                return Err(invalid(format!("expected 3 fields, found {}", fields.len())));
            };
            let year: Year = year
                .trim()
                .parse()
                .map_err(|e| invalid(format!("year: {e}")))?;
            let total: f64 = total
                .trim()
                .parse()
                .map_err(|e| invalid(format!("total: {e}")))?;
            series.add(gas.trim(), year, total);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_rows_ordered_by_year() {
        let mut series = EmissionsSeries::new();
        series.add("CO2", 1990, 2.0);
        series.add("CH4", 1975, 0.5);
        series.add("CO2", 1975, 1.0);
        series.add("CO2", 1975, 1.5);

        let mut buf = Vec::new();
        series.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "year,gas,total\n1975,CH4,0.5\n1975,CO2,2.5\n1990,CO2,2\n");
        assert_eq!(EmissionsSeries::parse_csv(&text).unwrap(), series);
    }

    #[test]
    fn test_parse_rejects_short_rows() {
        let err = EmissionsSeries::parse_csv("year,gas,total\n1975,CO2\n").unwrap_err();
        assert!(matches!(err, InputError::EmissionsParse { line: 2, .. }));
    }

    #[test]
    fn test_parse_reports_bad_total() {
        let err = EmissionsSeries::parse_csv("year,gas,total\n1975,CO2,1\n1990,CO2,lots\n")
            .unwrap_err();
        match err {
            InputError::EmissionsParse { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.starts_with("total"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
