use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One historical row: observed climate metrics for a (year, state,
/// commodity) key. Temperatures in °F, precipitation in inches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClimateRecord {
    pub year: i32,
    pub state: String,
    pub commodity: String,
    pub avg_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub precipitation: f64,
}

/// The historical dataset, loaded once at startup and read-only afterwards.
/// Serves both the form's choice sets and the actual-value lookup.
#[derive(Debug)]
pub struct ClimateHistory {
    records: Vec<ClimateRecord>,
}

impl ClimateHistory {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open dataset at {}", path.display()))?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: ClimateRecord =
                row.with_context(|| format!("malformed dataset row in {}", path.display()))?;
            records.push(record);
        }
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<ClimateRecord>) -> Result<Self> {
        if records.is_empty() {
            bail!("historical dataset is empty");
        }
        let history = Self { records };
        // The (year, state, commodity) key is expected unique; lookups take
        // the first match, so surface any violation loudly at load.
        let dupes = history.duplicate_key_count();
        if dupes > 0 {
            tracing::warn!(
                "historical dataset has {} duplicated (year, state, commodity) keys",
                dupes
            );
        }
        Ok(history)
    }

    fn duplicate_key_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| !seen.insert((r.year, r.state.as_str(), r.commodity.as_str())))
            .count()
    }

    /// First row matching all three keys exactly. No nearest-year or fuzzy
    /// matching; `None` means "no data", which is distinct from zeros.
    pub fn lookup(&self, year: i32, state: &str, commodity: &str) -> Option<&ClimateRecord> {
        self.records
            .iter()
            .find(|r| r.year == year && r.state == state && r.commodity == commodity)
    }

    pub fn states(&self) -> Vec<String> {
        self.distinct(|r| &r.state)
    }

    pub fn commodities(&self) -> Vec<String> {
        self.distinct(|r| &r.commodity)
    }

    fn distinct<F>(&self, pick: F) -> Vec<String>
    where
        F: Fn(&ClimateRecord) -> &String,
    {
        let mut values: Vec<String> = self
            .records
            .iter()
            .map(pick)
            .filter(|v| !v.is_empty())
            .cloned()
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, state: &str, commodity: &str, avg: f64) -> ClimateRecord {
        ClimateRecord {
            year,
            state: state.to_string(),
            commodity: commodity.to_string(),
            avg_temp: avg,
            min_temp: avg - 10.0,
            max_temp: avg + 10.0,
            precipitation: 34.2,
        }
    }

    fn history() -> ClimateHistory {
        ClimateHistory::from_records(vec![
            record(2019, "Iowa", "Corn", 49.1),
            record(2020, "Iowa", "Corn", 50.3),
            record(2020, "Iowa", "Soybeans", 50.3),
            record(2020, "Kansas", "Wheat", 56.8),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_matches_all_three_keys_exactly() {
        let h = history();
        let hit = h.lookup(2020, "Iowa", "Corn").unwrap();
        assert_eq!(hit.avg_temp, 50.3);

        assert!(h.lookup(2021, "Iowa", "Corn").is_none());
        assert!(h.lookup(2020, "Ohio", "Corn").is_none());
        assert!(h.lookup(2020, "Iowa", "Wheat").is_none());
    }

    #[test]
    fn lookup_takes_first_of_duplicate_keys() {
        let h = ClimateHistory::from_records(vec![
            record(2020, "Iowa", "Corn", 50.3),
            record(2020, "Iowa", "Corn", 99.9),
        ])
        .unwrap();
        assert_eq!(h.duplicate_key_count(), 1);
        assert_eq!(h.lookup(2020, "Iowa", "Corn").unwrap().avg_temp, 50.3);
    }

    #[test]
    fn choice_sets_are_distinct_and_sorted() {
        let h = history();
        assert_eq!(h.states(), vec!["Iowa", "Kansas"]);
        assert_eq!(h.commodities(), vec!["Corn", "Soybeans", "Wheat"]);
    }

    #[test]
    fn choice_sets_skip_empty_values() {
        let h = ClimateHistory::from_records(vec![
            record(2020, "Iowa", "Corn", 50.3),
            record(2020, "", "Corn", 50.3),
            record(2020, "Iowa", "", 50.3),
        ])
        .unwrap();
        assert_eq!(h.states(), vec!["Iowa"]);
        assert_eq!(h.commodities(), vec!["Corn"]);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(ClimateHistory::from_records(vec![]).is_err());
    }
}
