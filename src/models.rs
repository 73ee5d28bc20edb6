//! Data models for the phrase size plotter.
//!
//! This module contains the input records, the aggregated table of
//! normalized distributions, and the small enums shared by the CLI
//! and the configuration file.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One histogram measurement, as emitted by the upstream PFP tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    /// Window size used by the parse.
    #[serde(deserialize_with = "integral_i64")]
    pub w: i64,
    /// Geometric reference parameter.
    pub p: f64,
    /// Number of samples the histogram was taken over.
    #[serde(deserialize_with = "integral_u64")]
    pub total: u64,
    /// Raw counts; `hist[i]` counts phrases of length `i + 1`.
    pub hist: Vec<u64>,
}

/// JSON numbers that must be integral but may be written as `4.0`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Integral {
    Int(i64),
    Float(f64),
}

impl Integral {
    fn into_i64(self) -> Result<i64, String> {
        match self {
            Integral::Int(v) => Ok(v),
            Integral::Float(v) if !v.is_finite() || v.fract() != 0.0 => {
                Err(format!("expected an integer, found {}", v))
            }
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
            Integral::Float(v) if v < i64::MIN as f64 || v >= i64::MAX as f64 => {
                Err(format!("integer {} is out of range", v))
            }
            Integral::Float(v) => Ok(v as i64),
        }
    }
}

fn integral_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Integral::deserialize(deserializer)?
        .into_i64()
        .map_err(serde::de::Error::custom)
}

fn integral_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = integral_i64(deserializer)?;
    u64::try_from(value).map_err(|_| {
        serde::de::Error::custom(format!("expected a non-negative integer, found {}", value))
    })
}

/// How repeated `(p, w)` pairs in the input are combined.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one.
    #[default]
    Replace,
    /// Counts and totals are summed before normalizing.
    Merge,
}

/// How the `p` field of a record maps onto the geometric distribution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Parameterization {
    /// `p` is the success probability.
    #[default]
    Probability,
    /// `p` is the mean phrase length, so the success probability is `1 / p`.
    Mean,
}

impl Parameterization {
    /// Success probability of the geometric reference for parameter `p`.
    pub fn success_probability(&self, p: f64) -> f64 {
        match self {
            Parameterization::Probability => p,
            Parameterization::Mean => 1.0 / p,
        }
    }
}

/// Which chart panels carry a legend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LegendPlacement {
    /// Only the first panel.
    #[default]
    First,
    /// Every panel.
    All,
    /// No legend at all.
    None,
}

impl LegendPlacement {
    /// Whether the panel at `index` should draw a legend.
    pub fn shows_on(&self, index: usize) -> bool {
        match self {
            LegendPlacement::First => index == 0,
            LegendPlacement::All => true,
            LegendPlacement::None => false,
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Replace => write!(f, "replace"),
            DuplicatePolicy::Merge => write!(f, "merge"),
        }
    }
}

/// Normalized distributions for every window sharing one `p`.
///
/// Windows keep the order in which they were first seen.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroup {
    p: f64,
    windows: Vec<(i64, Vec<f64>)>,
}

impl WindowGroup {
    pub(crate) fn new(p: f64) -> Self {
        Self {
            p,
            windows: Vec::new(),
        }
    }

    /// The parameter shared by this group.
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Distribution recorded for window `w`.
    #[allow(dead_code)] // Lookup utility, panels iterate instead
    pub fn get(&self, w: i64) -> Option<&[f64]> {
        self.windows
            .iter()
            .find(|(key, _)| *key == w)
            .map(|(_, dist)| dist.as_slice())
    }

    /// Iterate `(w, distribution)` pairs in insertion order.
    pub fn windows(&self) -> impl Iterator<Item = (i64, &[f64])> {
        self.windows.iter().map(|(w, dist)| (*w, dist.as_slice()))
    }

    /// Number of windows in the group.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Length of the longest distribution in the group.
    pub fn max_len(&self) -> usize {
        self.windows.iter().map(|(_, d)| d.len()).max().unwrap_or(0)
    }

    /// Insert or overwrite the distribution for `w`, keeping its first position.
    pub(crate) fn insert(&mut self, w: i64, dist: Vec<f64>) {
        match self.windows.iter_mut().find(|(key, _)| *key == w) {
            Some(slot) => slot.1 = dist,
            None => self.windows.push((w, dist)),
        }
    }
}

/// Mapping `p → (w → normalized distribution)`, ordered by first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationTable {
    groups: Vec<WindowGroup>,
}

impl AggregationTable {
    /// Group for parameter `p`.
    #[allow(dead_code)] // Lookup utility, panels iterate instead
    pub fn get(&self, p: f64) -> Option<&WindowGroup> {
        self.groups.iter().find(|g| g.p == p)
    }

    /// All groups in panel order.
    pub fn groups(&self) -> &[WindowGroup] {
        &self.groups
    }

    /// Parameters in panel order.
    #[allow(dead_code)] // Used by tests and summaries
    pub fn parameters(&self) -> Vec<f64> {
        self.groups.iter().map(|g| g.p).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group for `p`, created at the end if missing.
    pub(crate) fn group_mut(&mut self, p: f64) -> &mut WindowGroup {
        let index = match self.groups.iter().position(|g| g.p == p) {
            Some(index) => index,
            None => {
                self.groups.push(WindowGroup::new(p));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }
}

/// Summary of an aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    /// Records read from the input.
    pub records: usize,
    /// Distinct parameters (panels).
    pub parameters: usize,
    /// Distinct `(p, w)` series.
    pub series: usize,
    /// Records that collided with an earlier `(p, w)` pair.
    pub duplicates: usize,
    /// Longest distribution across the table.
    pub longest: usize,
}

impl TableSummary {
    /// Creates a summary from the input and the table built from it.
    pub fn from_table(records: &[Record], table: &AggregationTable) -> Self {
        let series: usize = table.groups().iter().map(|g| g.len()).sum();

        Self {
            records: records.len(),
            parameters: table.len(),
            series,
            duplicates: records.len().saturating_sub(series),
            longest: table.groups().iter().map(|g| g.max_len()).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parses_integral_floats() {
        let record: Record =
            serde_json::from_str(r#"{"w": 4.0, "p": 0.25, "total": 10.0, "hist": [1, 2]}"#)
                .unwrap();
        assert_eq!(record.w, 4);
        assert_eq!(record.total, 10);
        assert_eq!(record.hist, vec![1, 2]);
    }

    #[test]
    fn test_record_rejects_fractional_total() {
        let result: Result<Record, _> =
            serde_json::from_str(r#"{"w": 4, "p": 0.25, "total": 2.5, "hist": [1]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_rejects_negative_total() {
        let result: Result<Record, _> =
            serde_json::from_str(r#"{"w": 4, "p": 0.25, "total": -3, "hist": [1]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_rejects_out_of_range_integers() {
        // Above u64::MAX, serde_json only has an f64 for it
        let result: Result<Record, _> = serde_json::from_str(
            r#"{"w": 4, "p": 0.25, "total": 100000000000000000000, "hist": [1]}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("out of range"), "{}", err);

        // Fits u64 but not i64
        let result: Result<Record, _> = serde_json::from_str(
            r#"{"w": 4, "p": 0.25, "total": 18446744073709551615, "hist": [1]}"#,
        );
        assert!(result.is_err());

        let result: Result<Record, _> =
            serde_json::from_str(r#"{"w": 1e19, "p": 0.25, "total": 3, "hist": [1]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_missing_field() {
        let result: Result<Record, _> = serde_json::from_str(r#"{"w": 4, "p": 0.25, "hist": [1]}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("total"));
    }

    #[test]
    fn test_success_probability() {
        assert_eq!(Parameterization::Probability.success_probability(0.25), 0.25);
        assert_eq!(Parameterization::Mean.success_probability(4.0), 0.25);
    }

    #[test]
    fn test_legend_placement() {
        assert!(LegendPlacement::First.shows_on(0));
        assert!(!LegendPlacement::First.shows_on(1));
        assert!(LegendPlacement::All.shows_on(3));
        assert!(!LegendPlacement::None.shows_on(0));
    }

    #[test]
    fn test_table_summary() {
        let records: Vec<Record> = [(1, 0.5), (2, 0.5), (1, 0.5), (1, 0.2)]
            .iter()
            .map(|&(w, p)| Record {
                w,
                p,
                total: 2,
                hist: vec![1; w as usize + 1],
            })
            .collect();

        let mut table = AggregationTable::default();
        for record in &records {
            table
                .group_mut(record.p)
                .insert(record.w, vec![0.5; record.hist.len()]);
        }

        let summary = TableSummary::from_table(&records, &table);
        assert_eq!(summary.records, 4);
        assert_eq!(summary.parameters, 2);
        assert_eq!(summary.series, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.longest, 3);
    }

    #[test]
    fn test_window_group_keeps_first_position() {
        let mut group = WindowGroup::new(0.5);
        group.insert(8, vec![1.0]);
        group.insert(4, vec![0.5]);
        group.insert(8, vec![0.25, 0.25]);

        let order: Vec<i64> = group.windows().map(|(w, _)| w).collect();
        assert_eq!(order, vec![8, 4]);
        assert_eq!(group.get(8), Some(&[0.25, 0.25][..]));
        assert_eq!(group.max_len(), 2);
    }
}
