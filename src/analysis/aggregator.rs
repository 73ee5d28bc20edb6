//! Histogram aggregation and the geometric reference curve.
//!
//! This module groups raw records by parameter and window and turns
//! their counts into relative frequencies.

use crate::models::{AggregationTable, DuplicatePolicy, Record};
use thiserror::Error;
use tracing::debug;

/// Errors raised while normalizing histograms.
#[derive(Error, Debug, PartialEq)]
pub enum AggregateError {
    #[error("record {index} (w={w}, p={p}) has total = 0, cannot normalize")]
    ZeroTotal { index: usize, w: i64, p: f64 },
}

/// Divide every count by `total`.
///
/// The result is not required to sum to 1; upstream histograms may be
/// truncated.
pub fn normalize(hist: &[u64], total: u64) -> Vec<f64> {
    let total = total as f64;
    hist.iter().map(|&c| c as f64 / total).collect()
}

/// Raw counts collected for one `(p, w)` pair before normalization.
struct PendingSeries {
    p: f64,
    w: i64,
    counts: Vec<u64>,
    total: u64,
}

/// Build the aggregation table from records in input order.
///
/// `p` groups and `w` series keep first-seen order. Repeated `(p, w)`
/// pairs are resolved by `policy`.
pub fn aggregate(
    records: &[Record],
    policy: DuplicatePolicy,
) -> Result<AggregationTable, AggregateError> {
    let mut pending: Vec<PendingSeries> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.total == 0 {
            return Err(AggregateError::ZeroTotal {
                index,
                w: record.w,
                p: record.p,
            });
        }

        let existing = pending
            .iter_mut()
            .find(|s| s.p == record.p && s.w == record.w);

        match existing {
            None => pending.push(PendingSeries {
                p: record.p,
                w: record.w,
                counts: record.hist.clone(),
                total: record.total,
            }),
            Some(series) => {
                debug!(
                    "Duplicate series p={} w={} at record {} ({})",
                    record.p, record.w, index, policy
                );
                match policy {
                    DuplicatePolicy::Replace => {
                        series.counts = record.hist.clone();
                        series.total = record.total;
                    }
                    DuplicatePolicy::Merge => {
                        merge_counts(&mut series.counts, &record.hist);
                        series.total = series.total.saturating_add(record.total);
                    }
                }
            }
        }
    }

    let mut table = AggregationTable::default();
    for series in pending {
        table
            .group_mut(series.p)
            .insert(series.w, normalize(&series.counts, series.total));
    }

    Ok(table)
}

/// Element-wise sum, padding the shorter side with zeros.
fn merge_counts(into: &mut Vec<u64>, other: &[u64]) {
    if other.len() > into.len() {
        into.resize(other.len(), 0);
    }
    for (slot, &count) in into.iter_mut().zip(other) {
        *slot = slot.saturating_add(count);
    }
}

/// Geometric probability mass `q·(1−q)^(k−1)` for `k = 1 .. len−1`.
///
/// `len` is the length of the longest distribution drawn next to the
/// curve. `q` is not validated.
pub fn geometric_reference(q: f64, len: usize) -> Vec<(u32, f64)> {
    (1..len)
        .map(|k| {
            let k = k as u32;
            (k, q * (1.0 - q).powi(k as i32 - 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(w: i64, p: f64, total: u64, hist: &[u64]) -> Record {
        Record {
            w,
            p,
            total,
            hist: hist.to_vec(),
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_normalize() {
        let dist = normalize(&[3, 0, 7], 20);
        assert_close(&dist, &[0.15, 0.0, 0.35]);
    }

    #[test]
    fn test_single_record() {
        let records = vec![record(2, 0.5, 4, &[2, 1, 1])];
        let table = aggregate(&records, DuplicatePolicy::Replace).unwrap();

        let group = table.get(0.5).unwrap();
        assert_close(group.get(2).unwrap(), &[0.5, 0.25, 0.25]);

        let reference = geometric_reference(0.5, group.max_len());
        assert_eq!(reference, vec![(1, 0.5), (2, 0.25)]);
    }

    #[test]
    fn test_windows_share_parameter() {
        let records = vec![record(1, 0.3, 10, &[5, 5]), record(2, 0.3, 4, &[1, 2, 1])];
        let table = aggregate(&records, DuplicatePolicy::Replace).unwrap();

        assert_eq!(table.len(), 1);
        let group = table.get(0.3).unwrap();
        assert_eq!(group.len(), 2);
        assert_close(group.get(1).unwrap(), &[0.5, 0.5]);
        assert_close(group.get(2).unwrap(), &[0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_grouping_by_parameter() {
        let records = vec![
            record(1, 0.2, 2, &[1, 1]),
            record(2, 0.4, 2, &[2]),
            record(3, 0.2, 4, &[4]),
        ];
        let table = aggregate(&records, DuplicatePolicy::Replace).unwrap();

        assert_eq!(table.parameters(), vec![0.2, 0.4]);
        let low: Vec<i64> = table.get(0.2).unwrap().windows().map(|(w, _)| w).collect();
        let high: Vec<i64> = table.get(0.4).unwrap().windows().map(|(w, _)| w).collect();
        assert_eq!(low, vec![1, 3]);
        assert_eq!(high, vec![2]);
    }

    #[test]
    fn test_last_write_wins() {
        let records = vec![
            record(4, 0.5, 2, &[2]),
            record(8, 0.5, 1, &[1]),
            record(4, 0.5, 4, &[1, 3]),
        ];
        let table = aggregate(&records, DuplicatePolicy::Replace).unwrap();

        let group = table.get(0.5).unwrap();
        assert_close(group.get(4).unwrap(), &[0.25, 0.75]);
        let order: Vec<i64> = group.windows().map(|(w, _)| w).collect();
        assert_eq!(order, vec![4, 8]);
    }

    #[test]
    fn test_merge_sums_counts() {
        let records = vec![record(4, 0.5, 4, &[2, 2]), record(4, 0.5, 4, &[1, 1, 2])];
        let table = aggregate(&records, DuplicatePolicy::Merge).unwrap();

        assert_close(table.get(0.5).unwrap().get(4).unwrap(), &[0.375, 0.375, 0.25]);
    }

    #[test]
    fn test_zero_total() {
        let records = vec![record(1, 0.5, 2, &[2]), record(7, 0.25, 0, &[0])];
        let err = aggregate(&records, DuplicatePolicy::Replace).unwrap_err();
        assert_eq!(
            err,
            AggregateError::ZeroTotal {
                index: 1,
                w: 7,
                p: 0.25
            }
        );
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = vec![
            record(1, 0.2, 5, &[1, 2, 2]),
            record(2, 0.7, 3, &[3]),
            record(1, 0.2, 6, &[6]),
        ];
        let first = aggregate(&records, DuplicatePolicy::Replace).unwrap();
        let second = aggregate(&records, DuplicatePolicy::Replace).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let table = aggregate(&[], DuplicatePolicy::Merge).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_geometric_reference_bounds() {
        for &q in &[0.05, 0.3, 0.5, 0.9] {
            let reference = geometric_reference(q, 40);
            assert_eq!(reference.len(), 39);
            for window in reference.windows(2) {
                assert!(window[1].1 <= window[0].1);
            }
            for (_, y) in &reference {
                assert!(*y > 0.0 && *y <= q);
            }
        }
    }

    #[test]
    fn test_geometric_reference_short() {
        assert!(geometric_reference(0.5, 0).is_empty());
        assert!(geometric_reference(0.5, 1).is_empty());
    }
}
