//! Frequency alignment and sentinel imputation.
//!
//! Turns a `RawSeries` into a `CleanSeries`: chronological order, no
//! duplicate timestamps (last occurrence wins), sentinel values replaced
//! by the most recent valid prior value. Strictly forward-fill — a future
//! value never fills a past gap, and a leading sentinel run stays absent
//! because there is nothing valid to carry forward yet.

use std::collections::BTreeMap;

use crate::types::{CleanSeries, RawSeries};

/// Clean a raw series and tag it with its entity and output column.
pub fn clean(raw: &RawSeries, entity: Option<&str>, column: &str) -> CleanSeries {
    // BTreeMap gives chronological order; inserting in source order means
    // the last occurrence of a duplicated timestamp wins.
    let mut by_date = BTreeMap::new();
    for point in &raw.points {
        by_date.insert(point.date, point.value);
    }

    let mut points = Vec::with_capacity(by_date.len());
    let mut last_valid: Option<f64> = None;

    for (date, value) in by_date {
        let is_sentinel = raw.sentinel.map(|s| value == s).unwrap_or(false);
        if is_sentinel {
            match last_valid {
                Some(prior) => points.push((date, prior)),
                None => continue, // leading gap, nothing to carry forward
            }
        } else {
            last_valid = Some(value);
            points.push((date, value));
        }
    }

    CleanSeries::new(entity, column, points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawPoint, RawSeries};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn raw(points: &[(&str, f64)], sentinel: Option<f64>) -> RawSeries {
        RawSeries::new(
            "test",
            "TEST",
            points
                .iter()
                .map(|(date, value)| RawPoint {
                    date: d(date),
                    value: *value,
                })
                .collect(),
            sentinel,
        )
    }

    #[test]
    fn test_forward_fill_scenario() {
        // Spec'd scenario: [10, -1, 12] with sentinel -1 → [10, 10, 12].
        let series = raw(
            &[
                ("2024-01-01", 10.0),
                ("2024-01-02", -1.0),
                ("2024-01-03", 12.0),
            ],
            Some(-1.0),
        );
        let cleaned = clean(&series, None, "EURTWD");
        let values: Vec<f64> = cleaned.points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10.0, 10.0, 12.0]);
    }

    #[test]
    fn test_leading_sentinels_stay_absent() {
        let series = raw(
            &[
                ("2024-01-01", -1.0),
                ("2024-01-02", -1.0),
                ("2024-01-03", 12.0),
                ("2024-01-04", -1.0),
            ],
            Some(-1.0),
        );
        let cleaned = clean(&series, None, "EURTWD");
        assert_eq!(cleaned.first_date(), Some(d("2024-01-03")));
        let values: Vec<f64> = cleaned.points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![12.0, 12.0]);
    }

    #[test]
    fn test_no_future_value_fills_past_gap() {
        // All-sentinel prefix must not borrow from the first valid value.
        let series = raw(&[("2024-01-01", -1.0), ("2024-01-02", 5.0)], Some(-1.0));
        let cleaned = clean(&series, None, "X");
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.points[0], (d("2024-01-02"), 5.0));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let series = raw(
            &[
                ("2024-01-03", 3.0),
                ("2024-01-01", 1.0),
                ("2024-01-02", 2.0),
            ],
            None,
        );
        let cleaned = clean(&series, None, "X");
        let dates: Vec<NaiveDate> = cleaned.points.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]);
    }

    #[test]
    fn test_duplicate_timestamp_last_wins() {
        let series = raw(
            &[
                ("2024-01-01", 1.0),
                ("2024-01-02", 2.0),
                ("2024-01-01", 9.0),
            ],
            None,
        );
        let cleaned = clean(&series, None, "X");
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.points[0], (d("2024-01-01"), 9.0));
    }

    #[test]
    fn test_no_sentinel_definition_passes_values_through() {
        // -1 is a legitimate value when the provider has no sentinel.
        let series = raw(&[("2024-01-01", -1.0), ("2024-01-02", -2.5)], None);
        let cleaned = clean(&series, None, "Spread");
        let values: Vec<f64> = cleaned.points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![-1.0, -2.5]);
    }

    #[test]
    fn test_no_sentinel_after_first_valid() {
        // Forward-fill completeness property.
        let series = raw(
            &[
                ("2024-01-01", -1.0),
                ("2024-01-02", 7.0),
                ("2024-01-03", -1.0),
                ("2024-01-04", -1.0),
                ("2024-01-05", 8.0),
            ],
            Some(-1.0),
        );
        let cleaned = clean(&series, None, "X");
        assert!(cleaned.points.iter().all(|(_, v)| *v != -1.0));
        let values: Vec<f64> = cleaned.points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![7.0, 7.0, 7.0, 8.0]);
    }

    #[test]
    fn test_entity_and_column_tags() {
        let series = raw(&[("2024-01-01", 1.0)], None);
        let cleaned = clean(&series, Some("Germany"), "GDP");
        assert_eq!(cleaned.entity.as_deref(), Some("Germany"));
        assert_eq!(cleaned.column, "GDP");
    }

    #[test]
    fn test_empty_input() {
        let series = raw(&[], Some(-1.0));
        let cleaned = clean(&series, None, "X");
        assert!(cleaned.is_empty());
    }
}
