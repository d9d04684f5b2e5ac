//! Derived metrics: percentage changes and spreads.
//!
//! Period-over-period changes use frequency-aware lag counts — 4 for
//! quarterly, 12 for monthly, 1 for daily — so a "year over year" rate
//! means the same thing regardless of cadence. The first `lag`
//! observations have no defined change and stay absent, never zero.

use crate::types::{CleanSeries, Frequency};

/// Decimal places for derived percentage values.
const ROUND_DP: i32 = 2;

fn round(value: f64) -> f64 {
    let factor = 10f64.powi(ROUND_DP);
    (value * factor).round() / factor
}

/// A cleaned series together with one derived column.
///
/// Computed once per fetch; both halves are immutable afterwards.
#[derive(Debug, Clone)]
pub struct DerivedSeries {
    pub base: CleanSeries,
    pub derived: CleanSeries,
}

/// Append a percentage-change column at the frequency's lag.
///
/// `derived[t] = (value[t] / value[t - lag] - 1) * 100`, rounded.
/// Observations whose lagged denominator is zero are left absent.
pub fn with_pct_change(base: CleanSeries, frequency: Frequency, column: &str) -> DerivedSeries {
    let lag = frequency.lag();
    let mut points = Vec::new();

    for (i, (date, value)) in base.points.iter().enumerate() {
        if i < lag {
            continue;
        }
        let (_, prior) = base.points[i - lag];
        if prior == 0.0 {
            continue;
        }
        points.push((*date, round((value / prior - 1.0) * 100.0)));
    }

    let derived = CleanSeries::new(base.entity.as_deref(), column, points);
    DerivedSeries { base, derived }
}

/// Difference `a − b` on every date where both sides have a value.
///
/// Dates present in only one input are dropped — a spread against an
/// absent leg is undefined, not zero.
pub fn spread(a: &CleanSeries, b: &CleanSeries, column: &str) -> CleanSeries {
    let mut points = Vec::new();
    let mut ai = a.points.iter().peekable();
    let mut bi = b.points.iter().peekable();

    while let (Some((ad, av)), Some((bd, bv))) = (ai.peek(), bi.peek()) {
        match ad.cmp(bd) {
            std::cmp::Ordering::Equal => {
                points.push((*ad, round(av - bv)));
                ai.next();
                bi.next();
            }
            std::cmp::Ordering::Less => {
                ai.next();
            }
            std::cmp::Ordering::Greater => {
                bi.next();
            }
        }
    }

    CleanSeries::new(None, column, points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(points: &[(&str, f64)]) -> CleanSeries {
        CleanSeries::new(
            None,
            "X",
            points.iter().map(|(date, v)| (d(date), *v)).collect(),
        )
    }

    #[test]
    fn test_daily_lag_one() {
        let base = series(&[
            ("2024-01-01", 100.0),
            ("2024-01-02", 102.0),
            ("2024-01-03", 96.9),
        ]);
        let out = with_pct_change(base, Frequency::Daily, "Diff (%)");
        assert_eq!(out.derived.len(), 2);
        assert_eq!(out.derived.points[0], (d("2024-01-02"), 2.0));
        assert_eq!(out.derived.points[1], (d("2024-01-03"), -5.0));
    }

    #[test]
    fn test_quarterly_lag_four() {
        // Five quarters: only the last has a year-ago comparison.
        let base = series(&[
            ("2023-01-01", 100.0),
            ("2023-04-01", 101.0),
            ("2023-07-01", 102.0),
            ("2023-10-01", 103.0),
            ("2024-01-01", 110.0),
        ]);
        let out = with_pct_change(base, Frequency::Quarterly, "GDP YoY (%)");
        assert_eq!(out.derived.len(), 1);
        assert_eq!(out.derived.points[0], (d("2024-01-01"), 10.0));
    }

    #[test]
    fn test_first_lag_entries_absent() {
        let points: Vec<(String, f64)> = (1..=14)
            .map(|m| {
                let (y, m) = if m > 12 { (2025, m - 12) } else { (2024, m) };
                (format!("{y}-{m:02}-01"), 100.0 + m as f64)
            })
            .collect();
        let refs: Vec<(&str, f64)> = points.iter().map(|(s, v)| (s.as_str(), *v)).collect();
        let base = series(&refs);
        let out = with_pct_change(base, Frequency::Monthly, "YoY");
        // 14 observations, lag 12 → exactly 2 derived values.
        assert_eq!(out.derived.len(), 2);
        assert_eq!(out.derived.first_date(), Some(d("2025-01-01")));
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let base = series(&[("2024-01-01", 3.0), ("2024-01-02", 4.0)]);
        let out = with_pct_change(base, Frequency::Daily, "Diff (%)");
        // 33.333...% rounds to 33.33.
        assert_eq!(out.derived.points[0].1, 33.33);
    }

    #[test]
    fn test_zero_denominator_left_absent() {
        let base = series(&[("2024-01-01", 0.0), ("2024-01-02", 5.0)]);
        let out = with_pct_change(base, Frequency::Daily, "Diff (%)");
        assert!(out.derived.is_empty());
    }

    #[test]
    fn test_base_preserved_unchanged() {
        let base = series(&[("2024-01-01", 100.0), ("2024-01-02", 102.0)]);
        let original = base.points.clone();
        let out = with_pct_change(base, Frequency::Daily, "Diff (%)");
        assert_eq!(out.base.points, original);
    }

    #[test]
    fn test_spread_on_common_dates() {
        let a = series(&[
            ("2024-01-01", 4.0),
            ("2024-01-02", 4.1),
            ("2024-01-04", 4.2),
        ]);
        let b = series(&[
            ("2024-01-02", 3.0),
            ("2024-01-03", 3.1),
            ("2024-01-04", 3.2),
        ]);
        let s = spread(&a, &b, "10YY Spread");
        assert_eq!(s.len(), 2);
        assert_eq!(s.points[0], (d("2024-01-02"), 1.1));
        assert_eq!(s.points[1], (d("2024-01-04"), 1.0));
    }

    #[test]
    fn test_spread_disjoint_dates_is_empty() {
        let a = series(&[("2024-01-01", 4.0)]);
        let b = series(&[("2024-01-02", 3.0)]);
        assert!(spread(&a, &b, "S").is_empty());
    }

    #[test]
    fn test_spread_can_be_negative() {
        let a = series(&[("2024-01-01", 2.0)]);
        let b = series(&[("2024-01-01", 3.5)]);
        let s = spread(&a, &b, "S");
        assert_eq!(s.points[0].1, -1.5);
    }
}
