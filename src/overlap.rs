//! Holdings overlap between two funds.
//!
//! Positions are matched by ticker. The overlap of a shared position is the
//! smaller of its two weights, and the total overlap is the sum over all
//! shared positions.

use crate::error::ComparisonError;
use crate::history::HistorySnapshot;
use crate::holding::Holding;
use serde::Serialize;
use std::collections::HashMap;

/// Number of shared holdings shown side by side by default.
pub const DEFAULT_MAX_SHARED: usize = 15;

/// A ticker held by both funds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapEntry {
    pub ticker: String,
    pub name: String,
    pub weight_etf1: f64,
    pub weight_etf2: f64,
    pub overlap_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub overlap: Vec<OverlapEntry>,
    pub total_overlap: f64,
    pub unique_etf1: Vec<Holding>,
    pub unique_etf2: Vec<Holding>,
}

impl ComparisonResult {
    pub fn overlap_count(&self) -> usize {
        self.overlap.len()
    }

    /// Shared holdings ranked by their combined weight in both funds.
    pub fn top_shared(&self, max_items: usize) -> Vec<&OverlapEntry> {
        let mut shared: Vec<&OverlapEntry> = self.overlap.iter().collect();
        shared.sort_by(|a, b| {
            (b.weight_etf1 + b.weight_etf2)
                .partial_cmp(&(a.weight_etf1 + a.weight_etf2))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        shared.truncate(max_items);
        shared
    }
}

struct Position<'a> {
    name: &'a str,
    weight: f64,
}

// ticker -> position, plus the tickers in first-seen order
fn positions_by_ticker(holdings: &[Holding]) -> (HashMap<&str, Position<'_>>, Vec<&str>) {
    let mut positions: HashMap<&str, Position<'_>> = HashMap::new();
    let mut order = Vec::new();

    for holding in holdings {
        let ticker = holding.get_ticker();
        if let Some(position) = positions.get_mut(ticker) {
            position.weight += holding.get_weight();
        } else {
            order.push(ticker);
            positions.insert(
                ticker,
                Position {
                    name: holding.get_name(),
                    weight: holding.get_weight(),
                },
            );
        }
    }
    (positions, order)
}

/// Compares two holdings lists.
///
/// Duplicate tickers within one side are summed before matching. Passing the
/// very same non-empty list for both sides is rejected with
/// [`ComparisonError::SameSnapshot`].
pub fn compare(
    holdings_a: &[Holding],
    holdings_b: &[Holding],
) -> Result<ComparisonResult, ComparisonError> {
    if !holdings_a.is_empty() && std::ptr::eq(holdings_a, holdings_b) {
        return Err(ComparisonError::SameSnapshot);
    }

    let (positions_a, order_a) = positions_by_ticker(holdings_a);
    let (positions_b, _) = positions_by_ticker(holdings_b);

    let overlap: Vec<OverlapEntry> = order_a
        .iter()
        .filter_map(|ticker| {
            let a = &positions_a[ticker];
            positions_b.get(ticker).map(|b| OverlapEntry {
                ticker: ticker.to_string(),
                name: a.name.to_string(),
                weight_etf1: a.weight,
                weight_etf2: b.weight,
                overlap_weight: a.weight.min(b.weight),
            })
        })
        .collect();

    let total_overlap = overlap.iter().map(|entry| entry.overlap_weight).sum();

    let unique_etf1 = holdings_a
        .iter()
        .filter(|h| !positions_b.contains_key(h.get_ticker()))
        .cloned()
        .collect();
    let unique_etf2 = holdings_b
        .iter()
        .filter(|h| !positions_a.contains_key(h.get_ticker()))
        .cloned()
        .collect();

    Ok(ComparisonResult {
        overlap,
        total_overlap,
        unique_etf1,
        unique_etf2,
    })
}

/// Compares two snapshots, rejecting a snapshot compared with itself.
pub fn compare_snapshots(
    first: &HistorySnapshot,
    second: &HistorySnapshot,
) -> Result<ComparisonResult, ComparisonError> {
    let same_id = !first.get_id().is_empty() && first.get_id() == second.get_id();
    if std::ptr::eq(first, second) || same_id {
        return Err(ComparisonError::SameSnapshot);
    }
    compare(first.holdings(), second.holdings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn tickers(holdings: &[Holding]) -> Vec<&str> {
        holdings.iter().map(Holding::get_ticker).collect()
    }

    #[test]
    fn test_compare_two_funds() {
        let a = vec![Holding::new("AAPL", "Apple", 10.0), Holding::new("MSFT", "Microsoft", 8.0)];
        let b = vec![Holding::new("AAPL", "Apple", 6.0), Holding::new("GOOG", "Alphabet", 5.0)];

        let result = compare(&a, &b).unwrap();
        assert_eq!(
            result.overlap,
            vec![OverlapEntry {
                ticker: "AAPL".to_string(),
                name: "Apple".to_string(),
                weight_etf1: 10.0,
                weight_etf2: 6.0,
                overlap_weight: 6.0,
            }]
        );
        assert_relative_eq!(result.total_overlap, 6.0);
        assert_eq!(tickers(&result.unique_etf1), vec!["MSFT"]);
        assert_eq!(tickers(&result.unique_etf2), vec!["GOOG"]);
    }

    #[test]
    fn test_duplicate_tickers_are_summed() {
        let a = vec![Holding::new("AAPL", "Apple", 3.0), Holding::new("AAPL", "Apple", 4.0)];
        let b = vec![Holding::new("AAPL", "Apple", 5.0)];
        let result = compare(&a, &b).unwrap();
        assert_eq!(result.overlap_count(), 1);
        assert_relative_eq!(result.overlap[0].weight_etf1, 7.0);
        assert_relative_eq!(result.overlap[0].overlap_weight, 5.0);
    }

    #[test]
    fn test_ticker_match_is_case_sensitive() {
        let a = vec![Holding::new("aapl", "Apple", 3.0)];
        let b = vec![Holding::new("AAPL", "Apple", 5.0)];
        let result = compare(&a, &b).unwrap();
        assert!(result.overlap.is_empty());
        assert_eq!(result.unique_etf1.len(), 1);
        assert_eq!(result.unique_etf2.len(), 1);
    }

    #[test]
    fn test_empty_side() {
        let a = vec![Holding::new("AAPL", "Apple", 3.0)];
        let result = compare(&a, &[]).unwrap();
        assert_eq!(result.total_overlap, 0.0);
        assert_eq!(tickers(&result.unique_etf1), vec!["AAPL"]);
        assert!(result.unique_etf2.is_empty());

        let result = compare(&[], &[]).unwrap();
        assert_eq!(result, ComparisonResult::default());
    }

    #[test]
    fn test_same_list_is_rejected() {
        let a = vec![Holding::new("AAPL", "Apple", 3.0)];
        assert_eq!(compare(&a, &a), Err(ComparisonError::SameSnapshot));

        // equal content in a different list is a legitimate comparison
        let copy = a.clone();
        assert!(compare(&a, &copy).is_ok());
    }

    #[test]
    fn test_same_snapshot_is_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let first = HistorySnapshot::new("h1", "e1", date, vec![Holding::new("A", "A", 1.0)]);
        let same_id = HistorySnapshot::new("h1", "e1", date, vec![Holding::new("A", "A", 1.0)]);
        let other = HistorySnapshot::new("h2", "e2", date, vec![Holding::new("A", "A", 2.0)]);

        assert_eq!(compare_snapshots(&first, &first), Err(ComparisonError::SameSnapshot));
        assert_eq!(compare_snapshots(&first, &same_id), Err(ComparisonError::SameSnapshot));
        let result = compare_snapshots(&first, &other).unwrap();
        assert_relative_eq!(result.total_overlap, 1.0);
    }

    #[test]
    fn test_top_shared_ranks_by_combined_weight() {
        let a = vec![
            Holding::new("A", "A", 1.0),
            Holding::new("B", "B", 5.0),
            Holding::new("C", "C", 3.0),
        ];
        let b = vec![
            Holding::new("A", "A", 1.0),
            Holding::new("B", "B", 1.0),
            Holding::new("C", "C", 4.0),
        ];
        let result = compare(&a, &b).unwrap();
        let top: Vec<&str> = result.top_shared(2).iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(top, vec!["C", "B"]);
    }

    fn arb_side(prefix: &'static str) -> impl Strategy<Value = Vec<Holding>> {
        prop::collection::vec((0usize..12, 0.0f64..10.0), 0..20).prop_map(move |rows| {
            rows.into_iter()
                .map(|(id, weight)| {
                    // shared tickers come from a common pool, the prefix makes some unique
                    let ticker = if id < 6 { format!("T{id}") } else { format!("{prefix}{id}") };
                    Holding::new(&ticker, &ticker, weight)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_total_overlap_is_symmetric(a in arb_side("A"), b in arb_side("B")) {
            let ab = compare(&a, &b).unwrap();
            let ba = compare(&b, &a).unwrap();
            prop_assert!((ab.total_overlap - ba.total_overlap).abs() < 1e-9);
            prop_assert_eq!(&ab.unique_etf1, &ba.unique_etf2);
            prop_assert_eq!(&ab.unique_etf2, &ba.unique_etf1);
        }

        #[test]
        fn prop_overlap_weight_is_the_minimum(a in arb_side("A"), b in arb_side("B")) {
            let result = compare(&a, &b).unwrap();
            for entry in &result.overlap {
                prop_assert_eq!(entry.overlap_weight, entry.weight_etf1.min(entry.weight_etf2));
            }
        }
    }
}
