//! Allocation breakdown of a fund's holdings.
//!
//! Holdings are grouped by one categorical attribute, weights are summed per
//! category and the categories are ranked by weight.

use crate::holding::{CategoricalField, Holding};
use serde::Serialize;
use std::collections::HashMap;

/// Label of the bucket that collects the categories beyond the limit.
///
/// A data category spelled the same way is kept as its own bucket, so a
/// folded allocation can carry this label twice. [`Allocation::get`] returns
/// the first one.
pub const OTHERS_LABEL: &str = "Others";

/// Number of buckets shown when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: usize = 10;

/// Ranked allocation buckets, `labels[i]` carries `values[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Allocation {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Allocation {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }
}

/// Sums weights per category, in the order categories are first encountered.
pub fn category_totals(holdings: &[Holding], field: CategoricalField) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for holding in holdings {
        let category = holding.category(field);
        if let Some(&i) = index.get(category) {
            totals[i].1 += holding.get_weight();
        } else {
            index.insert(category, totals.len());
            totals.push((category.to_string(), holding.get_weight()));
        }
    }
    totals
}

/// Groups `holdings` by `field` and ranks the categories by summed weight.
///
/// At most `limit` buckets are returned (a limit of 0 counts as 1). Ties keep
/// the order in which categories first appear in `holdings`.
///
/// With `include_others` the categories that do not fit are folded into a
/// trailing [`OTHERS_LABEL`] bucket and the total weight is preserved.
/// Without it the tail is dropped and the returned weights no longer add up
/// to the input total.
pub fn aggregate(
    holdings: &[Holding],
    field: CategoricalField,
    limit: usize,
    include_others: bool,
) -> Allocation {
    if holdings.is_empty() {
        return Allocation::default();
    }
    let limit = limit.max(1);

    let mut sorted = category_totals(holdings, field);
    // sort_by is stable, equal weights stay in encounter order
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if include_others && sorted.len() > limit {
        let tail = sorted.split_off(limit - 1);
        let others_sum: f64 = tail.iter().map(|(_, weight)| weight).sum();
        sorted.push((OTHERS_LABEL.to_string(), others_sum));
    } else {
        sorted.truncate(limit);
    }

    let (labels, values) = sorted.into_iter().unzip();
    Allocation { labels, values }
}
