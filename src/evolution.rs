//! Allocation trends across a fund's history.

use crate::allocation::category_totals;
use crate::history::HistorySnapshot;
use crate::holding::CategoricalField;
use serde::Serialize;
use std::collections::HashMap;

/// Number of categories charted when the caller does not ask for a count.
pub const DEFAULT_TOP_N: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub label: String,
    pub values: Vec<f64>,
}

impl CategorySeries {
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Per-category weight series aligned to `dates`, ranked by mean weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub dates: Vec<String>,
    pub series: Vec<CategorySeries>,
}

impl TimeSeries {
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.values.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.label.as_str())
    }
}

/// Builds the `top_n` category trends over `histories`.
///
/// Snapshots are put in date order first. A category missing from a snapshot
/// counts as zero weight there, so every series has one value per date.
/// Categories are ranked by their mean over the whole range.
pub fn project(histories: &[HistorySnapshot], field: CategoricalField, top_n: usize) -> TimeSeries {
    if histories.is_empty() {
        return TimeSeries::default();
    }

    let mut sorted: Vec<&HistorySnapshot> = histories.iter().collect();
    sorted.sort_by_key(|h| h.get_date());

    let dates: Vec<String> = sorted.iter().map(|h| h.get_date().to_string()).collect();

    let mut series: Vec<CategorySeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, history) in sorted.iter().enumerate() {
        for (category, weight) in category_totals(history.holdings(), field) {
            let slot = match index.get(&category) {
                Some(&slot) => slot,
                None => {
                    index.insert(category.clone(), series.len());
                    series.push(CategorySeries {
                        label: category,
                        values: vec![0.0; sorted.len()],
                    });
                    series.len() - 1
                }
            };
            series[slot].values[i] = weight;
        }
    }

    // stable: equal means keep first-seen order
    series.sort_by(|a, b| {
        b.mean()
            .partial_cmp(&a.mean())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    series.truncate(top_n);

    TimeSeries { dates, series }
}
