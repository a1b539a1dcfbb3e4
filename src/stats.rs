use serde::Serialize;

/// Summary statistics of a chart's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChartStats {
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub median: f64,
}

pub fn chart_stats(values: &[f64]) -> ChartStats {
    if values.is_empty() {
        return ChartStats::default();
    }

    let total: f64 = values.iter().sum();
    let average = total / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 != 0 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };

    ChartStats {
        total,
        average,
        max,
        min,
        median,
    }
}

/// Formats a value that is already expressed in percent, e.g. `12.5` -> `12.50%`.
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

pub fn format_compact_number(num: f64) -> String {
    let abs = num.abs();
    if abs >= 1e12 {
        format!("{:.1}T", num / 1e12)
    } else if abs >= 1e9 {
        format!("{:.1}B", num / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", num / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", num / 1e3)
    } else {
        format!("{num}")
    }
}

pub fn format_currency(amount: f64, currency: &str) -> String {
    format!("{} {amount:.2}", currency.to_uppercase())
}

pub fn round_to(num: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (num * factor).round() / factor
}
