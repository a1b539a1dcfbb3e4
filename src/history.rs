use crate::holding::{CategoricalField, Holding};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Number of largest positions summed into the concentration figure.
const TOP_CONCENTRATION: usize = 10;

/// Holdings of one ETF as observed on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(rename = "_id", default)]
    id: String,
    etf: String,
    #[serde(deserialize_with = "iso_date")]
    date: NaiveDate,
    #[serde(default)]
    holdings: Vec<Holding>,
}

impl HistorySnapshot {
    pub fn new(id: &str, etf: &str, date: NaiveDate, holdings: Vec<Holding>) -> HistorySnapshot {
        HistorySnapshot {
            id: id.to_string(),
            etf: etf.to_string(),
            date,
            holdings,
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_etf(&self) -> &str {
        &self.etf
    }

    pub fn get_date(&self) -> NaiveDate {
        self.date
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().map(Holding::get_weight).sum()
    }

    pub fn total_market_value(&self) -> f64 {
        self.holdings.iter().map(Holding::get_market_value).sum()
    }

    pub fn total_notional_value(&self) -> f64 {
        self.holdings.iter().map(Holding::get_notional_value).sum()
    }
}

/// Headline figures of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub total_holdings: usize,
    pub total_weight: f64,
    pub total_market_value: f64,
    pub total_notional_value: f64,
    pub top_ticker: String,
    pub top_weight: f64,
    pub top10_weight: f64,
    pub sectors: usize,
    pub regions: usize,
}

/// Summarises a snapshot, `None` when it has no holdings.
///
/// The top holding is the first one with the largest weight. Holdings without
/// a sector or region count together as one "Other" category.
pub fn snapshot_summary(snapshot: &HistorySnapshot) -> Option<SnapshotSummary> {
    let top = snapshot
        .holdings
        .iter()
        .reduce(|max, h| if h.get_weight() > max.get_weight() { h } else { max })?;

    let mut weights: Vec<f64> = snapshot.holdings.iter().map(Holding::get_weight).collect();
    weights.sort_by(|a, b| b.total_cmp(a));
    let top10_weight = weights.iter().take(TOP_CONCENTRATION).sum();

    let distinct = |field: CategoricalField| {
        snapshot
            .holdings
            .iter()
            .map(|h| h.category(field))
            .collect::<HashSet<_>>()
            .len()
    };

    Some(SnapshotSummary {
        total_holdings: snapshot.holdings.len(),
        total_weight: snapshot.total_weight(),
        total_market_value: snapshot.total_market_value(),
        total_notional_value: snapshot.total_notional_value(),
        top_ticker: top.get_ticker().to_string(),
        top_weight: top.get_weight(),
        top10_weight,
        sectors: distinct(CategoricalField::Sector),
        regions: distinct(CategoricalField::Region),
    })
}

/// Distinct snapshot dates, newest first.
pub fn snapshot_dates(histories: &[HistorySnapshot]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = histories.iter().map(|h| h.date).collect();
    dates.sort_by(|a, b| b.cmp(a));
    dates.dedup();
    dates
}

/// Parses `YYYY-MM-DD`, also accepting a full ISO-8601 timestamp of which only
/// the calendar date is kept.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    let rest = &value[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn iso_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_iso_date(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO date: {value}")))
}

pub(crate) fn optional_iso_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.is_empty() => parse_iso_date(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO date: {value}"))),
        _ => Ok(None),
    }
}

/// Most recent snapshot, the first one wins on equal dates.
pub fn latest(histories: &[HistorySnapshot]) -> Option<&HistorySnapshot> {
    histories
        .iter()
        .reduce(|best, h| if h.date > best.date { h } else { best })
}

/// Snapshot taken exactly on `date`, or else the latest one before it.
pub fn on_or_before(histories: &[HistorySnapshot], date: NaiveDate) -> Option<&HistorySnapshot> {
    histories
        .iter()
        .filter(|h| h.date <= date)
        .reduce(|best, h| if h.date > best.date { h } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(id: &str, date: &str) -> HistorySnapshot {
        let holdings = vec![Holding::new("A", "A", 60.0), Holding::new("B", "B", 40.0)];
        HistorySnapshot::new(id, "etf", date.parse().unwrap(), holdings)
    }

    #[test]
    fn test_deserialize_snapshot() {
        let json = r#"{
            "_id": "h1",
            "etf": "e1",
            "date": "2024-03-31",
            "holdings": [{"issuer_ticker": "MSFT", "name": "MICROSOFT CORP", "weight_pct": 7.1}]
        }"#;
        let history: HistorySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(history.get_id(), "h1");
        assert_eq!(history.get_date(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(history.holdings().len(), 1);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let json = r#"{"etf": "e1", "date": "31/03/2024", "holdings": []}"#;
        assert!(serde_json::from_str::<HistorySnapshot>(json).is_err());
    }

    #[test]
    fn test_parse_iso_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 31);
        assert_eq!(parse_iso_date("2024-03-31"), expected);
        assert_eq!(parse_iso_date("2024-03-31T00:00:00.000Z"), expected);
        assert_eq!(parse_iso_date("2024-03-31x"), None);
        assert_eq!(parse_iso_date("2024-3-1"), None);
        assert_eq!(parse_iso_date(""), None);
    }

    #[test]
    fn test_total_weight() {
        assert_eq!(snapshot("a", "2024-01-01").total_weight(), 100.0);
    }

    #[test]
    fn test_snapshot_summary() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let mut holdings: Vec<Holding> = (0..12)
            .map(|i| {
                Holding::new(&format!("T{i}"), "", (i + 1) as f64)
                    .with_category(CategoricalField::Sector, if i % 2 == 0 { "Tech" } else { "Energy" })
                    .with_market_value(100.0, 10.0)
            })
            .collect();
        holdings.push(Holding::new("TIE", "", 12.0));
        let summary = snapshot_summary(&HistorySnapshot::new("h", "e", date, holdings)).unwrap();

        assert_eq!(summary.total_holdings, 13);
        assert_relative_eq!(summary.total_weight, 90.0);
        assert_relative_eq!(summary.total_market_value, 1200.0);
        assert_eq!(summary.top_ticker, "T11");
        assert_relative_eq!(summary.top_weight, 12.0);
        // 12 + 12 + 11 + ... + 4
        assert_relative_eq!(summary.top10_weight, 84.0);
        assert_eq!(summary.sectors, 3);
        assert_eq!(summary.regions, 1);
    }

    #[test]
    fn test_empty_snapshot_has_no_summary() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert!(snapshot_summary(&HistorySnapshot::new("h", "e", date, vec![])).is_none());
    }

    #[test]
    fn test_snapshot_dates_newest_first() {
        let histories = vec![
            snapshot("b", "2024-02-01"),
            snapshot("a", "2024-01-01"),
            snapshot("c", "2024-03-01"),
            snapshot("d", "2024-02-01"),
        ];
        let dates: Vec<String> = snapshot_dates(&histories).iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);
    }

    #[test]
    fn test_latest_and_on_or_before() {
        let histories = vec![
            snapshot("b", "2024-02-01"),
            snapshot("a", "2024-01-01"),
            snapshot("c", "2024-03-01"),
        ];
        assert_eq!(latest(&histories).map(|h| h.get_id()), Some("c"));
        let date = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(on_or_before(&histories, date).map(|h| h.get_id()), Some("b"));
        let early = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(on_or_before(&histories, early).is_none());
        assert!(latest(&[]).is_none());
    }
}
