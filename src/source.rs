//! Local data directory holding the ETF catalog and holdings histories.
//!
//! Layout:
//!
//! ```text
//! <root>/etfs.json             array of catalog entries
//! <root>/histories/<id>.json   array of holdings snapshots of one fund
//! ```
//!
//! Everything read from disk is validated before it is handed out and kept in
//! a [`TtlCache`] owned by the [`DataSource`].

use crate::cache::TtlCache;
use crate::error::{ComparisonError, SourceError, ValidationError};
use crate::etf::Etf;
use crate::history::{self, HistorySnapshot};
use crate::overlap::{self, ComparisonResult};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CATALOG_FILE: &str = "etfs.json";
const HISTORIES_DIR: &str = "histories";
const CATALOG_KEY: &str = "catalog";

/// Two funds and the overlap of their holdings.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub etf1: Etf,
    pub etf2: Etf,
    pub date1: NaiveDate,
    pub date2: NaiveDate,
    pub result: ComparisonResult,
}

pub struct DataSource {
    root: PathBuf,
    catalog: TtlCache<Arc<Vec<Etf>>>,
    histories: TtlCache<Arc<Vec<HistorySnapshot>>>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    debug!(path = %path.display(), "loading");
    let data = read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks a snapshot before its weights reach the aggregation code.
pub fn validate_snapshot(snapshot: &HistorySnapshot) -> Result<(), ValidationError> {
    let date = snapshot.get_date();
    for (index, holding) in snapshot.holdings().iter().enumerate() {
        let ticker = holding.get_ticker();
        if ticker.trim().is_empty() {
            return Err(ValidationError::EmptyTicker { index, date });
        }
        let weight = holding.get_weight();
        if !weight.is_finite() {
            return Err(ValidationError::NonFiniteWeight {
                ticker: ticker.to_string(),
                date,
            });
        }
        if !(0.0..=100.0).contains(&weight) {
            return Err(ValidationError::WeightOutOfRange {
                ticker: ticker.to_string(),
                date,
                weight,
            });
        }
    }
    Ok(())
}

impl DataSource {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> DataSource {
        DataSource {
            root: root.into(),
            catalog: TtlCache::new(ttl),
            histories: TtlCache::new(ttl),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drops everything cached so the next access reads from disk again.
    pub fn invalidate(&mut self) {
        self.catalog.clear();
        self.histories.clear();
    }

    pub fn invalidate_history(&mut self, etf_id: &str) {
        self.histories.invalidate(etf_id);
    }

    pub fn catalog(&mut self) -> Result<Arc<Vec<Etf>>, SourceError> {
        let path = self.root.join(CATALOG_FILE);
        self.catalog
            .get_or_try_insert_with(CATALOG_KEY, || read_json(&path).map(Arc::new))
    }

    /// Looks a fund up by id or ticker.
    pub fn etf(&mut self, key: &str) -> Result<Etf, SourceError> {
        if key.trim().is_empty() {
            return Err(SourceError::MissingId);
        }
        self.catalog()?
            .iter()
            .find(|etf| etf.matches_key(key))
            .cloned()
            .ok_or_else(|| SourceError::UnknownEtf(key.to_string()))
    }

    /// All snapshots of a fund, in file order. A fund without a history file
    /// has no history.
    pub fn histories(&mut self, etf_id: &str) -> Result<Arc<Vec<HistorySnapshot>>, SourceError> {
        let path = self.root.join(HISTORIES_DIR).join(format!("{etf_id}.json"));
        self.histories.get_or_try_insert_with(etf_id, || {
            if !path.exists() {
                return Ok(Arc::new(Vec::new()));
            }
            let snapshots: Vec<HistorySnapshot> = read_json(&path)?;
            for snapshot in &snapshots {
                if let Err(e) = validate_snapshot(snapshot) {
                    warn!(etf = etf_id, path = %path.display(), "rejecting history: {e}");
                    return Err(SourceError::from(e));
                }
            }
            Ok(Arc::new(snapshots))
        })
    }

    /// The snapshot on `date`, or the latest before it; the latest overall
    /// when no date is given.
    pub fn history_at(
        &mut self,
        etf_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<HistorySnapshot, SourceError> {
        let histories = self.histories(etf_id)?;
        let found = match date {
            Some(date) => history::on_or_before(&histories, date).ok_or_else(|| {
                SourceError::NoHistoryBefore {
                    etf: etf_id.to_string(),
                    date,
                }
            })?,
            None => history::latest(&histories)
                .ok_or_else(|| SourceError::NoHistory(etf_id.to_string()))?,
        };
        Ok(found.clone())
    }

    pub fn latest(&mut self, etf_id: &str) -> Result<HistorySnapshot, SourceError> {
        self.history_at(etf_id, None)
    }

    /// Compares the holdings of two funds, each at its own date.
    ///
    /// A fund compared with itself is rejected before anything is loaded from
    /// the histories.
    pub fn compare(
        &mut self,
        etf1: &str,
        etf2: &str,
        date1: Option<NaiveDate>,
        date2: Option<NaiveDate>,
    ) -> Result<Comparison, SourceError> {
        if etf1.trim().is_empty() || etf2.trim().is_empty() {
            return Err(SourceError::MissingId);
        }
        if etf1 == etf2 {
            return Err(ComparisonError::SameEtf(etf1.to_string()).into());
        }

        let first = self.etf(etf1)?;
        let second = self.etf(etf2)?;
        if first.get_id() == second.get_id() {
            return Err(ComparisonError::SameEtf(first.get_ticker().to_string()).into());
        }

        let snapshot1 = self.history_at(first.get_id(), date1)?;
        let snapshot2 = self.history_at(second.get_id(), date2)?;
        let result = overlap::compare_snapshots(&snapshot1, &snapshot2)?;

        Ok(Comparison {
            date1: snapshot1.get_date(),
            date2: snapshot2.get_date(),
            etf1: first,
            etf2: second,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holding::Holding;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {"_id": "e1", "name": "World Equity", "ticker": "WRLD", "currency": "USD", "ter": 0.2, "aum": 1e9},
        {"_id": "e2", "name": "US Tech", "ticker": "TECH", "currency": "USD", "ter": 0.3, "aum": 5e8},
        {"_id": "e3", "name": "Empty Fund", "ticker": "NONE"}
    ]"#;

    const WORLD: &str = r#"[
        {"_id": "w2", "etf": "e1", "date": "2024-02-29", "holdings": [
            {"issuer_ticker": "AAPL", "name": "Apple", "weight_pct": 10.0},
            {"issuer_ticker": "MSFT", "name": "Microsoft", "weight_pct": 8.0}
        ]},
        {"_id": "w1", "etf": "e1", "date": "2024-01-31", "holdings": [
            {"issuer_ticker": "AAPL", "name": "Apple", "weight_pct": 12.0}
        ]}
    ]"#;

    const TECH: &str = r#"[
        {"_id": "t1", "etf": "e2", "date": "2024-02-29", "holdings": [
            {"issuer_ticker": "AAPL", "name": "Apple", "weight_pct": 6.0},
            {"issuer_ticker": "GOOG", "name": "Alphabet", "weight_pct": 5.0}
        ]}
    ]"#;

    fn data_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CATALOG_FILE), CATALOG).unwrap();
        fs::create_dir(dir.path().join(HISTORIES_DIR)).unwrap();
        fs::write(dir.path().join(HISTORIES_DIR).join("e1.json"), WORLD).unwrap();
        fs::write(dir.path().join(HISTORIES_DIR).join("e2.json"), TECH).unwrap();
        dir
    }

    fn source(dir: &TempDir) -> DataSource {
        DataSource::new(dir.path(), Duration::from_secs(60))
    }

    #[test]
    fn test_catalog_and_lookup() {
        let dir = data_dir();
        let mut source = source(&dir);
        assert_eq!(source.catalog().unwrap().len(), 3);
        assert_eq!(source.etf("tech").unwrap().get_id(), "e2");
        assert_eq!(source.etf("e1").unwrap().get_ticker(), "WRLD");
        assert!(matches!(source.etf("XXX"), Err(SourceError::UnknownEtf(_))));
        assert!(matches!(source.etf(" "), Err(SourceError::MissingId)));
    }

    #[test]
    fn test_catalog_is_cached_until_invalidated() {
        let dir = data_dir();
        let mut source = source(&dir);
        assert_eq!(source.catalog().unwrap().len(), 3);

        fs::write(dir.path().join(CATALOG_FILE), "[]").unwrap();
        assert_eq!(source.catalog().unwrap().len(), 3);

        source.invalidate();
        assert!(source.catalog().unwrap().is_empty());
    }

    #[test]
    fn test_history_at() {
        let dir = data_dir();
        let mut source = source(&dir);

        let latest = source.latest("e1").unwrap();
        assert_eq!(latest.get_id(), "w2");

        let date = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(source.history_at("e1", Some(date)).unwrap().get_id(), "w1");

        let early = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert!(matches!(
            source.history_at("e1", Some(early)),
            Err(SourceError::NoHistoryBefore { .. })
        ));
        assert!(matches!(source.history_at("e3", None), Err(SourceError::NoHistory(_))));
    }

    #[test]
    fn test_compare_funds() {
        let dir = data_dir();
        let mut source = source(&dir);
        let comparison = source.compare("WRLD", "TECH", None, None).unwrap();

        assert_eq!(comparison.etf1.get_id(), "e1");
        assert_eq!(comparison.result.total_overlap, 6.0);
        assert_eq!(comparison.result.unique_etf1.len(), 1);
        assert_eq!(comparison.result.unique_etf2[0].get_ticker(), "GOOG");
    }

    #[test]
    fn test_compare_rejects_same_fund() {
        let dir = data_dir();
        let mut source = source(&dir);
        assert!(matches!(
            source.compare("e1", "e1", None, None),
            Err(SourceError::Comparison(ComparisonError::SameEtf(_)))
        ));
        // same fund referenced by id and by ticker
        assert!(matches!(
            source.compare("e1", "wrld", None, None),
            Err(SourceError::Comparison(ComparisonError::SameEtf(_)))
        ));
        assert!(matches!(source.compare("", "e2", None, None), Err(SourceError::MissingId)));
    }

    #[test]
    fn test_out_of_range_weight_is_rejected() {
        let dir = data_dir();
        let bad = r#"[{"etf": "e3", "date": "2024-01-31", "holdings": [
            {"issuer_ticker": "BAD", "weight_pct": 120.0}
        ]}]"#;
        fs::write(dir.path().join(HISTORIES_DIR).join("e3.json"), bad).unwrap();

        let mut source = source(&dir);
        match source.histories("e3") {
            Err(SourceError::Validation(ValidationError::WeightOutOfRange { ticker, weight, .. })) => {
                assert_eq!(ticker, "BAD");
                assert_eq!(weight, 120.0);
            }
            other => panic!("expected a weight validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalidate_history() {
        let dir = data_dir();
        let mut source = source(&dir);
        assert_eq!(source.histories("e2").unwrap().len(), 1);

        fs::write(dir.path().join(HISTORIES_DIR).join("e2.json"), "[]").unwrap();
        assert_eq!(source.histories("e2").unwrap().len(), 1);

        source.invalidate_history("e2");
        assert!(source.histories("e2").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let dir = data_dir();
        fs::write(dir.path().join(HISTORIES_DIR).join("e3.json"), "{not json").unwrap();
        let mut source = source(&dir);
        assert!(matches!(source.histories("e3"), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn test_validate_snapshot() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let ok = HistorySnapshot::new("", "e", date, vec![Holding::new("A", "A", 100.0)]);
        assert!(validate_snapshot(&ok).is_ok());

        let negative = HistorySnapshot::new("", "e", date, vec![Holding::new("A", "A", -1.0)]);
        assert!(matches!(
            validate_snapshot(&negative),
            Err(ValidationError::WeightOutOfRange { .. })
        ));

        let nan = HistorySnapshot::new("", "e", date, vec![Holding::new("A", "A", f64::NAN)]);
        assert!(matches!(
            validate_snapshot(&nan),
            Err(ValidationError::NonFiniteWeight { .. })
        ));

        let no_ticker = HistorySnapshot::new("", "e", date, vec![Holding::new("", "A", 1.0)]);
        assert_eq!(
            validate_snapshot(&no_ticker),
            Err(ValidationError::EmptyTicker { index: 0, date })
        );
    }
}
