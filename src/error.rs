//! Errors of the comparison engine, the ingestion checks and the data directory.
//!
//! Comparison and validation errors are plain values the library returns;
//! [`SourceError`] wraps both together with file and lookup failures.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Rejected comparison requests.
///
/// Comparing a fund or a snapshot with itself is a no-op request and is
/// surfaced as a validation message rather than computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("Cannot compare a holdings snapshot with itself")]
    SameSnapshot,

    #[error("Cannot compare ETF {0} with itself")]
    SameEtf(String),
}

/// Ingestion errors for holdings data read from disk.
///
/// The aggregation functions never validate weights, so bad data is caught
/// here, before it reaches them.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Weight of {ticker} on {date} must be within 0-100, got {weight}")]
    WeightOutOfRange {
        ticker: String,
        date: NaiveDate,
        weight: f64,
    },

    #[error("Weight of {ticker} on {date} is not a finite number")]
    NonFiniteWeight { ticker: String, date: NaiveDate },

    #[error("Holding #{index} on {date} has no ticker")]
    EmptyTicker { index: usize, date: NaiveDate },
}

/// Errors raised while loading the catalog and histories from the data directory.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not well-formatted JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown ETF: {0}")]
    UnknownEtf(String),

    #[error("No holdings history for ETF {0}")]
    NoHistory(String),

    #[error("No holdings history for ETF {etf} on or before {date}")]
    NoHistoryBefore { etf: String, date: NaiveDate },

    #[error("ETF ID is required")]
    MissingId,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}
