//! Browsing, aggregation and comparison of ETF holdings.

pub mod allocation;
pub mod cache;
pub mod error;
pub mod etf;
pub mod evolution;
pub mod history;
pub mod holding;
pub mod overlap;
pub mod report;
pub mod source;
pub mod stats;
pub mod table;
