//! Searching, sorting and paging of tabular records.
//!
//! Sort keys are typed: every sortable field maps to a [`SortValue`] of a
//! fixed kind, and the comparator for that kind is picked once per sort.

use crate::holding::{CategoricalField, Holding};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Semantic type of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Text(&'a str),
    Number(f64),
    Date(NaiveDate),
}

fn compare_text(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Text(a), SortValue::Text(b)) => a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase)),
        _ => Ordering::Equal,
    }
}

fn compare_number(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

fn compare_date(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

impl SortKind {
    fn comparator(self) -> fn(&SortValue<'_>, &SortValue<'_>) -> Ordering {
        match self {
            SortKind::Text => compare_text,
            SortKind::Number => compare_number,
            SortKind::Date => compare_date,
        }
    }
}

/// A record that can be ordered by one of its fields.
pub trait Sortable {
    type Field: Copy;

    fn sort_kind(field: Self::Field) -> SortKind;

    fn sort_value(&self, field: Self::Field) -> SortValue<'_>;
}

/// Stable sort of `items` by `field`.
pub fn sort_by_field<T: Sortable>(items: &mut [T], field: T::Field, direction: SortDirection) {
    let compare = T::sort_kind(field).comparator();
    items.sort_by(|a, b| {
        let ordering = compare(&a.sort_value(field), &b.sort_value(field));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Sortable columns of the holdings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldingField {
    Ticker,
    Name,
    Sector,
    Region,
    Currency,
    #[default]
    Weight,
    MarketValue,
    Price,
}

impl HoldingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingField::Ticker => "ticker",
            HoldingField::Name => "name",
            HoldingField::Sector => "sector",
            HoldingField::Region => "region",
            HoldingField::Currency => "currency",
            HoldingField::Weight => "weight",
            HoldingField::MarketValue => "market_value",
            HoldingField::Price => "price",
        }
    }
}

impl FromStr for HoldingField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ticker" => Ok(HoldingField::Ticker),
            "name" => Ok(HoldingField::Name),
            "sector" => Ok(HoldingField::Sector),
            "region" => Ok(HoldingField::Region),
            "currency" => Ok(HoldingField::Currency),
            "weight" | "weight_pct" => Ok(HoldingField::Weight),
            "market_value" | "value" => Ok(HoldingField::MarketValue),
            "price" => Ok(HoldingField::Price),
            other => Err(format!("Unknown holdings column: {other}")),
        }
    }
}

impl Sortable for Holding {
    type Field = HoldingField;

    fn sort_kind(field: HoldingField) -> SortKind {
        match field {
            HoldingField::Ticker
            | HoldingField::Name
            | HoldingField::Sector
            | HoldingField::Region
            | HoldingField::Currency => SortKind::Text,
            HoldingField::Weight | HoldingField::MarketValue | HoldingField::Price => {
                SortKind::Number
            }
        }
    }

    fn sort_value(&self, field: HoldingField) -> SortValue<'_> {
        match field {
            HoldingField::Ticker => SortValue::Text(self.get_ticker()),
            HoldingField::Name => SortValue::Text(self.get_name()),
            HoldingField::Sector => SortValue::Text(self.category(CategoricalField::Sector)),
            HoldingField::Region => SortValue::Text(self.category(CategoricalField::Region)),
            HoldingField::Currency => SortValue::Text(self.category(CategoricalField::Currency)),
            HoldingField::Weight => SortValue::Number(self.get_weight()),
            HoldingField::MarketValue => SortValue::Number(self.get_market_value()),
            HoldingField::Price => SortValue::Number(self.get_price()),
        }
    }
}

/// Case-insensitive match on name or ticker; an empty term keeps everything.
pub fn search<'a>(holdings: &'a [Holding], term: &str) -> Vec<&'a Holding> {
    let term = term.to_lowercase();
    holdings
        .iter()
        .filter(|h| {
            h.get_name().to_lowercase().contains(&term)
                || h.get_ticker().to_lowercase().contains(&term)
        })
        .collect()
}

impl<T: Sortable> Sortable for &T {
    type Field = T::Field;

    fn sort_kind(field: Self::Field) -> SortKind {
        T::sort_kind(field)
    }

    fn sort_value(&self, field: Self::Field) -> SortValue<'_> {
        (**self).sort_value(field)
    }
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Cuts page `page` (1-based) out of `items`.
///
/// The page size is clamped to `1..=MAX_PAGE_SIZE` and the page number to the
/// existing pages, so asking past the end yields the last page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_count = items.len();
    let total_pages = total_count.div_ceil(page_size);
    let current_page = page.clamp(1, total_pages.max(1));

    let start = (current_page - 1) * page_size;
    let end = (start + page_size).min(total_count);
    let items = items.get(start..end).unwrap_or_default().to_vec();

    Page {
        items,
        total_count,
        current_page,
        total_pages,
        has_next: current_page < total_pages,
        has_previous: current_page > 1,
    }
}
