use crate::history::optional_iso_date;
use crate::table::{sort_by_field, SortDirection, SortKind, SortValue, Sortable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// TER difference below which two funds count as similarly priced.
const SIMILAR_TER: f64 = 0.1;

/// A fund in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Etf {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    ticker: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    fund_type: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    return_method: String,
    #[serde(default)]
    ter: f64,
    #[serde(default)]
    aum: f64,
    #[serde(default, deserialize_with = "optional_iso_date")]
    last_update: Option<NaiveDate>,
    #[serde(default)]
    located_in: String,
    #[serde(default)]
    distribution_return: String,
    #[serde(default)]
    export_link: String,
}

impl Etf {
    pub fn new(id: &str, name: &str, ticker: &str) -> Etf {
        Etf {
            id: id.to_string(),
            name: name.to_string(),
            ticker: ticker.to_string(),
            link: String::new(),
            fund_type: String::new(),
            currency: String::new(),
            class: String::new(),
            return_method: String::new(),
            ter: 0.0,
            aum: 0.0,
            last_update: None,
            located_in: String::new(),
            distribution_return: String::new(),
            export_link: String::new(),
        }
    }

    pub fn with_profile(mut self, fund_type: &str, currency: &str, located_in: &str) -> Etf {
        self.fund_type = fund_type.to_string();
        self.currency = currency.to_string();
        self.located_in = located_in.to_string();
        self
    }

    pub fn with_costs(mut self, ter: f64, aum: f64) -> Etf {
        self.ter = ter;
        self.aum = aum;
        self
    }

    pub fn with_distribution(mut self, class: &str, return_method: &str, distribution_return: &str) -> Etf {
        self.class = class.to_string();
        self.return_method = return_method.to_string();
        self.distribution_return = distribution_return.to_string();
        self
    }

    pub fn with_last_update(mut self, date: NaiveDate) -> Etf {
        self.last_update = Some(date);
        self
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_ticker(&self) -> &str {
        &self.ticker
    }

    pub fn get_fund_type(&self) -> &str {
        &self.fund_type
    }

    pub fn get_currency(&self) -> &str {
        &self.currency
    }

    pub fn get_class(&self) -> &str {
        &self.class
    }

    pub fn get_return_method(&self) -> &str {
        &self.return_method
    }

    pub fn get_ter(&self) -> f64 {
        self.ter
    }

    pub fn get_aum(&self) -> f64 {
        self.aum
    }

    pub fn get_last_update(&self) -> Option<NaiveDate> {
        self.last_update
    }

    pub fn get_located_in(&self) -> &str {
        &self.located_in
    }

    pub fn get_distribution_return(&self) -> &str {
        &self.distribution_return
    }

    /// Whether `query` matches this fund's id or ticker, ignoring case for the ticker.
    pub fn matches_key(&self, query: &str) -> bool {
        self.id == query || self.ticker.eq_ignore_ascii_case(query)
    }
}

/// Sortable columns of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EtfField {
    Name,
    Ticker,
    #[default]
    Aum,
    Ter,
    LastUpdate,
}

impl FromStr for EtfField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(EtfField::Name),
            "ticker" => Ok(EtfField::Ticker),
            "aum" => Ok(EtfField::Aum),
            "ter" => Ok(EtfField::Ter),
            "last_update" | "lastupdate" | "updated" => Ok(EtfField::LastUpdate),
            other => Err(format!("Unknown catalog column: {other}")),
        }
    }
}

impl Sortable for Etf {
    type Field = EtfField;

    fn sort_kind(field: EtfField) -> SortKind {
        match field {
            EtfField::Name | EtfField::Ticker => SortKind::Text,
            EtfField::Aum | EtfField::Ter => SortKind::Number,
            EtfField::LastUpdate => SortKind::Date,
        }
    }

    fn sort_value(&self, field: EtfField) -> SortValue<'_> {
        match field {
            EtfField::Name => SortValue::Text(&self.name),
            EtfField::Ticker => SortValue::Text(&self.ticker),
            EtfField::Aum => SortValue::Number(self.aum),
            EtfField::Ter => SortValue::Number(self.ter),
            // funds that were never updated sort as the oldest
            EtfField::LastUpdate => SortValue::Date(self.last_update.unwrap_or(NaiveDate::MIN)),
        }
    }
}

/// Catalog search and ordering, defaults to all funds by AUM descending.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub search: String,
    pub currency: Option<String>,
    pub fund_type: Option<String>,
    pub sort_by: EtfField,
    pub order: SortDirection,
}

pub fn filter_catalog<'a>(etfs: &'a [Etf], filter: &CatalogFilter) -> Vec<&'a Etf> {
    let term = filter.search.to_lowercase();
    let mut found: Vec<&Etf> = etfs
        .iter()
        .filter(|etf| {
            etf.name.to_lowercase().contains(&term) || etf.ticker.to_lowercase().contains(&term)
        })
        .filter(|etf| filter.currency.as_ref().is_none_or(|c| &etf.currency == c))
        .filter(|etf| filter.fund_type.as_ref().is_none_or(|t| &etf.fund_type == t))
        .collect();
    sort_by_field(&mut found, filter.sort_by, filter.order);
    found
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_aum: f64,
    pub avg_ter: f64,
    pub unique_currencies: usize,
    pub unique_fund_types: usize,
}

pub fn catalog_stats(etfs: &[Etf]) -> Option<CatalogStats> {
    if etfs.is_empty() {
        return None;
    }
    Some(CatalogStats {
        total_aum: etfs.iter().map(|e| e.aum).sum(),
        avg_ter: etfs.iter().map(|e| e.ter).sum::<f64>() / etfs.len() as f64,
        unique_currencies: distinct_currencies(etfs).len(),
        unique_fund_types: distinct_fund_types(etfs).len(),
    })
}

pub fn distinct_currencies(etfs: &[Etf]) -> Vec<&str> {
    etfs.iter()
        .map(|e| e.currency.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn distinct_fund_types(etfs: &[Etf]) -> Vec<&str> {
    etfs.iter()
        .map(|e| e.fund_type.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fund-level similarities and differences of two catalog entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundProfile {
    pub similarities: Vec<&'static str>,
    pub differences: Vec<&'static str>,
}

impl FundProfile {
    pub fn between(first: &Etf, second: &Etf) -> FundProfile {
        let mut profile = FundProfile::default();
        let checks = [
            (first.currency == second.currency, "Same Currency", "Different Currency"),
            (first.located_in == second.located_in, "Same Domicile", "Different Domicile"),
            (first.fund_type == second.fund_type, "Same Type", "Different Type"),
            ((first.ter - second.ter).abs() < SIMILAR_TER, "Similar TER", "Different TER"),
        ];
        for (same, similarity, difference) in checks {
            if same {
                profile.similarities.push(similarity);
            } else {
                profile.differences.push(difference);
            }
        }
        profile
    }
}
