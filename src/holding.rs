use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category used when a holding has no value for the grouping attribute.
pub const OTHER_CATEGORY: &str = "Other";

/// One constituent security of an ETF at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(alias = "ticker")]
    issuer_ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    asset_class: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    fx: Option<String>,

    #[serde(default, deserialize_with = "null_as_zero")]
    weight_pct: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    market_value: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    notional_value: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    nominal: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    price: f64,
}

impl Holding {
    pub fn new(ticker: &str, name: &str, weight_pct: f64) -> Holding {
        Holding {
            issuer_ticker: ticker.to_string(),
            name: name.to_string(),
            sector: None,
            asset_class: None,
            region: None,
            currency: None,
            fx: None,
            weight_pct,
            market_value: 0.0,
            notional_value: 0.0,
            nominal: 0.0,
            price: 0.0,
        }
    }

    /// Sets one of the categorical attributes, consuming and returning the holding.
    pub fn with_category(mut self, field: CategoricalField, value: &str) -> Holding {
        let value = Some(value.to_string());
        match field {
            CategoricalField::Sector => self.sector = value,
            CategoricalField::AssetClass => self.asset_class = value,
            CategoricalField::Region => self.region = value,
            CategoricalField::Currency => self.currency = value,
        }
        self
    }

    pub fn with_market_value(mut self, market_value: f64, price: f64) -> Holding {
        self.market_value = market_value;
        self.price = price;
        self
    }

    pub fn get_ticker(&self) -> &str {
        &self.issuer_ticker
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_weight(&self) -> f64 {
        self.weight_pct
    }

    pub fn get_market_value(&self) -> f64 {
        self.market_value
    }

    pub fn get_notional_value(&self) -> f64 {
        self.notional_value
    }

    pub fn get_nominal(&self) -> f64 {
        self.nominal
    }

    pub fn get_price(&self) -> f64 {
        self.price
    }

    pub fn get_fx(&self) -> Option<&str> {
        self.fx.as_deref()
    }

    /// Raw value of a categorical attribute, `None` when missing.
    pub fn get_attribute(&self, field: CategoricalField) -> Option<&str> {
        match field {
            CategoricalField::Sector => self.sector.as_deref(),
            CategoricalField::AssetClass => self.asset_class.as_deref(),
            CategoricalField::Region => self.region.as_deref(),
            CategoricalField::Currency => self.currency.as_deref(),
        }
    }

    /// The bucket this holding falls into when grouped by `field`.
    ///
    /// Missing and empty attributes both land in [`OTHER_CATEGORY`].
    pub fn category(&self, field: CategoricalField) -> &str {
        match self.get_attribute(field) {
            Some(value) if !value.is_empty() => value,
            _ => OTHER_CATEGORY,
        }
    }
}

// upstream exports write `null` for positions without a quote
fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Categorical attribute of a holding that allocations are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoricalField {
    #[default]
    Sector,
    AssetClass,
    Region,
    Currency,
}

impl CategoricalField {
    /// Returns all groupable fields
    pub fn all() -> [CategoricalField; 4] {
        [
            CategoricalField::Region,
            CategoricalField::Sector,
            CategoricalField::AssetClass,
            CategoricalField::Currency,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalField::Sector => "sector",
            CategoricalField::AssetClass => "asset_class",
            CategoricalField::Region => "region",
            CategoricalField::Currency => "currency",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoricalField::Sector => "Sector Allocation",
            CategoricalField::AssetClass => "Asset Class",
            CategoricalField::Region => "Geographic Allocation",
            CategoricalField::Currency => "Currency",
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoricalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sector" => Ok(CategoricalField::Sector),
            "asset_class" | "asset-class" | "class" => Ok(CategoricalField::AssetClass),
            "region" => Ok(CategoricalField::Region),
            "currency" => Ok(CategoricalField::Currency),
            other => Err(format!("Unknown grouping field: {other}")),
        }
    }
}
