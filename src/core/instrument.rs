use super::category::AssetCategory;
use super::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A priceable product in one asset category. Instruments without a ticker
/// (savings accounts and other manual products) have no market price.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Instrument {
    pub name: String,
    pub category: AssetCategory,
    pub ticker: Option<String>,
    pub description: Option<String>,
}

impl Instrument {
    pub fn has_market_price(&self) -> bool {
        self.ticker.is_some()
    }
}

/// Validated set of instruments, grouped by category.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    instruments: Vec<Instrument>,
}

impl InstrumentRegistry {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        for instrument in &instruments {
            let name = instrument.name.trim();
            if name.is_empty() {
                return Err(PlanError::InvalidConfig(
                    "instrument name must not be empty".to_string(),
                ));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(PlanError::InvalidConfig(format!(
                    "duplicate instrument name: {name}"
                )));
            }
            if let Some(ticker) = &instrument.ticker {
                if ticker.trim().is_empty() {
                    return Err(PlanError::InvalidConfig(format!(
                        "ticker for {name} must not be empty; omit it for manual products"
                    )));
                }
            }
        }
        Ok(Self { instruments })
    }

    pub fn all(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn find(&self, name: &str) -> Option<&Instrument> {
        let name = name.trim();
        self.instruments
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn in_category(&self, category: AssetCategory) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter().filter(move |i| i.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(name: &str, category: AssetCategory, ticker: Option<&str>) -> Instrument {
        Instrument {
            name: name.to_string(),
            category,
            ticker: ticker.map(str::to_string),
            description: None,
        }
    }

    #[test]
    fn groups_and_finds_instruments() {
        let registry = InstrumentRegistry::new(vec![
            instrument("KODEX 200", AssetCategory::EquityFund, Some("069500.KS")),
            instrument("Samsung Electronics", AssetCategory::Stock, Some("005930.KS")),
            instrument("Parking account", AssetCategory::Cash, None),
        ])
        .unwrap();

        assert_eq!(registry.in_category(AssetCategory::Stock).count(), 1);
        assert!(registry.find("kodex 200").is_some());
        assert!(!registry.find("Parking account").unwrap().has_market_price());
    }

    #[test]
    fn rejects_duplicates_and_blank_fields() {
        let dup = InstrumentRegistry::new(vec![
            instrument("Gold ETF", AssetCategory::Gold, Some("GLD")),
            instrument("gold etf", AssetCategory::Gold, Some("IAU")),
        ]);
        assert!(matches!(dup, Err(PlanError::InvalidConfig(_))));

        let blank_name = InstrumentRegistry::new(vec![instrument(" ", AssetCategory::Gold, None)]);
        assert!(blank_name.is_err());

        let blank_ticker =
            InstrumentRegistry::new(vec![instrument("Oil", AssetCategory::Commodity, Some(""))]);
        assert!(blank_ticker.is_err());
    }
}
