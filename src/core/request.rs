use super::allocator::RiskTolerance;
use super::category::AssetCategory;
use super::error::PlanError;
use super::instrument::{Instrument, InstrumentRegistry};
use std::collections::{BTreeMap, BTreeSet};

/// Everything one planning request needs, fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    risk: RiskTolerance,
    categories: BTreeSet<AssetCategory>,
    instruments: Vec<String>,
    amount: Option<f64>,
}

impl PlanRequest {
    pub fn new(risk: RiskTolerance, categories: impl IntoIterator<Item = AssetCategory>) -> Self {
        Self {
            risk,
            categories: categories.into_iter().collect(),
            instruments: Vec::new(),
            amount: None,
        }
    }

    /// Restricts the request to the named instruments. With none named,
    /// every registry instrument in a selected category takes part.
    pub fn with_instruments(self, names: impl IntoIterator<Item = String>) -> Self {
        Self {
            instruments: names.into_iter().collect(),
            ..self
        }
    }

    pub fn with_amount(self, amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..self
        }
    }

    pub fn risk(&self) -> RiskTolerance {
        self.risk
    }

    pub fn categories(&self) -> &BTreeSet<AssetCategory> {
        &self.categories
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    /// Chosen instruments per selected category.
    pub fn resolve_instruments<'a>(
        &self,
        registry: &'a InstrumentRegistry,
    ) -> Result<BTreeMap<AssetCategory, Vec<&'a Instrument>>, PlanError> {
        let mut chosen: BTreeMap<AssetCategory, Vec<&'a Instrument>> = BTreeMap::new();

        if self.instruments.is_empty() {
            for category in &self.categories {
                let members: Vec<_> = registry.in_category(*category).collect();
                if !members.is_empty() {
                    chosen.insert(*category, members);
                }
            }
            return Ok(chosen);
        }

        for name in &self.instruments {
            let instrument = registry.find(name).ok_or_else(|| {
                PlanError::InvalidInput(format!("unknown instrument: {name}"))
            })?;
            if !self.categories.contains(&instrument.category) {
                return Err(PlanError::InvalidInput(format!(
                    "{} belongs to {}, which is not selected",
                    instrument.name, instrument.category
                )));
            }
            let members = chosen.entry(instrument.category).or_default();
            if !members.iter().any(|m| m.name == instrument.name) {
                members.push(instrument);
            }
        }
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InstrumentRegistry {
        let make = |name: &str, category, ticker: Option<&str>| Instrument {
            name: name.to_string(),
            category,
            ticker: ticker.map(str::to_string),
            description: None,
        };
        InstrumentRegistry::new(vec![
            make("KODEX 200", AssetCategory::EquityFund, Some("069500.KS")),
            make("TIGER S&P500", AssetCategory::EquityFund, Some("360750.KS")),
            make("KRX Gold", AssetCategory::Gold, Some("GLD")),
            make("Parking account", AssetCategory::Cash, None),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_to_every_instrument_in_selected_categories() {
        let registry = registry();
        let request = PlanRequest::new(
            RiskTolerance::default(),
            [AssetCategory::EquityFund, AssetCategory::Stock],
        );
        let chosen = request.resolve_instruments(&registry).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[&AssetCategory::EquityFund].len(), 2);
    }

    #[test]
    fn named_instruments_are_grouped_and_deduplicated() {
        let registry = registry();
        let request = PlanRequest::new(
            RiskTolerance::default(),
            [AssetCategory::EquityFund, AssetCategory::Gold],
        )
        .with_instruments(["krx gold".to_string(), "KRX Gold".to_string()])
        .with_amount(1_000_000.0);

        let chosen = request.resolve_instruments(&registry).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[&AssetCategory::Gold].len(), 1);
        assert_eq!(request.amount(), Some(1_000_000.0));
    }

    #[test]
    fn rejects_unknown_or_unselected_instruments() {
        let registry = registry();
        let request = PlanRequest::new(RiskTolerance::default(), [AssetCategory::Gold])
            .with_instruments(["Nope".to_string()]);
        assert!(matches!(
            request.resolve_instruments(&registry),
            Err(PlanError::InvalidInput(_))
        ));

        let request = PlanRequest::new(RiskTolerance::default(), [AssetCategory::Gold])
            .with_instruments(["KODEX 200".to_string()]);
        let err = request.resolve_instruments(&registry).unwrap_err();
        assert!(err.to_string().contains("not selected"));
    }
}
