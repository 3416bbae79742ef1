//! Splits a currency amount into whole-unit purchases.

use super::allocator::AllocationWeights;
use super::category::AssetCategory;
use super::error::{InstrumentWarning, PlanError};
use super::instrument::Instrument;
use std::collections::BTreeMap;
use tracing::debug;

/// An instrument paired with its current unit price, if one is known.
#[derive(Debug, Clone)]
pub struct PricedInstrument<'a> {
    pub instrument: &'a Instrument,
    pub price: Option<f64>,
    /// Why the price is missing, when the lookup failed.
    pub price_error: Option<String>,
}

impl<'a> PricedInstrument<'a> {
    pub fn known(instrument: &'a Instrument, price: f64) -> Self {
        Self {
            instrument,
            price: Some(price),
            price_error: None,
        }
    }

    pub fn unknown(instrument: &'a Instrument, reason: impl Into<String>) -> Self {
        Self {
            instrument,
            price: None,
            price_error: Some(reason.into()),
        }
    }

    fn usable_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Bought { units: u64, spent: f64 },
    /// The per-instrument budget does not cover a single unit.
    BelowMinimum { minimum_buy_in: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseLine {
    pub instrument: String,
    pub unit_price: f64,
    pub budget: f64,
    pub outcome: PurchaseOutcome,
}

impl PurchaseLine {
    pub fn units(&self) -> u64 {
        match self.outcome {
            PurchaseOutcome::Bought { units, .. } => units,
            PurchaseOutcome::BelowMinimum { .. } => 0,
        }
    }

    pub fn spent(&self) -> f64 {
        match self.outcome {
            PurchaseOutcome::Bought { spent, .. } => spent,
            PurchaseOutcome::BelowMinimum { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPurchase {
    pub amount: f64,
    pub lines: Vec<PurchaseLine>,
    pub unavailable: Vec<InstrumentWarning>,
    pub spent: f64,
    pub leftover: f64,
}

/// Divides `amount` evenly over the instruments with a known price and buys
/// whole units of each.
pub fn apportion(amount: f64, chosen: &[PricedInstrument]) -> Result<CategoryPurchase, PlanError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PlanError::InvalidInput(format!(
            "amount must be a non-negative number, got {amount}"
        )));
    }
    if chosen.is_empty() {
        return Err(PlanError::EmptySelection(
            "choose at least one instrument".to_string(),
        ));
    }

    let (priced, unpriced): (Vec<_>, Vec<_>) =
        chosen.iter().partition(|c| c.usable_price().is_some());

    let unavailable: Vec<InstrumentWarning> = unpriced
        .iter()
        .map(|c| {
            let reason = c.price_error.clone().unwrap_or_else(|| {
                if c.instrument.has_market_price() {
                    "price unavailable".to_string()
                } else {
                    "no market price (manual product)".to_string()
                }
            });
            InstrumentWarning::new(&c.instrument.name, reason)
        })
        .collect();

    if priced.is_empty() {
        debug!("No priced instruments; {amount} stays as cash");
        return Ok(CategoryPurchase {
            amount,
            lines: Vec::new(),
            unavailable,
            spent: 0.0,
            leftover: amount,
        });
    }

    let budget = amount / priced.len() as f64;
    let mut remaining = amount;
    let mut lines = Vec::with_capacity(priced.len());

    for choice in priced {
        let Some(price) = choice.usable_price() else {
            continue;
        };
        let units = (budget / price).floor();
        let outcome = if units > 0.0 {
            let spent = units * price;
            remaining -= spent;
            PurchaseOutcome::Bought {
                units: units as u64,
                spent,
            }
        } else {
            PurchaseOutcome::BelowMinimum {
                minimum_buy_in: price,
            }
        };
        debug!(instrument = %choice.instrument.name, budget, price, ?outcome, "Apportioned");
        lines.push(PurchaseLine {
            instrument: choice.instrument.name.clone(),
            unit_price: price,
            budget,
            outcome,
        });
    }

    Ok(CategoryPurchase {
        amount,
        spent: amount - remaining,
        leftover: remaining,
        lines,
        unavailable,
    })
}

/// Purchase breakdown for a whole plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPurchase {
    pub total_amount: f64,
    pub categories: BTreeMap<AssetCategory, CategoryPurchase>,
    /// Categories with weight but no chosen instruments, with their amount.
    pub skipped: Vec<(AssetCategory, f64)>,
}

impl PlanPurchase {
    pub fn spent(&self) -> f64 {
        self.categories.values().map(|c| c.spent).sum()
    }

    pub fn leftover(&self) -> f64 {
        self.total_amount - self.spent()
    }
}

/// Splits `total_amount` by `weights`, then apportions each category's share
/// over the instruments chosen for it.
pub fn apportion_plan(
    total_amount: f64,
    weights: &AllocationWeights,
    chosen: &BTreeMap<AssetCategory, Vec<PricedInstrument>>,
) -> Result<PlanPurchase, PlanError> {
    if !total_amount.is_finite() || total_amount <= 0.0 {
        return Err(PlanError::InvalidInput(format!(
            "investment amount must be positive, got {total_amount}"
        )));
    }
    let has_choice = weights
        .nonzero()
        .any(|(category, _)| chosen.get(&category).is_some_and(|c| !c.is_empty()));
    if !has_choice {
        return Err(PlanError::EmptySelection(
            "no instruments chosen in any weighted category".to_string(),
        ));
    }

    let mut plan = PlanPurchase {
        total_amount,
        categories: BTreeMap::new(),
        skipped: Vec::new(),
    };

    for (category, weight) in weights.nonzero() {
        let amount = total_amount * weight / 100.0;
        match chosen.get(&category) {
            Some(instruments) if !instruments.is_empty() => {
                plan.categories
                    .insert(category, apportion(amount, instruments)?);
            }
            _ => {
                debug!("{}", PlanError::no_instruments(category));
                plan.skipped.push((category, amount));
            }
        }
    }

    Ok(plan)
}
