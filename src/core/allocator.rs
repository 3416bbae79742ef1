//! Maps a risk tolerance and a category selection to percentage weights.

use super::category::{AssetCategory, Tilt};
use super::error::PlanError;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const NEUTRAL_RISK: f64 = 50.0;
pub const DEFAULT_SHIFT_PER_POINT: f64 = 0.4;

/// A risk tolerance in `[0, 100]`. Low values favour defensive categories.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RiskTolerance(f64);

impl RiskTolerance {
    pub fn new(value: f64) -> Result<Self, PlanError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(PlanError::InvalidInput(format!(
                "risk tolerance must be between 0 and 100, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for RiskTolerance {
    fn default() -> Self {
        Self(NEUTRAL_RISK)
    }
}

/// Percentage weight per category. Every category is present; unselected
/// ones carry 0.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationWeights {
    weights: BTreeMap<AssetCategory, f64>,
}

impl AllocationWeights {
    /// Builds weights from explicit percentages. Missing categories get 0.
    pub fn from_percentages(
        percentages: impl IntoIterator<Item = (AssetCategory, f64)>,
    ) -> Self {
        let mut weights: BTreeMap<AssetCategory, f64> =
            AssetCategory::ALL.iter().map(|c| (*c, 0.0)).collect();
        for (category, pct) in percentages {
            weights.insert(category, pct);
        }
        Self { weights }
    }

    pub fn get(&self, category: AssetCategory) -> f64 {
        self.weights.get(&category).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w))
    }

    /// Categories with a nonzero weight, in enum order.
    pub fn nonzero(&self) -> impl Iterator<Item = (AssetCategory, f64)> + '_ {
        self.iter().filter(|(_, w)| *w > 0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Base table and shift coefficient driving the allocation.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    base: BTreeMap<AssetCategory, f64>,
    shift_per_point: f64,
}

impl Default for AllocationModel {
    fn default() -> Self {
        Self {
            base: AssetCategory::ALL
                .iter()
                .map(|c| (*c, c.base_weight()))
                .collect(),
            shift_per_point: DEFAULT_SHIFT_PER_POINT,
        }
    }
}

impl AllocationModel {
    /// Creates a model with custom base weights. Categories missing from
    /// `base` fall back to the built-in table.
    pub fn new(
        base: &BTreeMap<AssetCategory, f64>,
        shift_per_point: f64,
    ) -> Result<Self, PlanError> {
        if !shift_per_point.is_finite() || shift_per_point < 0.0 {
            return Err(PlanError::InvalidConfig(format!(
                "shift_per_point must be a non-negative number, got {shift_per_point}"
            )));
        }
        let mut model = Self {
            shift_per_point,
            ..Self::default()
        };
        for (category, weight) in base {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "base weight for {category} must be a non-negative number, got {weight}"
                )));
            }
            model.base.insert(*category, *weight);
        }
        Ok(model)
    }

    pub fn shift_per_point(&self) -> f64 {
        self.shift_per_point
    }

    /// Configured weight of `category` at neutral risk.
    pub fn base_weight(&self, category: AssetCategory) -> f64 {
        self.base.get(&category).copied().unwrap_or(0.0)
    }

    /// Weight of one category after the risk shift and the clamp, before
    /// normalization.
    fn shifted_weight(&self, category: AssetCategory, risk: RiskTolerance) -> f64 {
        let base = self.base_weight(category);
        let deviation = risk.value() - NEUTRAL_RISK;
        let shifted = match category.tilt() {
            Tilt::Defensive => base - deviation * self.shift_per_point,
            Tilt::Aggressive => base + deviation * self.shift_per_point,
            Tilt::Neutral => base,
        };
        shifted.max(0.0)
    }

    pub fn allocate(
        &self,
        risk: RiskTolerance,
        selected: &BTreeSet<AssetCategory>,
    ) -> Result<AllocationWeights, PlanError> {
        if selected.is_empty() {
            return Err(PlanError::EmptySelection(
                "select at least one asset category".to_string(),
            ));
        }

        let raw: Vec<(AssetCategory, f64)> = AssetCategory::ALL
            .iter()
            .map(|c| {
                let weight = if selected.contains(c) {
                    self.shifted_weight(*c, risk)
                } else {
                    0.0
                };
                (*c, weight)
            })
            .collect();

        let total: f64 = raw.iter().map(|(_, w)| w).sum();
        debug!(risk = risk.value(), total, "Shifted allocation: {raw:?}");
        if total <= 0.0 {
            return Err(PlanError::DegenerateAllocation);
        }

        Ok(AllocationWeights::from_percentages(
            raw.into_iter().map(|(c, w)| (c, w / total * 100.0)),
        ))
    }
}
