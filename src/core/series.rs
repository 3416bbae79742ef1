//! Daily price history for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Ordered `(date, price)` pairs with strictly increasing dates and
/// strictly positive prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from unordered points. Non-finite and non-positive
    /// prices are dropped; for duplicate dates the last price wins.
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let by_date: BTreeMap<NaiveDate, f64> = points
            .into_iter()
            .filter(|(_, price)| price.is_finite() && *price > 0.0)
            .collect();
        Self {
            points: by_date
                .into_iter()
                .map(|(date, price)| PricePoint { date, price })
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].price)
    }

    /// Points falling inside `[start, end]`.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }

    /// Rebases the series so the first price reads 100.
    pub fn rebased(&self) -> Self {
        let Some(base) = self.first().map(|p| p.price) else {
            return Self::empty();
        };
        Self {
            points: self
                .points
                .iter()
                .map(|p| PricePoint {
                    date: p.date,
                    price: p.price / base * 100.0,
                })
                .collect(),
        }
    }

    /// Percent change between the first and the last point.
    pub fn change_pct(&self) -> Option<f64> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) if self.len() >= 2 => {
                Some((last.price - first.price) / first.price * 100.0)
            }
            _ => None,
        }
    }
}
