use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Which way a category moves when risk tolerance departs from neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tilt {
    Defensive,
    Neutral,
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Cash,
    ShortTermBond,
    MidLongBond,
    LongBond,
    Gold,
    EquityFund,
    Stock,
    Commodity,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 8] = [
        AssetCategory::Cash,
        AssetCategory::ShortTermBond,
        AssetCategory::MidLongBond,
        AssetCategory::LongBond,
        AssetCategory::Gold,
        AssetCategory::EquityFund,
        AssetCategory::Stock,
        AssetCategory::Commodity,
    ];

    pub fn tilt(&self) -> Tilt {
        match self {
            AssetCategory::Cash
            | AssetCategory::ShortTermBond
            | AssetCategory::MidLongBond
            | AssetCategory::LongBond => Tilt::Defensive,
            AssetCategory::Gold => Tilt::Neutral,
            AssetCategory::EquityFund | AssetCategory::Stock | AssetCategory::Commodity => {
                Tilt::Aggressive
            }
        }
    }

    /// Percentage of the portfolio this category gets at neutral risk.
    pub fn base_weight(&self) -> f64 {
        match self {
            AssetCategory::Cash => 30.0,
            AssetCategory::ShortTermBond => 10.0,
            AssetCategory::MidLongBond => 10.0,
            AssetCategory::LongBond => 10.0,
            AssetCategory::Gold => 10.0,
            AssetCategory::EquityFund => 20.0,
            AssetCategory::Stock => 5.0,
            AssetCategory::Commodity => 5.0,
        }
    }

    /// Returns display name and emoji for the category
    pub fn display_info(&self) -> (&'static str, &'static str) {
        match self {
            AssetCategory::Cash => ("Cash & savings", "💵"),
            AssetCategory::ShortTermBond => ("Short-term bonds", "📄"),
            AssetCategory::MidLongBond => ("Mid/long-term bonds", "📑"),
            AssetCategory::LongBond => ("Long-term bonds", "📜"),
            AssetCategory::Gold => ("Gold", "🥇"),
            AssetCategory::EquityFund => ("Equity funds", "📊"),
            AssetCategory::Stock => ("Stocks", "📈"),
            AssetCategory::Commodity => ("Commodities", "🛢️"),
        }
    }

    fn key(&self) -> &'static str {
        match self {
            AssetCategory::Cash => "cash",
            AssetCategory::ShortTermBond => "short_term_bond",
            AssetCategory::MidLongBond => "mid_long_bond",
            AssetCategory::LongBond => "long_bond",
            AssetCategory::Gold => "gold",
            AssetCategory::EquityFund => "equity_fund",
            AssetCategory::Stock => "stock",
            AssetCategory::Commodity => "commodity",
        }
    }
}

impl Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for AssetCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' ', '/'], "_");
        match normalized.as_str() {
            "cash" | "savings" | "cash_equivalent" => Ok(AssetCategory::Cash),
            "short_term_bond" | "short_bond" => Ok(AssetCategory::ShortTermBond),
            "mid_long_bond" | "mid_bond" => Ok(AssetCategory::MidLongBond),
            "long_bond" | "long_term_bond" => Ok(AssetCategory::LongBond),
            "gold" => Ok(AssetCategory::Gold),
            "equity_fund" | "fund" | "etf" => Ok(AssetCategory::EquityFund),
            "stock" | "stocks" | "equity" => Ok(AssetCategory::Stock),
            "commodity" | "commodities" => Ok(AssetCategory::Commodity),
            _ => Err(anyhow::anyhow!("Invalid asset category: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_table_sums_to_hundred() {
        let total: f64 = AssetCategory::ALL.iter().map(|c| c.base_weight()).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn parses_aliases_and_display_round_trips() {
        assert_eq!(
            "Mid/Long Bond".parse::<AssetCategory>().unwrap(),
            AssetCategory::MidLongBond
        );
        assert_eq!("savings".parse::<AssetCategory>().unwrap(), AssetCategory::Cash);
        for category in AssetCategory::ALL {
            assert_eq!(category.to_string().parse::<AssetCategory>().unwrap(), category);
        }
        assert!("crypto".parse::<AssetCategory>().is_err());
    }

    #[test]
    fn gold_is_the_only_neutral_category() {
        let neutral: Vec<_> = AssetCategory::ALL
            .into_iter()
            .filter(|c| c.tilt() == Tilt::Neutral)
            .collect();
        assert_eq!(neutral, vec![AssetCategory::Gold]);
    }
}
