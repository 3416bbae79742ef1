//! Core business logic abstractions

pub mod allocator;
pub mod apportion;
pub mod backtest;
pub mod cache;
pub mod category;
pub mod config;
pub mod error;
pub mod instrument;
pub mod log;
pub mod price;
pub mod request;
pub mod series;

// Re-export main types for cleaner imports
pub use allocator::{AllocationModel, AllocationWeights, RiskTolerance};
pub use category::{AssetCategory, Tilt};
pub use error::{InstrumentWarning, PlanError};
pub use instrument::{Instrument, InstrumentRegistry};
pub use price::{HistoricalPeriod, PriceProvider, PriceWindow};
pub use request::PlanRequest;
pub use series::PriceSeries;
