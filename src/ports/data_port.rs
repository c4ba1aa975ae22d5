//! Price data access port trait.

use std::path::Path;

use crate::domain::error::StratError;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Load an ordered price series; out-of-order rows are an error.
    fn load_series(&self, path: &Path) -> Result<PriceSeries, StratError>;
}
