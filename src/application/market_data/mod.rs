pub mod alignment;
pub mod feature_engine;
pub mod liquidity;

pub use alignment::align_by_timestamp;
pub use feature_engine::{FeatureEngine, FeatureEngineConfig};
