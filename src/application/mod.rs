pub mod agents;
pub mod market_data;
pub mod ml;
pub mod optimization;
pub mod scan_harness;
pub mod strategies;
