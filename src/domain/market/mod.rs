// Market data domain: series store and derived columns
pub mod augmented;
pub mod series;
pub mod session_clock;
