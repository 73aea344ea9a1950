mod po3;
pub mod smt;

pub use po3::{DetectorConfig, Imbalance, Po3Detector, Raid, detect_imbalance, find_raid};
pub use smt::check_divergence;
