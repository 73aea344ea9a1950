pub mod data_collector;
pub mod predictor;
pub mod smartcore_predictor;
