pub mod outcome;
pub mod simulator;
