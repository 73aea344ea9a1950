// Domain-specific error types
pub mod errors;

// Candle series, derived columns and session time
pub mod market;

// Model feature contract
pub mod ml;

// Port interfaces
pub mod ports;

pub mod ring_buffer;

// Core trading domain
pub mod trading;
