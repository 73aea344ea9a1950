pub mod live_scanner;
pub mod session;
