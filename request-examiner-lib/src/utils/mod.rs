pub mod env;
pub mod os;
pub mod telemetry;
