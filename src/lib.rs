pub mod config;
pub mod decoder;
pub mod market;
pub mod pipeline;
pub mod telemetry;
