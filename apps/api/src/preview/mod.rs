// Preview service: orchestration of one generation pass, its configuration,
// persistence of the result, and the HTTP handlers in front of it.

pub mod config;
pub mod generator;
pub mod handlers;
pub mod storage;

pub use config::PreviewConfig;
