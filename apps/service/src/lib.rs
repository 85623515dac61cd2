pub mod alerting;
pub mod config;
pub mod database;
pub mod engine;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;
pub mod store;

#[cfg(test)]
mod test_support;

pub use engine::Engine;
