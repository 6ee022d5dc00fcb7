pub mod config;
pub mod executor;
pub mod expression;
pub mod function;
pub mod planner;
pub mod processor;
pub mod record;

pub use config::EngineConfig;
pub use processor::{Outcome, SqlProcessor};
pub use record::Record;
