pub mod backup;
pub mod diagnostic;
pub mod log;
pub mod progress;
pub mod punch;
pub mod purge;
pub mod reports;
pub mod resolver;
