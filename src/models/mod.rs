pub mod diagnostic;
pub mod directory;
pub mod purge;
pub mod report;
pub mod session;
pub mod unit;
