pub mod config;
pub mod db;
pub mod diag;
pub mod directory;
pub mod history;
pub mod init;
pub mod log;
pub mod punch;
pub mod purge;
pub mod report;
pub mod units;
