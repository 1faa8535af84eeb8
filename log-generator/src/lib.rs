pub mod config;
pub mod payload;
pub mod runner;
pub mod sink;
