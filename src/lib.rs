pub mod commands;
pub mod config;
pub mod discovery;
pub mod executor;
pub mod fs;
pub mod keyvalue;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod sandbox;
pub mod utils;
