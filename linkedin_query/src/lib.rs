pub mod cli;
pub mod config;
pub mod conversations;
pub mod error;
pub mod filters;
pub mod importer;
pub mod query;
pub mod store;
pub mod summary;
pub mod telemetry;
pub mod utils;
