pub mod aggregator;
pub mod analyzer;
pub mod api;
pub mod config;
pub mod data_models;
pub mod error;
pub mod exa;
pub mod options;
pub mod suggestions;
