pub mod api;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod geo;
pub mod models;
pub mod observability;
pub mod state;
pub mod storage;
pub mod workflows;
