//! taskbatch library — application logic for the batch demos.

pub mod app;
pub mod config;
pub mod errors;
