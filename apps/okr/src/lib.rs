//! # okr
//!
//! Command-line driver for `okr-core`: loads a JSON data file, runs one
//! governed operation as a given actor, prints the result and optionally
//! writes the data back.

pub mod cli;
pub mod config;
pub mod error;

pub use error::AppError;
