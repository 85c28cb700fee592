//! Core module - shared infrastructure for sei-termos
//!
//! This module contains the data model, configuration, and error handling
//! used throughout the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{FailureScope, Result, SeiError};
pub use types::*;
