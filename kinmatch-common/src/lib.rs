//! # kinmatch Common Library
//!
//! Shared code for the kinmatch crates including:
//! - Subject / candidate data model
//! - Free-text partial date parsing
//! - Configuration loading
//! - Tracing setup
//! - Common error type

pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod model;

pub use error::{Error, Result};
