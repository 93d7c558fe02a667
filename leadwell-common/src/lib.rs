//! # LeadWell Common Library
//!
//! Shared code for the LeadWell lead-management service:
//! - Domain models and insert/patch records
//! - Configuration loading and resolution
//! - The pure lead scoring heuristic
//! - Common error type

pub mod config;
pub mod error;
pub mod models;
pub mod scoring;

pub use error::{Error, Result};
