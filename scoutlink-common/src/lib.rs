//! # Scoutlink Common Library
//!
//! Shared code for the scoutlink services:
//! - Common error types
//! - Configuration loading (TOML file + environment overrides)
//! - Phone number utilities

pub mod config;
pub mod error;
pub mod phone;

pub use error::{Error, Result};
