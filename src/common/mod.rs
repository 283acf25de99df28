//! Common types, traits, configuration and error definitions for store_navigation
//!
//! This module provides the foundational building blocks used across
//! every routing stage in this crate.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
