//! Common types and utilities for the transfer service
//!
//! This library contains shared types used across the workspace. It provides
//! a unified approach to error handling, decimal arithmetic, and the domain
//! models for accounts and transfers.

pub mod error;
pub mod model;
pub mod decimal;

/// Re-export important types
pub use error::{Error, Result, ErrorExt};
pub use decimal::*;
