//! Shared types for limitledger: limit records, interactions, configuration
//! and the common error type.

pub mod config;
pub mod error;
pub mod interaction;
pub mod limit;
