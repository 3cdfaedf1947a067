//! Core types and trait definitions for the Bursary donation platform.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod admin;
pub mod donation;
pub mod donor;
pub mod error;
pub mod export;
pub mod ledger;
pub mod money;
pub mod query;
pub mod recurring;
pub mod registry;
pub mod store;
pub mod student;
pub mod verification;

pub use error::{Error, Result};
pub use money::Cents;
