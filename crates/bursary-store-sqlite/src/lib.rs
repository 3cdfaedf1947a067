//! SQLite backend for the Bursary platform store.
//!
//! Every ledger mutation (sponsorship, donation completion, refund,
//! verification approval) runs inside a single SQLite transaction, so the
//! denormalized balances can never be observed out of step with the
//! donation rows that justify them.

pub mod encode;
pub mod error;
pub mod schema;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use store::SqliteStore;
