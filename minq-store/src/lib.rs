//! Primitive store contract for minq
//!
//! The queue engine is built entirely on a small set of atomic primitives
//! (counters, scalar get/set, lists, sets, rename, prefix scan). This crate
//! defines that contract as the [`Store`] trait and ships an in-memory
//! implementation, [`EphemeralStore`], for tests and embedded use.

mod ephemeral;
mod traits;

pub use ephemeral::EphemeralStore;
pub use traits::{Store, StoreError};
