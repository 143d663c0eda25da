//! Queue engine for minq
//!
//! Turns the primitive operations of a [`minq_store::Store`] into named,
//! durable, FIFO-ish queues: per-message identity, soft (reference-counted)
//! and hard reads, a claim-based get-and-delete protocol, batch drains, and
//! per-queue consumption policies. The engine is stateless; every piece of
//! cross-call state lives in the store under a key-naming convention.

mod engine;
mod policy;


pub use engine::{
    normalize, Claim, Deletion, Delivery, QueueEngine, QueueError, Record, QUEUE_SET,
};
pub use policy::{Policy, StoredPolicy};
