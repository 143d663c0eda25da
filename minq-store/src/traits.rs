//! Store backend traits

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wrong kind of value at key: {0}")]
    WrongType(String),

    #[error("value at {0} is not an integer")]
    NotAnInteger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Abstract atomic key-value/list store.
///
/// Every method is a single primitive the backend must execute atomically;
/// callers get no atomicity across calls. Values are opaque byte strings,
/// keys and set members are UTF-8 strings. "Absent" is an `Option::None` or
/// a zero count, never an error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Increment the integer counter at `key`, creating it at 0 first.
    /// Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<u64, StoreError>;

    /// Store a scalar value, overwriting anything already at `key`.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Read a scalar value.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Batched read. The result preserves request order; missing or
    /// non-scalar keys yield `None` holes.
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Bytes>>, StoreError>;

    /// Append to the tail of the list at `list`, creating it if absent.
    /// Returns the new list length.
    async fn push_tail(&self, list: &str, value: Bytes) -> Result<u64, StoreError>;

    /// Remove and return the head of the list, or `None` if empty/absent.
    async fn pop_head(&self, list: &str) -> Result<Option<Bytes>, StoreError>;

    /// Read the list element at `index` without removing it.
    async fn peek_index(&self, list: &str, index: u64) -> Result<Option<Bytes>, StoreError>;

    /// Read elements `start..=stop` of the list. Negative indices count
    /// from the tail; out-of-range bounds are clamped.
    async fn range(&self, list: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError>;

    /// Current list length; an absent list has length 0.
    async fn list_len(&self, list: &str) -> Result<u64, StoreError>;

    /// Add `member` to the set at `set`. Returns whether it was newly added.
    async fn set_add(&self, set: &str, member: &str) -> Result<bool, StoreError>;

    /// All members of the set, in no particular order.
    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Delete `key` of any kind. Returns the number of keys removed
    /// (0 means the key did not exist).
    async fn remove(&self, key: &str) -> Result<u64, StoreError>;

    /// Atomically move the value at `src` to `dst`, overwriting `dst`.
    /// Returns `false` if `src` did not exist.
    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError>;

    /// All keys starting with `prefix`. Cost scales with total keyspace.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

// Shared handles count as stores, so several engines can sit on one backend.
#[async_trait]
impl<T: Store + ?Sized> Store for Arc<T> {
    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        (**self).incr(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        (**self).get(key).await
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Bytes>>, StoreError> {
        (**self).mget(keys).await
    }

    async fn push_tail(&self, list: &str, value: Bytes) -> Result<u64, StoreError> {
        (**self).push_tail(list, value).await
    }

    async fn pop_head(&self, list: &str) -> Result<Option<Bytes>, StoreError> {
        (**self).pop_head(list).await
    }

    async fn peek_index(&self, list: &str, index: u64) -> Result<Option<Bytes>, StoreError> {
        (**self).peek_index(list, index).await
    }

    async fn range(&self, list: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError> {
        (**self).range(list, start, stop).await
    }

    async fn list_len(&self, list: &str) -> Result<u64, StoreError> {
        (**self).list_len(list).await
    }

    async fn set_add(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        (**self).set_add(set, member).await
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        (**self).set_members(set).await
    }

    async fn remove(&self, key: &str) -> Result<u64, StoreError> {
        (**self).remove(key).await
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError> {
        (**self).rename(src, dst).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).scan_prefix(prefix).await
    }
}
