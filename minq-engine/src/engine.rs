//! The queue engine
//!
//! Adding an element to a queue:
//! - increment the queue's UUID counter to mint a message id
//! - store the payload under `<queue>:<id>`
//! - push that key onto the list `<queue>:queue`
//! - on the first id, register the list key in the global `QUEUESET`
//!
//! Getting an element pops a key from the list and fetches the record it
//! names. Deleting is separate: a hard get leaves the record in the store
//! until the caller issues a delete, or uses the combined get-and-delete
//! claim protocol.

use bytes::Bytes;
use minq_store::{Store, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::policy::{Policy, StoredPolicy};

/// The set which holds the list key of every queue ever created.
pub const QUEUE_SET: &str = "QUEUESET";

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// A queue name, payload, or key was not valid UTF-8.
    #[error("strings must be utf-8")]
    InvalidEncoding,

    /// `set_policy` was handed a name outside the defined enumeration.
    /// The stored policy is left untouched.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A message handed out by [`QueueEngine::dequeue`].
///
/// `count` is the message's reference count after a soft get; hard gets
/// never read the counter and always report 0. `value` can be absent if the
/// record was deleted between the list read and the value fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub key: String,
    pub value: Option<Bytes>,
    pub count: u64,
}

/// A message key/value pair from a batch drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub key: String,
    pub value: Option<Bytes>,
}

/// Result of [`QueueEngine::delete`]. `removed == 0` means the key did not
/// exist in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub key: String,
    pub removed: u64,
}

/// Outcome of the [`QueueEngine::get_and_delete`] claim protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Claim {
    /// Nothing was queued.
    Empty,
    /// A concurrent consumer interrupted the protocol mid-flight; the
    /// caller may retry the whole operation.
    Contended,
    /// The message was claimed, read, and removed.
    Message {
        policy: StoredPolicy,
        key: String,
        value: Option<Bytes>,
    },
}

/// Canonical UTF-8 form of a byte-string input. Every public engine
/// operation normalizes its inputs before deriving any key.
pub fn normalize(item: &[u8]) -> Result<&str, QueueError> {
    std::str::from_utf8(item).map_err(|_| QueueError::InvalidEncoding)
}

fn counter_key(queue: &str) -> String {
    format!("{}:UUID", queue)
}

fn list_key(queue: &str) -> String {
    format!("{}:queue", queue)
}

fn policy_key(queue: &str) -> String {
    format!("{}:queuepolicy", queue)
}

fn message_key(queue: &str, id: u64) -> String {
    format!("{}:{}", queue, id)
}

fn refcount_key(message_key: &str) -> String {
    format!("{}:refcount", message_key)
}

fn lock_key(message_key: &str) -> String {
    format!("{}:lock", message_key)
}

/// Stateless queue logic over a [`Store`].
///
/// The engine holds no state of its own; reference counts, policies, and
/// lock markers all live in the store under the key-naming convention, so
/// any number of engines may share one store. Only individual store
/// primitives are atomic; the documented race windows between them are
/// accepted and surface as absence sentinels, never as errors.
pub struct QueueEngine<S> {
    store: S,
}

impl<S: Store> QueueEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append a message to the queue, creating the queue on first use.
    /// Returns the new message key.
    ///
    /// The sequence counter-increment / record-set / registry-add /
    /// list-push is not transactional: a crash mid-sequence can leave a
    /// record unreachable or a queue unregistered. There is no rollback.
    pub async fn enqueue(&self, queue: &[u8], value: &[u8]) -> Result<String, QueueError> {
        let queue = normalize(queue)?;
        let value = Bytes::copy_from_slice(normalize(value)?.as_bytes());

        let id = self.store.incr(&counter_key(queue)).await?;
        let key = message_key(queue, id);
        self.store.set(&key, value).await?;

        let lkey = list_key(queue);
        if id == 1 {
            // First message this queue has ever minted: register it. The
            // gap between the increment and this add is an accepted race.
            self.store.set_add(QUEUE_SET, &lkey).await?;
        }

        self.store.push_tail(&lkey, Bytes::from(key.clone())).await?;
        info!(queue = %queue, key = %key, "enqueued message");
        Ok(key)
    }

    /// Take the queue head. `None` means the queue is empty, which is a
    /// normal outcome.
    ///
    /// A hard get (`soft == false`) pops the key off the list; the record
    /// stays in the store until a separate [`delete`](Self::delete). A soft
    /// get peeks without removing and bumps the message's reference
    /// counter, so repeated soft gets keep returning the same head.
    pub async fn dequeue(
        &self,
        queue: &[u8],
        soft: bool,
    ) -> Result<Option<(StoredPolicy, Delivery)>, QueueError> {
        let queue = normalize(queue)?;
        let lkey = list_key(queue);

        let raw = if soft {
            self.store.peek_index(&lkey, 0).await?
        } else {
            self.store.pop_head(&lkey).await?
        };
        let key = match raw {
            Some(raw) => normalize(raw.as_ref())?.to_string(),
            None => return Ok(None),
        };

        let pkey = policy_key(queue);
        let mut fetched = self.store.mget(&[pkey.as_str(), key.as_str()]).await?;
        let value = fetched.pop().flatten();
        let policy = StoredPolicy::decode_or_default(fetched.pop().flatten().as_ref());

        let count = if soft {
            self.store.incr(&refcount_key(&key)).await?
        } else {
            0
        };

        debug!(queue = %queue, key = %key, soft, "dequeued message");
        Ok(Some((policy, Delivery { key, value, count })))
    }

    /// Delete a message record from the store (not from any list). The
    /// caller must have hard-dequeued the key first; the engine does not
    /// check.
    pub async fn delete(&self, queue: &[u8], key: &[u8]) -> Result<Deletion, QueueError> {
        normalize(queue)?;
        let key = normalize(key)?;

        let removed = self.store.remove(key).await?;
        info!(key = %key, removed, "deleted message record");
        Ok(Deletion {
            key: key.to_string(),
            removed,
        })
    }

    /// Number of not-yet-dequeued messages. Point-in-time, approximate
    /// under concurrency.
    pub async fn length(&self, queue: &[u8]) -> Result<u64, QueueError> {
        let queue = normalize(queue)?;
        Ok(self.store.list_len(&list_key(queue)).await?)
    }

    /// Every queue list key ever registered. Stale entries are never
    /// pruned.
    pub async fn list_queues(&self) -> Result<Vec<String>, QueueError> {
        Ok(self.store.set_members(QUEUE_SET).await?)
    }

    /// Pop, read, and delete the queue head in one best-effort protocol.
    ///
    /// The store has no pop-and-fetch-and-delete primitive, so the popped
    /// key is first renamed to a lock name owned by this caller. Any step
    /// losing a race with a concurrent consumer yields
    /// [`Claim::Contended`]; an interrupted caller can leave the record
    /// stranded under its lock name.
    pub async fn get_and_delete(&self, queue: &[u8]) -> Result<Claim, QueueError> {
        let queue = normalize(queue)?;
        let lkey = list_key(queue);

        let okey = match self.store.pop_head(&lkey).await? {
            Some(raw) => normalize(raw.as_ref())?.to_string(),
            None => return Ok(Claim::Empty),
        };

        let nkey = lock_key(&okey);
        if !self.store.rename(&okey, &nkey).await? {
            // The source vanished: a concurrent delete beat us to it.
            return Ok(Claim::Contended);
        }

        let pkey = policy_key(queue);
        let mut fetched = self.store.mget(&[pkey.as_str(), nkey.as_str()]).await?;
        let value = fetched.pop().flatten();
        let policy = StoredPolicy::decode_or_default(fetched.pop().flatten().as_ref());

        if self.store.remove(&nkey).await? == 0 {
            return Ok(Claim::Contended);
        }

        info!(queue = %queue, key = %okey, "got and deleted message");
        Ok(Claim::Message {
            policy,
            key: okey,
            value,
        })
    }

    /// Set the queue's consumption policy. Names outside the enumeration
    /// yield [`QueueError::InvalidPolicy`] and leave the store untouched.
    pub async fn set_policy(&self, queue: &[u8], policy: &[u8]) -> Result<Policy, QueueError> {
        let queue = normalize(queue)?;
        let name = normalize(policy)?;

        let policy = Policy::from_name(name)
            .ok_or_else(|| QueueError::InvalidPolicy(name.to_string()))?;
        self.store
            .set(&policy_key(queue), Bytes::from(policy.code().to_string()))
            .await?;

        info!(queue = %queue, policy = policy.name(), "set queue policy");
        Ok(policy)
    }

    /// The queue's stored policy. Absent or unrecognized codes decode to
    /// [`StoredPolicy::Unrecognized`] ("unknown").
    pub async fn get_policy(&self, queue: &[u8]) -> Result<StoredPolicy, QueueError> {
        let queue = normalize(queue)?;
        let raw = self.store.get(&policy_key(queue)).await?;
        Ok(raw.map_or(StoredPolicy::Unrecognized, |b| StoredPolicy::decode(&b)))
    }

    /// Destructively pop up to `count` messages in FIFO order, stopping
    /// early once the queue is empty. `None` means nothing was available.
    ///
    /// Each message costs a separate pop+get round trip; the loop as a
    /// whole is not atomic and may interleave with concurrent consumers.
    pub async fn tail(
        &self,
        queue: &[u8],
        count: usize,
    ) -> Result<Option<(StoredPolicy, Vec<Record>)>, QueueError> {
        let queue = normalize(queue)?;
        let lkey = list_key(queue);

        let mut records = Vec::new();
        for _ in 0..count {
            let key = match self.store.pop_head(&lkey).await? {
                Some(raw) => normalize(raw.as_ref())?.to_string(),
                None => break,
            };
            let value = self.store.get(&key).await?;
            records.push(Record { key, value });
        }

        if records.is_empty() {
            return Ok(None);
        }

        let raw = self.store.get(&policy_key(queue)).await?;
        let policy = StoredPolicy::decode_or_default(raw.as_ref());
        debug!(queue = %queue, count = records.len(), "tailed messages");
        Ok(Some((policy, records)))
    }

    /// Count every store key carrying the queue's prefix: records, the
    /// counter, the list, the policy, refcounts. Scans the whole keyspace;
    /// diagnostic use only, never a hot path.
    pub async fn count_elements(&self, queue: &[u8]) -> Result<usize, QueueError> {
        let queue = normalize(queue)?;
        Ok(self.store.scan_prefix(queue).await?.len())
    }

    /// The first `count` pending message keys, in list order, without
    /// removing anything.
    pub async fn last_items(&self, queue: &[u8], count: usize) -> Result<Vec<String>, QueueError> {
        let queue = normalize(queue)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let raw = self
            .store
            .range(&list_key(queue), 0, count as i64 - 1)
            .await?;
        raw.iter()
            .map(|b| normalize(b.as_ref()).map(ToOwned::to_owned))
            .collect()
    }
}
