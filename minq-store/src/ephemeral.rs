//! In-memory ephemeral store backend

use super::traits::*;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};

/// One stored value; a key holds exactly one kind at a time.
#[derive(Debug)]
enum Entry {
    Scalar(Bytes),
    List(VecDeque<Bytes>),
    Set(HashSet<String>),
}

/// Ephemeral (in-memory) store backend.
///
/// Each primitive acts under a single map-entry lock, which gives the
/// per-primitive atomicity the `Store` contract asks for. `rename` touches
/// two keys and is atomic only per process, which is all an in-memory
/// backend can promise anyway.
#[derive(Debug, Default)]
pub struct EphemeralStore {
    entries: DashMap<String, Entry>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_counter(raw: &Bytes, key: &str) -> Result<u64, StoreError> {
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))
    }
}

#[async_trait]
impl Store for EphemeralStore {
    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Scalar(Bytes::from_static(b"0")));

        match entry.value_mut() {
            Entry::Scalar(raw) => {
                let next = Self::parse_counter(raw, key)? + 1;
                *raw = Bytes::from(next.to_string());
                Ok(next)
            }
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), Entry::Scalar(value));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match entry.value() {
                Entry::Scalar(raw) => Ok(Some(raw.clone())),
                _ => Err(StoreError::WrongType(key.to_string())),
            },
        }
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Bytes>>, StoreError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            // Non-scalar keys are a hole, not an error, so one odd key
            // cannot poison a batch.
            let value = match self.entries.get(*key) {
                Some(entry) => match entry.value() {
                    Entry::Scalar(raw) => Some(raw.clone()),
                    _ => None,
                },
                None => None,
            };
            values.push(value);
        }
        Ok(values)
    }

    async fn push_tail(&self, list: &str, value: Bytes) -> Result<u64, StoreError> {
        let mut entry = self
            .entries
            .entry(list.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));

        match entry.value_mut() {
            Entry::List(items) => {
                items.push_back(value);
                Ok(items.len() as u64)
            }
            _ => Err(StoreError::WrongType(list.to_string())),
        }
    }

    async fn pop_head(&self, list: &str) -> Result<Option<Bytes>, StoreError> {
        let popped = match self.entries.get_mut(list) {
            None => return Ok(None),
            Some(mut entry) => match entry.value_mut() {
                Entry::List(items) => items.pop_front(),
                _ => return Err(StoreError::WrongType(list.to_string())),
            },
        };

        // Drained lists do not linger as keys.
        self.entries
            .remove_if(list, |_, entry| matches!(entry, Entry::List(items) if items.is_empty()));

        Ok(popped)
    }

    async fn peek_index(&self, list: &str, index: u64) -> Result<Option<Bytes>, StoreError> {
        match self.entries.get(list) {
            None => Ok(None),
            Some(entry) => match entry.value() {
                Entry::List(items) => Ok(items.get(index as usize).cloned()),
                _ => Err(StoreError::WrongType(list.to_string())),
            },
        }
    }

    async fn range(&self, list: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError> {
        let entry = match self.entries.get(list) {
            None => return Ok(Vec::new()),
            Some(entry) => entry,
        };

        match entry.value() {
            Entry::List(items) => {
                let len = items.len() as i64;
                let resolve = |i: i64| if i < 0 { len + i } else { i };
                let start = resolve(start).max(0);
                let stop = resolve(stop).min(len - 1);
                if len == 0 || start > stop {
                    return Ok(Vec::new());
                }
                Ok(items
                    .iter()
                    .skip(start as usize)
                    .take((stop - start + 1) as usize)
                    .cloned()
                    .collect())
            }
            _ => Err(StoreError::WrongType(list.to_string())),
        }
    }

    async fn list_len(&self, list: &str) -> Result<u64, StoreError> {
        match self.entries.get(list) {
            None => Ok(0),
            Some(entry) => match entry.value() {
                Entry::List(items) => Ok(items.len() as u64),
                _ => Err(StoreError::WrongType(list.to_string())),
            },
        }
    }

    async fn set_add(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let mut entry = self
            .entries
            .entry(set.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()));

        match entry.value_mut() {
            Entry::Set(members) => Ok(members.insert(member.to_string())),
            _ => Err(StoreError::WrongType(set.to_string())),
        }
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        match self.entries.get(set) {
            None => Ok(Vec::new()),
            Some(entry) => match entry.value() {
                Entry::Set(members) => Ok(members.iter().cloned().collect()),
                _ => Err(StoreError::WrongType(set.to_string())),
            },
        }
    }

    async fn remove(&self, key: &str) -> Result<u64, StoreError> {
        Ok(u64::from(self.entries.remove(key).is_some()))
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError> {
        match self.entries.remove(src) {
            None => Ok(false),
            Some((_, value)) => {
                self.entries.insert(dst.to_string(), value);
                Ok(true)
            }
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}
