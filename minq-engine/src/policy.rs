//! Per-queue consumption policies

use serde::{Deserialize, Serialize};

/// A policy a caller may set on a queue. The delivery layer consults it;
/// the engine only stores and reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Broadcast,
    Roundrobin,
}

impl Policy {
    /// Numeric code written to the store.
    pub const fn code(self) -> u8 {
        match self {
            Self::Broadcast => 1,
            Self::Roundrobin => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Roundrobin => "roundrobin",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "broadcast" => Some(Self::Broadcast),
            "roundrobin" => Some(Self::Roundrobin),
            _ => None,
        }
    }
}

/// A policy as decoded from the store. The stored value may be stale or
/// corrupt, so decoding keeps an explicit `Unrecognized` case instead of
/// assuming validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredPolicy {
    Broadcast,
    Roundrobin,
    #[serde(rename = "unknown")]
    Unrecognized,
}

impl StoredPolicy {
    pub fn decode(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw).ok().and_then(|s| s.parse::<u8>().ok()) {
            Some(1) => Self::Broadcast,
            Some(2) => Self::Roundrobin,
            _ => Self::Unrecognized,
        }
    }

    /// Decode an optional stored value; an absent policy means broadcast.
    pub fn decode_or_default(raw: Option<&bytes::Bytes>) -> Self {
        raw.map_or(Self::Broadcast, |b| Self::decode(b))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Roundrobin => "roundrobin",
            Self::Unrecognized => "unknown",
        }
    }
}

impl From<Policy> for StoredPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Broadcast => Self::Broadcast,
            Policy::Roundrobin => Self::Roundrobin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for policy in [Policy::Broadcast, Policy::Roundrobin] {
            assert_eq!(Policy::from_name(policy.name()), Some(policy));
        }
        assert_eq!(Policy::from_name("bogus"), None);
    }

    #[test]
    fn test_decode_codes() {
        assert_eq!(StoredPolicy::decode(b"1"), StoredPolicy::Broadcast);
        assert_eq!(StoredPolicy::decode(b"2"), StoredPolicy::Roundrobin);
        assert_eq!(StoredPolicy::decode(b"7"), StoredPolicy::Unrecognized);
        assert_eq!(StoredPolicy::decode(b"garbage"), StoredPolicy::Unrecognized);
        assert_eq!(StoredPolicy::decode(b"\xff"), StoredPolicy::Unrecognized);
    }

    #[test]
    fn test_absent_policy_defaults_to_broadcast() {
        assert_eq!(
            StoredPolicy::decode_or_default(None),
            StoredPolicy::Broadcast
        );
        let raw = bytes::Bytes::from_static(b"2");
        assert_eq!(
            StoredPolicy::decode_or_default(Some(&raw)),
            StoredPolicy::Roundrobin
        );
    }

    #[test]
    fn test_unrecognized_renders_unknown() {
        assert_eq!(StoredPolicy::Unrecognized.name(), "unknown");
    }
}
