//! Cheap order-sensitive change detection for annotation collections.
//!
//! The fingerprint hashes each record's canonical JSON bytes, so it is
//! stable across process restarts and independent of memory layout.
//! `std::hash` is deliberately not used: its output may differ between
//! processes, which would break the "has anything changed since the last
//! sync" comparison after a reload.

use serde::Serialize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// ASCII record separator, folded in between items so that moving bytes
/// across record boundaries changes the fingerprint.
const RECORD_SEPARATOR: u8 = 0x1e;

fn fold(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic fingerprint of an ordered sequence of records.
///
/// Equal sequences (content and order) produce equal fingerprints; any
/// change to any serialized field changes the value with high probability.
/// Reordering counts as a change.
pub fn fingerprint<T: Serialize>(items: &[T]) -> u64 {
    let mut hash = FNV_OFFSET;
    for item in items {
        match serde_json::to_vec(item) {
            Ok(bytes) => hash = fold(hash, &bytes),
            // An unserializable record still perturbs the stream instead of
            // silently vanishing from the fingerprint.
            Err(_) => hash = fold(hash, b"<unserializable>"),
        }
        hash = fold(hash, &[RECORD_SEPARATOR]);
    }
    hash
}

/// Tracks the last observed fingerprint and answers "did it change".
#[derive(Debug, Clone, Default)]
pub struct DirtyStateTracker {
    last_seen: Option<u64>,
}

impl DirtyStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current state as clean.
    pub fn mark_clean<T: Serialize>(&mut self, items: &[T]) {
        self.last_seen = Some(fingerprint(items));
    }

    /// Whether the sequence differs from the last clean state. With no
    /// recorded baseline, any non-empty sequence counts as dirty.
    pub fn is_dirty<T: Serialize>(&self, items: &[T]) -> bool {
        match self.last_seen {
            Some(baseline) => fingerprint(items) != baseline,
            None => !items.is_empty(),
        }
    }

    /// Compare against the last observation and remember the new value.
    /// Returns true when the fingerprint changed (or on first observation).
    pub fn observe<T: Serialize>(&mut self, items: &[T]) -> bool {
        let current = fingerprint(items);
        let changed = self.last_seen != Some(current);
        self.last_seen = Some(current);
        changed
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}
