//! Storage Engine
//!
//! The engine owns every piece of mutable state in the server:
//!
//! - the string table: key → value
//! - the expiry table: key → deadline, only for strings with a TTL
//! - the sorted-set table: key → [`SortedSet`]
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               StorageEngine                 │
//! │  ┌───────────────────────────────────────┐  │
//! │  │            Mutex<Tables>              │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐  │  │
//! │  │  │ strings │ │ expiries│ │  zsets  │  │  │
//! │  │  └─────────┘ └─────────┘ └─────────┘  │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every public operation takes the one lock for its whole duration, so
//! operations are linearizable and no caller ever sees another caller's
//! half-applied write. Nothing here awaits, blocks on I/O or logs.
//!
//! An expiry record whose string is gone is an orphan; readers drop it and
//! carry on as if it were absent.

use crate::storage::expiry::{self, ExpireCondition, SetExpiry};
use crate::storage::sorted_set::SortedSet;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// The NX / XX precondition of SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only write if the key is absent.
    Nx,
    /// Only write if the key is present.
    Xx,
}

/// Options accepted by [`StorageEngine::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetOptions {
    pub condition: Option<SetCondition>,
    /// Report the value held before the write.
    pub get: bool,
    pub expiry: SetExpiry,
}

/// What a SET did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    /// `false` when the NX/XX precondition was not met.
    pub applied: bool,
    /// The value before the write; only filled in when `get` was requested.
    pub previous: Option<Bytes>,
}

/// A KEYS pattern.
///
/// Only three shapes exist: `*`, a literal with one trailing `*`, and a
/// plain literal. Any other `*`, `?` or `[` is matched literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    All,
    Prefix(Bytes),
    Exact(Bytes),
}

impl KeyPattern {
    pub fn parse(pattern: &[u8]) -> Self {
        match pattern {
            b"*" => KeyPattern::All,
            [prefix @ .., b'*'] => KeyPattern::Prefix(Bytes::copy_from_slice(prefix)),
            exact => KeyPattern::Exact(Bytes::copy_from_slice(exact)),
        }
    }

    pub fn matches(&self, key: &[u8]) -> bool {
        match self {
            KeyPattern::All => true,
            KeyPattern::Prefix(prefix) => key.starts_with(prefix),
            KeyPattern::Exact(exact) => key == exact.as_ref(),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    strings: HashMap<Bytes, Bytes>,
    expiries: HashMap<Bytes, SystemTime>,
    sorted_sets: HashMap<Bytes, SortedSet>,
}

impl Tables {
    /// Whether `key` holds a live string. Expired strings and orphaned
    /// expiry records are removed on the way.
    fn is_live(&mut self, key: &[u8], now: SystemTime) -> bool {
        let expired = matches!(self.expiries.get(key), Some(&deadline) if deadline <= now);
        if expired {
            self.remove_string(key);
            return false;
        }

        if self.strings.contains_key(key) {
            true
        } else {
            self.expiries.remove(key);
            false
        }
    }

    fn remove_string(&mut self, key: &[u8]) -> bool {
        self.expiries.remove(key);
        self.strings.remove(key).is_some()
    }

    fn reap_expired(&mut self, now: SystemTime) {
        let expired: Vec<Bytes> = self
            .expiries
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove_string(&key);
        }
    }
}

/// The shared in-memory store.
///
/// Wrap it in an `Arc` and hand a clone to every connection.
///
/// # Example
///
/// ```
/// use respkv::storage::{SetOptions, StorageEngine};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("Ariz"), &SetOptions::default());
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("Ariz")));
///
/// engine.zadd(Bytes::from("board"), vec![(2.0, Bytes::from("b")), (1.0, Bytes::from("a"))]);
/// assert_eq!(
///     engine.zrange(&Bytes::from("board"), 0, -1),
///     vec![Bytes::from("a"), Bytes::from("b")]
/// );
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    tables: Mutex<Tables>,
}

impl StorageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic inside an operation cannot leave the maps torn, so a
    /// poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value of a live string key.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        let now = SystemTime::now();
        let mut tables = self.lock();
        if !tables.is_live(key, now) {
            return None;
        }
        tables.strings.get(key).cloned()
    }

    /// Writes a string key under the given options.
    pub fn set(&self, key: Bytes, value: Bytes, options: &SetOptions) -> SetOutcome {
        let now = SystemTime::now();
        let mut tables = self.lock();

        let exists = tables.is_live(&key, now);
        let previous = if options.get {
            tables.strings.get(&key).cloned()
        } else {
            None
        };

        let allowed = match options.condition {
            Some(SetCondition::Nx) => !exists,
            Some(SetCondition::Xx) => exists,
            None => true,
        };
        if !allowed {
            return SetOutcome {
                applied: false,
                previous,
            };
        }

        let current = tables.expiries.get(&key).copied();
        match options.expiry.resolve(now, current) {
            Some(deadline) if deadline <= now => {
                tables.remove_string(&key);
            }
            Some(deadline) => {
                tables.expiries.insert(key.clone(), deadline);
                tables.strings.insert(key, value);
            }
            None => {
                tables.expiries.remove(&key);
                tables.strings.insert(key, value);
            }
        }

        SetOutcome {
            applied: true,
            previous,
        }
    }

    /// Deletes string keys and returns how many live ones were removed.
    ///
    /// Sorted sets under the same names are left alone.
    pub fn del(&self, keys: &[Bytes]) -> usize {
        let now = SystemTime::now();
        let mut tables = self.lock();

        let mut deleted = 0;
        for key in keys {
            if tables.is_live(key, now) && tables.remove_string(key) {
                deleted += 1;
            }
        }
        deleted
    }

    /// Sets a key's TTL to `seconds` from now.
    ///
    /// Returns `false` if the key is absent or the condition rejects the
    /// change. A non-positive `seconds` deletes the key.
    pub fn expire(&self, key: &Bytes, seconds: i64, condition: Option<ExpireCondition>) -> bool {
        let now = SystemTime::now();
        let mut tables = self.lock();

        if !tables.is_live(key, now) {
            return false;
        }

        let current = tables.expiries.get(key).copied();
        let deadline = expiry::shift_secs(now, seconds);
        if let Some(condition) = condition {
            if !condition.allows(current, deadline) {
                return false;
            }
        }

        match deadline {
            Some(deadline) if deadline <= now => {
                tables.remove_string(key);
            }
            Some(deadline) => {
                tables.expiries.insert(key.clone(), deadline);
            }
            None => {
                tables.expiries.remove(key);
            }
        }
        true
    }

    /// Remaining TTL in seconds, `-1` for a key without TTL and `-2` for an
    /// absent or expired key.
    pub fn ttl(&self, key: &Bytes) -> i64 {
        let now = SystemTime::now();
        let mut tables = self.lock();

        if !tables.is_live(key, now) {
            return -2;
        }
        match tables.expiries.get(key) {
            Some(&deadline) => expiry::remaining_secs(deadline, now),
            None => -1,
        }
    }

    /// Keys of both tables matching `pattern`, sorted and without duplicates.
    ///
    /// Expired strings are reaped first, so KEYS never reports a key that
    /// GET would not return.
    pub fn keys(&self, pattern: &KeyPattern) -> Vec<Bytes> {
        let now = SystemTime::now();
        let mut tables = self.lock();
        tables.reap_expired(now);

        let mut matched = BTreeSet::new();
        matched.extend(tables.strings.keys().filter(|k| pattern.matches(k)).cloned());
        matched.extend(
            tables
                .sorted_sets
                .keys()
                .filter(|k| pattern.matches(k))
                .cloned(),
        );
        matched.into_iter().collect()
    }

    /// Adds or updates members of a sorted set, creating the set if needed.
    ///
    /// Returns the number of members that did not exist before.
    pub fn zadd(&self, key: Bytes, members: Vec<(f64, Bytes)>) -> usize {
        if members.is_empty() {
            return 0;
        }

        let mut tables = self.lock();
        let set = tables.sorted_sets.entry(key).or_default();

        let mut added = 0;
        for (score, member) in members {
            if set.insert(member, score) {
                added += 1;
            }
        }
        added
    }

    /// Member names of a sorted set between two inclusive ranks.
    pub fn zrange(&self, key: &Bytes, start: i64, stop: i64) -> Vec<Bytes> {
        let tables = self.lock();
        match tables.sorted_sets.get(key) {
            Some(set) => set.range(start, stop),
            None => Vec::new(),
        }
    }

    /// Score of one member. An inspection helper; no command reads it.
    pub fn zscore(&self, key: &Bytes, member: &[u8]) -> Option<f64> {
        let tables = self.lock();
        tables.sorted_sets.get(key).and_then(|set| set.score(member))
    }

    /// Number of distinct keys across both tables, counting expired strings
    /// that have not been touched yet.
    pub fn len(&self) -> usize {
        let tables = self.lock();
        let shared = tables
            .sorted_sets
            .keys()
            .filter(|k| !tables.strings.contains_key(*k))
            .count();
        tables.strings.len() + shared
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
