//! Storage Engine Module
//!
//! The in-memory data engine: a string table with lazily enforced TTLs and a
//! sorted-set table, both behind a single lock.
//!
//! ## Features
//!
//! - **One lock**: each operation sees and changes all tables atomically
//! - **Lazy expiry**: expired keys are removed when a command touches them
//! - **Sorted sets**: score-ordered ranges with name tie-breaking
//!
//! ## Example
//!
//! ```
//! use respkv::storage::{SetExpiry, SetOptions, StorageEngine};
//! use bytes::Bytes;
//!
//! let engine = StorageEngine::new();
//!
//! let options = SetOptions {
//!     expiry: SetExpiry::Ex(3600),
//!     ..Default::default()
//! };
//! engine.set(Bytes::from("session"), Bytes::from("token123"), &options);
//! assert_eq!(engine.ttl(&Bytes::from("session")), 3600);
//! ```

pub mod engine;
pub mod expiry;
pub mod sorted_set;

pub use engine::{KeyPattern, SetCondition, SetOptions, SetOutcome, StorageEngine};
pub use expiry::{ExpireCondition, SetExpiry};
pub use sorted_set::{Member, SortedSet};
