//! Command Handler
//!
//! Turns a decoded request into a reply by way of three steps:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌──────────────┐    ┌─────────────┐    ┌──────────────┐    │
//! │  │ Command::    │───>│  apply()    │───>│  RespValue   │    │
//! │  │   parse()    │    │             │    │  encoding    │    │
//! │  └──────────────┘    └──────┬──────┘    └──────────────┘    │
//! │                             │                               │
//! │                             ▼                               │
//! │                       StorageEngine                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A parse failure short-circuits into an error reply and never touches the
//! engine.

use super::parse::Command;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;

/// Executes commands against a shared storage engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes one request and returns the reply to send back.
    ///
    /// `request` is the full argument list, command name first.
    pub fn execute(&self, request: Vec<Bytes>) -> RespValue {
        match Command::parse(request) {
            Ok(command) => self.apply(command),
            Err(e) => RespValue::error(e.to_string()),
        }
    }

    /// Applies an already validated command.
    pub fn apply(&self, command: Command) -> RespValue {
        match command {
            Command::Get { key } => self
                .storage
                .get(&key)
                .map_or_else(RespValue::null, RespValue::bulk_string),

            Command::Set {
                key,
                value,
                options,
            } => {
                let outcome = self.storage.set(key, value, &options);
                if options.get {
                    outcome
                        .previous
                        .map_or_else(RespValue::null, RespValue::bulk_string)
                } else if outcome.applied {
                    RespValue::ok()
                } else {
                    RespValue::null()
                }
            }

            Command::Del { keys } => RespValue::integer(count(self.storage.del(&keys))),

            Command::Expire {
                key,
                seconds,
                condition,
            } => RespValue::integer(i64::from(self.storage.expire(&key, seconds, condition))),

            Command::Ttl { key } => RespValue::integer(self.storage.ttl(&key)),

            Command::Keys { pattern } => RespValue::bulk_array(self.storage.keys(&pattern)),

            Command::ZAdd { key, members } => {
                RespValue::integer(count(self.storage.zadd(key, members)))
            }

            Command::ZRange { key, start, stop } => {
                RespValue::bulk_array(self.storage.zrange(&key, start, stop))
            }
        }
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
