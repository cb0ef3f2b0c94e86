//! Command Module
//!
//! The command processing layer. It receives decoded requests, validates them
//! into typed commands, executes them against the storage engine and builds
//! the replies.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │ Vec<Bytes>
//!          ▼
//! ┌─────────────────┐
//! │ Command::parse  │  (parse.rs)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (handler.rs)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key`
//! - `SET key value [NX|XX] [GET] [EX s|PX ms|EXAT ts|PXAT ts|KEEPTTL]`
//! - `DEL key [key ...]`
//! - `EXPIRE key seconds [NX|XX|GT|LT]`
//! - `TTL key`
//! - `KEYS pattern`
//! - `ZADD key score member [score member ...]`
//! - `ZRANGE key start stop`

pub mod handler;
pub mod parse;

pub use handler::CommandHandler;
pub use parse::{Command, CommandError};
