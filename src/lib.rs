//! # respkv - An In-Memory Key-Value Server
//!
//! respkv is a single-node, in-memory key-value server speaking a subset of
//! the Redis serialization protocol. It stores byte-string values with
//! optional TTLs and sorted sets of scored members.
//!
//! ## Features
//!
//! - **Redis-Compatible Wire Format**: requests are arrays of bulk strings,
//!   so `redis-cli` works as a client
//! - **TTL Support**: relative and absolute expiry, enforced lazily on access
//! - **Sorted Sets**: ZADD / ZRANGE with deterministic ordering of ties
//! - **Async I/O**: built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              respkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (server.rs) │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐   ┌────────────────────────────┐    │
//! │                     │    RESP     │   │       StorageEngine        │    │
//! │                     │   Parser    │   │  Mutex<strings, expiries,  │    │
//! │                     └─────────────┘   │         sorted sets>       │    │
//! │                                       └────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use respkv::connection::ConnectionStats;
//! use respkv::server::serve;
//! use respkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6378").await?;
//!     serve(listener, storage, stats).await;
//!     Ok(())
//! }
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
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP types and the incremental parser
//! - [`storage`]: the shared engine, expiry rules and sorted sets
//! - [`commands`]: request validation and execution
//! - [`connection`]: per-client read/execute/reply loop
//! - [`server`]: the accept loop
//! - [`client`]: a minimal async client
//! - [`config`]: command-line configuration

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use client::{Client, ClientError};
pub use commands::{Command, CommandError, CommandHandler};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ProtocolError, RespParser, RespValue};
pub use storage::StorageEngine;

/// The default port respkv listens on
pub const DEFAULT_PORT: u16 = 6378;

/// The default host respkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
