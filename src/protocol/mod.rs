//! Wire Protocol
//!
//! A prefix-tagged, CRLF-delimited protocol in the style of RESP. Clients send
//! every request as an array of bulk strings; the server answers with one
//! value of any kind.
//!
//! ## Modules
//!
//! - `types`: the [`RespValue`] sum type and its serialization
//! - `parser`: incremental decoding of requests and responses
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_request, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (args, consumed) = parse_request(data).unwrap().unwrap();
//! assert_eq!(args.len(), 2);
//! assert_eq!(consumed, data.len());
//!
//! let reply = RespValue::bulk_string("Ariz");
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, parse_request, ProtocolError, ProtocolResult, RespParser};
pub use types::RespValue;
