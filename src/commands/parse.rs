//! Request → Command
//!
//! A decoded request is a list of byte strings. [`Command::parse`] resolves
//! the command name once and validates arity, option grammar and every
//! numeric argument, producing one variant per supported command. Nothing
//! reaches the storage engine unless the whole request is valid, which is
//! what makes multi-member ZADD all-or-nothing.

use crate::storage::{ExpireCondition, KeyPattern, SetCondition, SetExpiry, SetOptions};
use bytes::Bytes;
use thiserror::Error;

/// Largest EX/EXAT/EXPIRE value whose millisecond form fits in an `i64`.
const MAX_EXPIRE_SECS: i64 = i64::MAX / 1000;

/// A request that is well framed but not a valid command.
///
/// The `Display` text is the exact error reply sent to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR no command")]
    Empty,

    #[error("ERR unknown command")]
    Unknown,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// Unknown, repeated or conflicting option token
    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    #[error("ERR NX and XX, GT or LT options at the same time are not compatible")]
    IncompatibleConditions,
}

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `GET key`
    Get { key: Bytes },
    /// `SET key value [NX|XX] [GET] [EX s|PX ms|EXAT ts|PXAT ts|KEEPTTL]`
    Set {
        key: Bytes,
        value: Bytes,
        options: SetOptions,
    },
    /// `DEL key [key ...]`
    Del { keys: Vec<Bytes> },
    /// `EXPIRE key seconds [NX|XX|GT|LT]`
    Expire {
        key: Bytes,
        seconds: i64,
        condition: Option<ExpireCondition>,
    },
    /// `TTL key`
    Ttl { key: Bytes },
    /// `KEYS pattern`
    Keys { pattern: KeyPattern },
    /// `ZADD key score member [score member ...]`
    ZAdd {
        key: Bytes,
        members: Vec<(f64, Bytes)>,
    },
    /// `ZRANGE key start stop`
    ZRange { key: Bytes, start: i64, stop: i64 },
}

impl Command {
    /// Parses a request. The command name and option tokens are
    /// case-insensitive.
    pub fn parse(request: Vec<Bytes>) -> Result<Command, CommandError> {
        let mut request = request.into_iter();
        let name = request.next().ok_or(CommandError::Empty)?;
        let args: Vec<Bytes> = request.collect();

        match name.to_ascii_uppercase().as_slice() {
            b"GET" => {
                let [key] = exact(args, "GET")?;
                Ok(Command::Get { key })
            }
            b"SET" => parse_set(args),
            b"DEL" => {
                if args.is_empty() {
                    return Err(CommandError::WrongArity("DEL"));
                }
                Ok(Command::Del { keys: args })
            }
            b"EXPIRE" => parse_expire(args),
            b"TTL" => {
                let [key] = exact(args, "TTL")?;
                Ok(Command::Ttl { key })
            }
            b"KEYS" => {
                let [pattern] = exact(args, "KEYS")?;
                Ok(Command::Keys {
                    pattern: KeyPattern::parse(&pattern),
                })
            }
            b"ZADD" => parse_zadd(args),
            b"ZRANGE" => {
                let [key, start, stop] = exact(args, "ZRANGE")?;
                Ok(Command::ZRange {
                    key,
                    start: parse_i64(&start)?,
                    stop: parse_i64(&stop)?,
                })
            }
            _ => Err(CommandError::Unknown),
        }
    }
}

fn exact<const N: usize>(args: Vec<Bytes>, name: &'static str) -> Result<[Bytes; N], CommandError> {
    <[Bytes; N]>::try_from(args).map_err(|_| CommandError::WrongArity(name))
}

fn parse_set(args: Vec<Bytes>) -> Result<Command, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("SET"));
    }

    let mut args = args.into_iter();
    let (Some(key), Some(value)) = (args.next(), args.next()) else {
        return Err(CommandError::WrongArity("SET"));
    };

    let mut options = SetOptions::default();
    while let Some(token) = args.next() {
        match token.to_ascii_uppercase().as_slice() {
            b"NX" if options.condition != Some(SetCondition::Xx) => {
                options.condition = Some(SetCondition::Nx);
            }
            b"XX" if options.condition != Some(SetCondition::Nx) => {
                options.condition = Some(SetCondition::Xx);
            }
            b"GET" => options.get = true,
            b"KEEPTTL" if matches!(options.expiry, SetExpiry::Persist | SetExpiry::KeepTtl) => {
                options.expiry = SetExpiry::KeepTtl;
            }
            unit @ (b"EX" | b"PX" | b"EXAT" | b"PXAT") if options.expiry == SetExpiry::Persist => {
                let amount = args.next().ok_or(CommandError::Syntax)?;
                let amount = parse_i64(&amount)?;
                let in_seconds = matches!(unit, b"EX" | b"EXAT");
                if amount <= 0 || (in_seconds && amount > MAX_EXPIRE_SECS) {
                    return Err(CommandError::InvalidExpireTime("SET"));
                }

                let amount = amount as u64;
                options.expiry = match unit {
                    b"EX" => SetExpiry::Ex(amount),
                    b"PX" => SetExpiry::Px(amount),
                    b"EXAT" => SetExpiry::ExAt(amount),
                    _ => SetExpiry::PxAt(amount),
                };
            }
            _ => return Err(CommandError::Syntax),
        }
    }

    Ok(Command::Set {
        key,
        value,
        options,
    })
}

fn parse_expire(args: Vec<Bytes>) -> Result<Command, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("EXPIRE"));
    }

    let mut args = args.into_iter();
    let (Some(key), Some(seconds)) = (args.next(), args.next()) else {
        return Err(CommandError::WrongArity("EXPIRE"));
    };

    let seconds = parse_i64(&seconds)?;
    if seconds.unsigned_abs() > MAX_EXPIRE_SECS as u64 {
        return Err(CommandError::InvalidExpireTime("EXPIRE"));
    }

    let mut condition = None;
    for token in args {
        let flag = match token.to_ascii_uppercase().as_slice() {
            b"NX" => ExpireCondition::Nx,
            b"XX" => ExpireCondition::Xx,
            b"GT" => ExpireCondition::Gt,
            b"LT" => ExpireCondition::Lt,
            _ => return Err(CommandError::Syntax),
        };
        match condition {
            Some(existing) if existing != flag => {
                return Err(CommandError::IncompatibleConditions)
            }
            _ => condition = Some(flag),
        }
    }

    Ok(Command::Expire {
        key,
        seconds,
        condition,
    })
}

fn parse_zadd(args: Vec<Bytes>) -> Result<Command, CommandError> {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CommandError::WrongArity("ZADD"));
    }

    let mut args = args.into_iter();
    let key = args.next().ok_or(CommandError::WrongArity("ZADD"))?;

    let mut members = Vec::with_capacity(args.len() / 2);
    while let (Some(score), Some(member)) = (args.next(), args.next()) {
        members.push((parse_score(&score)?, member));
    }

    Ok(Command::ZAdd { key, members })
}

fn parse_i64(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger)
}

fn parse_score(arg: &[u8]) -> Result<f64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|score| !score.is_nan())
        .ok_or(CommandError::NotAFloat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(args: &[&str]) -> Vec<Bytes> {
        args.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    fn parse(args: &[&str]) -> Result<Command, CommandError> {
        Command::parse(request(args))
    }

    fn set_options(args: &[&str]) -> Result<SetOptions, CommandError> {
        let mut full = vec!["SET", "k", "v"];
        full.extend_from_slice(args);
        match parse(&full)? {
            Command::Set { options, .. } => Ok(options),
            other => panic!("expected SET, got {:?}", other),
        }
    }

    #[test]
    fn test_command_name_is_case_insensitive() {
        assert_eq!(
            parse(&["get", "k"]),
            Ok(Command::Get {
                key: Bytes::from("k")
            })
        );
        assert_eq!(
            parse(&["tTl", "k"]),
            Ok(Command::Ttl {
                key: Bytes::from("k")
            })
        );
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(Command::parse(Vec::new()), Err(CommandError::Empty));
        assert_eq!(parse(&["FLUSHALL"]), Err(CommandError::Unknown));
        assert_eq!(
            CommandError::Unknown.to_string(),
            "ERR unknown command"
        );
    }

    #[test]
    fn test_arity() {
        assert_eq!(parse(&["GET"]), Err(CommandError::WrongArity("GET")));
        assert_eq!(parse(&["GET", "a", "b"]), Err(CommandError::WrongArity("GET")));
        assert_eq!(parse(&["SET", "k"]), Err(CommandError::WrongArity("SET")));
        assert_eq!(parse(&["DEL"]), Err(CommandError::WrongArity("DEL")));
        assert_eq!(parse(&["EXPIRE", "k"]), Err(CommandError::WrongArity("EXPIRE")));
        assert_eq!(parse(&["TTL"]), Err(CommandError::WrongArity("TTL")));
        assert_eq!(parse(&["KEYS"]), Err(CommandError::WrongArity("KEYS")));
        assert_eq!(parse(&["ZADD", "s", "1"]), Err(CommandError::WrongArity("ZADD")));
        assert_eq!(
            parse(&["ZADD", "s", "1", "a", "2"]),
            Err(CommandError::WrongArity("ZADD"))
        );
        assert_eq!(
            parse(&["ZRANGE", "s", "0"]),
            Err(CommandError::WrongArity("ZRANGE"))
        );
        assert_eq!(
            CommandError::WrongArity("GET").to_string(),
            "ERR wrong number of arguments for 'GET' command"
        );
    }

    #[test]
    fn test_set_defaults() {
        assert_eq!(set_options(&[]), Ok(SetOptions::default()));
    }

    #[test]
    fn test_set_all_options() {
        assert_eq!(
            set_options(&["nx", "GET", "ex", "10"]),
            Ok(SetOptions {
                condition: Some(SetCondition::Nx),
                get: true,
                expiry: SetExpiry::Ex(10),
            })
        );
        assert_eq!(
            set_options(&["XX", "PX", "1500"]).map(|o| (o.condition, o.expiry)),
            Ok((Some(SetCondition::Xx), SetExpiry::Px(1500)))
        );
        assert_eq!(
            set_options(&["EXAT", "1700000000"]).map(|o| o.expiry),
            Ok(SetExpiry::ExAt(1_700_000_000))
        );
        assert_eq!(
            set_options(&["PXAT", "1700000000000"]).map(|o| o.expiry),
            Ok(SetExpiry::PxAt(1_700_000_000_000))
        );
        assert_eq!(
            set_options(&["KEEPTTL", "XX"]).map(|o| o.expiry),
            Ok(SetExpiry::KeepTtl)
        );
    }

    #[test]
    fn test_set_conflicting_options() {
        assert_eq!(set_options(&["NX", "XX"]), Err(CommandError::Syntax));
        assert_eq!(set_options(&["EX", "1", "PX", "5"]), Err(CommandError::Syntax));
        assert_eq!(set_options(&["EX", "1", "KEEPTTL"]), Err(CommandError::Syntax));
        assert_eq!(set_options(&["KEEPTTL", "PXAT", "5"]), Err(CommandError::Syntax));
        assert_eq!(set_options(&["EX"]), Err(CommandError::Syntax));
        assert_eq!(set_options(&["FOREVER"]), Err(CommandError::Syntax));
    }

    #[test]
    fn test_set_bad_expire_values() {
        assert_eq!(set_options(&["EX", "ten"]), Err(CommandError::NotAnInteger));
        assert_eq!(
            set_options(&["EX", "0"]),
            Err(CommandError::InvalidExpireTime("SET"))
        );
        assert_eq!(
            set_options(&["PX", "-5"]),
            Err(CommandError::InvalidExpireTime("SET"))
        );
        assert_eq!(
            set_options(&["EX", &i64::MAX.to_string()]),
            Err(CommandError::InvalidExpireTime("SET"))
        );
    }

    #[test]
    fn test_expire_conditions() {
        assert_eq!(
            parse(&["EXPIRE", "k", "10"]),
            Ok(Command::Expire {
                key: Bytes::from("k"),
                seconds: 10,
                condition: None,
            })
        );
        for (flag, expected) in [
            ("nx", ExpireCondition::Nx),
            ("XX", ExpireCondition::Xx),
            ("gt", ExpireCondition::Gt),
            ("LT", ExpireCondition::Lt),
        ] {
            match parse(&["EXPIRE", "k", "-3", flag]) {
                Ok(Command::Expire {
                    seconds, condition, ..
                }) => {
                    assert_eq!(seconds, -3);
                    assert_eq!(condition, Some(expected));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_expire_invalid() {
        assert_eq!(
            parse(&["EXPIRE", "k", "soon"]),
            Err(CommandError::NotAnInteger)
        );
        assert_eq!(
            parse(&["EXPIRE", "k", "10", "MAYBE"]),
            Err(CommandError::Syntax)
        );
        assert_eq!(
            parse(&["EXPIRE", "k", "10", "NX", "GT"]),
            Err(CommandError::IncompatibleConditions)
        );
        assert_eq!(
            parse(&["EXPIRE", "k", &i64::MIN.to_string()]),
            Err(CommandError::InvalidExpireTime("EXPIRE"))
        );
    }

    #[test]
    fn test_keys_pattern() {
        assert_eq!(
            parse(&["KEYS", "user:*"]),
            Ok(Command::Keys {
                pattern: KeyPattern::Prefix(Bytes::from("user:"))
            })
        );
    }

    #[test]
    fn test_zadd_pairs() {
        assert_eq!(
            parse(&["ZADD", "s", "1", "a", "-2.5", "b", "+inf", "c"]),
            Ok(Command::ZAdd {
                key: Bytes::from("s"),
                members: vec![
                    (1.0, Bytes::from("a")),
                    (-2.5, Bytes::from("b")),
                    (f64::INFINITY, Bytes::from("c")),
                ],
            })
        );
    }

    #[test]
    fn test_zadd_rejects_any_bad_score() {
        assert_eq!(
            parse(&["ZADD", "s", "1", "x", "notanumber", "y"]),
            Err(CommandError::NotAFloat)
        );
        assert_eq!(
            parse(&["ZADD", "s", "nan", "x"]),
            Err(CommandError::NotAFloat)
        );
    }

    #[test]
    fn test_zrange_indices() {
        assert_eq!(
            parse(&["ZRANGE", "s", "-2", "-1"]),
            Ok(Command::ZRange {
                key: Bytes::from("s"),
                start: -2,
                stop: -1,
            })
        );
        assert_eq!(
            parse(&["ZRANGE", "s", "0", "last"]),
            Err(CommandError::NotAnInteger)
        );
    }
}
