//! Expiry Rules
//!
//! Keys expire lazily: there is no background sweeper. A deadline is only
//! compared with the clock when a command touches the key, and an expired key
//! is removed at that moment.
//!
//! Deadlines are wall-clock instants (`SystemTime`) so that the absolute
//! `EXAT`/`PXAT` forms of SET map onto the same representation as the relative
//! `EX`/`PX` forms.
//!
//! A deadline of `None` means "never expires". Adding a duration beyond the
//! platform clock's range also yields `None`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How SET assigns the TTL of the key it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetExpiry {
    /// No TTL option: the key becomes persistent.
    #[default]
    Persist,
    /// `KEEPTTL`: an overwritten key keeps its deadline.
    KeepTtl,
    /// `EX seconds`, relative.
    Ex(u64),
    /// `PX milliseconds`, relative.
    Px(u64),
    /// `EXAT unix-seconds`, absolute.
    ExAt(u64),
    /// `PXAT unix-milliseconds`, absolute.
    PxAt(u64),
}

impl SetExpiry {
    /// The deadline the written key ends up with.
    ///
    /// `current` is the deadline of the live key being overwritten, if any.
    pub fn resolve(self, now: SystemTime, current: Option<SystemTime>) -> Option<SystemTime> {
        match self {
            SetExpiry::Persist => None,
            SetExpiry::KeepTtl => current,
            SetExpiry::Ex(secs) => now.checked_add(Duration::from_secs(secs)),
            SetExpiry::Px(ms) => now.checked_add(Duration::from_millis(ms)),
            SetExpiry::ExAt(secs) => UNIX_EPOCH.checked_add(Duration::from_secs(secs)),
            SetExpiry::PxAt(ms) => UNIX_EPOCH.checked_add(Duration::from_millis(ms)),
        }
    }
}

/// The `NX | XX | GT | LT` flag of EXPIRE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    /// Only when the key has no TTL.
    Nx,
    /// Only when the key already has a TTL.
    Xx,
    /// Only when the new deadline is later than the current one.
    Gt,
    /// Only when the new deadline is earlier than the current one.
    Lt,
}

impl ExpireCondition {
    /// Whether moving a key from `current` to `new` is allowed.
    ///
    /// `None` on either side is an infinite deadline, so GT never applies to
    /// a persistent key and LT always does.
    pub fn allows(self, current: Option<SystemTime>, new: Option<SystemTime>) -> bool {
        match self {
            ExpireCondition::Nx => current.is_none(),
            ExpireCondition::Xx => current.is_some(),
            ExpireCondition::Gt => match (current, new) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(current), Some(new)) => new > current,
            },
            ExpireCondition::Lt => match (current, new) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(current), Some(new)) => new < current,
            },
        }
    }
}

/// `now` shifted by a signed number of seconds.
pub(crate) fn shift_secs(now: SystemTime, secs: i64) -> Option<SystemTime> {
    let delta = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        now.checked_add(delta)
    } else {
        Some(now.checked_sub(delta).unwrap_or(UNIX_EPOCH))
    }
}

/// Remaining lifetime in whole seconds, rounded to the nearest second.
pub(crate) fn remaining_secs(deadline: SystemTime, now: SystemTime) -> i64 {
    let ms = deadline
        .duration_since(now)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    i64::try_from((ms + 500) / 1000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);

        assert_eq!(SetExpiry::Persist.resolve(now, Some(now)), None);
        assert_eq!(
            SetExpiry::Ex(10).resolve(now, None),
            Some(now + Duration::from_secs(10))
        );
        assert_eq!(
            SetExpiry::Px(1_500).resolve(now, None),
            Some(now + Duration::from_millis(1_500))
        );
        assert_eq!(
            SetExpiry::ExAt(2_000).resolve(now, None),
            Some(UNIX_EPOCH + Duration::from_secs(2_000))
        );
        assert_eq!(
            SetExpiry::PxAt(2_000_500).resolve(now, None),
            Some(UNIX_EPOCH + Duration::from_millis(2_000_500))
        );
    }

    #[test]
    fn test_keepttl_keeps_current_deadline() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let current = now + Duration::from_secs(30);
        assert_eq!(SetExpiry::KeepTtl.resolve(now, Some(current)), Some(current));
        assert_eq!(SetExpiry::KeepTtl.resolve(now, None), None);
    }

    #[test]
    fn test_conditions_against_existing_ttl() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let current = Some(now + Duration::from_secs(10));
        let later = Some(now + Duration::from_secs(20));
        let sooner = Some(now + Duration::from_secs(5));

        assert!(!ExpireCondition::Nx.allows(current, later));
        assert!(ExpireCondition::Xx.allows(current, later));
        assert!(ExpireCondition::Gt.allows(current, later));
        assert!(!ExpireCondition::Gt.allows(current, sooner));
        assert!(!ExpireCondition::Gt.allows(current, current));
        assert!(ExpireCondition::Lt.allows(current, sooner));
        assert!(!ExpireCondition::Lt.allows(current, later));
        assert!(!ExpireCondition::Lt.allows(current, current));
    }

    #[test]
    fn test_conditions_against_persistent_key() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let new = Some(now + Duration::from_secs(10));

        assert!(ExpireCondition::Nx.allows(None, new));
        assert!(!ExpireCondition::Xx.allows(None, new));
        assert!(!ExpireCondition::Gt.allows(None, new));
        assert!(ExpireCondition::Lt.allows(None, new));
    }

    #[test]
    fn test_shift_and_remaining() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        assert_eq!(shift_secs(now, 5), Some(now + Duration::from_secs(5)));
        assert_eq!(shift_secs(now, -5), Some(now - Duration::from_secs(5)));

        assert_eq!(remaining_secs(now + Duration::from_millis(9_600), now), 10);
        assert_eq!(remaining_secs(now + Duration::from_millis(9_400), now), 9);
        assert_eq!(remaining_secs(now - Duration::from_secs(1), now), 0);
    }
}
