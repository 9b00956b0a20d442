//! Client-side ids for ephemeral filter clauses.
//!
//! Clause ids only need to be unique within one editing session, so they are
//! minted by an [`IdSource`] the caller owns rather than by global state.

use std::time::{SystemTime, UNIX_EPOCH};

/// Produces ids for newly created [`FilterClause`](crate::model::FilterClause)s.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Millisecond timestamp combined with a per-instance counter:
/// `f-<millis base36>-<counter>`.
///
/// The counter guarantees uniqueness within one generator even when the
/// clock does not advance between calls.
#[derive(Debug, Clone)]
pub struct MonotonicIds {
    counter: u64,
    clock: fn() -> u64,
}

impl MonotonicIds {
    /// Generator backed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(system_millis)
    }

    /// Generator backed by a caller-supplied millisecond clock.
    #[must_use]
    pub const fn with_clock(clock: fn() -> u64) -> Self {
        Self { counter: 0, clock }
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for MonotonicIds {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("f-{}-{}", to_base36((self.clock)()), self.counter)
    }
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[usize::try_from(n % 36).unwrap_or_default()]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterClause, FilterField, FilterOperator, FilterValue};
    use std::collections::HashSet;

    fn frozen() -> u64 {
        1_700_000_000_000
    }

    #[test]
    fn ids_are_unique_with_a_frozen_clock() {
        let mut ids = MonotonicIds::with_clock(frozen);
        let seen: HashSet<String> = (0..100).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn id_format_is_prefix_time_counter() {
        let mut ids = MonotonicIds::with_clock(frozen);
        let first = ids.next_id();
        assert_eq!(first, format!("f-{}-1", to_base36(frozen())));
        assert!(ids.next_id().ends_with("-2"));
    }

    #[test]
    fn separate_generators_do_not_share_counters() {
        let mut a = MonotonicIds::with_clock(frozen);
        let mut b = MonotonicIds::with_clock(frozen);
        a.next_id();
        a.next_id();
        assert!(b.next_id().ends_with("-1"));
    }

    #[test]
    fn base36_round_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn clause_constructor_draws_from_source() {
        let mut ids = MonotonicIds::with_clock(frozen);
        let clause = FilterClause::new(
            &mut ids,
            FilterField::Status,
            FilterOperator::AnyOf,
            FilterValue::list(&["open"]),
        );
        assert!(clause.id.starts_with("f-"));
        assert!(clause.id.ends_with("-1"));
    }
}
