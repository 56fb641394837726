//! C8's fixed escalating retry-after schedule (§4.8). Pure so both
//! `kg-dlq` and its tests can reason about it without a clock dependency
//! beyond `chrono`.

use chrono::{DateTime, Duration, Utc};

/// `{60s, 5m, 30m}` — the delay used at attempt `k` is `table[min(k, len-1)]`.
/// Per the Open Question resolution (§11.3 of the full spec), attempts at or
/// beyond the last index all wait 30 minutes; this is intentional and not
/// escalated further.
pub const RETRY_LADDER_SECS: [i64; 3] = [60, 300, 1800];

pub fn delay_for_attempt(retry_count: u32) -> Duration {
    let idx = (retry_count as usize).min(RETRY_LADDER_SECS.len() - 1);
    Duration::seconds(RETRY_LADDER_SECS[idx])
}

/// `None` means the retry is permitted now; `Some(remaining)` carries the
/// seconds still required before another retry may be attempted.
pub fn remaining_gate(retry_count: u32, last_retry_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    let last = last_retry_at?;
    let delay = delay_for_attempt(retry_count);
    let elapsed = now - last;
    if elapsed >= delay {
        None
    } else {
        Some((delay - elapsed).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_clamps_at_last_entry() {
        assert_eq!(delay_for_attempt(0).num_seconds(), 60);
        assert_eq!(delay_for_attempt(1).num_seconds(), 300);
        assert_eq!(delay_for_attempt(2).num_seconds(), 1800);
        assert_eq!(delay_for_attempt(5).num_seconds(), 1800);
        assert_eq!(delay_for_attempt(100).num_seconds(), 1800);
    }

    #[test]
    fn gate_blocks_before_delay_elapses() {
        let t0 = DateTime::parse_from_rfc3339("2026-07-27T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = t0 + Duration::seconds(40);
        let remaining = remaining_gate(2, Some(t0), now);
        assert_eq!(remaining, Some(1800 - 40));
    }

    #[test]
    fn gate_opens_after_delay_elapses() {
        let t0 = DateTime::parse_from_rfc3339("2026-07-27T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = t0 + Duration::seconds(61);
        assert_eq!(remaining_gate(0, Some(t0), now), None);
    }

    #[test]
    fn gate_open_with_no_prior_attempt() {
        let now = Utc::now();
        assert_eq!(remaining_gate(0, None, now), None);
    }
}
