//! Next-occurrence computation for repeat rules.
//!
//! Pure and deterministic -- no I/O, no ambient clock. The caller supplies
//! `now` and gets back an anchor that is strictly in the future for every
//! repeating rule.

use chrono::{DateTime, Duration, Months, Utc};

use super::RepeatRule;
use crate::error::RecurrenceError;

/// Advance `anchor` past `now` in whole periods of `rule`.
///
/// `RepeatRule::None` returns the anchor unchanged; the caller treats the
/// reminder as terminal once that instant has passed. Repeating rules step
/// the anchor forward one period at a time until it is strictly after
/// `now`, preserving time-of-day. Missed periods are skipped, not replayed.
///
/// Month and year steps use calendar arithmetic with chrono's end-of-month
/// clamping: Jan 31 + 1 month lands on the last day of February.
pub fn next_occurrence(
    anchor: DateTime<Utc>,
    rule: RepeatRule,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RecurrenceError> {
    let mut next = anchor;
    while next <= now {
        let stepped = match rule {
            RepeatRule::None => return Ok(anchor),
            RepeatRule::Daily => next.checked_add_signed(Duration::days(1)),
            RepeatRule::Weekly => next.checked_add_signed(Duration::weeks(1)),
            RepeatRule::Monthly => next.checked_add_months(Months::new(1)),
            RepeatRule::Yearly => next.checked_add_months(Months::new(12)),
        };
        next = stepped.ok_or(RecurrenceError::Unrepresentable { anchor, rule })?;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap()
    }

    #[test]
    fn none_rule_returns_anchor_unchanged() {
        let anchor = utc("2025-01-01T08:00:00Z");
        let now = utc("2025-06-01T00:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::None, now).unwrap(),
            anchor
        );
    }

    #[test]
    fn future_anchor_is_untouched() {
        let anchor = utc("2025-03-01T08:00:00Z");
        let now = utc("2025-01-01T00:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Daily, now).unwrap(),
            anchor
        );
    }

    #[test]
    fn daily_skips_missed_days() {
        // Two missed days are skipped, not replayed.
        let anchor = utc("2025-01-01T08:00:00Z");
        let now = utc("2025-01-03T09:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Daily, now).unwrap(),
            utc("2025-01-04T08:00:00Z")
        );
    }

    #[test]
    fn daily_anchor_equal_to_now_advances() {
        let anchor = utc("2025-01-01T08:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Daily, anchor).unwrap(),
            utc("2025-01-02T08:00:00Z")
        );
    }

    #[test]
    fn weekly_preserves_time_of_day() {
        let anchor = utc("2025-01-06T21:30:00Z");
        let now = utc("2025-01-20T21:30:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Weekly, now).unwrap(),
            utc("2025-01-27T21:30:00Z")
        );
    }

    #[test]
    fn monthly_clamps_to_end_of_february() {
        let anchor = utc("2025-01-31T10:00:00Z");
        let now = utc("2025-02-10T00:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Monthly, now).unwrap(),
            utc("2025-02-28T10:00:00Z")
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let anchor = utc("2024-02-29T09:00:00Z");
        let now = utc("2025-01-01T00:00:00Z");
        assert_eq!(
            next_occurrence(anchor, RepeatRule::Yearly, now).unwrap(),
            utc("2025-02-28T09:00:00Z")
        );
    }

    proptest! {
        // For every repeating rule the result is strictly after `now`.
        #[test]
        fn repeating_result_is_strictly_future(
            anchor_secs in 0i64..4_000_000_000,
            gap_secs in 0i64..400_000_000,
            rule_index in 0usize..4,
        ) {
            let rules = [
                RepeatRule::Daily,
                RepeatRule::Weekly,
                RepeatRule::Monthly,
                RepeatRule::Yearly,
            ];
            let rule = rules[rule_index];
            let anchor = Utc.timestamp_opt(anchor_secs, 0).unwrap();
            let now = Utc.timestamp_opt(anchor_secs + gap_secs, 0).unwrap();
            let next = next_occurrence(anchor, rule, now).unwrap();
            prop_assert!(next > now);
        }
    }
}
