//! Gate deciding whether a ledger cycle is due.

use sbi_types::time::SECS_PER_MINUTE;
use sbi_types::Timestamp;

/// When no cycle was ever recorded, pretend one ran this long ago so the
/// first run is due.
const BOOTSTRAP_OFFSET_MIN: u64 = 145;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleDecision {
    /// Run the cycle and store `cycle_at` as the new `last_cycle`.
    Due { cycle_at: Timestamp },
    NotDue { elapsed_min: f64 },
}

pub struct CycleGate;

impl CycleGate {
    /// The new cycle time is `last + share_cycle_min`, not `now`, so cycles
    /// do not drift with job latency.
    pub fn check(last_cycle: Option<Timestamp>, share_cycle_min: f64, now: Timestamp) -> CycleDecision {
        let last = last_cycle.unwrap_or_else(|| now.minus_secs(BOOTSTRAP_OFFSET_MIN * SECS_PER_MINUTE));
        let elapsed_min = last.elapsed_minutes(now);
        if elapsed_min > share_cycle_min {
            let step = (share_cycle_min.max(0.0) * SECS_PER_MINUTE as f64).round() as u64;
            CycleDecision::Due {
                cycle_at: last.plus_secs(step),
            }
        } else {
            CycleDecision::NotDue { elapsed_min }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn first_run_is_due() {
        let decision = CycleGate::check(None, 144.0, Timestamp::new(NOW));
        assert_eq!(
            decision,
            CycleDecision::Due {
                cycle_at: Timestamp::new(NOW - 60)
            }
        );
    }

    #[test]
    fn not_due_before_cycle_length() {
        let last = Timestamp::new(NOW - 100 * 60);
        match CycleGate::check(Some(last), 144.0, Timestamp::new(NOW)) {
            CycleDecision::NotDue { elapsed_min } => assert!((elapsed_min - 100.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exactly_cycle_length_is_not_due() {
        let last = Timestamp::new(NOW - 144 * 60);
        assert!(matches!(
            CycleGate::check(Some(last), 144.0, Timestamp::new(NOW)),
            CycleDecision::NotDue { .. }
        ));
    }

    #[test]
    fn due_advances_by_cycle_length() {
        let last = Timestamp::new(NOW - 300 * 60);
        assert_eq!(
            CycleGate::check(Some(last), 144.0, Timestamp::new(NOW)),
            CycleDecision::Due {
                cycle_at: Timestamp::new(NOW - 156 * 60)
            }
        );
    }
}
