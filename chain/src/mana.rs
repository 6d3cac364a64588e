//! Regenerating voting mana.

use sbi_types::{AccountName, Timestamp, VoterCapacity};

/// Mana regenerates from empty to full over five days.
pub const MANA_REGENERATION_SECS: u64 = 5 * 24 * 3600;

/// Mana as last written on chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Manabar {
    pub max_mana: f64,
    pub current_mana: f64,
    pub last_update_time: Timestamp,
}

impl Manabar {
    /// Mana at `now`, including linear regeneration since the last update.
    pub fn regenerated(&self, now: Timestamp) -> f64 {
        if self.max_mana <= 0.0 {
            return 0.0;
        }
        let elapsed = self.last_update_time.elapsed_since(now) as f64;
        let regen = elapsed * self.max_mana / MANA_REGENERATION_SECS as f64;
        (self.current_mana + regen).min(self.max_mana)
    }

    pub fn to_capacity(&self, account: AccountName, now: Timestamp) -> VoterCapacity {
        let current_mana_pct = if self.max_mana > 0.0 {
            self.regenerated(now) / self.max_mana * 100.0
        } else {
            0.0
        };
        VoterCapacity {
            account,
            max_mana: self.max_mana,
            current_mana_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regenerates_linearly_and_caps() {
        let bar = Manabar {
            max_mana: 1_000.0,
            current_mana: 500.0,
            last_update_time: Timestamp::new(0),
        };
        let half_day = MANA_REGENERATION_SECS / 10;
        assert!((bar.regenerated(Timestamp::new(half_day)) - 600.0).abs() < 1e-6);
        assert_eq!(bar.regenerated(Timestamp::new(MANA_REGENERATION_SECS)), 1_000.0);
    }

    #[test]
    fn empty_account_has_zero_pct() {
        let bar = Manabar {
            max_mana: 0.0,
            current_mana: 0.0,
            last_update_time: Timestamp::new(0),
        };
        let cap = bar.to_capacity(AccountName::new("empty"), Timestamp::new(10));
        assert_eq!(cap.current_mana_pct, 0.0);
        assert_eq!(cap.available_rshares(), 0.0);
    }
}
