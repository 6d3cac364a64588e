//! Time-weighted share exposure.
//!
//! Share-age is the integral of held shares over time, in share-days. Samples
//! are deltas; the held amount over an interval is the running total after
//! the sample that opens it.

use sbi_types::{MemberState, ShareAgeSample, Timestamp};

/// Integrate `samples` up to `as_of`.
///
/// Samples after `as_of` are ignored and the rest are taken in timestamp
/// order, so the replay order of the event log does not matter. A negative
/// running total counts as zero exposure, which keeps the result
/// non-decreasing in `as_of`.
pub fn calc_share_age(samples: &[ShareAgeSample], as_of: Timestamp) -> f64 {
    let mut visible: Vec<&ShareAgeSample> =
        samples.iter().filter(|s| s.timestamp <= as_of).collect();
    visible.sort_by_key(|s| s.timestamp);

    let mut running: i64 = 0;
    let mut total = 0.0;
    for (i, sample) in visible.iter().enumerate() {
        running = running.saturating_add(sample.shares);
        let end = visible
            .get(i + 1)
            .map(|next| next.timestamp)
            .unwrap_or(as_of);
        total += running.max(0) as f64 * sample.timestamp.days_until(end);
    }
    total
}

/// Share-age of `member` at a point in time. Used by fairness tie-breaks
/// that need to compare members as they stood when an event happened.
pub fn calc_share_age_until(member: &MemberState, timestamp: Timestamp) -> f64 {
    calc_share_age(&member.share_age_samples, timestamp)
}

/// Recompute `share_age` and `avg_share_age` as of `now`.
pub fn refresh_share_age(member: &mut MemberState, now: Timestamp) {
    member.share_age = calc_share_age(&member.share_age_samples, now);
    let total = member.total_shares();
    member.avg_share_age = if total > 0 {
        member.share_age / total as f64
    } else {
        0.0
    };
}
