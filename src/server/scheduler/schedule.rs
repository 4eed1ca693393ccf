//! Sweep cadence calculations.
//!
//! A full sweep emits one work item per user, paced by the user interval. The spacing
//! between two sweeps grows with the user count so a sweep never overlaps the next one.

use std::time::Duration;

/// Extra users accounted for when sizing the sweep interval.
pub const USER_MARGIN: usize = 50;

/// Calculates the minimum spacing between two full sweeps.
///
/// # Arguments
/// - `user_count` - Users known to the store
/// - `user_interval` - Pacing between two emitted work items
/// - `floor` - Lower bound of the spacing
///
/// # Returns
/// `max(floor, user_interval * (user_count + USER_MARGIN))`
///
/// # Example
/// With 10,000 users and 200ms pacing the spacing is 2010 seconds, about 33.5 minutes.
pub fn calculate_sweep_interval(
    user_count: usize,
    user_interval: Duration,
    floor: Duration,
) -> Duration {
    let slots = u32::try_from(user_count.saturating_add(USER_MARGIN)).unwrap_or(u32::MAX);

    user_interval.saturating_mul(slots).max(floor)
}
