//! Tests for calculate_sweep_interval function.

use std::time::Duration;

use crate::server::scheduler::schedule::{calculate_sweep_interval, USER_MARGIN};

const FLOOR: Duration = Duration::from_secs(15 * 60);

/// Tests that small user bases are swept at the floor interval.
///
/// Expected: 15 minutes
#[test]
fn returns_floor_for_few_users() {
    let result = calculate_sweep_interval(10, Duration::from_millis(200), FLOOR);
    assert_eq!(result, FLOOR);
}

/// Tests that the interval grows with the user count.
///
/// Expected: (10,000 + 50) * 200ms = 2010s
#[test]
fn grows_with_user_count() {
    let result = calculate_sweep_interval(10_000, Duration::from_millis(200), FLOOR);
    assert_eq!(
        result,
        Duration::from_millis(200 * (10_000 + USER_MARGIN as u64))
    );
}

/// Tests that an empty store still respects the floor.
///
/// Expected: 15 minutes
#[test]
fn empty_store_returns_floor() {
    let result = calculate_sweep_interval(0, Duration::from_millis(200), FLOOR);
    assert_eq!(result, FLOOR);
}

/// Tests that huge user counts saturate instead of overflowing.
#[test]
fn saturates_on_overflow() {
    let result = calculate_sweep_interval(usize::MAX, Duration::from_secs(u64::MAX / 2), FLOOR);
    assert_eq!(result, Duration::MAX);
}
