use std::time::Duration;

/// Shortest sleep between two acquisition attempts.
pub const WAIT_STEP_FLOOR: Duration = Duration::from_millis(50);
/// Longest sleep between two acquisition attempts.
pub const WAIT_STEP_CEILING: Duration = Duration::from_millis(800);
/// Factor applied to each step until it reaches the ceiling.
pub const WAIT_STEP_GROWTH: f64 = 1.2;

/// Sleeps to take between acquisition attempts, spanning `wait_time`.
///
/// Steps grow geometrically from [`WAIT_STEP_FLOOR`] towards
/// [`WAIT_STEP_CEILING`], then repeat the ceiling, then whatever is left of
/// the budget. The result is reversed: the remainder and the long sleeps come
/// first, and the last entry is always zero so the final attempt is not
/// followed by a pointless sleep.
///
/// ```
/// use burrow_lock::wait_schedule;
/// use std::time::Duration;
///
/// assert_eq!(wait_schedule(Duration::ZERO), vec![Duration::ZERO]);
/// ```
pub fn wait_schedule(wait_time: Duration) -> Vec<Duration> {
    let mut steps = vec![Duration::ZERO];
    let mut total = Duration::ZERO;

    let mut step = WAIT_STEP_FLOOR;
    while step < WAIT_STEP_CEILING && total + step <= wait_time {
        steps.push(step);
        total += step;
        step = grow(step);
    }

    while total + WAIT_STEP_CEILING < wait_time {
        steps.push(WAIT_STEP_CEILING);
        total += WAIT_STEP_CEILING;
    }

    let remainder = wait_time.saturating_sub(total);
    if !remainder.is_zero() {
        steps.push(remainder);
    }

    steps.reverse();
    steps
}

fn grow(step: Duration) -> Duration {
    let nanos = step.as_nanos() as f64 * WAIT_STEP_GROWTH;
    Duration::from_nanos(nanos as u64)
}
