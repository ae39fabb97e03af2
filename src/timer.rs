//! Monotonic timing primitive shared by every benchmark.
//!
//! Backed by [`std::time::Instant`], which never goes backwards and is not
//! affected by wall-clock adjustments.

use std::time::Instant;

/// Current monotonic timestamp.
#[inline(always)]
pub fn now() -> Instant {
    Instant::now()
}

/// Seconds elapsed between two timestamps, with nanosecond resolution.
///
/// Saturates to zero if `end` precedes `start`.
#[inline(always)]
pub fn elapsed(start: Instant, end: Instant) -> f64 {
    end.saturating_duration_since(start).as_secs_f64()
}

/// Run `f` once and return its result together with the seconds it took.
pub fn time<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = now();
    let out = f();
    let end = now();
    (out, elapsed(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn elapsed_is_non_negative_and_monotonic() {
        let a = now();
        let b = now();
        assert!(b >= a);
        assert!(elapsed(a, b) >= 0.0);
        assert_eq!(elapsed(b, a), 0.0);
    }

    #[test]
    fn elapsed_reports_sleep_duration() {
        let ((), secs) = time(|| std::thread::sleep(Duration::from_millis(5)));
        assert!(secs >= 0.005, "slept 5 ms but measured {secs}");
    }
}
