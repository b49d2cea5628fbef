//! Resolution calibration
//!
//! Drives a read function through a short sampling loop to measure:
//! - the smallest positive delta between successive reads (the quantum)
//! - the longest run of reads that returned the same value
//!
//! From those it derives the clock's resolution, the amortized cost of one
//! read, and a tick-advance read that never returns a stale value.
//!
//! Calibration blocks the calling thread for at least 32 clock units (32ms
//! for millisecond clocks). It terminates only if the clock advances; a
//! frozen clock hangs it.

use std::fmt;
use std::sync::Arc;

use crate::clock::{ReadFn, Timestamp};

/// Starting value for the minimum observed delta
pub const INITIAL_MIN_INTERVAL: Timestamp = 1000.0;

/// Minimum span of clock time covered by calibration
pub const CALIBRATION_WINDOW: Timestamp = 32.0;

/// Minimum number of observed advances before calibration may stop
pub const MIN_UPDATES: u64 = 2;

/// Significant digits kept for non-integral resolutions
const RESOLUTION_DIGITS: u32 = 2;

/// Result of calibrating one read function
#[derive(Clone)]
pub struct Calibration {
    resolution: Timestamp,
    cost: Timestamp,
    min_interval: Timestamp,
    max_no_updates: u64,
    updates: u64,
    reads: u64,
    elapsed: Timestamp,
    new_start_now: ReadFn,
}

impl Calibration {
    /// Clock quantum; zero when every read observed a fresh value
    pub fn resolution(&self) -> Timestamp {
        self.resolution
    }

    /// Amortized time consumed by one read
    pub fn cost(&self) -> Timestamp {
        self.cost
    }

    /// Smallest non-zero delta observed, before rounding
    pub fn min_interval(&self) -> Timestamp {
        self.min_interval
    }

    /// Longest run of consecutive reads that returned an unchanged value
    pub fn max_no_updates(&self) -> u64 {
        self.max_no_updates
    }

    /// Number of times the clock was seen to advance
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Total reads performed, including the first
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Clock time spanned between the first and last read
    pub fn elapsed(&self) -> Timestamp {
        self.elapsed
    }

    pub fn new_start_now_fn(&self) -> &ReadFn {
        &self.new_start_now
    }

    /// True when `new_start_now` busy-waits rather than reading directly
    pub fn is_busy_wait(&self) -> bool {
        self.resolution != 0.0
    }
}

impl fmt::Debug for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calibration")
            .field("resolution", &self.resolution)
            .field("cost", &self.cost)
            .field("min_interval", &self.min_interval)
            .field("max_no_updates", &self.max_no_updates)
            .field("updates", &self.updates)
            .field("reads", &self.reads)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// Calibrate `now`.
///
/// Reads until the clock has advanced at least [`MIN_UPDATES`] times and at
/// least [`CALIBRATION_WINDOW`] units have passed since the first read.
pub fn calibrate(now: &ReadFn) -> Calibration {
    let mut min_interval = INITIAL_MIN_INTERVAL;
    let mut max_no_updates = 0u64;
    let mut updates = 0u64;
    let mut no_updates = 0u64;
    let mut reads = 1u64;

    let start = now();
    let end = start + CALIBRATION_WINDOW;
    let mut t0 = start;

    let last = loop {
        let t1 = now();
        reads += 1;
        let dt = t1 - t0;
        if dt == 0.0 {
            no_updates += 1;
            continue;
        }

        // Negative deltas from a non-monotonic clock are taken as-is
        if dt < min_interval {
            min_interval = dt;
        }
        if no_updates > max_no_updates {
            max_no_updates = no_updates;
        }
        updates += 1;
        if updates >= MIN_UPDATES && t1 >= end {
            break t1;
        }
        no_updates = 0;
        t0 = t1;
    };

    let (resolution, cost, new_start_now) = if max_no_updates == 0 {
        (0.0, min_interval, now.clone())
    } else {
        let resolution = if min_interval.fract() == 0.0 {
            min_interval
        } else {
            round_to_precision(min_interval, RESOLUTION_DIGITS)
        };
        (
            resolution,
            resolution / max_no_updates as f64,
            busy_wait(now.clone()),
        )
    };

    tracing::debug!(
        resolution,
        cost,
        min_interval,
        max_no_updates,
        updates,
        reads,
        "calibrated clock"
    );

    Calibration {
        resolution,
        cost,
        min_interval,
        max_no_updates,
        updates,
        reads,
        elapsed: last - start,
        new_start_now,
    }
}

/// Read `now` until it differs from the first value read, return that.
///
/// CPU-bound with no timeout: a frozen clock spins forever.
fn busy_wait(now: ReadFn) -> ReadFn {
    Arc::new(move || {
        let t0 = now();
        loop {
            let t1 = now();
            if t1 != t0 {
                return t1;
            }
            std::hint::spin_loop();
        }
    })
}

/// Digits printed when expanding an `f64` exactly; covers the longest
/// decimal expansion of any finite double
const EXACT_DIGITS: usize = 800;

/// Most significant digits an `f64` can carry
const MAX_DIGITS: u32 = 17;

/// Round to `digits` significant digits.
///
/// Works on the exact decimal expansion of `value`, rounding half away from
/// zero, then parses the shortened decimal back. Zero, non-finite values,
/// `digits == 0` and `digits` of 17 or more are returned unchanged.
pub fn round_to_precision(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() || digits == 0 || digits >= MAX_DIGITS {
        return value;
    }
    let exact = format!("{:.*e}", EXACT_DIGITS, value.abs());
    let Some((mantissa, exponent)) = exact.split_once('e') else {
        return value;
    };
    let Ok(mut exponent) = exponent.parse::<i32>() else {
        return value;
    };

    let mut kept: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
    let rest = kept.split_off(digits as usize);
    if rest.first().is_some_and(|&d| d >= b'5') && carry(&mut kept) {
        kept.insert(0, b'1');
        kept.pop();
        exponent += 1;
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let kept = String::from_utf8_lossy(&kept);
    format!("{sign}{kept}e{}", exponent - (digits as i32 - 1))
        .parse()
        .unwrap_or(value)
}

/// Add one to a decimal digit string; true when it overflows
fn carry(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return false;
        }
    }
    true
}
