//! Timer - selected clock bundled with its calibration

use std::fmt;
use std::sync::Arc;

use crate::calibrate::{calibrate, Calibration};
use crate::clock::{ClockApi, ReadFn, Timestamp};
use crate::registry::ClockRegistry;

/// Timer configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimerConfig {
    /// Clock names in order of preference. Empty means registry order.
    pub preference: Vec<String>,
}

impl TimerConfig {
    /// Monotonic clocks only; falls back to the wall clock when neither exists
    pub fn monotonic() -> Self {
        Self::with_preference([ClockApi::Tsc.as_str(), ClockApi::Instant.as_str()])
    }

    /// Wall clock with sub-millisecond precision
    pub fn wall_clock() -> Self {
        Self::with_preference([ClockApi::SystemTime.as_str()])
    }

    pub fn with_preference<I, S>(preference: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TimerConfig {
            preference: preference.into_iter().map(Into::into).collect(),
        }
    }
}

/// Calibrated timestamp source.
///
/// Selection and calibration happen once, in the constructor, which blocks
/// for at least 32ms. The result is immutable; clones share the same read
/// functions.
#[derive(Clone)]
pub struct Timer {
    api: String,
    now: ReadFn,
    is_fallback: bool,
    calibration: Calibration,
}

impl Timer {
    /// Best available built-in clock
    pub fn new() -> Self {
        Self::with_config(&TimerConfig::default())
    }

    /// First available built-in clock among `names`
    pub fn with_preference<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(&TimerConfig::with_preference(names))
    }

    pub fn with_config(config: &TimerConfig) -> Self {
        Self::with_registry(ClockRegistry::system(), config)
    }

    /// Select from an explicit registry, then calibrate
    pub fn with_registry(registry: &ClockRegistry, config: &TimerConfig) -> Self {
        let selection = registry.select(&config.preference);
        let (api, now) = selection.candidate.into_parts();
        let calibration = calibrate(&now);

        tracing::debug!(
            api = %api,
            fallback = selection.is_fallback,
            resolution = calibration.resolution(),
            cost = calibration.cost(),
            "timer ready"
        );

        Timer {
            api,
            now,
            is_fallback: selection.is_fallback,
            calibration,
        }
    }

    /// Name of the selected clock, or the fallback name
    pub fn api(&self) -> &str {
        &self.api
    }

    /// True when no preferred clock was available
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Read the clock
    #[inline]
    pub fn now(&self) -> Timestamp {
        (self.now)()
    }

    pub fn now_fn(&self) -> &ReadFn {
        &self.now
    }

    /// Clock quantum, zero when every read is already fresh
    pub fn resolution(&self) -> Timestamp {
        self.calibration.resolution()
    }

    /// Amortized cost of one read
    pub fn cost(&self) -> Timestamp {
        self.calibration.cost()
    }

    /// Read a timestamp strictly different from any read just before.
    ///
    /// When the resolution is non-zero this spins until the clock advances,
    /// with no yield point and no timeout. Callers that need a bound must
    /// impose one themselves.
    #[inline]
    pub fn new_start_now(&self) -> Timestamp {
        (self.calibration.new_start_now_fn())()
    }

    /// The tick-advance function; identical to [`Timer::now_fn`] when the
    /// resolution is zero
    pub fn new_start_now_fn(&self) -> &ReadFn {
        self.calibration.new_start_now_fn()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Whether both read functions are the same function
    pub fn reads_are_fresh(&self) -> bool {
        Arc::ptr_eq(&self.now, self.calibration.new_start_now_fn())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("api", &self.api)
            .field("fallback", &self.is_fallback)
            .field("resolution", &self.resolution())
            .field("cost", &self.cost())
            .finish_non_exhaustive()
    }
}
