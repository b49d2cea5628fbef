//! Timestamps, read functions and the built-in clock providers

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::{ClockError, ClockResult};

/// Milliseconds since a provider-specific epoch.
///
/// Epochs are not comparable across providers.
pub type Timestamp = f64;

/// A bound time-reading function.
///
/// Function identity is pointer identity of the `Arc`.
pub type ReadFn = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Name of the reserved fallback clock: wall clock in whole milliseconds.
pub const FALLBACK_CLOCK: &str = "unix_millis";

/// A present clock provider: a name and the function that reads it.
#[derive(Clone)]
pub struct ClockCandidate {
    name: String,
    read: ReadFn,
}

impl ClockCandidate {
    pub fn new(name: impl Into<String>, read: ReadFn) -> Self {
        ClockCandidate {
            name: name.into(),
            read,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_fn(&self) -> &ReadFn {
        &self.read
    }

    /// Read the clock once
    #[inline]
    pub fn read(&self) -> Timestamp {
        (self.read)()
    }

    pub(crate) fn into_parts(self) -> (String, ReadFn) {
        (self.name, self.read)
    }
}

impl fmt::Debug for ClockCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockCandidate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Built-in clock providers, in declaration order (highest precision first)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockApi {
    /// Invariant CPU time-stamp counter, scaled to milliseconds
    Tsc,
    /// OS monotonic clock
    Instant,
    /// Wall clock with sub-millisecond precision
    SystemTime,
}

impl ClockApi {
    /// Declaration order used when no preference is given
    pub const ALL: [ClockApi; 3] = [ClockApi::Tsc, ClockApi::Instant, ClockApi::SystemTime];

    pub fn as_str(self) -> &'static str {
        match self {
            ClockApi::Tsc => "tsc",
            ClockApi::Instant => "instant",
            ClockApi::SystemTime => "system_time",
        }
    }

    /// Check whether the host exposes this provider.
    ///
    /// Side-effect free; the registry calls it once per provider.
    pub fn probe(self) -> bool {
        match self {
            ClockApi::Tsc => has_invariant_tsc(),
            ClockApi::Instant => !cfg!(all(target_arch = "wasm32", target_os = "unknown")),
            ClockApi::SystemTime => SystemTime::now().duration_since(UNIX_EPOCH).is_ok(),
        }
    }

    /// Build the read function for this provider.
    ///
    /// Monotonic providers count from the moment the reader is built.
    pub fn reader(self) -> ReadFn {
        match self {
            ClockApi::Tsc => {
                let clock = quanta::Clock::new();
                let anchor = clock.now();
                Arc::new(move || millis(clock.now().duration_since(anchor)))
            }
            ClockApi::Instant => {
                let anchor = Instant::now();
                Arc::new(move || millis(anchor.elapsed()))
            }
            ClockApi::SystemTime => Arc::new(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(millis)
                    .unwrap_or(0.0)
            }),
        }
    }
}

impl fmt::Display for ClockApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClockApi {
    type Err = ClockError;

    fn from_str(s: &str) -> ClockResult<Self> {
        ClockApi::ALL
            .into_iter()
            .find(|api| api.as_str() == s)
            .ok_or_else(|| ClockError::UnknownClock(s.to_string()))
    }
}

/// Read function of the fallback clock.
///
/// Whole milliseconds since the Unix epoch. Assumed to advance within the
/// calibration window; a frozen system clock hangs calibration.
pub fn fallback_reader() -> ReadFn {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    })
}

#[inline]
fn millis(d: Duration) -> Timestamp {
    d.as_secs_f64() * 1000.0
}

/// Invariant TSC plus RDTSCP, the pair quanta needs before it reads the TSC
#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
fn has_invariant_tsc() -> bool {
    let cpuid = raw_cpuid::CpuId::new();
    let has_invariant_tsc = cpuid
        .get_advanced_power_mgmt_info()
        .map_or(false, |apm| apm.has_invariant_tsc());
    let has_rdtscp = cpuid
        .get_extended_processor_and_feature_identifiers()
        .map_or(false, |epf| epf.has_rdtscp());

    has_invariant_tsc && has_rdtscp
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "sse2")))]
fn has_invariant_tsc() -> bool {
    false
}
