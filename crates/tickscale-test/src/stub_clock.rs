//! Stub clocks - deterministic read functions for calibration tests
//!
//! Each clock hands out `ReadFn`s that share one state, so a test can
//! inspect how many reads calibration performed.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickscale::{ReadFn, Timestamp};

/// Clock that advances by `step` on every `period`-th read
#[derive(Clone, Debug)]
pub struct StepClock {
    inner: Arc<Mutex<StepState>>,
}

#[derive(Debug)]
struct StepState {
    origin: Timestamp,
    step: Timestamp,
    period: u64,
    calls: u64,
}

impl StepClock {
    /// `period` of 1 advances on every read. A period of 0 is treated as 1.
    pub fn new(step: Timestamp, period: u64) -> Self {
        Self::starting_at(0.0, step, period)
    }

    pub fn starting_at(origin: Timestamp, step: Timestamp, period: u64) -> Self {
        StepClock {
            inner: Arc::new(Mutex::new(StepState {
                origin,
                step,
                period: period.max(1),
                calls: 0,
            })),
        }
    }

    /// Advances on every read
    pub fn every_call(step: Timestamp) -> Self {
        Self::new(step, 1)
    }

    pub fn read(&self) -> Timestamp {
        let mut state = self.inner.lock();
        let value = state.origin + state.step * (state.calls / state.period) as f64;
        state.calls += 1;
        value
    }

    pub fn read_fn(&self) -> ReadFn {
        let clock = self.clone();
        Arc::new(move || clock.read())
    }

    /// Reads performed so far, across all handles
    pub fn calls(&self) -> u64 {
        self.inner.lock().calls
    }
}

/// Clock that replays `script`, then keeps adding `tail_step` to the last
/// value
#[derive(Clone, Debug)]
pub struct ScriptedClock {
    inner: Arc<Mutex<ScriptState>>,
}

#[derive(Debug)]
struct ScriptState {
    script: Vec<Timestamp>,
    tail_step: Timestamp,
    cursor: usize,
    last: Timestamp,
}

impl ScriptedClock {
    pub fn new(script: Vec<Timestamp>, tail_step: Timestamp) -> Self {
        ScriptedClock {
            inner: Arc::new(Mutex::new(ScriptState {
                script,
                tail_step,
                cursor: 0,
                last: 0.0,
            })),
        }
    }

    pub fn read(&self) -> Timestamp {
        let mut state = self.inner.lock();
        let value = match state.script.get(state.cursor) {
            Some(&value) => value,
            None => state.last + state.tail_step,
        };
        state.cursor += 1;
        state.last = value;
        value
    }

    pub fn read_fn(&self) -> ReadFn {
        let clock = self.clone();
        Arc::new(move || clock.read())
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().cursor
    }
}

/// Quantized clock with jittery read cost.
///
/// Each read advances a hidden true time by `cost` scaled by a random
/// factor in `1 ± jitter`, then reports it floored to a multiple of
/// `quantum`. Seeded, so identical parameters replay identically.
#[derive(Clone, Debug)]
pub struct JitterClock {
    inner: Arc<Mutex<JitterState>>,
}

#[derive(Debug)]
struct JitterState {
    quantum: Timestamp,
    cost: Timestamp,
    jitter: f64,
    true_time: Timestamp,
    rng: StdRng,
}

impl JitterClock {
    pub fn new(quantum: Timestamp, cost: Timestamp, jitter: f64, seed: u64) -> Self {
        JitterClock {
            inner: Arc::new(Mutex::new(JitterState {
                quantum,
                cost,
                jitter: jitter.clamp(0.0, 1.0),
                true_time: 0.0,
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    /// 1ms ticks, ~50µs reads
    pub fn millisecond(seed: u64) -> Self {
        Self::new(1.0, 0.05, 0.5, seed)
    }

    pub fn read(&self) -> Timestamp {
        let mut state = self.inner.lock();
        let factor = if state.jitter > 0.0 {
            let jitter = state.jitter;
            1.0 + state.rng.gen_range(-jitter..=jitter)
        } else {
            1.0
        };
        let advance = state.cost * factor;
        state.true_time += advance;
        (state.true_time / state.quantum).floor() * state.quantum
    }

    pub fn read_fn(&self) -> ReadFn {
        let clock = self.clone();
        Arc::new(move || clock.read())
    }

    /// Unquantized time accumulated so far
    pub fn true_time(&self) -> Timestamp {
        self.inner.lock().true_time
    }
}
