//! tickscale - Self-calibrating timestamp source
//!
//! This crate provides:
//! - A registry of named clock providers, probed once per host
//! - Preference-ordered clock selection with a universal fallback
//! - Calibration of the selected clock's resolution and per-read cost
//! - A tick-advance read that never returns a stale timestamp
//!
//! All timestamps are `f64` milliseconds from a clock-specific epoch.
//!
//! ```no_run
//! use tickscale::Timer;
//!
//! let timer = Timer::new();
//! let start = timer.new_start_now();
//! // ... measured work ...
//! let elapsed = timer.now() - start;
//! println!("{} took {elapsed}ms (±{}ms)", timer.api(), timer.resolution());
//! ```

pub mod calibrate;
pub mod clock;
pub mod error;
pub mod registry;
pub mod timer;

pub use calibrate::*;
pub use clock::*;
pub use error::*;
pub use registry::*;
pub use timer::*;
