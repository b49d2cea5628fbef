//! tickscale Test Harness - Deterministic clocks for calibration testing
//!
//! This crate provides:
//! - Stepping clocks that advance on a fixed call schedule
//! - Scripted clocks that replay a recorded sequence
//! - Seeded jitter clocks that mimic a quantized hardware clock
//! - Registry helpers wiring stub clocks into a `ClockRegistry`

pub mod stub_clock;
pub mod stub_registry;

pub use stub_clock::*;
pub use stub_registry::*;
