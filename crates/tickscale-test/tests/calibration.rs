//! Calibration properties against deterministic clocks

use std::sync::Arc;

use proptest::prelude::*;
use tickscale::{calibrate, ClockApi, Timer, TimerConfig, FALLBACK_CLOCK};
use tickscale_test::{absent_registry, stub_registry, JitterClock, ScriptedClock, StepClock};

fn timer_on(read: tickscale::ReadFn) -> Timer {
    let registry = stub_registry([("stub", Some(read))], None).unwrap();
    Timer::with_registry(&registry, &TimerConfig::default())
}

#[test]
fn quantized_clock_reports_quantum_and_cost() {
    let clock = StepClock::new(16.0, 3);
    let timer = timer_on(clock.read_fn());

    assert_eq!(timer.api(), "stub");
    assert_eq!(timer.resolution(), 16.0);
    assert_eq!(timer.calibration().max_no_updates(), 2);
    assert_eq!(timer.cost(), 8.0);
    assert_eq!(clock.calls(), 7);
}

#[test]
fn always_advancing_clock_has_zero_resolution() {
    let timer = timer_on(StepClock::every_call(1.0).read_fn());

    assert_eq!(timer.resolution(), 0.0);
    assert_eq!(timer.cost(), 1.0);
    assert!(Arc::ptr_eq(timer.now_fn(), timer.new_start_now_fn()));
}

#[test]
fn new_start_now_never_repeats_last_read() {
    let clock = StepClock::new(4.0, 5);
    let timer = timer_on(clock.read_fn());

    for _ in 0..20 {
        let t = timer.now();
        let fresh = timer.new_start_now();
        assert_ne!(fresh, t);
        assert!(fresh > t);
    }
}

#[test]
fn calibration_waits_out_the_window() {
    // Fast early advances, then the clock crawls past the window
    let clock = ScriptedClock::new(vec![0.0, 1.0, 2.0, 2.0, 2.0], 10.0);
    let cal = calibrate(&clock.read_fn());

    assert!(cal.elapsed() >= 32.0);
    assert_eq!(cal.min_interval(), 1.0);
    assert_eq!(cal.resolution(), 1.0);
    assert_eq!(cal.max_no_updates(), 2);
    assert_eq!(cal.cost(), 0.5);
}

#[test]
fn backwards_step_is_taken_as_an_advance() {
    // 12 -> 11 steps back; the negative delta becomes the minimum interval
    let clock = ScriptedClock::new(vec![10.0, 12.0, 11.0, 11.0, 20.0], 10.0);
    let cal = calibrate(&clock.read_fn());

    assert_eq!(cal.min_interval(), -1.0);
    assert_eq!(cal.max_no_updates(), 1);
    assert_eq!(cal.updates(), 6);
    assert_eq!(cal.reads(), 8);
    assert_eq!(clock.calls(), 8);
    assert_eq!(cal.elapsed(), 40.0);
    assert_eq!(cal.resolution(), -1.0);
    assert_eq!(cal.cost(), -1.0);
    assert!(cal.is_busy_wait());

    let t = clock.read();
    let fresh = (cal.new_start_now_fn())();
    assert_ne!(fresh, t);
}

#[test]
fn jitter_clock_calibrates_to_its_quantum() {
    let timer = timer_on(JitterClock::millisecond(42).read_fn());

    assert_eq!(timer.resolution(), 1.0);
    assert!(timer.cost() > 0.0);
    assert!(timer.cost() < 1.0);
    assert!(timer.calibration().max_no_updates() >= 1);
}

#[test]
fn fractional_quantum_is_reported_at_two_digits() {
    let timer = timer_on(JitterClock::new(0.25, 0.01, 0.5, 3).read_fn());

    assert_eq!(timer.resolution(), 0.25);
    assert!(timer.cost() > 0.0);
}

#[test]
fn repeated_construction_is_deterministic() {
    let a = timer_on(JitterClock::millisecond(9).read_fn());
    let b = timer_on(JitterClock::millisecond(9).read_fn());

    assert_eq!(a.resolution(), b.resolution());
    assert_eq!(a.cost(), b.cost());
    assert_eq!(a.calibration().reads(), b.calibration().reads());
}

#[test]
fn unavailable_candidates_fall_back_with_valid_calibration() {
    let fallback = StepClock::new(16.0, 3);
    let registry = absent_registry(["tsc", "instant"], Some(fallback.read_fn())).unwrap();
    let timer = Timer::with_registry(&registry, &TimerConfig::default());

    assert_eq!(timer.api(), FALLBACK_CLOCK);
    assert!(timer.is_fallback());
    assert_eq!(timer.resolution(), 16.0);
    assert_eq!(timer.cost(), 8.0);
}

#[test]
fn wall_clock_fallback_calibrates() {
    let registry = absent_registry(["only"], None).unwrap();
    let timer = Timer::with_registry(&registry, &TimerConfig::with_preference(["only"]));

    assert_eq!(timer.api(), FALLBACK_CLOCK);
    assert!(timer.resolution() >= 0.0);
    assert!(timer.cost() > 0.0);
}

#[test]
fn system_timer_with_unknown_preference_falls_back() {
    let timer = Timer::with_preference(["no_such_clock"]);

    assert_eq!(timer.api(), FALLBACK_CLOCK);
    assert!(timer.resolution() >= 0.0);
    assert!(timer.cost() > 0.0);
}

#[test]
fn system_monotonic_timer() {
    let timer = Timer::with_config(&TimerConfig::monotonic());

    if !timer.is_fallback() {
        assert!(timer.api() == ClockApi::Tsc.as_str() || timer.api() == ClockApi::Instant.as_str());
    }
    let t = timer.now();
    assert!(timer.new_start_now() >= t);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn step_clock_calibration_matches_schedule(step in 1u32..16, period in 2u64..6) {
        let step = step as f64;
        let clock = StepClock::starting_at(1000.0, step, period);
        let timer = timer_on(clock.read_fn());

        prop_assert_eq!(timer.resolution(), step);
        prop_assert_eq!(timer.calibration().max_no_updates(), period - 1);
        prop_assert_eq!(timer.cost(), step / (period - 1) as f64);

        let t = timer.now();
        prop_assert!(timer.new_start_now() > t);
    }

    #[test]
    fn calibration_invariants_hold(seed in any::<u64>(), quantum in 1u32..4) {
        let timer = timer_on(JitterClock::new(quantum as f64, 0.2, 0.9, seed).read_fn());

        prop_assert!(timer.resolution() >= 0.0);
        prop_assert!(timer.cost() > 0.0);
        if timer.resolution() == 0.0 {
            prop_assert!(Arc::ptr_eq(timer.now_fn(), timer.new_start_now_fn()));
        } else {
            prop_assert!(!Arc::ptr_eq(timer.now_fn(), timer.new_start_now_fn()));
        }
    }
}
