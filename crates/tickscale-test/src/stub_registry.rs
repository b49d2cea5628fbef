//! Registry helpers for tests

use tickscale::{ClockRegistry, ClockResult, ReadFn};

/// Build a registry from `(name, read)` slots in order.
///
/// `None` slots are absent providers. `fallback` replaces the wall-clock
/// fallback when given.
pub fn stub_registry<'a, I>(slots: I, fallback: Option<ReadFn>) -> ClockResult<ClockRegistry>
where
    I: IntoIterator<Item = (&'a str, Option<ReadFn>)>,
{
    let mut builder = ClockRegistry::builder();
    for (name, read) in slots {
        builder = match read {
            Some(read) => builder.candidate_fn(name, read),
            None => builder.unavailable(name),
        };
    }
    if let Some(fallback) = fallback {
        builder = builder.fallback_fn(fallback);
    }
    builder.build()
}

/// Registry in which every named provider is absent
pub fn absent_registry<'a, I>(names: I, fallback: Option<ReadFn>) -> ClockResult<ClockRegistry>
where
    I: IntoIterator<Item = &'a str>,
{
    stub_registry(names.into_iter().map(|name| (name, None)), fallback)
}
