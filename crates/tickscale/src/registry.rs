//! Clock registry and selector
//!
//! A registry is an ordered, immutable table of named provider slots. Each
//! slot is probed once when the registry is built; absent providers keep
//! their slot (and position) but carry no read function.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::clock::{fallback_reader, ClockApi, ClockCandidate, ReadFn, Timestamp, FALLBACK_CLOCK};
use crate::{ClockError, ClockResult};

/// One named provider slot
#[derive(Clone)]
struct ClockSlot {
    name: String,
    read: Option<ReadFn>,
}

/// Ordered table of clock providers plus the universal fallback
#[derive(Clone)]
pub struct ClockRegistry {
    slots: Vec<ClockSlot>,
    fallback: ClockCandidate,
}

/// Outcome of [`ClockRegistry::select`]
#[derive(Clone, Debug)]
pub struct Selection {
    pub candidate: ClockCandidate,
    /// True when no preferred provider was present
    pub is_fallback: bool,
}

impl ClockRegistry {
    pub fn builder() -> ClockRegistryBuilder {
        ClockRegistryBuilder::default()
    }

    /// Registry of the built-in providers, probed once per process
    pub fn system() -> &'static ClockRegistry {
        static SYSTEM: OnceLock<ClockRegistry> = OnceLock::new();
        SYSTEM.get_or_init(Self::probe_system)
    }

    /// Probe the built-in providers into a fresh registry
    pub fn probe_system() -> ClockRegistry {
        let mut builder = Self::builder();
        for api in ClockApi::ALL {
            let present = api.probe();
            tracing::trace!(clock = api.as_str(), present, "probed clock");
            builder = builder.slot(api.as_str().to_string(), present.then(|| api.reader()));
        }
        // Built-in names are distinct and never the fallback name
        builder.build_unchecked()
    }

    /// Slot names in declaration order, present or not
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    /// Present providers in declaration order
    pub fn available(&self) -> Vec<ClockCandidate> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.read
                    .as_ref()
                    .map(|read| ClockCandidate::new(slot.name.clone(), read.clone()))
            })
            .collect()
    }

    /// Look up a present provider by name
    pub fn get(&self, name: &str) -> Option<ClockCandidate> {
        let slot = self.slots.iter().find(|slot| slot.name == name)?;
        let read = slot.read.as_ref()?;
        Some(ClockCandidate::new(slot.name.clone(), read.clone()))
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fallback(&self) -> &ClockCandidate {
        &self.fallback
    }

    /// Pick the first present provider in `preference`.
    ///
    /// An empty preference means declaration order. Unknown and absent
    /// names are skipped; when nothing matches the fallback clock is
    /// returned. Never fails.
    pub fn select<I, S>(&self, preference: I) -> Selection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut preference = preference.into_iter().peekable();
        let selected = if preference.peek().is_none() {
            self.first_present(self.slots.iter().map(|slot| slot.name.as_str()))
        } else {
            self.first_present(preference)
        };

        match selected {
            Some(candidate) => {
                tracing::debug!(clock = candidate.name(), "selected clock");
                Selection {
                    candidate,
                    is_fallback: false,
                }
            }
            None => {
                tracing::debug!(clock = FALLBACK_CLOCK, "no preferred clock present, using fallback");
                Selection {
                    candidate: self.fallback.clone(),
                    is_fallback: true,
                }
            }
        }
    }

    fn first_present<I, S>(&self, names: I) -> Option<ClockCandidate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            match self.get(name) {
                Some(candidate) => return Some(candidate),
                None => tracing::trace!(clock = name, "skipping absent clock"),
            }
        }
        None
    }
}

impl std::fmt::Debug for ClockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for slot in &self.slots {
            list.entry(&format_args!(
                "{}{}",
                slot.name,
                if slot.read.is_some() { "" } else { " (absent)" }
            ));
        }
        list.finish()
    }
}

/// Builder for [`ClockRegistry`].
///
/// Every provider must report milliseconds: the calibrator's sampling
/// window is 32 units of whatever scale the read function returns.
#[derive(Default)]
pub struct ClockRegistryBuilder {
    slots: Vec<ClockSlot>,
    fallback: Option<ReadFn>,
}

impl ClockRegistryBuilder {
    /// Add a provider. `probe` runs once, now; `read` is kept only when it
    /// reports the capability as present.
    pub fn provider<P, F>(mut self, name: impl Into<String>, probe: P, read: F) -> Self
    where
        P: FnOnce() -> bool,
        F: Fn() -> Timestamp + Send + Sync + 'static,
    {
        let name = name.into();
        let present = probe();
        tracing::trace!(clock = %name, present, "probed clock");
        self.slot(name, present.then(|| Arc::new(read) as ReadFn))
    }

    /// Add an always-present provider
    pub fn candidate<F>(self, name: impl Into<String>, read: F) -> Self
    where
        F: Fn() -> Timestamp + Send + Sync + 'static,
    {
        self.provider(name, || true, read)
    }

    /// Add an always-present provider from an existing read function,
    /// keeping its identity
    pub fn candidate_fn(self, name: impl Into<String>, read: ReadFn) -> Self {
        let name = name.into();
        tracing::trace!(clock = %name, present = true, "probed clock");
        self.slot(name, Some(read))
    }

    /// Add a provider slot that is absent on this host
    pub fn unavailable(self, name: impl Into<String>) -> Self {
        self.slot(name.into(), None)
    }

    fn slot(mut self, name: String, read: Option<ReadFn>) -> Self {
        self.slots.push(ClockSlot { name, read });
        self
    }

    /// Replace the fallback read function. The name stays [`FALLBACK_CLOCK`].
    pub fn fallback<F>(mut self, read: F) -> Self
    where
        F: Fn() -> Timestamp + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(read));
        self
    }

    /// Replace the fallback with an existing read function
    pub fn fallback_fn(mut self, read: ReadFn) -> Self {
        self.fallback = Some(read);
        self
    }

    pub fn build(self) -> ClockResult<ClockRegistry> {
        self.validate()?;
        Ok(self.build_unchecked())
    }

    fn validate(&self) -> ClockResult<()> {
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.name.is_empty() {
                return Err(ClockError::EmptyName);
            }
            if slot.name == FALLBACK_CLOCK {
                return Err(ClockError::ReservedName(slot.name.clone()));
            }
            if !seen.insert(slot.name.as_str()) {
                return Err(ClockError::DuplicateName(slot.name.clone()));
            }
        }
        Ok(())
    }

    fn build_unchecked(self) -> ClockRegistry {
        let fallback = self.fallback.unwrap_or_else(fallback_reader);
        ClockRegistry {
            slots: self.slots,
            fallback: ClockCandidate::new(FALLBACK_CLOCK, fallback),
        }
    }
}
