//! Per-cycle wait set and the blocking-wait contract.
//!
//! A [`WaitSet`] holds one slot per ready-eligible source, grouped by kind,
//! plus one slot per [`WakeCondition`]. It is rebuilt every cycle. A
//! [`WaitPrimitive`] blocks on it and, on return, leaves only the slots that
//! are ready; everything else is nulled.

use std::sync::Arc;
use std::time::Duration;

use prioexec_errors::WaitSetError;

use crate::entities::{EventSource, SourceKind, WakeCondition, WakeListener};

/// Slot counts for one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSetSizes {
    /// Timer slots
    pub timers: usize,
    /// Subscription slots
    pub subscriptions: usize,
    /// Service slots
    pub services: usize,
    /// Client slots
    pub clients: usize,
    /// Waitable slots
    pub waitables: usize,
    /// Wake condition slots
    pub wake_conditions: usize,
}

impl WaitSetSizes {
    /// Slot count for one source kind.
    pub fn for_kind(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::Timer => self.timers,
            SourceKind::Subscription => self.subscriptions,
            SourceKind::Service => self.services,
            SourceKind::Client => self.clients,
            SourceKind::Waitable => self.waitables,
        }
    }

    /// Count one more source of `kind`.
    pub fn add(&mut self, kind: SourceKind) {
        let slot = match kind {
            SourceKind::Timer => &mut self.timers,
            SourceKind::Subscription => &mut self.subscriptions,
            SourceKind::Service => &mut self.services,
            SourceKind::Client => &mut self.clients,
            SourceKind::Waitable => &mut self.waitables,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total number of source slots.
    pub fn sources(&self) -> usize {
        SourceKind::PRECEDENCE
            .iter()
            .fold(0usize, |acc, kind| acc.saturating_add(self.for_kind(*kind)))
    }
}

type SourceSlots = Vec<Option<Arc<EventSource>>>;

/// Native wait handles for one cycle.
#[derive(Debug, Default)]
pub struct WaitSet {
    sizes: WaitSetSizes,
    timers: SourceSlots,
    subscriptions: SourceSlots,
    services: SourceSlots,
    clients: SourceSlots,
    waitables: SourceSlots,
    wake_conditions: Vec<Option<Arc<WakeCondition>>>,
}

impl WaitSet {
    /// Create an empty wait set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every entry, keeping allocations.
    pub fn clear(&mut self) {
        for kind in SourceKind::PRECEDENCE {
            self.slots_vec_mut(kind).clear();
        }
        self.wake_conditions.clear();
        self.sizes = WaitSetSizes::default();
    }

    /// Clear and size the set to exactly `sizes`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitSetError::Resize`] if memory for the slots cannot be
    /// reserved.
    pub fn resize(&mut self, sizes: WaitSetSizes) -> Result<(), WaitSetError> {
        self.clear();
        for kind in SourceKind::PRECEDENCE {
            let wanted = sizes.for_kind(kind);
            self.slots_vec_mut(kind)
                .try_reserve_exact(wanted)
                .map_err(|e| WaitSetError::resize(wanted, e.to_string()))?;
        }
        self.wake_conditions
            .try_reserve_exact(sizes.wake_conditions)
            .map_err(|e| WaitSetError::resize(sizes.wake_conditions, e.to_string()))?;
        self.sizes = sizes;
        Ok(())
    }

    /// Add a source to the slots of its kind.
    ///
    /// # Errors
    ///
    /// Returns [`WaitSetError::Populate`] if every slot of that kind is
    /// already used.
    pub fn add_source(&mut self, source: Arc<EventSource>) -> Result<(), WaitSetError> {
        let kind = source.kind();
        let capacity = self.sizes.for_kind(kind);
        let slots = self.slots_vec_mut(kind);
        if slots.len() >= capacity {
            return Err(WaitSetError::Populate {
                kind: kind.as_str(),
            });
        }
        slots.push(Some(source));
        Ok(())
    }

    /// Add a wake condition.
    ///
    /// # Errors
    ///
    /// Returns [`WaitSetError::Populate`] if every wake condition slot is
    /// already used.
    pub fn add_wake_condition(
        &mut self,
        condition: Arc<WakeCondition>,
    ) -> Result<(), WaitSetError> {
        if self.wake_conditions.len() >= self.sizes.wake_conditions {
            return Err(WaitSetError::Populate {
                kind: "wake_condition",
            });
        }
        self.wake_conditions.push(Some(condition));
        Ok(())
    }

    /// Slots of one kind, null entries included.
    pub fn slots(&self, kind: SourceKind) -> &[Option<Arc<EventSource>>] {
        match kind {
            SourceKind::Timer => &self.timers,
            SourceKind::Subscription => &self.subscriptions,
            SourceKind::Service => &self.services,
            SourceKind::Client => &self.clients,
            SourceKind::Waitable => &self.waitables,
        }
    }

    /// Mutable slots of one kind, for wait primitives to null.
    pub fn slots_mut(&mut self, kind: SourceKind) -> &mut [Option<Arc<EventSource>>] {
        self.slots_vec_mut(kind)
    }

    /// Wake condition slots.
    pub fn wake_conditions(&self) -> &[Option<Arc<WakeCondition>>] {
        &self.wake_conditions
    }

    /// Mutable wake condition slots.
    pub fn wake_conditions_mut(&mut self) -> &mut [Option<Arc<WakeCondition>>] {
        &mut self.wake_conditions
    }

    /// Sizes the set was last resized to.
    pub fn sizes(&self) -> WaitSetSizes {
        self.sizes
    }

    /// True if the set has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.wake_conditions.is_empty()
            && SourceKind::PRECEDENCE
                .iter()
                .all(|kind| self.slots(*kind).is_empty())
    }

    /// Number of non-null source slots.
    pub fn ready_sources(&self) -> usize {
        SourceKind::PRECEDENCE
            .iter()
            .map(|kind| self.slots(*kind).iter().flatten().count())
            .sum()
    }

    /// Null every entry that is not ready, if at least one entry is ready.
    ///
    /// Sources are ready when `is_ready` says so, wake conditions when
    /// triggered. Returns false and leaves the set untouched when nothing is
    /// ready. Wait primitives call this once per wake-up.
    pub fn retain_ready(&mut self, is_ready: impl Fn(&EventSource) -> bool) -> bool {
        let any_source = SourceKind::PRECEDENCE.iter().any(|kind| {
            self.slots(*kind)
                .iter()
                .flatten()
                .any(|source| is_ready(source))
        });
        let any_wake = self
            .wake_conditions
            .iter()
            .flatten()
            .any(|condition| condition.is_triggered());
        if !any_source && !any_wake {
            return false;
        }

        for kind in SourceKind::PRECEDENCE {
            for slot in self.slots_vec_mut(kind).iter_mut() {
                if slot.as_ref().is_some_and(|source| !is_ready(source)) {
                    *slot = None;
                }
            }
        }
        for slot in &mut self.wake_conditions {
            if slot.as_ref().is_some_and(|condition| !condition.is_triggered()) {
                *slot = None;
            }
        }
        true
    }

    fn slots_vec_mut(&mut self, kind: SourceKind) -> &mut SourceSlots {
        match kind {
            SourceKind::Timer => &mut self.timers,
            SourceKind::Subscription => &mut self.subscriptions,
            SourceKind::Service => &mut self.services,
            SourceKind::Client => &mut self.clients,
            SourceKind::Waitable => &mut self.waitables,
        }
    }
}

/// Result of one blocking wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    /// At least one entry is ready; the others were nulled
    Ready,
    /// The timeout elapsed with nothing ready
    Timeout,
    /// The wait set had no entries
    Empty,
    /// The wait itself failed
    Error(String),
}

/// Opaque blocking wait on a [`WaitSet`].
///
/// Implementations block until at least one entry is ready or `timeout`
/// elapses, then null every entry that is not ready (see
/// [`WaitSet::retain_ready`]).
pub trait WaitPrimitive: Send {
    /// Block on `wait_set` for at most `timeout`.
    fn wait(&mut self, wait_set: &mut WaitSet, timeout: Duration) -> WaitStatus;

    /// Listener attached to every registered [`WakeCondition`] so a trigger
    /// interrupts a blocked [`wait`](Self::wait).
    fn wake_listener(&self) -> Option<Arc<dyn WakeListener>> {
        None
    }
}
