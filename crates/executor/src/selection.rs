//! Picking one unit of work from the ready list.
//!
//! Two strategies sit behind [`SelectionStrategy`]:
//!
//! - [`KindPrecedence`]: timers, then subscriptions, services, clients and
//!   waitables. Within a kind the first ready source in collection order
//!   wins.
//! - [`PriorityOrder`]: the largest [`EventSource::priority`] across all
//!   kinds. Ties go to the source collected first.
//!
//! Both skip sources whose mutually exclusive group is in flight. The
//! [`PriorityScheduler`] switches between them at runtime and closes the gate
//! of whatever it selects.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prioexec_errors::ProtocolError;

use crate::entities::{CallbackGroup, EventSource, Node, SourceId, SourceKind};

/// Policy choosing an index into the ready list.
pub trait SelectionStrategy: Send + Sync {
    /// Index of the source to run next, or `None` if nothing can be taken.
    fn pick(&self, ready: &[Arc<EventSource>]) -> Option<usize>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Strict kind precedence: Timer > Subscription > Service > Client > Waitable.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindPrecedence;

impl SelectionStrategy for KindPrecedence {
    fn pick(&self, ready: &[Arc<EventSource>]) -> Option<usize> {
        SourceKind::PRECEDENCE.iter().find_map(|kind| {
            ready
                .iter()
                .position(|source| source.kind() == *kind && source.can_be_taken())
        })
    }

    fn name(&self) -> &'static str {
        "kind_precedence"
    }
}

/// Largest priority first, ties in collection order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityOrder;

impl SelectionStrategy for PriorityOrder {
    fn pick(&self, ready: &[Arc<EventSource>]) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (index, source) in ready.iter().enumerate() {
            if !source.can_be_taken() {
                continue;
            }
            match best {
                Some((_, priority)) if source.priority() <= priority => {}
                _ => best = Some((index, source.priority())),
            }
        }
        best.map(|(index, _)| index)
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}

/// Which strategy a [`PriorityScheduler`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// [`KindPrecedence`]
    #[default]
    KindPrecedence,
    /// [`PriorityOrder`]
    Priority,
}

impl SelectionMode {
    /// Mode for a `use_priorities` flag.
    pub fn from_use_priorities(use_priorities: bool) -> Self {
        if use_priorities {
            SelectionMode::Priority
        } else {
            SelectionMode::KindPrecedence
        }
    }

    /// The strategy implementing this mode.
    pub fn strategy(self) -> &'static dyn SelectionStrategy {
        match self {
            SelectionMode::KindPrecedence => &KindPrecedence,
            SelectionMode::Priority => &PriorityOrder,
        }
    }
}

/// A selected source, tagged by kind.
#[derive(Debug, Clone)]
pub enum Executable {
    /// A timer
    Timer(Arc<EventSource>),
    /// A subscription
    Subscription(Arc<EventSource>),
    /// A service server
    Service(Arc<EventSource>),
    /// A service client
    Client(Arc<EventSource>),
    /// A waitable
    Waitable(Arc<EventSource>),
}

impl Executable {
    fn new(source: Arc<EventSource>) -> Self {
        match source.kind() {
            SourceKind::Timer => Executable::Timer(source),
            SourceKind::Subscription => Executable::Subscription(source),
            SourceKind::Service => Executable::Service(source),
            SourceKind::Client => Executable::Client(source),
            SourceKind::Waitable => Executable::Waitable(source),
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &Arc<EventSource> {
        match self {
            Executable::Timer(s)
            | Executable::Subscription(s)
            | Executable::Service(s)
            | Executable::Client(s)
            | Executable::Waitable(s) => s,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> SourceKind {
        match self {
            Executable::Timer(_) => SourceKind::Timer,
            Executable::Subscription(_) => SourceKind::Subscription,
            Executable::Service(_) => SourceKind::Service,
            Executable::Client(_) => SourceKind::Client,
            Executable::Waitable(_) => SourceKind::Waitable,
        }
    }
}

/// The unit of work a thread owns from selection until completion.
///
/// Holds the owning group and node alive for the duration. For a mutually
/// exclusive group the gate is closed while the unit holds it; it is
/// reopened only by [`release_gate`](Self::release_gate), never on drop.
#[derive(Debug)]
pub struct SelectedUnit {
    executable: Executable,
    group: Arc<CallbackGroup>,
    node: Arc<Node>,
    gate_held: bool,
}

impl SelectedUnit {
    /// Kind-tagged source.
    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// The selected source.
    pub fn source(&self) -> &Arc<EventSource> {
        self.executable.source()
    }

    /// Identity of the selected source.
    pub fn id(&self) -> SourceId {
        self.source().id()
    }

    /// Kind of the selected source.
    pub fn kind(&self) -> SourceKind {
        self.executable.kind()
    }

    /// Identity of the timer, if the unit is one.
    pub fn timer_id(&self) -> Option<SourceId> {
        match &self.executable {
            Executable::Timer(source) => Some(source.id()),
            _ => None,
        }
    }

    /// Owning group.
    pub fn group(&self) -> &Arc<CallbackGroup> {
        &self.group
    }

    /// Owning node.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// True while this unit keeps its group's gate closed.
    pub fn holds_gate(&self) -> bool {
        self.gate_held
    }

    /// Reopen the group's gate if this unit closed it.
    ///
    /// Idempotent: returns true only on the call that actually reopened it.
    pub fn release_gate(&mut self) -> bool {
        if !self.gate_held {
            return false;
        }
        self.gate_held = false;
        self.group.gate().release()
    }
}

/// Selection with a runtime-switchable strategy.
#[derive(Debug, Default)]
pub struct PriorityScheduler {
    use_priorities: AtomicBool,
}

impl PriorityScheduler {
    /// Create a scheduler in `mode`.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            use_priorities: AtomicBool::new(mode == SelectionMode::Priority),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> SelectionMode {
        SelectionMode::from_use_priorities(self.use_priorities.load(Ordering::Acquire))
    }

    /// Switch between priority and kind-precedence selection.
    pub fn set_use_priorities(&self, enabled: bool) {
        self.use_priorities.store(enabled, Ordering::Release);
    }

    /// Select one unit from `ready` with the current strategy.
    ///
    /// See [`select_with`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::GateAlreadyTaken`] if the chosen unit's
    /// mutually exclusive gate was closed.
    pub fn select(
        &self,
        ready: &mut Vec<Arc<EventSource>>,
    ) -> Result<Option<SelectedUnit>, ProtocolError> {
        select_with(self.mode().strategy(), ready)
    }
}

/// Select one unit from `ready` using `strategy`.
///
/// Sources whose group or node expired are dropped from `ready` first. The
/// selected source is removed from `ready`, and its group's gate is closed
/// if the group is mutually exclusive.
///
/// # Errors
///
/// Returns [`ProtocolError::GateAlreadyTaken`] if the chosen unit's
/// mutually exclusive gate was already closed.
pub fn select_with(
    strategy: &dyn SelectionStrategy,
    ready: &mut Vec<Arc<EventSource>>,
) -> Result<Option<SelectedUnit>, ProtocolError> {
    ready.retain(|source| source.group().is_some() && source.node().is_some());

    let Some(index) = strategy.pick(ready) else {
        return Ok(None);
    };
    if index >= ready.len() {
        return Ok(None);
    }
    let source = ready.remove(index);
    let (Some(group), Some(node)) = (source.group(), source.node()) else {
        return Ok(None);
    };

    let gate_held = group.is_mutually_exclusive();
    if gate_held && !group.gate().try_take() {
        return Err(ProtocolError::GateAlreadyTaken {
            group: group.id().get(),
        });
    }

    Ok(Some(SelectedUnit {
        executable: Executable::new(source),
        group,
        node,
        gate_held,
    }))
}
