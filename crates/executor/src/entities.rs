//! Nodes, callback groups and event sources.
//!
//! Ownership runs downward: a [`Node`] owns its [`CallbackGroup`]s, a group
//! owns its [`EventSource`]s. Every back-reference is a [`Weak`], so the
//! executor never extends the lifetime of anything the hosting runtime has
//! dropped. The executor itself only keeps weak node references and prunes
//! expired ones before every wait-set rebuild.

use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use prioexec_errors::{CallbackError, TakeError};
use serde::{Deserialize, Serialize};

use crate::gate::CallbackGroupGate;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Raw numeric identity.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Stable identity of an event source; the dedup key for timers.
    SourceId,
    NEXT_SOURCE_ID
);
entity_id!(
    /// Identity of a callback group.
    GroupId,
    NEXT_GROUP_ID
);
entity_id!(
    /// Identity of a node.
    NodeId,
    NEXT_NODE_ID
);

/// Kind of an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Periodic timer
    Timer,
    /// Topic subscription
    Subscription,
    /// Service server receiving requests
    Service,
    /// Service client receiving responses
    Client,
    /// Generic waitable
    Waitable,
}

impl SourceKind {
    /// All kinds in default-mode precedence order, highest first.
    pub const PRECEDENCE: [SourceKind; 5] = [
        SourceKind::Timer,
        SourceKind::Subscription,
        SourceKind::Service,
        SourceKind::Client,
        SourceKind::Waitable,
    ];

    /// Lowercase name used in logs and trace events.
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceKind::Timer => "timer",
            SourceKind::Subscription => "subscription",
            SourceKind::Service => "service",
            SourceKind::Client => "client",
            SourceKind::Waitable => "waitable",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-erased data taken from a ready source.
///
/// A message for subscriptions, a request for services, a response for
/// clients, the expiry for timers, whatever the waitable needs for waitables.
pub type Payload = Box<dyn Any + Send>;

/// Transport-side behaviour of an event source.
///
/// The executor drives every kind through the same three steps: `take` the
/// pending data, hand it to `execute`, then give it back with `release`.
pub trait SourceHandle: Send + Sync {
    /// True while the source has pending work. Queried by wait primitives.
    fn is_ready(&self) -> bool;

    /// Take the pending data.
    ///
    /// `Ok(None)` means the source woke without data (another worker took it,
    /// or the timer was cancelled) and the cycle is skipped.
    ///
    /// # Errors
    ///
    /// A [`TakeError`] is logged and counted; the cycle is skipped.
    fn take(&self) -> Result<Option<Payload>, TakeError>;

    /// Run the user callback on taken data.
    ///
    /// # Errors
    ///
    /// A [`CallbackError`] ends `spin()` once completion bookkeeping is done.
    fn execute(&self, payload: &mut Payload) -> Result<(), CallbackError>;

    /// Return taken data to the transport (loaned or serialized buffers).
    ///
    /// # Errors
    ///
    /// Failures are logged and never propagated.
    fn release(&self, _payload: Payload) -> Result<(), TakeError> {
        Ok(())
    }
}

/// A timer, subscription, service, client or waitable registered in a group.
pub struct EventSource {
    id: SourceId,
    kind: SourceKind,
    priority: i32,
    handle: Arc<dyn SourceHandle>,
    group: Weak<CallbackGroup>,
    node: Weak<Node>,
}

impl EventSource {
    /// Identity of this source.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Kind of this source.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Priority used in priority mode; larger runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Transport-side handle.
    pub fn handle(&self) -> &Arc<dyn SourceHandle> {
        &self.handle
    }

    /// Owning group, if it is still alive.
    pub fn group(&self) -> Option<Arc<CallbackGroup>> {
        self.group.upgrade()
    }

    /// Owning node, if it is still alive.
    pub fn node(&self) -> Option<Arc<Node>> {
        self.node.upgrade()
    }

    /// True if the owning group is alive and its gate is open.
    pub fn can_be_taken(&self) -> bool {
        self.group
            .upgrade()
            .is_some_and(|group| group.can_be_taken_from())
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Exclusivity policy of a callback group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exclusivity {
    /// At most one member runs at a time, system-wide.
    MutuallyExclusive,
    /// Members may run concurrently, including with themselves.
    Reentrant,
}

/// A set of event sources sharing an exclusivity policy.
pub struct CallbackGroup {
    id: GroupId,
    exclusivity: Exclusivity,
    gate: CallbackGroupGate,
    sources: RwLock<Vec<Arc<EventSource>>>,
    node: Weak<Node>,
    self_ref: Weak<CallbackGroup>,
}

impl CallbackGroup {
    fn new(exclusivity: Exclusivity, node: Weak<Node>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: GroupId::next(),
            exclusivity,
            gate: CallbackGroupGate::new(),
            sources: RwLock::new(Vec::new()),
            node,
            self_ref: self_ref.clone(),
        })
    }

    /// Identity of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Exclusivity policy.
    pub fn exclusivity(&self) -> Exclusivity {
        self.exclusivity
    }

    /// True for [`Exclusivity::MutuallyExclusive`] groups.
    pub fn is_mutually_exclusive(&self) -> bool {
        self.exclusivity == Exclusivity::MutuallyExclusive
    }

    /// The group's gate. Only consulted for mutually exclusive groups.
    pub fn gate(&self) -> &CallbackGroupGate {
        &self.gate
    }

    /// True unless a member of this mutually exclusive group is in flight.
    pub fn can_be_taken_from(&self) -> bool {
        match self.exclusivity {
            Exclusivity::Reentrant => true,
            Exclusivity::MutuallyExclusive => self.gate.is_available(),
        }
    }

    /// Register a new source in this group.
    ///
    /// Wakes any executor the owning node is registered with so the source
    /// is picked up on the next rebuild.
    pub fn add_source(
        &self,
        kind: SourceKind,
        priority: i32,
        handle: Arc<dyn SourceHandle>,
    ) -> Arc<EventSource> {
        let source = Arc::new(EventSource {
            id: SourceId::next(),
            kind,
            priority,
            handle,
            group: self.self_ref.clone(),
            node: self.node.clone(),
        });
        self.sources.write().push(Arc::clone(&source));
        if let Some(node) = self.node.upgrade() {
            node.wake_condition().trigger();
        }
        source
    }

    /// Deregister a source. Returns it if it was a member.
    pub fn remove_source(&self, id: SourceId) -> Option<Arc<EventSource>> {
        let mut sources = self.sources.write();
        let index = sources.iter().position(|s| s.id == id)?;
        Some(sources.remove(index))
    }

    /// Snapshot of the member sources in registration order.
    pub fn sources(&self) -> Vec<Arc<EventSource>> {
        self.sources.read().clone()
    }

    /// Number of member sources.
    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    /// True if the group has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

impl fmt::Debug for CallbackGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackGroup")
            .field("id", &self.id)
            .field("exclusivity", &self.exclusivity)
            .field("available", &self.gate.is_available())
            .field("sources", &self.len())
            .finish()
    }
}

/// Listener notified when a [`WakeCondition`] is triggered.
///
/// Wait primitives implement this so a trigger interrupts a blocked wait.
pub trait WakeListener: Send + Sync {
    /// Called from the triggering thread.
    fn wake(&self);
}

/// Manually triggered condition placed in every wait set.
///
/// Each node carries one (triggered when its sources change) and each
/// executor carries one (triggered on shutdown and after every completed
/// execution).
#[derive(Default)]
pub struct WakeCondition {
    triggered: AtomicBool,
    listener: RwLock<Option<Arc<dyn WakeListener>>>,
}

impl WakeCondition {
    /// Create an untriggered condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the condition and notify the attached listener.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        if let Some(listener) = self.listener.read().as_ref() {
            listener.wake();
        }
    }

    /// True if triggered and not yet consumed.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Consume the trigger. Returns whether it was set.
    pub fn take_triggered(&self) -> bool {
        self.triggered.swap(false, Ordering::AcqRel)
    }

    /// Attach or detach the listener woken by [`trigger`](Self::trigger).
    pub fn set_listener(&self, listener: Option<Arc<dyn WakeListener>>) {
        *self.listener.write() = listener;
    }
}

impl fmt::Debug for WakeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeCondition")
            .field("triggered", &self.is_triggered())
            .finish_non_exhaustive()
    }
}

/// A named container of callback groups.
pub struct Node {
    id: NodeId,
    name: String,
    groups: RwLock<Vec<Arc<CallbackGroup>>>,
    default_group: Arc<CallbackGroup>,
    wake: Arc<WakeCondition>,
    associated: AtomicBool,
    self_ref: Weak<Node>,
}

impl Node {
    /// Create a node with a mutually exclusive default group.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|self_ref: &Weak<Node>| {
            let default_group = CallbackGroup::new(Exclusivity::MutuallyExclusive, self_ref.clone());
            Self {
                id: NodeId::next(),
                name,
                groups: RwLock::new(vec![Arc::clone(&default_group)]),
                default_group,
                wake: Arc::new(WakeCondition::new()),
                associated: AtomicBool::new(false),
                self_ref: self_ref.clone(),
            }
        })
    }

    /// Identity of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group sources go to unless another is chosen.
    pub fn default_callback_group(&self) -> &Arc<CallbackGroup> {
        &self.default_group
    }

    /// Create and register a new callback group.
    pub fn create_callback_group(&self, exclusivity: Exclusivity) -> Arc<CallbackGroup> {
        let group = CallbackGroup::new(exclusivity, self.self_ref.clone());
        self.groups.write().push(Arc::clone(&group));
        self.wake.trigger();
        group
    }

    /// Deregister a callback group. Its sources stop being collected.
    pub fn remove_callback_group(&self, id: GroupId) -> Option<Arc<CallbackGroup>> {
        let removed = {
            let mut groups = self.groups.write();
            let index = groups.iter().position(|g| g.id() == id)?;
            groups.remove(index)
        };
        self.wake.trigger();
        Some(removed)
    }

    /// Snapshot of the registered groups in creation order.
    pub fn callback_groups(&self) -> Vec<Arc<CallbackGroup>> {
        self.groups.read().clone()
    }

    /// Register a source in the default group.
    pub fn add_source(
        &self,
        kind: SourceKind,
        priority: i32,
        handle: Arc<dyn SourceHandle>,
    ) -> Arc<EventSource> {
        self.default_group.add_source(kind, priority, handle)
    }

    /// Condition triggered when this node's sources change.
    pub fn wake_condition(&self) -> &Arc<WakeCondition> {
        &self.wake
    }

    /// Mark the node as owned by an executor. Fails if it already is.
    pub(crate) fn try_associate(&self) -> bool {
        self.associated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn disassociate(&self) {
        self.associated.store(false, Ordering::Release);
    }

    /// True while an executor has this node registered.
    pub fn is_associated(&self) -> bool {
        self.associated.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("groups", &self.groups.read().len())
            .finish()
    }
}
