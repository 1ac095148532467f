//! Readiness collection: registered nodes to a ready list.
//!
//! Every cycle the collector
//!
//! 1. prunes expired nodes and gathers the sources of every group whose gate
//!    is open ([`prune_and_collect`](ReadinessCollector::prune_and_collect)),
//! 2. sizes and fills the wait set with them plus all wake conditions
//!    ([`rebuild_wait_set`](ReadinessCollector::rebuild_wait_set)),
//! 3. blocks on the wait primitive
//!    ([`block_until_ready_or_timeout`](ReadinessCollector::block_until_ready_or_timeout)),
//! 4. drops every collected source the wait did not report ready
//!    ([`discard_null_handles`](ReadinessCollector::discard_null_handles)).
//!
//! What is left is the ready list, in collection order (node registration
//! order, then group creation order, then source registration order). The
//! scheduler picks from it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use prioexec_errors::{ProtocolError, WaitSetError};
use tracing::{debug, warn};

use crate::entities::{EventSource, Node, NodeId, SourceKind, WakeCondition};
use crate::wait_set::{WaitPrimitive, WaitSet, WaitSetSizes, WaitStatus};

struct RegisteredNode {
    id: NodeId,
    node: Weak<Node>,
    wake: Arc<WakeCondition>,
}

/// How a blocking wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Something is ready
    Ready,
    /// Nothing became ready within the timeout
    Timeout,
    /// The wait set was empty; logged and retried
    Empty,
}

/// Owner of the registered nodes, the wait set and the wait primitive.
pub struct ReadinessCollector {
    nodes: Vec<RegisteredNode>,
    interrupt: Arc<WakeCondition>,
    wait: Box<dyn WaitPrimitive>,
    wait_set: WaitSet,
    handles: Vec<Arc<EventSource>>,
    sizes: WaitSetSizes,
}

impl ReadinessCollector {
    /// Create a collector around a wait primitive.
    ///
    /// `interrupt` is placed in every wait set next to the node conditions.
    pub fn new(wait: Box<dyn WaitPrimitive>, interrupt: Arc<WakeCondition>) -> Self {
        interrupt.set_listener(wait.wake_listener());
        Self {
            nodes: Vec::new(),
            interrupt,
            wait,
            wait_set: WaitSet::new(),
            handles: Vec::new(),
            sizes: WaitSetSizes::default(),
        }
    }

    /// Register a node.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NodeAlreadyAdded`] if the node is registered
    /// with any executor.
    pub fn add_node(&mut self, node: &Arc<Node>) -> Result<(), ProtocolError> {
        if !node.try_associate() {
            return Err(ProtocolError::NodeAlreadyAdded {
                node: node.id().get(),
            });
        }
        let wake = Arc::clone(node.wake_condition());
        wake.set_listener(self.wait.wake_listener());
        self.nodes.push(RegisteredNode {
            id: node.id(),
            node: Arc::downgrade(node),
            wake,
        });
        Ok(())
    }

    /// Deregister a node.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NodeNotAdded`] if the node is not registered
    /// here.
    pub fn remove_node(&mut self, node: &Arc<Node>) -> Result<(), ProtocolError> {
        let Some(index) = self.nodes.iter().position(|entry| entry.id == node.id()) else {
            return Err(ProtocolError::NodeNotAdded {
                node: node.id().get(),
            });
        };
        let entry = self.nodes.remove(index);
        entry.wake.set_listener(None);
        node.disassociate();
        Ok(())
    }

    /// Number of registered node entries, expired ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop expired nodes and collect the sources of every open group.
    ///
    /// Returns the number of nodes pruned.
    pub fn prune_and_collect(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|entry| {
            let alive = entry.node.strong_count() > 0;
            if !alive {
                entry.wake.set_listener(None);
            }
            alive
        });
        let pruned = before.saturating_sub(self.nodes.len());
        if pruned > 0 {
            debug!(pruned = pruned, "Pruned expired nodes");
        }

        self.handles.clear();
        self.sizes = WaitSetSizes::default();
        for entry in &self.nodes {
            let Some(node) = entry.node.upgrade() else {
                continue;
            };
            for group in node.callback_groups() {
                if !group.can_be_taken_from() {
                    continue;
                }
                for source in group.sources() {
                    self.sizes.add(source.kind());
                    self.handles.push(source);
                }
            }
        }
        self.sizes.wake_conditions = self.nodes.len().saturating_add(1);
        pruned
    }

    /// Clear, resize and fill the wait set from the last collection.
    ///
    /// # Errors
    ///
    /// Any [`WaitSetError`] is fatal to the run loop.
    pub fn rebuild_wait_set(&mut self) -> Result<(), WaitSetError> {
        self.wait_set.resize(self.sizes)?;
        for source in &self.handles {
            self.wait_set.add_source(Arc::clone(source))?;
        }
        self.wait_set.add_wake_condition(Arc::clone(&self.interrupt))?;
        for entry in &self.nodes {
            self.wait_set.add_wake_condition(Arc::clone(&entry.wake))?;
        }
        Ok(())
    }

    /// Block until something in the wait set is ready or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`WaitSetError::Wait`] if the wait primitive failed.
    pub fn block_until_ready_or_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<WaitOutcome, WaitSetError> {
        match self.wait.wait(&mut self.wait_set, timeout) {
            WaitStatus::Ready => Ok(WaitOutcome::Ready),
            WaitStatus::Timeout => Ok(WaitOutcome::Timeout),
            WaitStatus::Empty => {
                warn!("Wait set was empty; this indicates a bookkeeping anomaly");
                Ok(WaitOutcome::Empty)
            }
            WaitStatus::Error(reason) => Err(WaitSetError::wait(reason)),
        }
    }

    /// Keep only the collected sources the wait reported ready.
    ///
    /// Consumes triggered wake conditions. Returns the number of ready
    /// sources left.
    pub fn discard_null_handles(&mut self) -> usize {
        for condition in self.wait_set.wake_conditions().iter().flatten() {
            condition.take_triggered();
        }

        let wait_set = &self.wait_set;
        let mut cursors = KindCursors::default();
        self.handles.retain(|source| {
            let slot = cursors.next(source.kind());
            wait_set
                .slots(source.kind())
                .get(slot)
                .is_some_and(|entry| entry.as_ref().is_some_and(|s| Arc::ptr_eq(s, source)))
        });
        self.handles.len()
    }

    /// Ready list left by the last [`discard_null_handles`](Self::discard_null_handles).
    pub fn ready(&self) -> &[Arc<EventSource>] {
        &self.handles
    }

    /// Mutable ready list; the scheduler removes what it selects.
    pub fn ready_mut(&mut self) -> &mut Vec<Arc<EventSource>> {
        &mut self.handles
    }

    /// The current wait set.
    pub fn wait_set(&self) -> &WaitSet {
        &self.wait_set
    }
}

impl core::fmt::Debug for ReadinessCollector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadinessCollector")
            .field("nodes", &self.nodes.len())
            .field("handles", &self.handles.len())
            .field("sizes", &self.sizes)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct KindCursors {
    timers: usize,
    subscriptions: usize,
    services: usize,
    clients: usize,
    waitables: usize,
}

impl KindCursors {
    fn next(&mut self, kind: SourceKind) -> usize {
        let cursor = match kind {
            SourceKind::Timer => &mut self.timers,
            SourceKind::Subscription => &mut self.subscriptions,
            SourceKind::Service => &mut self.services,
            SourceKind::Client => &mut self.clients,
            SourceKind::Waitable => &mut self.waitables,
        };
        let current = *cursor;
        *cursor = cursor.saturating_add(1);
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Exclusivity;
    use crate::test_support::{Flag, ImmediateWait, Inert};

    fn new_collector() -> ReadinessCollector {
        ReadinessCollector::new(
            Box::new(ImmediateWait::default()),
            Arc::new(WakeCondition::new()),
        )
    }

    #[test]
    fn test_add_node_twice_is_rejected() {
        let node = Node::new("n");
        let mut collector = new_collector();
        assert_eq!(collector.add_node(&node), Ok(()));

        let mut other = new_collector();
        assert_eq!(
            other.add_node(&node),
            Err(ProtocolError::NodeAlreadyAdded {
                node: node.id().get()
            })
        );

        assert_eq!(collector.remove_node(&node), Ok(()));
        assert!(other.add_node(&node).is_ok());
    }

    #[test]
    fn test_remove_unknown_node() {
        let node = Node::new("n");
        let mut collector = new_collector();
        assert_eq!(
            collector.remove_node(&node),
            Err(ProtocolError::NodeNotAdded {
                node: node.id().get()
            })
        );
    }

    #[test]
    fn test_expired_nodes_are_pruned_before_rebuild() -> Result<(), WaitSetError> {
        let keep = Node::new("keep");
        let gone = Node::new("gone");
        keep.add_source(SourceKind::Timer, 0, Arc::new(Inert));
        gone.add_source(SourceKind::Timer, 0, Arc::new(Inert));

        let mut collector = new_collector();
        assert!(collector.add_node(&keep).is_ok());
        assert!(collector.add_node(&gone).is_ok());
        drop(gone);

        assert_eq!(collector.prune_and_collect(), 1);
        assert_eq!(collector.node_count(), 1);
        collector.rebuild_wait_set()?;

        let sizes = collector.wait_set().sizes();
        assert_eq!(sizes.timers, 1);
        assert_eq!(sizes.wake_conditions, 2);
        Ok(())
    }

    #[test]
    fn test_closed_groups_are_not_collected() -> Result<(), WaitSetError> {
        let node = Node::new("n");
        let exclusive = node.create_callback_group(Exclusivity::MutuallyExclusive);
        exclusive.add_source(SourceKind::Subscription, 0, Arc::new(Inert));
        node.add_source(SourceKind::Subscription, 0, Arc::new(Inert));

        let mut collector = new_collector();
        assert!(collector.add_node(&node).is_ok());

        assert!(exclusive.gate().try_take());
        collector.prune_and_collect();
        collector.rebuild_wait_set()?;
        assert_eq!(collector.wait_set().sizes().subscriptions, 1);

        exclusive.gate().release();
        collector.prune_and_collect();
        collector.rebuild_wait_set()?;
        assert_eq!(collector.wait_set().sizes().subscriptions, 2);
        Ok(())
    }

    #[test]
    fn test_discard_keeps_collection_order() -> Result<(), WaitSetError> {
        let node = Node::new("n");
        let a = Arc::new(Flag::new(true));
        let b = Arc::new(Flag::new(false));
        let c = Arc::new(Flag::new(true));
        let first = node.add_source(SourceKind::Service, 0, a);
        node.add_source(SourceKind::Timer, 0, b);
        let third = node.add_source(SourceKind::Service, 0, c);

        let mut collector = new_collector();
        assert!(collector.add_node(&node).is_ok());
        collector.prune_and_collect();
        collector.rebuild_wait_set()?;
        assert_eq!(
            collector.block_until_ready_or_timeout(Duration::from_millis(1))?,
            WaitOutcome::Ready
        );
        assert_eq!(collector.discard_null_handles(), 2);

        let ids: Vec<_> = collector.ready().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![first.id(), third.id()]);
        Ok(())
    }

    #[test]
    fn test_wait_error_is_fatal() -> Result<(), WaitSetError> {
        let mut collector = ReadinessCollector::new(
            Box::new(ImmediateWait::failing("driver gone")),
            Arc::new(WakeCondition::new()),
        );
        collector.prune_and_collect();
        collector.rebuild_wait_set()?;
        assert_eq!(
            collector.block_until_ready_or_timeout(Duration::from_millis(1)),
            Err(WaitSetError::wait("driver gone"))
        );
        Ok(())
    }
}
