//! Protocol violations.
//!
//! These indicate a caller or bookkeeping bug rather than a runtime
//! condition. The run loops fail fast on every one of them.

/// Protocol violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// `spin()` was called on an executor that is already spinning
    #[error("spin() called while already spinning")]
    AlreadySpinning,

    /// A mutually exclusive group was selected while its gate was closed
    #[error("callback group {group} selected while another member is in flight")]
    GateAlreadyTaken {
        /// Identity of the group
        group: u64,
    },

    /// The node is already registered with an executor
    #[error("node {node} has already been added to an executor")]
    NodeAlreadyAdded {
        /// Identity of the node
        node: u64,
    },

    /// The node is not registered with this executor
    #[error("node {node} is not registered with this executor")]
    NodeNotAdded {
        /// Identity of the node
        node: u64,
    },

    /// A timer identity was still checked out when its worker finished
    #[error("timer {timer} was never released from the scheduled set")]
    StuckTimer {
        /// Identity of the timer
        timer: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ProtocolError::AlreadySpinning.to_string(),
            "spin() called while already spinning"
        );
        let msg = ProtocolError::GateAlreadyTaken { group: 4 }.to_string();
        assert!(msg.contains("group 4"));
    }
}
