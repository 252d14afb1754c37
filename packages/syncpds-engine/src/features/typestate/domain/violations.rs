/*
 * Protocol Violations
 *
 * Findings of the typestate analysis, reported at the method end point
 * where a resource is abandoned.
 */

use super::State;
use crate::shared::models::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Every path leaves the resource in a non-final state
    ResourceLeak,

    /// Some paths leave the resource in a non-final state
    MaybeLeaked,

    /// Some path called a method the protocol forbids in that state
    InvalidTransition,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::ResourceLeak => write!(f, "Resource Leak"),
            ViolationKind::MaybeLeaked => write!(f, "Maybe Leaked"),
            ViolationKind::InvalidTransition => write!(f, "Invalid Transition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolViolation {
    pub kind: ViolationKind,

    /// Allocation site of the resource
    pub allocation: Node,

    /// End point where the resource is abandoned
    pub node: Node,

    /// States the resource may be in at `node`
    pub states: BTreeSet<State>,

    pub message: String,
}

impl ProtocolViolation {
    pub fn new(
        kind: ViolationKind,
        allocation: Node,
        node: Node,
        states: BTreeSet<State>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            allocation,
            node,
            states,
            message: message.into(),
        }
    }

    pub fn format_message(&self) -> String {
        format!(
            "{}: {} on '{}' - {}",
            self.node.stmt, self.kind, self.node.fact.name, self.message
        )
    }
}

impl std::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_message())
    }
}
