/*
 * Protocol Definition Parser
 *
 * Custom protocols from YAML or JSON:
 *
 * ```yaml
 * protocol: Transaction
 * initial_state: Idle
 * final_states: [Committed, RolledBack]
 * error_state: Broken        # optional, defaults to "Error"
 * transitions:
 *   - { from: Idle,   action: begin,  to: Active }
 *   - { from: Active, action: commit, to: Committed }
 * preconditions:
 *   query: { requires: Active }
 * ```
 */

use crate::features::typestate::domain::{Action, Protocol, State};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub protocol: String,

    pub initial_state: String,

    #[serde(default)]
    pub final_states: Vec<String>,

    #[serde(default)]
    pub error_state: Option<String>,

    pub transitions: Vec<TransitionConfig>,

    #[serde(default)]
    pub preconditions: BTreeMap<String, PreconditionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub from: String,
    pub action: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreconditionConfig {
    pub requires: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Unreachable final states and similar
    #[error("Semantic error: {0}")]
    Semantic(String),
}

pub struct ProtocolParser;

impl ProtocolParser {
    pub fn from_yaml(yaml: &str) -> Result<Protocol, ParseError> {
        let config: ProtocolConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ParseError::Syntax(format!("YAML parse error: {}", e)))?;
        Self::build_protocol(config)
    }

    pub fn from_json(json: &str) -> Result<Protocol, ParseError> {
        let config: ProtocolConfig = serde_json::from_str(json)
            .map_err(|e| ParseError::Syntax(format!("JSON parse error: {}", e)))?;
        Self::build_protocol(config)
    }

    fn build_protocol(config: ProtocolConfig) -> Result<Protocol, ParseError> {
        let mut protocol = Protocol::new(&config.protocol);

        if let Some(error_state) = &config.error_state {
            protocol.set_error_state(State::new(error_state));
        }
        protocol.set_initial_state(State::new(&config.initial_state));
        for final_state in &config.final_states {
            protocol.add_final_state(State::new(final_state));
        }
        for transition in &config.transitions {
            protocol.add_transition(
                State::new(&transition.from),
                Action::new(&transition.action),
                State::new(&transition.to),
            );
        }
        for (action_name, precond) in &config.preconditions {
            protocol.add_precondition(Action::new(action_name), State::new(&precond.requires));
        }

        protocol.validate().map_err(ParseError::Validation)?;
        Self::validate_semantics(&config)?;

        Ok(protocol)
    }

    /// Every final state must be reachable from the initial state
    fn validate_semantics(config: &ProtocolConfig) -> Result<(), ParseError> {
        let mut reachable: BTreeSet<&str> = BTreeSet::new();
        reachable.insert(config.initial_state.as_str());

        loop {
            let before = reachable.len();
            for t in &config.transitions {
                if reachable.contains(t.from.as_str()) {
                    reachable.insert(t.to.as_str());
                }
            }
            if reachable.len() == before {
                break;
            }
        }

        for final_state in &config.final_states {
            if !reachable.contains(final_state.as_str()) {
                return Err(ParseError::Semantic(format!(
                    "Final state '{}' is unreachable from initial state '{}'",
                    final_state, config.initial_state
                )));
            }
        }

        Ok(())
    }
}

/// Fluent protocol construction
///
/// ```rust
/// use syncpds_engine::features::typestate::ProtocolBuilder;
///
/// let protocol = ProtocolBuilder::new("Job")
///     .initial_state("Init")
///     .add_transition("Init", "start", "Running")
///     .add_transition("Running", "stop", "Stopped")
///     .final_state("Stopped")
///     .build();
/// assert!(protocol.validate().is_ok());
/// ```
pub struct ProtocolBuilder {
    protocol: Protocol,
}

impl ProtocolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::new(name),
        }
    }

    pub fn initial_state(mut self, state: impl Into<String>) -> Self {
        self.protocol.set_initial_state(State::new(state.into()));
        self
    }

    pub fn add_transition(
        mut self,
        from: impl Into<String>,
        action: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.protocol.add_transition(
            State::new(from.into()),
            Action::new(action.into()),
            State::new(to.into()),
        );
        self
    }

    pub fn final_state(mut self, state: impl Into<String>) -> Self {
        self.protocol.add_final_state(State::new(state.into()));
        self
    }

    pub fn precondition(
        mut self,
        action: impl Into<String>,
        required_state: impl Into<String>,
    ) -> Self {
        self.protocol.add_precondition(
            Action::new(action.into()),
            State::new(required_state.into()),
        );
        self
    }

    pub fn build(self) -> Protocol {
        self.protocol
    }
}
