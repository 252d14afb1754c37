/*
 * Protocol Definition
 *
 * Finite-state description of a resource lifecycle, driven by method
 * names called on the resource.
 *
 * ```text
 * States: {Closed, Open, Error}
 *   Closed --open()--> Open
 *   Open   --read()--> Open
 *   Open   --close()-> Closed
 * ```
 *
 * A call whose name belongs to the protocol but has no transition from
 * the current state moves the resource to the error state. Names outside
 * the protocol leave the state unchanged.
 */

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// State of a tracked resource (e.g. "Open", "Closed")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub name: String,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Method call that triggers a transition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub method_name: String,
}

impl Action {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method_name: method.into(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}()", self.method_name)
    }
}

/// Typestate protocol definition
///
/// # Example
/// ```ignore
/// let mut protocol = Protocol::new("File");
///
/// let closed = State::new("Closed");
/// let open = State::new("Open");
///
/// protocol.set_initial_state(closed.clone());
/// protocol.add_final_state(closed.clone());
///
/// protocol.add_transition(closed.clone(), Action::new("open"), open.clone());
/// protocol.add_transition(open, Action::new("close"), closed);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol name (e.g., "File", "Lock", "Connection")
    pub name: String,

    pub states: BTreeSet<State>,

    pub initial_state: State,

    /// Accepting states: where a resource may legally be abandoned
    pub final_states: BTreeSet<State>,

    /// Sink for calls the protocol forbids in the current state
    pub error_state: State,

    /// (from_state, action) → to_state
    pub transitions: FxHashMap<(State, Action), State>,

    /// Actions that require specific states, for diagnostics
    pub action_preconditions: HashMap<Action, State>,
}

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        let error_state = State::new("Error");
        let mut states = BTreeSet::new();
        states.insert(error_state.clone());
        Self {
            name: name.into(),
            states,
            initial_state: State::new("Initial"),
            final_states: BTreeSet::new(),
            error_state,
            transitions: FxHashMap::default(),
            action_preconditions: HashMap::new(),
        }
    }

    pub fn add_state(&mut self, state: State) {
        self.states.insert(state);
    }

    pub fn add_transition(&mut self, from: State, action: Action, to: State) {
        self.states.insert(from.clone());
        self.states.insert(to.clone());
        self.transitions.insert((from, action), to);
    }

    pub fn can_transition(&self, from: &State, action: &Action, to: &State) -> bool {
        self.transitions.get(&(from.clone(), action.clone())) == Some(to)
    }

    /// Declared transition, `None` when undefined
    pub fn next_state(&self, from: &State, action: &Action) -> Option<State> {
        self.transitions
            .get(&(from.clone(), action.clone()))
            .cloned()
    }

    /// Total transition function over the protocol's own actions
    ///
    /// Undefined transitions (and every call from the error state) end in
    /// the error state.
    pub fn step(&self, from: &State, action: &Action) -> State {
        if from == &self.error_state {
            return self.error_state.clone();
        }
        self.next_state(from, action)
            .unwrap_or_else(|| self.error_state.clone())
    }

    /// Method names the protocol reacts to
    pub fn actions(&self) -> BTreeSet<Action> {
        self.transitions
            .keys()
            .map(|(_, action)| action.clone())
            .chain(self.action_preconditions.keys().cloned())
            .collect()
    }

    pub fn tracks(&self, method_name: &str) -> bool {
        self.transitions
            .keys()
            .any(|(_, action)| action.method_name == method_name)
            || self
                .action_preconditions
                .keys()
                .any(|action| action.method_name == method_name)
    }

    pub fn is_final_state(&self, state: &State) -> bool {
        self.final_states.contains(state)
    }

    pub fn is_error_state(&self, state: &State) -> bool {
        state == &self.error_state
    }

    pub fn initial_state(&self) -> State {
        self.initial_state.clone()
    }

    pub fn add_final_state(&mut self, state: State) {
        self.states.insert(state.clone());
        self.final_states.insert(state);
    }

    pub fn set_initial_state(&mut self, state: State) {
        self.states.insert(state.clone());
        self.initial_state = state;
    }

    pub fn set_error_state(&mut self, state: State) {
        self.states.remove(&self.error_state);
        self.states.insert(state.clone());
        self.error_state = state;
    }

    /// Specifies the state an action expects
    pub fn add_precondition(&mut self, action: Action, required_state: State) {
        self.action_preconditions.insert(action, required_state);
    }

    /// Actions with a declared transition out of `from`, sorted
    pub fn available_actions(&self, from: &State) -> Vec<Action> {
        let mut actions: Vec<Action> = self
            .transitions
            .keys()
            .filter(|(state, _)| state == from)
            .map(|(_, action)| action.clone())
            .collect();
        actions.sort();
        actions
    }

    /// Checks:
    /// - initial state exists in states
    /// - all final states exist in states
    /// - the error state is not accepting
    /// - all transitions reference known states
    pub fn validate(&self) -> Result<(), String> {
        if !self.states.contains(&self.initial_state) {
            return Err(format!(
                "Initial state '{}' not in states",
                self.initial_state
            ));
        }

        for state in &self.final_states {
            if !self.states.contains(state) {
                return Err(format!("Final state '{}' not in states", state));
            }
        }

        if self.final_states.contains(&self.error_state) {
            return Err(format!(
                "Error state '{}' cannot be a final state",
                self.error_state
            ));
        }

        for ((from, _action), to) in &self.transitions {
            if !self.states.contains(from) {
                return Err(format!("Transition from state '{}' not in states", from));
            }
            if !self.states.contains(to) {
                return Err(format!("Transition to state '{}' not in states", to));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state() -> Protocol {
        let mut protocol = Protocol::new("Test");
        let s1 = State::new("S1");
        let s2 = State::new("S2");
        protocol.set_initial_state(s1.clone());
        protocol.add_final_state(s1.clone());
        protocol.add_transition(s1.clone(), Action::new("go"), s2.clone());
        protocol.add_transition(s2, Action::new("back"), s1);
        protocol
    }

    #[test]
    fn test_protocol_basic() {
        let protocol = Protocol::new("TestProtocol");
        assert_eq!(protocol.name, "TestProtocol");
        assert_eq!(protocol.initial_state.name, "Initial");
        assert!(protocol.states.contains(&State::new("Error")));
    }

    #[test]
    fn test_add_transition() {
        let protocol = two_state();
        let go = Action::new("go");

        assert!(protocol.can_transition(&State::new("S1"), &go, &State::new("S2")));
        assert!(!protocol.can_transition(&State::new("S2"), &go, &State::new("S1")));
    }

    #[test]
    fn test_step_undefined_goes_to_error() {
        let protocol = two_state();

        assert_eq!(
            protocol.step(&State::new("S1"), &Action::new("go")),
            State::new("S2")
        );
        assert_eq!(
            protocol.step(&State::new("S1"), &Action::new("back")),
            protocol.error_state
        );
        assert_eq!(
            protocol.step(&protocol.error_state, &Action::new("go")),
            protocol.error_state
        );
    }

    #[test]
    fn test_tracks_only_protocol_actions() {
        let protocol = two_state();
        assert!(protocol.tracks("go"));
        assert!(protocol.tracks("back"));
        assert!(!protocol.tracks("toString"));
        assert_eq!(protocol.actions().len(), 2);
    }

    #[test]
    fn test_available_actions_sorted() {
        let mut protocol = Protocol::new("Test");
        let s1 = State::new("S1");
        let s2 = State::new("S2");
        protocol.add_transition(s1.clone(), Action::new("b"), s2.clone());
        protocol.add_transition(s1.clone(), Action::new("a"), s2);

        assert_eq!(
            protocol.available_actions(&s1),
            vec![Action::new("a"), Action::new("b")]
        );
    }

    #[test]
    fn test_validate_protocol() {
        assert!(two_state().validate().is_ok());

        let mut broken = two_state();
        broken.final_states.insert(broken.error_state.clone());
        assert!(broken.validate().is_err());

        let mut missing = Protocol::new("Missing");
        missing.initial_state = State::new("Nowhere");
        assert!(missing.validate().is_err());
    }
}
