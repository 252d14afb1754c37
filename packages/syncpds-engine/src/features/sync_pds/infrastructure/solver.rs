/*
 * Sync-PDS Solver
 *
 * Call automaton:  states INode<Val, Statement>, alphabet = statements
 * Field automaton: states INode<Node, Field>,    alphabet = field labels
 *
 * Node (s, x) is
 * - call-reachable  when (x) --s--> _ exists with non-zero weight
 * - field-reachable when (N(s,x)) --f--> _ exists
 * and is expanded exactly once, when both hold.
 *
 * Field rules toward N' are held back until N' is call-reachable, so the
 * field automaton never gains a transition for a context the call
 * automaton has not reached.
 *
 * Return coupling: a pop `<y,exit> → <y_ret,ε>` lands on a state q.
 * Every call site cs labelling a transition out of q is a return site;
 * each (exit, cs) pair gets the field rule `<N(exit,y),*> → <N(cs,y_ret),*>`.
 * When q is the seed sink and unbalanced returns are enabled, the callers
 * of the exit's method become return sites directly.
 *
 * The deadline is checked once per worklist iteration, so a timed-out
 * solver never stops inside a rule application.
 */

use crate::features::sync_pds::domain::{
    Expansion, PendingIndirection, PoiKey, PointOfIndirection, Resolution, SolverPhase,
    SolverStats, SolverStatus, Successor,
};
use crate::features::sync_pds::ports::{NodeExpander, ReachableNodeListener};
use crate::features::weights::{Reachability, Weight};
use crate::features::wpds::{
    INode, Rule, RuleListener, Saturation, SaturationStep, StateId, Transition,
    TransitionListener, WeightedAutomaton,
};
use crate::shared::models::{Field, Node, Statement, Val};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Instant;
use tracing::{debug, trace, warn};

pub type CallState = INode<Val, Statement>;
pub type FieldState = INode<Node, Field>;

/// Field stacks deeper than this are cut when enumerating access paths
const DEFAULT_STACK_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Return past the seed method into every caller
    pub track_unbalanced_returns: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            track_unbalanced_returns: true,
        }
    }
}

pub struct SyncPdsSolver<W: Weight> {
    options: SolverOptions,
    phase: SolverPhase,
    seed: Option<Node>,

    call: Saturation<Val, Statement, W>,
    field: Saturation<Node, Field, Reachability>,
    call_sink: Option<StateId>,
    field_sink: Option<StateId>,

    call_reached: FxHashSet<Node>,
    field_reached: FxHashSet<Node>,
    processed: BTreeSet<Node>,
    scheduled: FxHashSet<Node>,
    ready: VecDeque<Node>,
    deferred_field_rules: FxHashMap<Node, Vec<Rule<Field, Reachability>>>,
    observed: FxHashSet<(Node, Field)>,
    allocation_sites: BTreeSet<Node>,

    /// generated call state → call sites below it
    return_sites: FxHashMap<StateId, BTreeSet<Statement>>,
    /// returned fact → exit nodes that pop to it
    pop_origins: FxHashMap<Val, BTreeSet<Node>>,
    /// call state reached by a pop → (exit node, returned fact)
    pending_returns: FxHashMap<StateId, BTreeSet<(Node, Val)>>,
    /// pops that reached the seed sink
    unbalanced: BTreeSet<(Node, Val)>,

    pois: BTreeMap<PoiKey, PointOfIndirection<W>>,
    node_listeners: Vec<Box<dyn ReachableNodeListener>>,
    stats: SolverStats,
}

impl<W: Weight> SyncPdsSolver<W> {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            phase: SolverPhase::Idle,
            seed: None,
            call: Saturation::post_star(),
            field: Saturation::post_star(),
            call_sink: None,
            field_sink: None,
            call_reached: FxHashSet::default(),
            field_reached: FxHashSet::default(),
            processed: BTreeSet::new(),
            scheduled: FxHashSet::default(),
            ready: VecDeque::new(),
            deferred_field_rules: FxHashMap::default(),
            observed: FxHashSet::default(),
            allocation_sites: BTreeSet::new(),
            return_sites: FxHashMap::default(),
            pop_origins: FxHashMap::default(),
            pending_returns: FxHashMap::default(),
            unbalanced: BTreeSet::new(),
            pois: BTreeMap::new(),
            node_listeners: Vec::new(),
            stats: SolverStats::default(),
        }
    }

    /// Solver seeded at `node` with weight one
    pub fn seeded(node: Node, options: SolverOptions) -> Self {
        let mut solver = Self::new(options);
        solver.seed(node);
        solver
    }

    /// Insert the seed as initial state of both automata
    ///
    /// Panics when the solver was already seeded.
    pub fn seed(&mut self, node: Node) {
        if self.seed.is_some() {
            panic!("solver already seeded with {:?}", self.seed);
        }
        debug!(seed = %node, "seeding sync-pds solver");

        let call_source = self.call.states_mut().single(node.fact.clone());
        let call_sink = self
            .call
            .states_mut()
            .generated(call_source, Statement::epsilon());
        self.call.automaton_mut().add_initial_state(call_source);
        self.call.automaton_mut().add_accepting_state(call_sink);

        let field_source = self.field.states_mut().single(node.clone());
        let field_sink = self
            .field
            .states_mut()
            .generated(field_source, Field::epsilon());
        self.field.automaton_mut().add_initial_state(field_source);
        self.field.automaton_mut().add_accepting_state(field_sink);

        self.call_sink = Some(call_sink);
        self.field_sink = Some(field_sink);
        self.call.add_transition(
            Transition::new(call_source, node.stmt.clone(), call_sink),
            W::one(),
        );
        self.field.add_transition(
            Transition::new(field_source, Field::empty(), field_sink),
            Reachability::one(),
        );
        self.seed = Some(node);
        self.phase = SolverPhase::Seeded;
    }

    /// Saturate until quiescent or past `deadline`
    pub fn solve(
        &mut self,
        expander: &mut dyn NodeExpander<W>,
        deadline: Option<Instant>,
    ) -> SolverStatus {
        if self.seed.is_none() {
            return SolverStatus::Quiescent;
        }
        self.phase = SolverPhase::Saturating;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    seed = ?self.seed,
                    iterations = self.stats.iterations,
                    "sync-pds solver timed out"
                );
                self.phase = SolverPhase::TimedOut;
                return SolverStatus::TimedOut;
            }
            self.stats.iterations += 1;

            if let Some(step) = self.call.step() {
                if let SaturationStep::Transition(t) = step {
                    self.on_call_transition(&t, expander);
                }
                continue;
            }
            if let Some(step) = self.field.step() {
                if let SaturationStep::Transition(t) = step {
                    self.on_field_transition(&t, expander);
                }
                continue;
            }
            if let Some(node) = self.ready.pop_front() {
                self.process(node, expander);
                continue;
            }
            break;
        }

        self.phase = SolverPhase::Quiescent;
        SolverStatus::Quiescent
    }

    /// Nothing queued in either automaton or the node agenda
    pub fn is_saturated(&self) -> bool {
        self.call.is_saturated() && self.field.is_saturated() && self.ready.is_empty()
    }

    // ── call automaton ─────────────────────────────────────────────────

    fn on_call_transition(&mut self, t: &Transition<Statement>, expander: &mut dyn NodeExpander<W>) {
        let Some(weight) = self.call.automaton().weight(t).cloned() else {
            return;
        };
        let source = self.call.states().get(t.source).clone();

        if t.label.is_epsilon() {
            if let INode::Single(returned) = source {
                let exits = self.pop_origins.get(&returned).cloned().unwrap_or_default();
                for exit in exits {
                    self.note_pending_return(t.target, exit, returned.clone(), &weight, expander);
                }
            }
            return;
        }

        match source {
            INode::Single(fact) => self.mark_call_reachable(Node::new(t.label.clone(), fact)),
            INode::Generated { .. } => {
                let is_new = self
                    .return_sites
                    .entry(t.source)
                    .or_default()
                    .insert(t.label.clone());
                if is_new {
                    let pending = self.pending_returns.get(&t.source).cloned().unwrap_or_default();
                    for (exit, returned) in pending {
                        self.link_return(&exit, &returned, &t.label);
                    }
                }
            }
        }
    }

    fn note_pending_return(
        &mut self,
        target: StateId,
        exit: Node,
        returned: Val,
        weight: &W,
        expander: &mut dyn NodeExpander<W>,
    ) {
        let is_new = self
            .pending_returns
            .entry(target)
            .or_default()
            .insert((exit.clone(), returned.clone()));
        if is_new {
            let sites = self.return_sites.get(&target).cloned().unwrap_or_default();
            for cs in sites {
                self.link_return(&exit, &returned, &cs);
            }
        }

        if Some(target) == self.call_sink && self.options.track_unbalanced_returns {
            self.unbalanced.insert((exit.clone(), returned.clone()));
            self.link_unbalanced(&exit, &returned, weight, expander);
        }
    }

    fn link_return(&mut self, exit: &Node, returned: &Val, call_site: &Statement) {
        let target = Node::new(call_site.clone(), returned.clone());
        let from = self.field.states_mut().single(exit.clone());
        let to = self.field.states_mut().single(target.clone());
        let rule = Rule::normal(from, Field::wildcard(), to, Field::wildcard(), Reachability::one());
        self.add_field_rule(target, rule);
    }

    fn link_unbalanced(
        &mut self,
        exit: &Node,
        returned: &Val,
        weight: &W,
        expander: &mut dyn NodeExpander<W>,
    ) {
        let Some(sink) = self.call_sink else {
            return;
        };
        let callers = expander.callers_of(&exit.stmt.method);
        let source = self.call.states_mut().single(returned.clone());
        for cs in callers {
            debug!(exit = %exit, call_site = %cs, "unbalanced return");
            self.call
                .add_transition(Transition::new(source, cs.clone(), sink), weight.clone());
            self.link_return(exit, returned, &cs);
        }
    }

    /// Re-link returns past the seed after the call graph grew
    pub fn refresh_call_graph(&mut self, expander: &mut dyn NodeExpander<W>) {
        let Some(sink) = self.call_sink else {
            return;
        };
        for (exit, returned) in self.unbalanced.clone() {
            let Some(source) = self.call.states().lookup_single(&returned) else {
                continue;
            };
            let epsilon = Transition::new(source, Statement::epsilon(), sink);
            if let Some(weight) = self.call.automaton().weight(&epsilon).cloned() {
                self.link_unbalanced(&exit, &returned, &weight, expander);
            }
        }
    }

    fn mark_call_reachable(&mut self, node: Node) {
        if !self.call_reached.insert(node.clone()) {
            return;
        }
        if let Some(rules) = self.deferred_field_rules.remove(&node) {
            for rule in rules {
                self.field.add_rule(rule);
            }
        }
        if self.field_reached.contains(&node) {
            self.schedule(node);
        }
    }

    // ── field automaton ────────────────────────────────────────────────

    fn on_field_transition(&mut self, t: &Transition<Field>, expander: &mut dyn NodeExpander<W>) {
        if t.label.is_epsilon() {
            return;
        }
        let INode::Single(node) = self.field.states().get(t.source).clone() else {
            return;
        };
        if self.field_reached.insert(node.clone()) && self.call_reached.contains(&node) {
            self.schedule(node.clone());
        }
        if self.processed.contains(&node) {
            self.observe(&node, &t.label, expander);
        }
    }

    fn add_field_rule(&mut self, target: Node, rule: Rule<Field, Reachability>) {
        if self.call_reached.contains(&target) {
            self.field.add_rule(rule);
        } else {
            self.deferred_field_rules.entry(target).or_default().push(rule);
        }
    }

    // ── node agenda ────────────────────────────────────────────────────

    fn schedule(&mut self, node: Node) {
        if self.scheduled.insert(node.clone()) {
            self.ready.push_back(node);
        }
    }

    fn process(&mut self, node: Node, expander: &mut dyn NodeExpander<W>) {
        trace!(node = %node, "processing node");
        self.processed.insert(node.clone());
        self.stats.nodes_processed += 1;
        for listener in &mut self.node_listeners {
            listener.on_reachable_node(&node);
        }

        let expansion = expander.expand(&node);
        self.apply_expansion(&node, expansion, expander);

        if let Some(state) = self.field.states().lookup_single(&node) {
            let labels = self.field.automaton().labels_from(state);
            for label in labels {
                self.observe(&node, &label, expander);
            }
        }
    }

    fn observe(&mut self, node: &Node, label: &Field, expander: &mut dyn NodeExpander<W>) {
        if !self.observed.insert((node.clone(), label.clone())) {
            return;
        }
        let expansion = expander.observe_field_label(node, label);
        self.apply_expansion(node, expansion, expander);
    }

    fn apply_expansion(
        &mut self,
        origin: &Node,
        expansion: Expansion<W>,
        expander: &mut dyn NodeExpander<W>,
    ) {
        if expansion.allocation_site && self.allocation_sites.insert(origin.clone()) {
            debug!(node = %origin, "allocation site reached");
        }
        for successor in expansion.successors {
            self.apply_successor(origin, successor, expander);
        }
        for indirection in expansion.indirections {
            self.register_indirection(origin, indirection);
        }
    }

    fn apply_successor(
        &mut self,
        origin: &Node,
        successor: Successor<W>,
        expander: &mut dyn NodeExpander<W>,
    ) {
        let from = self.call.states_mut().single(origin.fact.clone());
        let field_from = self.field.states_mut().single(origin.clone());

        match successor {
            Successor::Normal { node, weight } => {
                let to = self.call.states_mut().single(node.fact.clone());
                self.call.add_rule(Rule::normal(
                    from,
                    origin.stmt.clone(),
                    to,
                    node.stmt.clone(),
                    weight,
                ));
                let field_to = self.field.states_mut().single(node.clone());
                let rule = Rule::normal(
                    field_from,
                    Field::wildcard(),
                    field_to,
                    Field::wildcard(),
                    Reachability::one(),
                );
                self.add_field_rule(node, rule);
            }
            Successor::FieldPush {
                node,
                field,
                weight,
            } => {
                let to = self.call.states_mut().single(node.fact.clone());
                self.call.add_rule(Rule::normal(
                    from,
                    origin.stmt.clone(),
                    to,
                    node.stmt.clone(),
                    weight,
                ));
                let field_to = self.field.states_mut().single(node.clone());
                let rule = Rule::push(
                    field_from,
                    Field::wildcard(),
                    field_to,
                    field,
                    Field::wildcard(),
                    Reachability::one(),
                );
                self.add_field_rule(node, rule);
            }
            Successor::FieldPop {
                node,
                field,
                weight,
            } => {
                let to = self.call.states_mut().single(node.fact.clone());
                self.call.add_rule(Rule::normal(
                    from,
                    origin.stmt.clone(),
                    to,
                    node.stmt.clone(),
                    weight,
                ));
                let field_to = self.field.states_mut().single(node.clone());
                let rule = Rule::pop(field_from, field, field_to, Reachability::one());
                self.add_field_rule(node, rule);
            }
            Successor::CallPush {
                node,
                call_site,
                weight,
            } => {
                let to = self.call.states_mut().single(node.fact.clone());
                self.call.add_rule(Rule::push(
                    from,
                    origin.stmt.clone(),
                    to,
                    node.stmt.clone(),
                    call_site,
                    weight,
                ));
                let field_to = self.field.states_mut().single(node.clone());
                let rule = Rule::normal(
                    field_from,
                    Field::wildcard(),
                    field_to,
                    Field::wildcard(),
                    Reachability::one(),
                );
                self.add_field_rule(node, rule);
            }
            Successor::CallPop { returned, weight } => {
                let to = self.call.states_mut().single(returned.clone());
                self.call
                    .add_rule(Rule::pop(from, origin.stmt.clone(), to, weight));
                let is_new = self
                    .pop_origins
                    .entry(returned.clone())
                    .or_default()
                    .insert(origin.clone());
                if is_new {
                    self.replay_pops(origin, &returned, to, expander);
                }
            }
        }
    }

    /// A new exit popping to `returned` joins the returns already landed
    fn replay_pops(
        &mut self,
        exit: &Node,
        returned: &Val,
        source: StateId,
        expander: &mut dyn NodeExpander<W>,
    ) {
        let automaton = self.call.automaton();
        let landed: Vec<(StateId, W)> = automaton
            .outgoing(source)
            .iter()
            .filter(|t| t.label.is_epsilon())
            .filter_map(|t| automaton.weight(t).map(|w| (t.target, w.clone())))
            .collect();
        for (target, weight) in landed {
            self.note_pending_return(target, exit.clone(), returned.clone(), &weight, expander);
        }
    }

    // ── points of indirection ──────────────────────────────────────────

    fn register_indirection(&mut self, origin: &Node, indirection: PendingIndirection<W>) {
        let PendingIndirection { key, successors } = indirection;
        let poi = self
            .pois
            .entry(key.clone())
            .or_insert_with(|| PointOfIndirection::new(key.clone()));
        if poi.add_waiting(origin.clone(), successors) {
            self.stats.indirections += 1;
            debug!(poi = %key, origin = %origin, "point of indirection registered");
        }
    }

    /// Deliver a resolution; false when it was already delivered
    pub fn fire_indirection(
        &mut self,
        key: &PoiKey,
        resolution: Resolution,
        expander: &mut dyn NodeExpander<W>,
    ) -> bool {
        let Some(poi) = self.pois.get_mut(key) else {
            return false;
        };
        if !poi.mark_fired(resolution.clone()) {
            return false;
        }
        self.stats.indirections_fired += 1;
        debug!(poi = %key, resolution = ?resolution, "point of indirection fired");

        match resolution {
            Resolution::Alias(origin) => {
                let successors = poi.successors_of(&origin).to_vec();
                for successor in successors {
                    self.apply_successor(&origin, successor, expander);
                }
            }
            Resolution::Callee(_) => {
                let origins: Vec<Node> = poi.origins().cloned().collect();
                for origin in origins {
                    let expansion = expander.expand(&origin);
                    self.apply_expansion(&origin, expansion, expander);
                }
            }
        }
        true
    }

    pub fn indirections(&self) -> impl Iterator<Item = &PointOfIndirection<W>> {
        self.pois.values()
    }

    pub fn indirection(&self, key: &PoiKey) -> Option<&PointOfIndirection<W>> {
        self.pois.get(key)
    }

    // ── results ────────────────────────────────────────────────────────

    pub fn seed_node(&self) -> Option<&Node> {
        self.seed.as_ref()
    }

    pub fn phase(&self) -> SolverPhase {
        self.phase
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    /// Nodes reached in both automata (snapshot)
    pub fn reached_nodes(&self) -> BTreeSet<Node> {
        self.processed.clone()
    }

    pub fn is_reached(&self, node: &Node) -> bool {
        self.processed.contains(node)
    }

    pub fn allocation_sites(&self) -> &BTreeSet<Node> {
        &self.allocation_sites
    }

    pub fn call_automaton(&self) -> &WeightedAutomaton<Val, Statement, W> {
        self.call.automaton()
    }

    pub fn field_automaton(&self) -> &WeightedAutomaton<Node, Field, Reachability> {
        self.field.automaton()
    }

    /// Call-automaton weight of `node` over all contexts
    pub fn node_weight(&self, node: &Node) -> W {
        match self.call.states().lookup_single(&node.fact) {
            Some(state) => self.call.automaton().config_weight(state, &node.stmt),
            None => W::zero(),
        }
    }

    /// Node reached with an empty call stack (directly under the seed sink)
    pub fn is_top_level(&self, node: &Node) -> bool {
        let (Some(sink), Some(state)) = (self.call_sink, self.call.states().lookup_single(&node.fact))
        else {
            return false;
        };
        self.call
            .automaton()
            .contains(&Transition::new(state, node.stmt.clone(), sink))
    }

    /// Field labels currently on top at `node`
    pub fn field_labels(&self, node: &Node) -> BTreeSet<Field> {
        self.field
            .states()
            .lookup_single(node)
            .map(|state| self.field.automaton().labels_from(state))
            .unwrap_or_default()
    }

    /// Field stacks accepted from `node`, `empty` stripped, cut at cycles
    pub fn field_stacks(&self, node: &Node) -> BTreeSet<Vec<Field>> {
        let mut stacks = BTreeSet::new();
        let (Some(start), Some(sink)) = (self.field.states().lookup_single(node), self.field_sink)
        else {
            return stacks;
        };
        let automaton = self.field.automaton();

        // explicit DFS: (state, labels so far, states on path)
        let mut stack: Vec<(StateId, Vec<Field>, Vec<StateId>)> = vec![(start, Vec::new(), vec![start])];
        while let Some((state, labels, path)) = stack.pop() {
            for t in automaton.outgoing(state) {
                if t.label.is_epsilon() {
                    continue;
                }
                if t.label.is_empty_field() {
                    if t.target == sink {
                        stacks.insert(labels.clone());
                    }
                    continue;
                }
                if path.contains(&t.target) || labels.len() >= DEFAULT_STACK_DEPTH {
                    continue;
                }
                let mut next_labels = labels.clone();
                next_labels.push(t.label.clone());
                let mut next_path = path.clone();
                next_path.push(t.target);
                stack.push((t.target, next_labels, next_path));
            }
        }
        stacks
    }

    pub fn stats(&self) -> SolverStats {
        SolverStats {
            call_transitions: self.call.automaton().len(),
            field_transitions: self.field.automaton().len(),
            call_rules: self.call.pds().len(),
            field_rules: self.field.pds().len(),
            ..self.stats.clone()
        }
    }

    // ── listeners ──────────────────────────────────────────────────────

    pub fn register_call_transition_listener(
        &mut self,
        listener: Box<dyn TransitionListener<Val, Statement, W>>,
    ) {
        self.call.register_transition_listener(listener);
    }

    pub fn register_field_transition_listener(
        &mut self,
        listener: Box<dyn TransitionListener<Node, Field, Reachability>>,
    ) {
        self.field.register_transition_listener(listener);
    }

    pub fn register_call_rule_listener(&mut self, listener: Box<dyn RuleListener<Val, Statement, W>>) {
        self.call.register_rule_listener(listener);
    }

    pub fn register_field_rule_listener(
        &mut self,
        listener: Box<dyn RuleListener<Node, Field, Reachability>>,
    ) {
        self.field.register_rule_listener(listener);
    }

    pub fn register_reachable_node_listener(&mut self, mut listener: Box<dyn ReachableNodeListener>) {
        for node in &self.processed {
            listener.on_reachable_node(node);
        }
        self.node_listeners.push(listener);
    }

    pub fn unregister_all_listeners(&mut self) {
        self.call.unregister_all_listeners();
        self.field.unregister_all_listeners();
        self.node_listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.call.listener_count() + self.field.listener_count() + self.node_listeners.len()
    }
}
