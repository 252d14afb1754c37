/*
 * Worklist Saturation
 *
 * One loop, two polarities:
 * - Forward (post*): configurations reachable from the automaton's
 *   initial language
 * - Backward (pre*): configurations that reach the automaton's language
 *
 * New rules and new or grown transitions are queued; `step()` handles one
 * queued item and returns it. Never recursive: callers drive `step()` and
 * may interleave other work between steps.
 *
 * post* weights (transition t = (p, γ, q) with weight v, rule weight w):
 *   normal  <p,γ> → <p',γ'>     (p', γ', q)            v ⊗ w
 *   push    <p,γ> → <p',γ'γ''>  (p', γ', mid)          one
 *                               (mid, γ'', q)          v ⊗ w
 *   pop     <p,γ> → <p',ε>      (p', ε, q)             v ⊗ w
 *   closure (p,ε,q):v0 + (q,γ,r):u  →  (p, γ, r)        u ⊗ v0
 *
 * `mid` is the generated state (p', γ'); it is shared by every push to
 * the same entry, which is what bounds recursion.
 *
 * pre* (t = (p', γ', q) with weight v):
 *   pop     <p,γ> → <p',ε>      (p, γ, p')             w
 *   normal  <p,γ> → <p',γ'>     (p, γ, q)              w ⊗ v
 *   push    <p,γ> → <p',γ'γ''>  rule <p,γ> → <q,γ''>   w ⊗ v
 *
 * pre* only applies concrete rules. A wildcard rule is kept as a template
 * and instantiated once per stack symbol: every label of a rule or
 * transition, plus symbols declared with `add_stack_symbol`. A symbol met
 * later instantiates every template again.
 */

use super::arena::StateArena;
use super::listener::{RuleListener, TransitionListener};
use super::pushdown_system::PushdownSystem;
use super::weighted_automaton::WeightedAutomaton;
use crate::features::weights::Weight;
use crate::features::wpds::domain::{
    Rule, RuleInsert, RuleKey, RuleKind, StackSymbol, Transition, TransitionUpdate,
};
use std::collections::{BTreeSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Saturation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// post*
    Forward,
    /// pre*
    Backward,
}

/// Item handled by one saturation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaturationStep<L> {
    Rule(RuleKey<L>),
    Transition(Transition<L>),
}

/// Pushdown system + automaton, saturated incrementally
pub struct Saturation<T, L, W> {
    polarity: Polarity,
    pds: PushdownSystem<L, W>,
    automaton: WeightedAutomaton<T, L, W>,
    worklist: VecDeque<SaturationStep<L>>,
    rule_listeners: Vec<Box<dyn RuleListener<T, L, W>>>,
    steps: usize,
    /// pre* only: concrete stack symbols seen so far
    alphabet: BTreeSet<L>,
    /// pre* only: wildcard rules, instantiated over `alphabet`
    templates: Vec<RuleKey<L>>,
}

impl<T, L, W> Saturation<T, L, W>
where
    T: Clone + Eq + Hash + Debug,
    L: StackSymbol,
    W: Weight,
{
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            pds: PushdownSystem::new(),
            automaton: WeightedAutomaton::new(),
            worklist: VecDeque::new(),
            rule_listeners: Vec::new(),
            steps: 0,
            alphabet: BTreeSet::new(),
            templates: Vec::new(),
        }
    }

    pub fn post_star() -> Self {
        Self::new(Polarity::Forward)
    }

    pub fn pre_star() -> Self {
        Self::new(Polarity::Backward)
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn pds(&self) -> &PushdownSystem<L, W> {
        &self.pds
    }

    pub fn automaton(&self) -> &WeightedAutomaton<T, L, W> {
        &self.automaton
    }

    pub fn states(&self) -> &StateArena<T, L> {
        self.automaton.states()
    }

    pub fn states_mut(&mut self) -> &mut StateArena<T, L> {
        self.automaton.states_mut()
    }

    /// Direct access; transitions added here bypass the worklist
    pub fn automaton_mut(&mut self) -> &mut WeightedAutomaton<T, L, W> {
        &mut self.automaton
    }

    /// Steps taken so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_saturated(&self) -> bool {
        self.worklist.is_empty()
    }

    pub fn add_rule(&mut self, rule: Rule<L, W>) -> RuleInsert {
        let key = rule.key.clone();
        if self.polarity == Polarity::Backward {
            for label in key.labels() {
                self.learn_symbol(label);
            }
        }
        let outcome = self.pds.add_rule(rule);
        if outcome.changed() {
            if let Some(stored) = self.pds.rule(&key) {
                let states = self.automaton.states();
                for listener in &mut self.rule_listeners {
                    listener.on_rule_added(&stored, states);
                }
            }
            if self.polarity == Polarity::Backward && key.has_wildcard() {
                if outcome == RuleInsert::Added {
                    self.templates.push(key.clone());
                }
                let symbols: Vec<L> = self.alphabet.iter().cloned().collect();
                for symbol in &symbols {
                    self.instantiate(&key, symbol);
                }
            } else {
                self.worklist.push_back(SaturationStep::Rule(key));
            }
        }
        outcome
    }

    /// Make `symbol` part of the stack alphabet pre* instantiates wildcard
    /// rules over. Labels of rules and transitions are added implicitly.
    pub fn add_stack_symbol(&mut self, symbol: L) {
        self.learn_symbol(&symbol);
    }

    pub fn add_transition(&mut self, transition: Transition<L>, weight: W) -> TransitionUpdate {
        if self.polarity == Polarity::Backward {
            self.learn_symbol(&transition.label);
        }
        let outcome = self.automaton.add_transition(transition.clone(), weight);
        if outcome.changed() {
            self.worklist.push_back(SaturationStep::Transition(transition));
        }
        outcome
    }

    /// Handle one queued item, `None` at fixpoint
    pub fn step(&mut self) -> Option<SaturationStep<L>> {
        let item = self.worklist.pop_front()?;
        self.steps += 1;
        match (&item, self.polarity) {
            (SaturationStep::Rule(key), Polarity::Forward) => self.post_rule(key),
            (SaturationStep::Transition(t), Polarity::Forward) => self.post_transition(t),
            (SaturationStep::Rule(key), Polarity::Backward) => self.pre_rule(key),
            (SaturationStep::Transition(t), Polarity::Backward) => self.pre_transition(t),
        }
        Some(item)
    }

    /// Run to fixpoint
    pub fn saturate(&mut self) {
        while self.step().is_some() {}
    }

    fn learn_symbol(&mut self, symbol: &L) {
        if self.polarity != Polarity::Backward || symbol.is_epsilon() || symbol.is_wildcard() {
            return;
        }
        if !self.alphabet.insert(symbol.clone()) {
            return;
        }
        let templates = self.templates.clone();
        for key in &templates {
            self.instantiate(key, symbol);
        }
    }

    /// Add the concrete instance of template `key` for `symbol`
    fn instantiate(&mut self, key: &RuleKey<L>, symbol: &L) {
        let Some(instance) = key.instantiate(symbol) else {
            return;
        };
        let Some(template) = self.pds.rule(key) else {
            return;
        };
        self.add_rule(Rule {
            key: instance,
            weight: template.weight,
        });
    }

    pub fn register_rule_listener(&mut self, mut listener: Box<dyn RuleListener<T, L, W>>) {
        let states = self.automaton.states();
        for rule in self.pds.rules() {
            listener.on_rule_added(&rule, states);
        }
        self.rule_listeners.push(listener);
    }

    pub fn register_transition_listener(&mut self, listener: Box<dyn TransitionListener<T, L, W>>) {
        self.automaton.register_listener(listener);
    }

    pub fn unregister_all_listeners(&mut self) {
        self.rule_listeners.clear();
        self.automaton.unregister_all_listeners();
    }

    pub fn listener_count(&self) -> usize {
        self.rule_listeners.len() + self.automaton.listener_count()
    }

    // ── post* ──────────────────────────────────────────────────────────

    fn post_transition(&mut self, t: &Transition<L>) {
        let Some(v) = self.automaton.weight(t).cloned() else {
            return;
        };

        if t.label.is_epsilon() {
            let below: Vec<_> = self
                .automaton
                .outgoing(t.target)
                .iter()
                .filter(|u| !u.label.is_epsilon())
                .cloned()
                .collect();
            for u in below {
                if let Some(u_weight) = self.automaton.weight(&u).cloned() {
                    let closed = Transition::new(t.source, u.label.clone(), u.target);
                    self.add_transition(closed, u_weight.extend(&v));
                }
            }
            return;
        }

        let rules: Vec<_> = self
            .pds
            .rules_from(t.source)
            .filter(|r| r.key.from_label.matches(&t.label))
            .collect();
        for rule in rules {
            self.apply_post(&rule, t, &v);
        }

        let above: Vec<_> = self.automaton.epsilon_into(t.source).to_vec();
        for e in above {
            if let Some(e_weight) = self.automaton.weight(&e).cloned() {
                let closed = Transition::new(e.source, t.label.clone(), t.target);
                self.add_transition(closed, v.extend(&e_weight));
            }
        }
    }

    fn post_rule(&mut self, key: &RuleKey<L>) {
        let Some(rule) = self.pds.rule(key) else {
            return;
        };
        let matching: Vec<_> = self
            .automaton
            .outgoing(key.from)
            .iter()
            .filter(|t| key.from_label.matches(&t.label))
            .cloned()
            .collect();
        for t in matching {
            if let Some(v) = self.automaton.weight(&t).cloned() {
                self.apply_post(&rule, &t, &v);
            }
        }
    }

    fn apply_post(&mut self, rule: &Rule<L, W>, t: &Transition<L>, v: &W) {
        let weight = v.extend(&rule.weight);
        match &rule.key.kind {
            RuleKind::Normal { to_label } => {
                let label = if to_label.is_wildcard() {
                    t.label.clone()
                } else {
                    to_label.clone()
                };
                self.add_transition(Transition::new(rule.key.to, label, t.target), weight);
            }
            RuleKind::Push { to_label, below } => {
                let mid = self
                    .automaton
                    .states_mut()
                    .generated(rule.key.to, to_label.clone());
                self.add_transition(Transition::new(rule.key.to, to_label.clone(), mid), W::one());
                let below_label = if below.is_wildcard() {
                    t.label.clone()
                } else {
                    below.clone()
                };
                self.add_transition(Transition::new(mid, below_label, t.target), weight);
            }
            RuleKind::Pop => {
                self.add_transition(Transition::new(rule.key.to, L::epsilon(), t.target), weight);
            }
        }
    }

    // ── pre* ───────────────────────────────────────────────────────────

    fn pre_transition(&mut self, t: &Transition<L>) {
        if t.label.is_epsilon() {
            return;
        }
        let Some(v) = self.automaton.weight(t).cloned() else {
            return;
        };
        let rules: Vec<_> = self
            .pds
            .rules_into(t.source)
            .filter(|r| !r.key.has_wildcard())
            .collect();
        for rule in rules {
            self.apply_pre(&rule, t, &v);
        }
    }

    fn pre_rule(&mut self, key: &RuleKey<L>) {
        let Some(rule) = self.pds.rule(key) else {
            return;
        };
        if let RuleKind::Pop = rule.key.kind {
            let t = Transition::new(rule.key.from, rule.key.from_label.clone(), rule.key.to);
            self.add_transition(t, rule.weight.clone());
            return;
        }
        let candidates: Vec<_> = self.automaton.outgoing(key.to).to_vec();
        for t in candidates {
            if let Some(v) = self.automaton.weight(&t).cloned() {
                self.apply_pre(&rule, &t, &v);
            }
        }
    }

    fn apply_pre(&mut self, rule: &Rule<L, W>, t: &Transition<L>, v: &W) {
        let from_label = rule.key.from_label.clone();
        match &rule.key.kind {
            RuleKind::Normal { to_label } if to_label == &t.label => {
                let derived = Transition::new(rule.key.from, from_label, t.target);
                self.add_transition(derived, rule.weight.extend(v));
            }
            RuleKind::Push { to_label, below } if to_label == &t.label => {
                // <p,γ> → <p',γ'γ''> with p' --γ'--> q becomes <p,γ> → <q,γ''>
                let derived = Rule::normal(
                    rule.key.from,
                    from_label,
                    t.target,
                    below.clone(),
                    rule.weight.extend(v),
                );
                self.add_rule(derived);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::weights::Reachability;
    use crate::features::wpds::domain::{INode, StateId};
    use crate::shared::models::Field;

    type Sat = Saturation<&'static str, Field, Reachability>;

    const R: Reachability = Reachability::Reachable;

    fn f(name: &str) -> Field {
        Field::named(name)
    }

    fn has(sat: &Sat, from: StateId, label: Field, to: StateId) -> bool {
        sat.automaton().contains(&Transition::new(from, label, to))
    }

    #[test]
    fn test_post_star_normal_push_pop() {
        let mut sat = Sat::post_star();
        let p = sat.states_mut().single("p");
        let sink = sat.states_mut().single("sink");
        sat.automaton_mut().add_accepting_state(sink);

        sat.add_rule(Rule::normal(p, f("a"), p, f("b"), R));
        sat.add_rule(Rule::push(p, f("b"), p, f("c"), f("d"), R));
        sat.add_rule(Rule::pop(p, f("c"), p, R));
        sat.add_transition(Transition::new(p, f("a"), sink), R);
        sat.saturate();

        let mid = sat
            .states()
            .lookup(&INode::Generated { fact: "p", label: f("c") })
            .expect("push creates a generated state");
        assert_eq!(sat.states().origin(mid), Some(p));
        assert!(has(&sat, p, f("b"), sink));
        assert!(has(&sat, p, f("c"), mid));
        assert!(has(&sat, mid, f("d"), sink));
        assert!(has(&sat, p, Field::epsilon(), mid));
        // epsilon closure: <p, ε> over (mid, d, sink)
        assert!(has(&sat, p, f("d"), sink));
        assert!(sat.is_saturated());
    }

    #[test]
    fn test_config_weight_reads_closure_transitions() {
        let mut sat = Sat::post_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let sink = sat.states_mut().single("sink");
        sat.automaton_mut().add_accepting_state(sink);

        // <p,a> → <p, c d>, <p,c> → <q,ε>: <q, d> only through (q, ε, mid)
        sat.add_rule(Rule::push(p, f("a"), p, f("c"), f("d"), R));
        sat.add_rule(Rule::pop(p, f("c"), q, R));
        sat.add_transition(Transition::new(p, f("a"), sink), R);
        sat.saturate();

        let mid = sat
            .states()
            .lookup(&INode::Generated { fact: "p", label: f("c") })
            .unwrap();
        assert!(has(&sat, q, Field::epsilon(), mid));
        assert_eq!(sat.automaton().config_weight(q, &f("d")), R);
        assert!(sat.automaton().config_weight(q, &f("c")).is_zero());
    }

    #[test]
    fn test_post_star_wildcard_keeps_top() {
        let mut sat = Sat::post_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let sink = sat.states_mut().single("sink");

        sat.add_rule(Rule::normal(p, Field::wildcard(), q, Field::wildcard(), R));
        sat.add_rule(Rule::push(q, Field::wildcard(), p, f("g"), Field::wildcard(), R));
        sat.add_transition(Transition::new(p, f("x"), sink), R);
        sat.saturate();

        assert!(has(&sat, q, f("x"), sink));
        let mid = sat
            .states()
            .lookup(&INode::Generated { fact: "p", label: f("g") })
            .unwrap();
        assert!(has(&sat, mid, f("x"), sink));
        // the push cycle folds into the same generated state
        assert!(has(&sat, mid, f("g"), mid) || has(&sat, q, f("g"), mid));
        assert!(sat.is_saturated());
    }

    #[test]
    fn test_rule_after_transition_still_applies() {
        let mut sat = Sat::post_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let sink = sat.states_mut().single("sink");

        sat.add_transition(Transition::new(p, f("a"), sink), R);
        sat.saturate();
        sat.add_rule(Rule::normal(p, f("a"), q, f("b"), R));
        sat.saturate();

        assert!(has(&sat, q, f("b"), sink));
    }

    #[test]
    fn test_pre_star_pop_normal_push() {
        let mut sat = Sat::pre_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let r = sat.states_mut().single("r");
        let fin = sat.states_mut().single("final");
        sat.automaton_mut().add_accepting_state(fin);

        // target language: <q, b>
        sat.add_transition(Transition::new(q, f("b"), fin), R);
        sat.add_rule(Rule::pop(p, f("a"), q, R));
        sat.add_rule(Rule::normal(p, f("c"), q, f("b"), R));
        sat.add_rule(Rule::push(r, f("x"), p, f("a"), f("b"), R));
        sat.saturate();

        assert!(has(&sat, p, f("a"), q));
        assert!(has(&sat, p, f("c"), fin));
        // <r,x> → <p, a b> → <q, b>
        assert!(has(&sat, r, f("x"), fin));
    }

    #[test]
    fn test_pre_star_wildcard_pop() {
        let mut sat = Sat::pre_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let fin = sat.states_mut().single("final");
        sat.automaton_mut().add_accepting_state(fin);

        sat.add_transition(Transition::new(q, f("b"), fin), R);
        sat.add_rule(Rule::pop(p, Field::wildcard(), q, R));
        sat.saturate();
        assert!(has(&sat, p, f("b"), q));

        // a symbol first seen afterwards is popped as well
        sat.add_transition(Transition::new(q, f("c"), fin), R);
        sat.saturate();
        assert!(has(&sat, p, f("c"), q));
        assert!(!has(&sat, p, Field::wildcard(), q));
    }

    #[test]
    fn test_pre_star_wildcard_push_keeps_own_top() {
        let mut sat = Sat::pre_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let r = sat.states_mut().single("r");
        let fin = sat.states_mut().single("final");
        sat.automaton_mut().add_accepting_state(fin);

        // <r,γ> → <p, a γ>, <p,a> → <q,ε>, target <q,b>
        sat.add_transition(Transition::new(q, f("b"), fin), R);
        sat.add_rule(Rule::push(r, Field::wildcard(), p, f("a"), Field::wildcard(), R));
        sat.add_rule(Rule::pop(p, f("a"), q, R));
        sat.saturate();

        assert!(has(&sat, r, f("b"), fin));
        assert!(!has(&sat, r, f("a"), fin));
        let wildcard_derived = sat
            .pds()
            .rules()
            .filter(|rule| rule.key.from == r && rule.key.to == q)
            .any(|rule| rule.key.has_wildcard());
        assert!(!wildcard_derived);
    }

    #[test]
    fn test_pre_star_wildcard_normal_to_concrete() {
        let mut sat = Sat::pre_star();
        let p = sat.states_mut().single("p");
        let q = sat.states_mut().single("q");
        let fin = sat.states_mut().single("final");
        sat.automaton_mut().add_accepting_state(fin);

        // <p,γ> → <q,b> for every γ
        sat.add_stack_symbol(f("x"));
        sat.add_rule(Rule::normal(p, Field::wildcard(), q, f("b"), R));
        sat.add_transition(Transition::new(q, f("b"), fin), R);
        sat.saturate();

        assert!(has(&sat, p, f("x"), fin));
        assert!(has(&sat, p, f("b"), fin));
    }

    #[test]
    fn test_rule_listener_replays_and_follows() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut sat = Sat::post_star();
        let p = sat.states_mut().single("p");
        sat.add_rule(Rule::normal(p, f("a"), p, f("b"), R));

        let count = Rc::new(RefCell::new(0usize));
        let seen = Rc::clone(&count);
        sat.register_rule_listener(Box::new(
            move |_: &Rule<Field, Reachability>, _: &StateArena<&'static str, Field>| {
                *seen.borrow_mut() += 1;
            },
        ));
        sat.add_rule(Rule::pop(p, f("b"), p, R));
        sat.add_rule(Rule::pop(p, f("b"), p, R));

        assert_eq!(*count.borrow(), 2);
        sat.unregister_all_listeners();
        assert_eq!(sat.listener_count(), 0);
    }

    mod agreement {
        use super::*;
        use proptest::prelude::*;

        const STATES: [&str; 3] = ["s0", "s1", "s2"];
        const LABELS: [&str; 3] = ["a", "b", "c"];

        /// Rule over state and label indices; `None` is the wildcard
        #[derive(Debug, Clone)]
        enum Shape {
            Normal(usize, Option<usize>, usize, Option<usize>),
            Push(usize, Option<usize>, usize, usize, Option<usize>),
            Pop(usize, Option<usize>, usize),
        }

        fn label() -> impl Strategy<Value = Option<usize>> {
            prop_oneof![3 => (0..LABELS.len()).prop_map(Some), 1 => Just(None)]
        }

        fn shape() -> impl Strategy<Value = Shape> {
            let s = 0..STATES.len();
            prop_oneof![
                (s.clone(), label(), s.clone(), label())
                    .prop_map(|(p, a, q, b)| Shape::Normal(p, a, q, b)),
                (s.clone(), label(), s.clone(), 0..LABELS.len(), label())
                    .prop_map(|(p, a, q, g, b)| Shape::Push(p, a, q, g, b)),
                (s.clone(), label(), s).prop_map(|(p, a, q)| Shape::Pop(p, a, q)),
            ]
        }

        fn symbol(label: Option<usize>) -> Field {
            label.map_or_else(Field::wildcard, |i| f(LABELS[i]))
        }

        /// States `s0..s2` and an accepting `final`, then the rules
        fn build(polarity: Polarity, shapes: &[Shape]) -> (Sat, Vec<StateId>, StateId) {
            let mut sat = Sat::new(polarity);
            let states: Vec<StateId> = STATES.iter().map(|s| sat.states_mut().single(*s)).collect();
            let fin = sat.states_mut().single("final");
            sat.automaton_mut().add_accepting_state(fin);
            for label in LABELS {
                sat.add_stack_symbol(f(label));
            }
            for shape in shapes {
                let rule = match *shape {
                    Shape::Normal(p, a, q, b) => Rule::normal(states[p], symbol(a), states[q], symbol(b), R),
                    Shape::Push(p, a, q, g, b) => {
                        Rule::push(states[p], symbol(a), states[q], f(LABELS[g]), symbol(b), R)
                    }
                    Shape::Pop(p, a, q) => Rule::pop(states[p], symbol(a), states[q], R),
                };
                sat.add_rule(rule);
            }
            (sat, states, fin)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(48))]

            /// <q,γ> ∈ post*(<s0,a>)  iff  <s0,a> ∈ pre*(<q,γ>)
            #[test]
            fn prop_post_star_and_pre_star_agree(shapes in prop::collection::vec(shape(), 0..7)) {
                let (mut forward, states, fin) = build(Polarity::Forward, &shapes);
                forward.add_transition(Transition::new(states[0], f("a"), fin), R);
                forward.saturate();

                for &q in &states {
                    for label in LABELS {
                        let (mut backward, _, _) = build(Polarity::Backward, &shapes);
                        backward.add_transition(Transition::new(q, f(label), fin), R);
                        backward.saturate();

                        let reached = has(&forward, q, f(label), fin);
                        let reaches = has(&backward, states[0], f("a"), fin);
                        prop_assert_eq!(reached, reaches, "<{:?}, {}>", q, label);
                    }
                }
            }
        }
    }
}
