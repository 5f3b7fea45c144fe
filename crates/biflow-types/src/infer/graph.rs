//! Polarized state arena.
//!
//! States are addressed by [`StateId`] and never freed while the graph lives.
//! Flow edges always join a positive and a negative state and are stored on
//! both endpoints.

use super::lattice::{BaseType, Head, RecordKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Positive states produce values, negative states consume them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => f.write_str("+"),
            Polarity::Negative => f.write_str("-"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub polarity: Polarity,
    pub flows: BTreeSet<StateId>,
    /// Alternatives known at this state, without duplicates.
    pub heads: Vec<Head>,
}

impl State {
    fn new(polarity: Polarity) -> Self {
        State {
            polarity,
            flows: BTreeSet::new(),
            heads: Vec::new(),
        }
    }
}

/// A graph operation was asked to join states of the wrong polarities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolarityError {
    pub op: &'static str,
    pub left: StateId,
    pub right: StateId,
}

impl fmt::Display for PolarityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} and {} violates the polarity invariant",
            self.op, self.left, self.right
        )
    }
}

impl std::error::Error for PolarityError {}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    states: Vec<State>,
}

impl Graph {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn polarity(&self, id: StateId) -> Polarity {
        self.state(id).polarity
    }

    pub fn heads(&self, id: StateId) -> &[Head] {
        &self.state(id).heads
    }

    pub fn flows(&self, id: StateId) -> &BTreeSet<StateId> {
        &self.state(id).flows
    }

    pub fn fresh(&mut self, polarity: Polarity) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(State::new(polarity));
        id
    }

    pub fn with_heads(
        &mut self,
        polarity: Polarity,
        heads: impl IntoIterator<Item = Head>,
    ) -> StateId {
        let id = self.fresh(polarity);
        for h in heads {
            self.add_head(id, h);
        }
        id
    }

    pub fn with_base(&mut self, polarity: Polarity, base: BaseType) -> StateId {
        self.with_heads(polarity, [Head::Base(base)])
    }

    /// Adds `head` unless an equal head is already present.
    pub fn add_head(&mut self, id: StateId, head: Head) -> bool {
        let heads = &mut self.states[id.index()].heads;
        if heads.contains(&head) {
            false
        } else {
            heads.push(head);
            true
        }
    }

    pub fn add_flow(&mut self, a: StateId, b: StateId) -> Result<(), PolarityError> {
        if self.polarity(a) == self.polarity(b) {
            return Err(PolarityError {
                op: "add_flow",
                left: a,
                right: b,
            });
        }
        self.states[a.index()].flows.insert(b);
        self.states[b.index()].flows.insert(a);
        Ok(())
    }

    /// Fresh positive state flowing into a fresh negative one.
    pub fn flow_pair(&mut self) -> (StateId, StateId) {
        let pos = self.fresh(Polarity::Positive);
        let neg = self.fresh(Polarity::Negative);
        self.states[pos.index()].flows.insert(neg);
        self.states[neg.index()].flows.insert(pos);
        (pos, neg)
    }

    /// Unions `source`'s flows and heads into `target`. Append-only.
    pub fn merge(&mut self, target: StateId, source: StateId) -> Result<(), PolarityError> {
        if self.polarity(target) != self.polarity(source) {
            return Err(PolarityError {
                op: "merge",
                left: target,
                right: source,
            });
        }
        if target == source {
            return Ok(());
        }
        let flows: Vec<StateId> = self.flows(source).iter().copied().collect();
        for f in flows {
            self.add_flow(target, f)?;
        }
        let heads = self.heads(source).to_vec();
        for h in heads {
            self.add_head(target, h);
        }
        Ok(())
    }

    /// Fresh state carrying the union of both inputs' flows and heads.
    pub fn combine(&mut self, a: StateId, b: StateId) -> Result<StateId, PolarityError> {
        let polarity = self.polarity(a);
        if polarity != self.polarity(b) {
            return Err(PolarityError {
                op: "combine",
                left: a,
                right: b,
            });
        }
        let out = self.fresh(polarity);
        self.merge(out, a)?;
        self.merge(out, b)?;
        Ok(out)
    }

    /// Every state reachable from `root` through flows and head substructure,
    /// in discovery order.
    pub fn reachable(&self, root: StateId) -> Vec<StateId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut work = vec![root];
        while let Some(id) = work.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let st = self.state(id);
            work.extend(st.flows.iter().copied());
            for h in &st.heads {
                work.extend(h.children());
            }
        }
        order
    }

    /// Copies the reachable closure of `root` into fresh states and returns
    /// the copy of `root`. Shared and cyclic structure is preserved.
    pub fn deep_copy(&mut self, root: StateId) -> StateId {
        let closure = self.reachable(root);
        let mut map: HashMap<StateId, StateId> = HashMap::with_capacity(closure.len());
        for &old in &closure {
            let new = self.fresh(self.polarity(old));
            map.insert(old, new);
        }
        let remap = |s: StateId| map.get(&s).copied().unwrap_or(s);
        for &old in &closure {
            let st = self.state(old);
            let flows: BTreeSet<StateId> = st.flows.iter().map(|&f| remap(f)).collect();
            let heads: Vec<Head> = st.heads.iter().map(|h| h.map_states(remap)).collect();
            let new = remap(old);
            let target = &mut self.states[new.index()];
            target.flows = flows;
            target.heads = heads;
        }
        remap(root)
    }

    /// Record head for a built-in container shape. Every field state has
    /// `polarity`; `pop` and `[]` are zero-argument functions returning the
    /// `values` state.
    pub fn container_head(&mut self, kind: RecordKind, polarity: Polarity) -> Head {
        let mut fields = BTreeMap::new();
        if let Some(tag) = kind.base() {
            let ty = self.with_base(polarity, tag);
            fields.insert("type".to_string(), ty);
        }
        let values = self.fresh(polarity);
        fields.insert("values".to_string(), values);

        if matches!(kind, RecordKind::Dict | RecordKind::List) {
            let keys = if kind == RecordKind::List {
                self.with_base(polarity, BaseType::Int)
            } else {
                self.fresh(polarity)
            };
            fields.insert("keys".to_string(), keys);
            let subscript = self.with_heads(polarity, [Head::function(vec![], values)]);
            fields.insert("[]".to_string(), subscript);
        }
        if matches!(kind, RecordKind::Dict | RecordKind::List | RecordKind::Set) {
            let pop = self.with_heads(polarity, [Head::function(vec![], values)]);
            fields.insert("pop".to_string(), pop);
        }

        Head::Record { kind, fields }
    }

    /// State holding a single container head.
    pub fn container(&mut self, kind: RecordKind, polarity: Polarity) -> StateId {
        let head = self.container_head(kind, polarity);
        self.with_heads(polarity, [head])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_flow_is_symmetric_and_polarity_checked() {
        let mut g = Graph::new();
        let p = g.fresh(Polarity::Positive);
        let n = g.fresh(Polarity::Negative);
        let p2 = g.fresh(Polarity::Positive);
        g.add_flow(p, n).unwrap();
        assert!(g.flows(p).contains(&n));
        assert!(g.flows(n).contains(&p));
        assert!(g.add_flow(p, p2).is_err());
    }

    #[test]
    fn heads_are_deduplicated() {
        let mut g = Graph::new();
        let s = g.fresh(Polarity::Positive);
        assert!(g.add_head(s, Head::Base(BaseType::Int)));
        assert!(!g.add_head(s, Head::Base(BaseType::Int)));
        assert_eq!(g.heads(s).len(), 1);
    }

    #[test]
    fn merge_unions_flows_and_heads() {
        let mut g = Graph::new();
        let a = g.with_base(Polarity::Positive, BaseType::Int);
        let b = g.with_base(Polarity::Positive, BaseType::Str);
        let n = g.fresh(Polarity::Negative);
        g.add_flow(b, n).unwrap();
        g.merge(a, b).unwrap();
        assert_eq!(
            g.heads(a),
            &[Head::Base(BaseType::Int), Head::Base(BaseType::Str)]
        );
        assert!(g.flows(a).contains(&n));
        assert!(g.flows(n).contains(&a));
        assert_eq!(g.heads(b), &[Head::Base(BaseType::Str)]);
    }

    #[test]
    fn combine_leaves_inputs_untouched() {
        let mut g = Graph::new();
        let a = g.with_base(Polarity::Positive, BaseType::Int);
        let b = g.with_base(Polarity::Positive, BaseType::Str);
        let c = g.combine(a, b).unwrap();
        assert_ne!(c, a);
        assert_eq!(g.heads(c).len(), 2);
        assert_eq!(g.heads(a).len(), 1);
        assert_eq!(g.heads(b).len(), 1);

        let n = g.fresh(Polarity::Negative);
        assert!(g.combine(a, n).is_err());
    }

    #[test]
    fn deep_copy_preserves_cycles_and_detaches() {
        let mut g = Graph::new();
        // a list whose values contain the list itself
        let list = g.container(RecordKind::List, Polarity::Positive);
        let values = g.heads(list)[0].field("values").unwrap();
        let head = g.heads(list)[0].clone();
        g.add_head(values, head);

        let before = g.len();
        let copy = g.deep_copy(list);
        assert!(g.len() > before);
        assert_ne!(copy, list);

        let copied_values = g.heads(copy)[0].field("values").unwrap();
        assert_ne!(copied_values, values);
        // the self reference now points inside the copy
        let inner = &g.heads(copied_values)[0];
        assert_eq!(inner.field("values"), Some(copied_values));

        g.add_head(copied_values, Head::Base(BaseType::Int));
        assert!(!g.heads(values).contains(&Head::Base(BaseType::Int)));
    }

    #[test]
    fn container_shapes() {
        let mut g = Graph::new();
        let list = g.container_head(RecordKind::List, Polarity::Positive);
        let keys = list.field("keys").unwrap();
        assert_eq!(g.heads(keys), &[Head::Base(BaseType::Int)]);
        assert!(list.field("[]").is_some());
        assert!(list.field("pop").is_some());

        let set = g.container_head(RecordKind::Set, Polarity::Positive);
        assert!(set.field("pop").is_some());
        assert!(set.field("keys").is_none());
        assert!(set.field("[]").is_none());

        let iter = g.container_head(RecordKind::Iter, Polarity::Negative);
        let ty = iter.field("type").unwrap();
        assert_eq!(g.polarity(ty), Polarity::Negative);
        assert_eq!(g.heads(ty), &[Head::Base(BaseType::Iter)]);
        assert!(iter.field("pop").is_none());
    }
}
