//! Display of inferred types, plus the post-solve pass that names function
//! parameters with `T_<i>` markers.

use super::graph::{Graph, StateId};
use super::lattice::{Head, RecordKind};
use std::collections::{BTreeMap, HashSet};

/// Nesting beyond this renders as `...`.
const MAX_RENDER_DEPTH: usize = 64;

/// Alternatives at `id`, joined by `|`. A state with no heads renders empty.
pub fn state(graph: &Graph, id: StateId) -> String {
    Renderer::new(graph).state(id)
}

pub fn head(graph: &Graph, h: &Head) -> String {
    Renderer::new(graph).head(h)
}

struct Renderer<'g> {
    graph: &'g Graph,
    active: Vec<StateId>,
}

impl<'g> Renderer<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            active: Vec::new(),
        }
    }

    fn state(&mut self, id: StateId) -> String {
        if self.active.contains(&id) || self.active.len() >= MAX_RENDER_DEPTH {
            return "...".to_string();
        }
        self.active.push(id);
        let graph = self.graph;
        let parts: Vec<String> = graph.heads(id).iter().map(|h| self.head(h)).collect();
        self.active.pop();
        parts.join("|")
    }

    fn field(&mut self, fields: &BTreeMap<String, StateId>, name: &str) -> String {
        match fields.get(name) {
            Some(&s) => self.state(s),
            None => String::new(),
        }
    }

    fn head(&mut self, h: &Head) -> String {
        match h {
            Head::Var(name) => name.clone(),
            Head::Base(b) => b.name().to_string(),
            Head::Function { params, result } => {
                let params: Vec<String> = params.iter().map(|&p| self.state(p)).collect();
                let result = self.state(*result);
                format!("({}->{})", params.join(","), result)
            }
            Head::Record { kind, fields } => match kind {
                RecordKind::Plain => {
                    let parts: Vec<String> = fields
                        .iter()
                        .map(|(k, &v)| format!("{}:{}", k, self.state(v)))
                        .collect();
                    format!("rec[{}]", parts.join(","))
                }
                RecordKind::Dict => {
                    let keys = self.field(fields, "keys");
                    let values = self.field(fields, "values");
                    format!("dict[{},{}]", keys, values)
                }
                RecordKind::Iter | RecordKind::List | RecordKind::Set => {
                    let tag = kind.base().map(|b| b.name()).unwrap_or("iter");
                    let values = self.field(fields, "values");
                    format!("{}[{}]", tag, values)
                }
            },
        }
    }
}

/// Adds display-only `T_<i>` heads to the parameter states of every function
/// bound at `roots`, and to the states those parameters flow to. Record
/// fields with flows get `T_<i>_<field>`. Run only after solving.
pub fn annotate(graph: &mut Graph, roots: &[StateId]) {
    let mut visited = HashSet::new();
    for &root in roots {
        let heads = graph.heads(root).to_vec();
        for h in heads {
            if let Head::Function { params, .. } = h {
                annotate_params(graph, &params, "T", &mut visited);
            }
        }
    }
}

fn mark(graph: &mut Graph, id: StateId, name: &str) {
    let marker = Head::Var(name.to_string());
    graph.add_head(id, marker.clone());
    let flows: Vec<StateId> = graph.flows(id).iter().copied().collect();
    for f in flows {
        graph.add_head(f, marker.clone());
    }
}

fn annotate_params(
    graph: &mut Graph,
    params: &[StateId],
    prefix: &str,
    visited: &mut HashSet<StateId>,
) {
    for (i, &param) in params.iter().enumerate() {
        let name = format!("{}_{}", prefix, i);
        mark(graph, param, &name);
        descend(graph, param, &name, visited);
    }
}

fn annotate_fields(
    graph: &mut Graph,
    fields: &BTreeMap<String, StateId>,
    prefix: &str,
    visited: &mut HashSet<StateId>,
) {
    for (key, &value) in fields {
        let name = format!("{}_{}", prefix, key);
        if !graph.flows(value).is_empty() {
            mark(graph, value, &name);
        }
        descend(graph, value, &name, visited);
    }
}

fn descend(graph: &mut Graph, id: StateId, name: &str, visited: &mut HashSet<StateId>) {
    if !visited.insert(id) {
        return;
    }
    let heads = graph.heads(id).to_vec();
    for h in heads {
        match h {
            Head::Record { fields, .. } => annotate_fields(graph, &fields, name, visited),
            Head::Function { params, .. } => annotate_params(graph, &params, name, visited),
            Head::Var(_) | Head::Base(_) => {}
        }
    }
}
