use super::graph::StateId;
use biflow_ast::span::Span;

/// A bound name: where it was bound and the state holding its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub span: Span,
    pub state: StateId,
}

impl Variable {
    pub fn new(name: impl Into<String>, span: Span, state: StateId) -> Self {
        Self {
            name: name.into(),
            span,
            state,
        }
    }
}

/// Append-only binding list; later bindings shadow earlier ones.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    entries: Vec<(String, Variable)>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// `upper` followed by `local`, so `local` shadows.
    pub fn combine(upper: &Scope, local: &Scope) -> Scope {
        let mut entries = Vec::with_capacity(upper.entries.len() + local.entries.len());
        entries.extend(upper.entries.iter().cloned());
        entries.extend(local.entries.iter().cloned());
        Scope { entries }
    }

    pub fn add(&mut self, name: impl Into<String>, var: Variable) {
        self.entries.push((name.into(), var));
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Distinct names in order of first binding.
    pub fn bound_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (name, _) in &self.entries {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    /// Current binding of each name, in order of first binding.
    pub fn latest_bindings(&self) -> Vec<&Variable> {
        self.bound_names()
            .iter()
            .filter_map(|n| self.get(n))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
