//! Head types and the fixed base-type hierarchy.
//!
//! ```rust
//! use biflow_types::infer::lattice::{is_base_subtype, BaseType};
//! assert!(is_base_subtype(BaseType::Int, BaseType::Float));
//! assert!(is_base_subtype(BaseType::List, BaseType::Iter));
//! assert!(!is_base_subtype(BaseType::Float, BaseType::Int));
//! ```

use super::graph::StateId;
use std::collections::BTreeMap;
use std::fmt;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BaseType {
    None,
    Float,
    Str,
    Bool,
    Int,
    Iter,
    Dict,
    List,
    Set,
}

impl BaseType {
    pub const ALL: [BaseType; 9] = [
        BaseType::None,
        BaseType::Float,
        BaseType::Str,
        BaseType::Bool,
        BaseType::Int,
        BaseType::Iter,
        BaseType::Dict,
        BaseType::List,
        BaseType::Set,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseType::None => "none",
            BaseType::Float => "float",
            BaseType::Str => "str",
            BaseType::Bool => "bool",
            BaseType::Int => "int",
            BaseType::Iter => "iter",
            BaseType::Dict => "dict",
            BaseType::List => "list",
            BaseType::Set => "set",
        }
    }

    /// Directly declared supertypes.
    pub fn supertypes(self) -> &'static [BaseType] {
        match self {
            BaseType::Int => &[BaseType::Float],
            BaseType::Dict => &[BaseType::Iter],
            BaseType::List => &[BaseType::Dict],
            BaseType::Set => &[BaseType::Iter],
            BaseType::None
            | BaseType::Float
            | BaseType::Str
            | BaseType::Bool
            | BaseType::Iter => &[],
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reflexive-transitive closure of the declared hierarchy. The table is a
/// small DAG, so plain recursion terminates.
pub fn is_base_subtype(sub: BaseType, sup: BaseType) -> bool {
    sub == sup
        || sub
            .supertypes()
            .iter()
            .any(|&parent| is_base_subtype(parent, sup))
}

/// Which record specialization a `Head::Record` is. Only affects rendering
/// and the container-mutation checks; subtyping is by field set alone.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    Plain,
    Iter,
    Dict,
    List,
    Set,
}

impl RecordKind {
    /// Tag stored in a container's `"type"` field.
    pub fn base(self) -> Option<BaseType> {
        match self {
            RecordKind::Plain => None,
            RecordKind::Iter => Some(BaseType::Iter),
            RecordKind::Dict => Some(BaseType::Dict),
            RecordKind::List => Some(BaseType::List),
            RecordKind::Set => Some(BaseType::Set),
        }
    }

    pub fn is_container(self) -> bool {
        self != RecordKind::Plain
    }
}

/// A structural fact attached to a state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Head {
    /// Display-only marker added after solving.
    Var(String),
    Base(BaseType),
    Function {
        params: Vec<StateId>,
        result: StateId,
    },
    Record {
        kind: RecordKind,
        fields: BTreeMap<String, StateId>,
    },
}

impl Head {
    pub fn function(params: Vec<StateId>, result: StateId) -> Self {
        Head::Function { params, result }
    }

    /// Plain record with the given fields.
    pub fn record(fields: impl IntoIterator<Item = (String, StateId)>) -> Self {
        Head::Record {
            kind: RecordKind::Plain,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Head::Var(_))
    }

    pub fn field(&self, name: &str) -> Option<StateId> {
        match self {
            Head::Record { fields, .. } => fields.get(name).copied(),
            _ => None,
        }
    }

    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            Head::Record { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Head-level compatibility: base types via the hierarchy, functions by
    /// arity only, records by field-set superset. Parameter and field
    /// variance is left to the engine. `Var` never compares.
    pub fn is_subtype_of(&self, other: &Head) -> bool {
        match (self, other) {
            (Head::Base(a), Head::Base(b)) => is_base_subtype(*a, *b),
            (Head::Function { params: p1, .. }, Head::Function { params: p2, .. }) => {
                p1.len() == p2.len()
            }
            (Head::Record { fields: f1, .. }, Head::Record { fields: f2, .. }) => {
                f2.keys().all(|k| f1.contains_key(k))
            }
            _ => false,
        }
    }

    /// Every state this head points at.
    pub fn children(&self) -> Vec<StateId> {
        match self {
            Head::Var(_) | Head::Base(_) => Vec::new(),
            Head::Function { params, result } => {
                let mut out = params.clone();
                out.push(*result);
                out
            }
            Head::Record { fields, .. } => fields.values().copied().collect(),
        }
    }

    /// Same head with every state reference rewritten through `map`.
    pub fn map_states(&self, mut map: impl FnMut(StateId) -> StateId) -> Head {
        match self {
            Head::Var(name) => Head::Var(name.clone()),
            Head::Base(b) => Head::Base(*b),
            Head::Function { params, result } => Head::Function {
                params: params.iter().map(|&p| map(p)).collect(),
                result: map(*result),
            },
            Head::Record { kind, fields } => Head::Record {
                kind: *kind,
                fields: fields.iter().map(|(k, &v)| (k.clone(), map(v))).collect(),
            },
        }
    }
}
