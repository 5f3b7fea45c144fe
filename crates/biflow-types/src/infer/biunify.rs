//! Biunification: the subtype-check-and-propagate solver.
//!
//! ```rust
//! use biflow_types::infer::biunify::Biunifier;
//! use biflow_types::infer::graph::{Graph, Polarity};
//! use biflow_types::infer::lattice::BaseType;
//!
//! let mut g = Graph::new();
//! let int = g.with_base(Polarity::Positive, BaseType::Int);
//! let float = g.with_base(Polarity::Negative, BaseType::Float);
//! let mut b = Biunifier::new();
//! b.biunify(&mut g, int, float).unwrap();
//! ```

use super::graph::{Graph, Polarity, PolarityError, StateId};
use super::lattice::Head;
use super::render;
use log::trace;
use std::collections::HashSet;
use std::fmt;

/// Default bound on nested biunify calls.
pub const MAX_BIUNIFY_DEPTH: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiunifyError {
    /// Rendered heads of the incompatible pair.
    Subtype { sub: String, sup: String },
    DepthLimitExceeded,
    InvariantViolation(String),
}

impl fmt::Display for BiunifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiunifyError::Subtype { sub, sup } => write!(f, "{} is not a subtype of {}", sub, sup),
            BiunifyError::DepthLimitExceeded => {
                write!(f, "biunification depth limit exceeded (pathological input)")
            }
            BiunifyError::InvariantViolation(msg) => {
                write!(f, "internal error: {} (this is a bug in the inferencer)", msg)
            }
        }
    }
}

impl std::error::Error for BiunifyError {}

impl From<PolarityError> for BiunifyError {
    fn from(e: PolarityError) -> Self {
        BiunifyError::InvariantViolation(e.to_string())
    }
}

/// Solver state for one inference run. The visited-pair memo lives here, so
/// separate runs never share it.
#[derive(Debug, Clone)]
pub struct Biunifier {
    seen: HashSet<(StateId, StateId)>,
    depth: u32,
    max_depth: u32,
}

impl Default for Biunifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Biunifier {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_BIUNIFY_DEPTH)
    }

    pub fn with_max_depth(max_depth: u32) -> Self {
        Self {
            seen: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Number of distinct pairs processed so far.
    pub fn visited(&self) -> usize {
        self.seen.len()
    }

    /// Require everything flowing out of `pos` to be acceptable wherever `neg`
    /// is consumed.
    pub fn biunify(
        &mut self,
        graph: &mut Graph,
        pos: StateId,
        neg: StateId,
    ) -> Result<(), BiunifyError> {
        if graph.polarity(pos) != Polarity::Positive || graph.polarity(neg) != Polarity::Negative
        {
            return Err(BiunifyError::InvariantViolation(format!(
                "biunify expects a positive and a negative state, got {}{} and {}{}",
                graph.polarity(pos),
                pos,
                graph.polarity(neg),
                neg
            )));
        }
        if !self.seen.insert((pos, neg)) {
            return Ok(());
        }

        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(BiunifyError::DepthLimitExceeded);
        }
        let result = self.biunify_inner(graph, pos, neg);
        self.depth -= 1;
        result
    }

    fn biunify_inner(
        &mut self,
        graph: &mut Graph,
        pos: StateId,
        neg: StateId,
    ) -> Result<(), BiunifyError> {
        trace!("biunify {} <: {} (depth {})", pos, neg, self.depth);

        let pos_heads = graph.heads(pos).to_vec();
        let neg_heads = graph.heads(neg).to_vec();

        for hp in &pos_heads {
            for hn in &neg_heads {
                if hp.is_var() || hn.is_var() {
                    return Err(BiunifyError::InvariantViolation(
                        "type variable reached the solver".to_string(),
                    ));
                }
                if !hp.is_subtype_of(hn) {
                    return Err(BiunifyError::Subtype {
                        sub: render::head(graph, hp),
                        sup: render::head(graph, hn),
                    });
                }
            }
        }

        // Whoever already consumes `neg` now also sees what `pos` provides,
        // and whoever feeds `pos` now also meets what `neg` requires.
        let consumers: Vec<StateId> = graph.flows(neg).iter().copied().collect();
        for q in consumers {
            graph.merge(q, pos)?;
        }
        let providers: Vec<StateId> = graph.flows(pos).iter().copied().collect();
        for q in providers {
            graph.merge(q, neg)?;
        }

        for hp in &pos_heads {
            let Head::Function { params: pp, .. } = hp else {
                continue;
            };
            for hn in &neg_heads {
                let Head::Function { params: np, .. } = hn else {
                    continue;
                };
                for (&declared, &supplied) in pp.iter().zip(np.iter()) {
                    self.biunify(graph, supplied, declared)?;
                }
            }
        }

        for hp in &pos_heads {
            let Head::Function { result: pr, .. } = hp else {
                continue;
            };
            for hn in &neg_heads {
                if let Head::Function { result: nr, .. } = hn {
                    self.biunify(graph, *pr, *nr)?;
                }
            }
        }

        for hp in &pos_heads {
            let Head::Record { fields: pf, .. } = hp else {
                continue;
            };
            for hn in &neg_heads {
                let Head::Record { fields: nf, .. } = hn else {
                    continue;
                };
                for (name, &required) in nf {
                    let Some(&provided) = pf.get(name) else {
                        return Err(BiunifyError::InvariantViolation(format!(
                            "field '{}' missing after head check",
                            name
                        )));
                    };
                    self.biunify(graph, provided, required)?;
                }
            }
        }

        Ok(())
    }
}
