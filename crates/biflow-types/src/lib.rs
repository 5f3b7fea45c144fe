#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

mod checker;


pub use checker::{Binding, Inference, Settings, TypeChecker, TypeError};

// inference lives in its own namespace
pub mod infer {
    pub mod biunify;
    pub mod builtins;
    pub mod graph;
    pub mod lattice;
    pub mod render;
    pub mod scope;
    pub mod visitor;

    pub use biunify::{BiunifyError, Biunifier};
    pub use graph::{Graph, Polarity, StateId};
    pub use lattice::{BaseType, Head, RecordKind};
    pub use scope::{Scope, Variable};
    pub use visitor::{BlockKind, BlockVisitor, InferCtx, InferError};

    #[cfg(test)]
    mod tests;
}

// Short names for dependents.
pub mod prelude {
    pub use crate::checker::{Binding, Inference, Settings, TypeChecker, TypeError};
    pub use crate::infer::{
        biunify::Biunifier,
        graph::{Graph, Polarity, StateId},
        lattice::{BaseType, Head},
        render::state as render_state,
    };
}
