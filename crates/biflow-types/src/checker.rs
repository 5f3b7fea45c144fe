// Entry point: runs constraint generation over a module and keeps the solved
// graph around for rendering.

use super::infer::biunify::MAX_BIUNIFY_DEPTH;
use super::infer::builtins;
use super::infer::graph::{Graph, StateId};
use super::infer::render;
use super::infer::scope::{Scope, Variable};
use super::infer::visitor::{BlockKind, BlockVisitor, InferCtx, MAX_INFER_DEPTH};
use biflow_ast::ast::Module;
use log::debug;

pub use super::infer::visitor::InferError as TypeError;

/// Knobs for one inference run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Type `print(..)` as `none` and `input(..)` as `str` without looking at
    /// their builtin signatures.
    pub skip_print_and_input: bool,
    /// Statement/expression nesting bound.
    pub max_depth: u32,
    /// Recursion bound for biunification.
    pub max_biunify_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_print_and_input: false,
            max_depth: MAX_INFER_DEPTH,
            max_biunify_depth: MAX_BIUNIFY_DEPTH,
        }
    }
}

/// A rendered binding, ready for printing.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub line: u32,
    pub col: u32,
    pub ty: String,
}

/// Outcome of [`TypeChecker::check_module`]. Inference stops at the first
/// error; everything bound before it is still available.
#[derive(Debug)]
pub struct Inference {
    graph: Graph,
    builtins: Scope,
    typed: Vec<Variable>,
    scope: Scope,
    error: Option<TypeError>,
}

impl Inference {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn error(&self) -> Option<&TypeError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn result(&self) -> Result<(), TypeError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Every binding in the order it was made, shadowed ones included.
    pub fn typed_variables(&self) -> &[Variable] {
        &self.typed
    }

    /// Final module-level scope, merges included.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn builtins(&self) -> &Scope {
        &self.builtins
    }

    pub fn render(&self, state: StateId) -> String {
        render::state(&self.graph, state)
    }

    /// Rendered type of the current top-level binding of `name`.
    pub fn type_of(&self, name: &str) -> Option<String> {
        self.scope.get(name).map(|v| self.render(v.state))
    }

    fn binding(&self, var: &Variable) -> Binding {
        Binding {
            name: var.name.clone(),
            line: var.span.line,
            col: var.span.col,
            ty: self.render(var.state),
        }
    }

    /// Latest top-level binding of each name.
    pub fn bindings(&self) -> Vec<Binding> {
        self.scope
            .latest_bindings()
            .into_iter()
            .map(|v| self.binding(v))
            .collect()
    }

    pub fn all_bindings(&self) -> Vec<Binding> {
        self.typed.iter().map(|v| self.binding(v)).collect()
    }

    pub fn builtin_bindings(&self) -> Vec<Binding> {
        self.builtins.iter().map(|v| self.binding(v)).collect()
    }
}

/// Infers structural types for whole modules.
#[derive(Debug, Default)]
pub struct TypeChecker {
    settings: Settings,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs inference over `module` in a fresh graph.
    pub fn check_module(&self, module: &Module) -> Inference {
        let mut ctx = InferCtx::new(self.settings);
        let builtins = builtins::install(&mut ctx.graph);

        let mut visitor = BlockVisitor::new(&mut ctx, builtins.clone(), BlockKind::Module);
        let outcome = visitor.visit_block(&module.body);
        let scope = visitor.into_scope();

        let error = outcome.err();
        if let Some(err) = &error {
            debug!("inference stopped: {}", err);
        }

        let (mut graph, typed) = ctx.into_parts();
        let roots: Vec<StateId> = builtins
            .iter()
            .chain(typed.iter())
            .chain(scope.iter())
            .map(|v| v.state)
            .collect();
        render::annotate(&mut graph, &roots);

        Inference {
            graph,
            builtins,
            typed,
            scope,
            error,
        }
    }
}
