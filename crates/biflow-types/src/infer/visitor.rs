//! Constraint generation.
//!
//! A [`BlockVisitor`] walks one statement sequence, allocating states for
//! expressions and calling the biunifier wherever two types meet. Branch and
//! loop bodies get their own visitor layered on the enclosing scopes; their
//! bindings are merged back when the body is done.

use super::biunify::{BiunifyError, Biunifier};
use super::graph::{Graph, Polarity, PolarityError, StateId};
use super::lattice::{BaseType, Head, RecordKind};
use super::scope::{Scope, Variable};
use crate::checker::Settings;
use biflow_ast::ast::{Expr, FnDef, Ident, Lit, Stmt};
use biflow_ast::span::Span;
use log::{debug, trace};
use std::fmt;

/// Default bound on statement/expression nesting.
pub const MAX_INFER_DEPTH: u32 = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum InferError {
    /// Two heads met in the wrong order.
    Subtype { sub: String, sup: String, span: Span },
    UnboundName { name: String, span: Span },
    NotSupported { construct: String, span: Span },
    /// A container operation found no head of the shape it needs.
    ShapeMismatch { msg: String, span: Span },
    DepthLimitExceeded { span: Span },
    InvariantViolation { msg: String, span: Span },
}

impl InferError {
    pub fn span(&self) -> Span {
        match self {
            InferError::Subtype { span, .. }
            | InferError::UnboundName { span, .. }
            | InferError::NotSupported { span, .. }
            | InferError::ShapeMismatch { span, .. }
            | InferError::DepthLimitExceeded { span }
            | InferError::InvariantViolation { span, .. } => *span,
        }
    }

    fn at(err: BiunifyError, span: Span) -> Self {
        match err {
            BiunifyError::Subtype { sub, sup } => InferError::Subtype { sub, sup, span },
            BiunifyError::DepthLimitExceeded => InferError::DepthLimitExceeded { span },
            BiunifyError::InvariantViolation(msg) => InferError::InvariantViolation { msg, span },
        }
    }

    fn polarity(err: PolarityError, span: Span) -> Self {
        InferError::InvariantViolation {
            msg: err.to_string(),
            span,
        }
    }

    fn not_supported(construct: impl Into<String>, span: Span) -> Self {
        InferError::NotSupported {
            construct: construct.into(),
            span,
        }
    }
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();
        write!(f, "(Ln{} Col{}) ", span.line, span.col)?;
        match self {
            InferError::Subtype { sub, sup, .. } => write!(f, "{} is not a subtype of {}", sub, sup),
            InferError::UnboundName { name, .. } => write!(f, "name '{}' is not bound", name),
            InferError::NotSupported { construct, .. } => {
                write!(f, "{} is not supported", construct)
            }
            InferError::ShapeMismatch { msg, .. } => f.write_str(msg),
            InferError::DepthLimitExceeded { .. } => {
                write!(f, "inference depth limit exceeded (pathological input)")
            }
            InferError::InvariantViolation { msg, .. } => {
                write!(f, "internal error: {} (this is a bug in the inferencer)", msg)
            }
        }
    }
}

impl std::error::Error for InferError {}

/// Per-run context shared by every visitor of one inference.
pub struct InferCtx {
    pub graph: Graph,
    biunifier: Biunifier,
    /// Every binding made, in order.
    typed: Vec<Variable>,
    /// Negative state a `return` feeds, while inside a function body.
    return_sink: Option<StateId>,
    /// State of the function whose body is being visited; calls to it are
    /// not instantiated.
    current_function: Option<StateId>,
    settings: Settings,
    depth: u32,
}

impl InferCtx {
    pub fn new(settings: Settings) -> Self {
        InferCtx {
            graph: Graph::new(),
            biunifier: Biunifier::with_max_depth(settings.max_biunify_depth),
            typed: Vec::new(),
            return_sink: None,
            current_function: None,
            settings,
            depth: 0,
        }
    }

    pub fn typed_variables(&self) -> &[Variable] {
        &self.typed
    }

    pub fn into_parts(self) -> (Graph, Vec<Variable>) {
        (self.graph, self.typed)
    }

    fn enter_depth(&mut self, span: Span) -> Result<(), InferError> {
        self.depth += 1;
        if self.depth > self.settings.max_depth {
            Err(InferError::DepthLimitExceeded { span })
        } else {
            Ok(())
        }
    }

    fn exit_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn biunify(&mut self, pos: StateId, neg: StateId, span: Span) -> Result<(), InferError> {
        self.biunifier
            .biunify(&mut self.graph, pos, neg)
            .map_err(|e| InferError::at(e, span))
    }

    /// Fresh copy of a callee's reachable structure, so each call site
    /// constrains its own parameter and result states. Only function values
    /// are copied; an unknown callee (a parameter, say) must keep its
    /// requirements on the states it was loaded from.
    pub fn instantiate(&mut self, callee: StateId) -> StateId {
        let is_function = self
            .graph
            .heads(callee)
            .iter()
            .any(|h| matches!(h, Head::Function { .. }));
        if !is_function || self.current_function == Some(callee) {
            return callee;
        }
        let copy = self.graph.deep_copy(callee);
        trace!("instantiate {} as {}", callee, copy);
        copy
    }

    /// Applies `function` to `args` and returns the positive result state.
    pub fn call(
        &mut self,
        function: StateId,
        args: Vec<StateId>,
        span: Span,
    ) -> Result<StateId, InferError> {
        let (result, sink) = self.graph.flow_pair();
        let expected = self
            .graph
            .with_heads(Polarity::Negative, [Head::function(args, sink)]);
        self.biunify(function, expected, span)?;
        Ok(result)
    }

    fn base(&mut self, b: BaseType) -> StateId {
        self.graph.with_base(Polarity::Positive, b)
    }
}

/// Where a statement sequence sits; decides which definitions are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Module,
    Function,
    Branch,
    WhileBody,
    ForBody,
}

pub struct BlockVisitor<'c> {
    ctx: &'c mut InferCtx,
    upper: Scope,
    scope: Scope,
    stack: Vec<StateId>,
    return_seen: bool,
    kind: BlockKind,
}

impl<'c> BlockVisitor<'c> {
    pub fn new(ctx: &'c mut InferCtx, upper: Scope, kind: BlockKind) -> Self {
        BlockVisitor {
            ctx,
            upper,
            scope: Scope::new(),
            stack: Vec::new(),
            return_seen: false,
            kind,
        }
    }

    /// Bindings made by this block.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn returned(&self) -> bool {
        self.return_seen
    }

    pub fn into_scope(self) -> Scope {
        self.scope
    }

    /// Visits statements in order; everything after a `return` is skipped.
    pub fn visit_block(&mut self, stmts: &[Stmt]) -> Result<(), InferError> {
        for stmt in stmts {
            if self.return_seen {
                break;
            }
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn child(&mut self, kind: BlockKind) -> BlockVisitor<'_> {
        let upper = Scope::combine(&self.upper, &self.scope);
        BlockVisitor::new(&mut *self.ctx, upper, kind)
    }

    // ======= scope helpers =======

    fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scope.get(name).or_else(|| self.upper.get(name))
    }

    fn load(&self, id: &Ident) -> Result<StateId, InferError> {
        self.lookup(&id.text)
            .map(|v| v.state)
            .ok_or_else(|| InferError::UnboundName {
                name: id.text.clone(),
                span: id.span,
            })
    }

    fn load_builtin(&self, name: &str, span: Span) -> Result<StateId, InferError> {
        self.lookup(name)
            .map(|v| v.state)
            .ok_or_else(|| InferError::UnboundName {
                name: name.to_string(),
                span,
            })
    }

    fn store(&mut self, id: &Ident, state: StateId) {
        let var = Variable::new(id.text.clone(), id.span, state);
        self.ctx.typed.push(var.clone());
        self.scope.add(id.text.clone(), var);
    }

    fn pop(&mut self, span: Span) -> Result<StateId, InferError> {
        self.stack.pop().ok_or_else(|| InferError::InvariantViolation {
            msg: "evaluation stack underflow".to_string(),
            span,
        })
    }

    /// Visit `expr` and take its state off the stack.
    fn eval(&mut self, expr: &Expr) -> Result<StateId, InferError> {
        self.visit_expr(expr)?;
        self.pop(expr.span())
    }

    fn require(&mut self, value: StateId, base: BaseType, span: Span) -> Result<(), InferError> {
        let expected = self.ctx.graph.with_base(Polarity::Negative, base);
        self.ctx.biunify(value, expected, span)
    }

    fn combine(&mut self, a: StateId, b: StateId, span: Span) -> Result<StateId, InferError> {
        self.ctx
            .graph
            .combine(a, b)
            .map_err(|e| InferError::polarity(e, span))
    }

    fn merge(&mut self, target: StateId, source: StateId, span: Span) -> Result<(), InferError> {
        self.ctx
            .graph
            .merge(target, source)
            .map_err(|e| InferError::polarity(e, span))
    }

    // ======= statements =======

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<(), InferError> {
        let span = stmt.span();
        self.ctx.enter_depth(span)?;
        let result = self.visit_stmt_inner(stmt, span);
        self.ctx.exit_depth();
        result
    }

    fn visit_stmt_inner(&mut self, stmt: &Stmt, span: Span) -> Result<(), InferError> {
        match stmt {
            Stmt::Assign { targets, value, .. } => {
                let state = self.eval(value)?;
                for target in targets {
                    let id = name_target(target)?;
                    self.store(id, state);
                }
                Ok(())
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                let id = name_target(target)?;
                let lhs = self.load(id)?;
                let rhs = self.eval(value)?;
                let op = self.load_builtin(op.builtin_name(), span)?;
                let op = self.ctx.instantiate(op);
                let result = self.ctx.call(op, vec![lhs, rhs], span)?;
                self.store(id, result);
                Ok(())
            }
            Stmt::If {
                test, body, orelse, ..
            } => self.visit_if(test, body, orelse, span),
            Stmt::While { test, body, .. } => {
                let cond = self.eval(test)?;
                self.require(cond, BaseType::Bool, span)?;
                let mut child = self.child(BlockKind::WhileBody);
                child.visit_block(body)?;
                let body_scope = child.into_scope();
                self.merge_loop(&body_scope, span)
            }
            Stmt::For {
                target, iter, body, ..
            } => self.visit_for(target, iter, body, span),
            Stmt::FunctionDef(def) => self.visit_function(def),
            Stmt::Return { value, .. } => {
                let Some(sink) = self.ctx.return_sink else {
                    return Err(InferError::not_supported("return outside of a function", span));
                };
                let state = match value {
                    Some(v) => self.eval(v)?,
                    None => self.ctx.base(BaseType::None),
                };
                self.ctx.biunify(state, sink, span)?;
                self.return_seen = true;
                Ok(())
            }
            Stmt::Expr { expr, .. } => {
                self.eval(expr)?;
                Ok(())
            }
            Stmt::Pass(_) | Stmt::Break(_) | Stmt::Continue(_) => Ok(()),
            Stmt::Unsupported { construct, .. } => {
                Err(InferError::not_supported(construct.clone(), span))
            }
        }
    }

    fn visit_if(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        span: Span,
    ) -> Result<(), InferError> {
        let cond = self.eval(test)?;
        self.require(cond, BaseType::Bool, span)?;

        let mut then_v = self.child(BlockKind::Branch);
        then_v.visit_block(body)?;
        let then_returned = then_v.returned();
        let then_scope = then_v.into_scope();

        let mut else_v = self.child(BlockKind::Branch);
        else_v.visit_block(orelse)?;
        let else_returned = else_v.returned();
        let else_scope = else_v.into_scope();

        let mut names = then_scope.bound_names();
        for name in else_scope.bound_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in names {
            let var = match (then_scope.get(&name), else_scope.get(&name)) {
                (Some(t), Some(e)) => {
                    let (t_span, t_state, e_state) = (t.span, t.state, e.state);
                    let merged = self.combine(t_state, e_state, span)?;
                    Variable::new(name.clone(), t_span, merged)
                }
                (Some(v), None) | (None, Some(v)) => v.clone(),
                (None, None) => continue,
            };
            debug!("if-merge {} at line {}", name, span.line);
            self.scope.add(name, var);
        }

        self.return_seen = then_returned && else_returned;
        Ok(())
    }

    fn visit_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        span: Span,
    ) -> Result<(), InferError> {
        let id = name_target(target)?;
        let iterable = self.eval(iter)?;

        let head = self
            .ctx
            .graph
            .container_head(RecordKind::Iter, Polarity::Negative);
        let values = head.field("values").ok_or_else(|| InferError::InvariantViolation {
            msg: "iterator shape without values".to_string(),
            span,
        })?;
        let element = self.ctx.graph.fresh(Polarity::Positive);
        self.ctx
            .graph
            .add_flow(element, values)
            .map_err(|e| InferError::polarity(e, span))?;
        let expected = self.ctx.graph.with_heads(Polarity::Negative, [head]);
        self.ctx.biunify(iterable, expected, span)?;

        let mut child = self.child(BlockKind::ForBody);
        child.store(id, element);
        child.visit_block(body)?;
        let body_scope = child.into_scope();
        self.merge_loop(&body_scope, span)
    }

    /// The body may run zero or more times: each name it bound becomes the
    /// combination of its pre-loop type (or `none`) and its post-body type.
    fn merge_loop(&mut self, body_scope: &Scope, span: Span) -> Result<(), InferError> {
        for var in body_scope.latest_bindings() {
            let prev = self.lookup(&var.name).map(|p| (p.span, p.state));
            let (marked, before) = match prev {
                Some(found) => found,
                None => (var.span, self.ctx.base(BaseType::None)),
            };
            let merged = self.combine(before, var.state, span)?;
            debug!("loop-merge {} at line {}", var.name, span.line);
            self.scope
                .add(var.name.clone(), Variable::new(var.name.clone(), marked, merged));
        }
        Ok(())
    }

    fn visit_function(&mut self, def: &FnDef) -> Result<(), InferError> {
        let construct = match self.kind {
            BlockKind::Module => None,
            BlockKind::Function => Some("nested function definition"),
            BlockKind::Branch => Some("function definition inside a conditional"),
            BlockKind::WhileBody => Some("function definition inside a while loop"),
            BlockKind::ForBody => Some("function definition inside a for loop"),
        };
        if let Some(construct) = construct {
            return Err(InferError::not_supported(construct, def.span));
        }

        let function = self.ctx.graph.fresh(Polarity::Positive);
        let var = Variable::new(def.name.text.clone(), def.span, function);
        self.ctx.typed.push(var.clone());

        let mut upper = Scope::combine(&self.upper, &self.scope);
        upper.add(def.name.text.clone(), var.clone());

        let mut params = Vec::with_capacity(def.params.len());
        let mut locals = Scope::new();
        for param in &def.params {
            let (pos, neg) = self.ctx.graph.flow_pair();
            locals.add(
                param.text.clone(),
                Variable::new(param.text.clone(), param.span, pos),
            );
            params.push(neg);
        }
        let (result, sink) = self.ctx.graph.flow_pair();
        self.ctx
            .graph
            .add_head(function, Head::function(params, result));

        let outer_sink = self.ctx.return_sink.replace(sink);
        let outer_function = self.ctx.current_function.replace(function);

        let mut body = BlockVisitor::new(&mut *self.ctx, upper, BlockKind::Function);
        body.scope = locals;
        let visited = body.visit_block(&def.body);
        let returned = body.returned();
        let finished = visited.and_then(|()| {
            if returned {
                return Ok(());
            }
            let none = self.ctx.base(BaseType::None);
            self.ctx.biunify(none, sink, def.span)
        });

        self.ctx.return_sink = outer_sink;
        self.ctx.current_function = outer_function;
        finished?;

        debug!(
            "function {} with {} parameter(s) at line {}",
            def.name.text,
            def.params.len(),
            def.span.line
        );
        self.scope.add(def.name.text.clone(), var);
        Ok(())
    }

    // ======= expressions =======

    fn visit_expr(&mut self, expr: &Expr) -> Result<(), InferError> {
        let span = expr.span();
        self.ctx.enter_depth(span)?;
        let result = self.visit_expr_inner(expr, span);
        self.ctx.exit_depth();
        let state = result?;
        self.stack.push(state);
        Ok(())
    }

    fn visit_expr_inner(&mut self, expr: &Expr, span: Span) -> Result<StateId, InferError> {
        match expr {
            Expr::Name(id) => self.load(id),
            Expr::Constant(lit, _) => {
                let base = match lit {
                    Lit::Int(_) => BaseType::Int,
                    Lit::Float(_) => BaseType::Float,
                    Lit::Bool(_) => BaseType::Bool,
                    Lit::Str(_) => BaseType::Str,
                    Lit::None => BaseType::None,
                    Lit::Bytes(_) => return Err(InferError::not_supported("bytes constant", span)),
                    Lit::Complex(_) => {
                        return Err(InferError::not_supported("complex constant", span))
                    }
                    Lit::Ellipsis => {
                        return Err(InferError::not_supported("Ellipsis constant", span))
                    }
                };
                Ok(self.ctx.base(base))
            }
            Expr::Call { func, args, .. } => self.visit_call(func, args, span),
            Expr::Attribute { value, attr, .. } => {
                let receiver = self.eval(value)?;
                let (result, field) = self.ctx.graph.flow_pair();
                let expected = self.ctx.graph.with_heads(
                    Polarity::Negative,
                    [Head::record([(attr.text.clone(), field)])],
                );
                self.ctx.biunify(receiver, expected, span)?;
                Ok(result)
            }
            Expr::Subscript { value, index, .. } => {
                let receiver = self.eval(value)?;
                self.eval(index)?;
                let (getter, field) = self.ctx.graph.flow_pair();
                let expected = self
                    .ctx
                    .graph
                    .with_heads(Polarity::Negative, [Head::record([("[]".to_string(), field)])]);
                self.ctx.biunify(receiver, expected, span)?;
                self.ctx.call(getter, Vec::new(), span)
            }
            Expr::Compare {
                left,
                ops,
                comparators,
                ..
            } => {
                let (op, right) = match (ops.as_slice(), comparators.as_slice()) {
                    ([op], [right]) => (*op, right),
                    _ => return Err(InferError::not_supported("chained comparison", span)),
                };
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                self.apply_operator(op.builtin_name(), vec![lhs, rhs], span)
            }
            Expr::BoolOp { op, values, .. } => {
                let Some((first, rest)) = values.split_first() else {
                    return Err(InferError::InvariantViolation {
                        msg: "boolean operation without operands".to_string(),
                        span,
                    });
                };
                let mut acc = self.eval(first)?;
                for value in rest {
                    let rhs = self.eval(value)?;
                    acc = self.apply_operator(op.builtin_name(), vec![acc, rhs], span)?;
                }
                Ok(acc)
            }
            Expr::UnaryOp { op, operand, .. } => {
                let arg = self.eval(operand)?;
                self.apply_operator(op.builtin_name(), vec![arg], span)
            }
            Expr::BinOp {
                left, op, right, ..
            } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                self.apply_operator(op.builtin_name(), vec![lhs, rhs], span)
            }
            Expr::List { elts, .. } => self.visit_collection(RecordKind::List, elts, span),
            Expr::Set { elts, .. } => self.visit_collection(RecordKind::Set, elts, span),
            Expr::Dict { keys, values, .. } => {
                let head = self
                    .ctx
                    .graph
                    .container_head(RecordKind::Dict, Polarity::Positive);
                let (key_field, value_field) = match (head.field("keys"), head.field("values")) {
                    (Some(k), Some(v)) => (k, v),
                    _ => {
                        return Err(InferError::InvariantViolation {
                            msg: "dict shape without keys or values".to_string(),
                            span,
                        })
                    }
                };
                let dict = self.ctx.graph.with_heads(Polarity::Positive, [head]);
                for (key, value) in keys.iter().zip(values) {
                    let k = self.eval(key)?;
                    let v = self.eval(value)?;
                    self.merge(key_field, k, span)?;
                    self.merge(value_field, v, span)?;
                }
                Ok(dict)
            }
            Expr::Unsupported { construct, .. } => {
                Err(InferError::not_supported(construct.clone(), span))
            }
        }
    }

    fn apply_operator(
        &mut self,
        name: &str,
        args: Vec<StateId>,
        span: Span,
    ) -> Result<StateId, InferError> {
        let op = self.load_builtin(name, span)?;
        let op = self.ctx.instantiate(op);
        self.ctx.call(op, args, span)
    }

    fn visit_collection(
        &mut self,
        kind: RecordKind,
        elts: &[Expr],
        span: Span,
    ) -> Result<StateId, InferError> {
        let head = self.ctx.graph.container_head(kind, Polarity::Positive);
        let values = head.field("values").ok_or_else(|| InferError::InvariantViolation {
            msg: "container shape without values".to_string(),
            span,
        })?;
        let container = self.ctx.graph.with_heads(Polarity::Positive, [head]);
        for elt in elts {
            let state = self.eval(elt)?;
            self.merge(values, state, span)?;
        }
        Ok(container)
    }

    fn visit_call(&mut self, func: &Expr, args: &[Expr], span: Span) -> Result<StateId, InferError> {
        let mut arg_states = Vec::with_capacity(args.len());
        for arg in args {
            arg_states.push(self.eval(arg)?);
        }

        if let Some(result) = self.special_call(func, &arg_states, span)? {
            return Ok(result);
        }

        let callee = self.eval(func)?;
        let callee = self.ctx.instantiate(callee);
        self.ctx.call(callee, arg_states, span)
    }

    /// Calls that need the receiver or bypass the builtin table.
    fn special_call(
        &mut self,
        func: &Expr,
        args: &[StateId],
        span: Span,
    ) -> Result<Option<StateId>, InferError> {
        match func {
            Expr::Name(id) => match id.text.as_str() {
                "print" if self.ctx.settings.skip_print_and_input => {
                    Ok(Some(self.ctx.base(BaseType::None)))
                }
                "input" if self.ctx.settings.skip_print_and_input => {
                    Ok(Some(self.ctx.base(BaseType::Str)))
                }
                "range" => {
                    let int = self.ctx.graph.with_base(Polarity::Negative, BaseType::Int);
                    for &arg in args {
                        self.ctx.biunify(arg, int, span)?;
                    }
                    let head = self
                        .ctx
                        .graph
                        .container_head(RecordKind::Iter, Polarity::Positive);
                    if let Some(values) = head.field("values") {
                        self.ctx.graph.add_head(values, Head::Base(BaseType::Int));
                    }
                    Ok(Some(self.ctx.graph.with_heads(Polarity::Positive, [head])))
                }
                _ => Ok(None),
            },
            Expr::Attribute { value, attr, .. } => match attr.text.as_str() {
                "append" | "add" | "update" | "extend" => {
                    self.mutate_container(value, attr, args, span).map(Some)
                }
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// `xs.append(v)` and friends: grow the receiver's element types in
    /// place and rebind the receiver name. Evaluates to `none`.
    fn mutate_container(
        &mut self,
        receiver: &Expr,
        method: &Ident,
        args: &[StateId],
        span: Span,
    ) -> Result<StateId, InferError> {
        let Expr::Name(id) = receiver else {
            return Err(InferError::not_supported(
                format!("{}() on a {} receiver", method.text, receiver.kind_name()),
                span,
            ));
        };
        let [arg] = args else {
            return Err(InferError::ShapeMismatch {
                msg: format!("{}() takes exactly one argument", method.text),
                span,
            });
        };
        let arg = *arg;

        let current = self.load(id)?;
        let rebound = self.ctx.graph.fresh(Polarity::Positive);
        self.merge(rebound, current, span)?;

        let (kind, msg) = match method.text.as_str() {
            "append" => (RecordKind::List, "Can only append to a list."),
            "add" => (RecordKind::Set, "Can only add to a set."),
            "update" => (RecordKind::Dict, "Can only update a dictionary."),
            _ => (RecordKind::List, "Can only extend a list."),
        };
        let shape_error = |msg: &str| InferError::ShapeMismatch {
            msg: msg.to_string(),
            span,
        };

        let target = self
            .ctx
            .graph
            .heads(rebound)
            .iter()
            .find(|h| h.record_kind() == Some(kind))
            .cloned()
            .ok_or_else(|| shape_error(msg))?;
        let values = target
            .field("values")
            .ok_or_else(|| shape_error(msg))?;

        match method.text.as_str() {
            "append" | "add" => self.merge(values, arg, span)?,
            "update" => {
                let source = self
                    .ctx
                    .graph
                    .heads(arg)
                    .iter()
                    .find(|h| h.record_kind() == Some(RecordKind::Dict))
                    .cloned()
                    .ok_or_else(|| shape_error("Can only update a dictionary with a dictionary."))?;
                let (Some(keys), Some(from_keys), Some(from_values)) = (
                    target.field("keys"),
                    source.field("keys"),
                    source.field("values"),
                ) else {
                    return Err(shape_error(msg));
                };
                self.merge(values, from_values, span)?;
                self.merge(keys, from_keys, span)?;
            }
            _ => {
                let source = self
                    .ctx
                    .graph
                    .heads(arg)
                    .iter()
                    .find(|h| h.record_kind().is_some_and(RecordKind::is_container))
                    .cloned()
                    .ok_or_else(|| shape_error("Can only extend a list with an iterable."))?;
                let from = source.field("values").ok_or_else(|| shape_error(msg))?;
                self.merge(values, from, span)?;
            }
        }

        self.store(id, rebound);
        Ok(self.ctx.base(BaseType::None))
    }
}

/// Assignment and loop targets must be plain names.
fn name_target(target: &Expr) -> Result<&Ident, InferError> {
    match target {
        Expr::Name(id) => Ok(id),
        Expr::Unsupported { construct, span } => {
            Err(InferError::not_supported(construct.clone(), *span))
        }
        other => Err(InferError::not_supported(
            format!("assignment to {}", other.kind_name()),
            other.span(),
        )),
    }
}
