//! The built-in environment, rebuilt into each run's graph.

use super::graph::{Graph, Polarity, StateId};
use super::lattice::{BaseType, Head, RecordKind};
use super::scope::{Scope, Variable};
use biflow_ast::span::Span;

#[derive(Clone, Copy, Debug)]
enum Param {
    Any,
    Base(BaseType),
    Iterable,
}

#[derive(Clone, Copy, Debug)]
enum Ret {
    Base(BaseType),
    Container(RecordKind),
}

use BaseType::{Bool, Float, Int, None as NoneTy, Str};
use Param::Any;

const fn p(b: BaseType) -> Param {
    Param::Base(b)
}

/// Name, parameters, result.
const TABLE: &[(&str, &[Param], Ret)] = &[
    ("print", &[Any], Ret::Base(NoneTy)),
    ("input", &[p(Str)], Ret::Base(Str)),
    ("+", &[p(Float), p(Float)], Ret::Base(Float)),
    ("-", &[p(Float), p(Float)], Ret::Base(Float)),
    ("*", &[p(Float), p(Float)], Ret::Base(Float)),
    ("/", &[p(Float), p(Float)], Ret::Base(Float)),
    ("%", &[p(Float), p(Float)], Ret::Base(Float)),
    ("**", &[p(Float), p(Float)], Ret::Base(Float)),
    ("//", &[p(Float), p(Float)], Ret::Base(Int)),
    ("not", &[p(Bool)], Ret::Base(Bool)),
    ("and", &[p(Bool), p(Bool)], Ret::Base(Bool)),
    ("or", &[p(Bool), p(Bool)], Ret::Base(Bool)),
    ("==", &[Any, Any], Ret::Base(Bool)),
    ("!=", &[Any, Any], Ret::Base(Bool)),
    ("<", &[p(Float), p(Float)], Ret::Base(Bool)),
    ("<=", &[p(Float), p(Float)], Ret::Base(Bool)),
    (">", &[p(Float), p(Float)], Ret::Base(Bool)),
    (">=", &[p(Float), p(Float)], Ret::Base(Bool)),
    ("int", &[Any], Ret::Base(Int)),
    ("str", &[Any], Ret::Base(Str)),
    ("float", &[Any], Ret::Base(Float)),
    ("list", &[], Ret::Container(RecordKind::List)),
    ("dict", &[], Ret::Container(RecordKind::Dict)),
    ("set", &[], Ret::Container(RecordKind::Set)),
    ("bool", &[Any], Ret::Base(Bool)),
    ("chr", &[p(Int)], Ret::Base(Str)),
    ("ord", &[p(Str)], Ret::Base(Int)),
    ("randint", &[p(Int), p(Int)], Ret::Base(Int)),
    ("len", &[Param::Iterable], Ret::Base(Int)),
    ("u-", &[p(Float)], Ret::Base(Float)),
];

/// Names bound by [`install`], in binding order.
pub fn names() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|(name, _, _)| *name)
}

fn signature(graph: &mut Graph, params: &[Param], ret: Ret) -> StateId {
    let params = params
        .iter()
        .map(|param| match param {
            Param::Any => graph.fresh(Polarity::Negative),
            Param::Base(b) => graph.with_base(Polarity::Negative, *b),
            Param::Iterable => graph.container(RecordKind::Iter, Polarity::Negative),
        })
        .collect();
    let result_head = match ret {
        Ret::Base(b) => Head::Base(b),
        Ret::Container(kind) => graph.container_head(kind, Polarity::Positive),
    };
    let result = graph.with_heads(Polarity::Positive, [result_head]);
    graph.with_heads(Polarity::Positive, [Head::function(params, result)])
}

/// Allocates every built-in signature in `graph` and returns their bindings.
pub fn install(graph: &mut Graph) -> Scope {
    let mut scope = Scope::new();
    for (name, params, ret) in TABLE {
        let state = signature(graph, params, *ret);
        scope.add(*name, Variable::new(*name, Span::default(), state));
    }
    scope
}
