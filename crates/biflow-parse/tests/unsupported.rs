//! Constructs outside the typed subset still parse, as `Unsupported` nodes.

use biflow_ast::ast::{Expr, Stmt};
use biflow_parse::parse_str;

fn stmt_construct(src: &str) -> String {
    let m = parse_str("<mem>", src).unwrap();
    match m.body.into_iter().next() {
        Some(Stmt::Unsupported { construct, .. }) => construct,
        other => panic!("expected unsupported statement for {:?}, got {:?}", src, other),
    }
}

fn expr_construct(src: &str) -> String {
    let m = parse_str("<mem>", src).unwrap();
    let value = match m.body.into_iter().next() {
        Some(Stmt::Expr { expr, .. }) => expr,
        Some(Stmt::Assign { value, .. }) => value,
        other => panic!("unexpected statement for {:?}: {:?}", src, other),
    };
    match value {
        Expr::Unsupported { construct, .. } => construct,
        other => panic!("expected unsupported expression for {:?}, got {:?}", src, other),
    }
}

#[test]
fn compound_statements() {
    assert_eq!(stmt_construct("class A(B):\n    x = 1\n"), "ClassDef");
    assert_eq!(
        stmt_construct("try:\n    x = 1\nexcept E as e:\n    pass\nfinally:\n    pass\n"),
        "Try"
    );
    assert_eq!(stmt_construct("with open(f) as g:\n    pass\n"), "With");
    assert_eq!(stmt_construct("async def f():\n    pass\n"), "AsyncFunctionDef");
    assert_eq!(stmt_construct("@dec\ndef f():\n    pass\n"), "decorators");
    assert_eq!(stmt_construct("while x:\n    pass\nelse:\n    pass\n"), "while-else");
    assert_eq!(stmt_construct("for x in y:\n    pass\nelse:\n    pass\n"), "for-else");
}

#[test]
fn simple_statements() {
    assert_eq!(stmt_construct("import os\n"), "Import");
    assert_eq!(stmt_construct("from a import b\n"), "ImportFrom");
    assert_eq!(stmt_construct("del x\n"), "Delete");
    assert_eq!(stmt_construct("global x\n"), "Global");
    assert_eq!(stmt_construct("assert x, 'msg'\n"), "Assert");
    assert_eq!(stmt_construct("raise E()\n"), "Raise");
    assert_eq!(stmt_construct("x: int = 1\n"), "AnnAssign");
    assert_eq!(stmt_construct("x |= 1\n"), "BitOr");
}

#[test]
fn parameter_shapes() {
    assert_eq!(stmt_construct("def f(a, b=1):\n    pass\n"), "default parameters");
    assert_eq!(stmt_construct("def f(*args):\n    pass\n"), "variadic parameters");
    let m = parse_str("<mem>", "def f(a: int) -> int:\n    return a\n").unwrap();
    assert!(matches!(m.body[0], Stmt::FunctionDef(_)));
}

#[test]
fn expressions() {
    assert_eq!(expr_construct("f = lambda x: x\n"), "Lambda");
    assert_eq!(expr_construct("y = a if c else b\n"), "IfExp");
    assert_eq!(expr_construct("y = [x for x in xs if x]\n"), "ListComp");
    assert_eq!(expr_construct("y = {x for x in xs}\n"), "SetComp");
    assert_eq!(expr_construct("y = {k: v for k, v in xs}\n"), "DictComp");
    assert_eq!(expr_construct("y = (x for x in xs)\n"), "GeneratorExp");
    assert_eq!(expr_construct("y = 1, 2\n"), "Tuple");
    assert_eq!(expr_construct("y = ()\n"), "Tuple");
    assert_eq!(expr_construct("y = f'{x}'\n"), "JoinedStr");
    assert_eq!(expr_construct("y = a[1:2]\n"), "Slice");
    assert_eq!(expr_construct("y = a | b\n"), "BitOr");
    assert_eq!(expr_construct("y = ~a\n"), "Invert");
    assert_eq!(expr_construct("y = a is None\n"), "Is");
}

#[test]
fn keyword_arguments_become_unsupported_args() {
    let m = parse_str("<mem>", "f(1, key=2)\n").unwrap();
    let Stmt::Expr { expr: Expr::Call { args, .. }, .. } = &m.body[0] else {
        panic!("expected call");
    };
    assert!(matches!(args[0], Expr::Constant(..)));
    assert!(matches!(
        &args[1],
        Expr::Unsupported { construct, .. } if construct == "keyword"
    ));
}
