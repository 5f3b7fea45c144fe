use biflow_ast::ast::{Expr, Stmt};
use biflow_parse::parse_str;

#[test]
fn statement_lines_and_columns() {
    let src = "x = 1\n\ndef f(a):\n    return a\n";
    let m = parse_str("<mem>", src).unwrap();
    assert_eq!((m.body[0].span().line, m.body[0].span().col), (1, 0));
    let Stmt::FunctionDef(def) = &m.body[1] else {
        panic!("expected def");
    };
    assert_eq!((def.span.line, def.span.col), (3, 0));
    assert_eq!((def.params[0].span.line, def.params[0].span.col), (3, 6));
    let ret = def.body[0].span();
    assert_eq!((ret.line, ret.col), (4, 4));
}

#[test]
fn assignment_target_position() {
    let m = parse_str("<mem>", "if c:\n    total = 0\n").unwrap();
    let Stmt::If { body, .. } = &m.body[0] else {
        panic!("expected if");
    };
    let Stmt::Assign { targets, .. } = &body[0] else {
        panic!("expected assignment");
    };
    let Expr::Name(id) = &targets[0] else {
        panic!("expected name target");
    };
    assert_eq!((id.span.line, id.span.col), (2, 4));
}

#[test]
fn call_span_ends_at_rparen() {
    let src = "y = foo(1, 2)";
    let m = parse_str("<mem>", src).unwrap();
    let Stmt::Assign { value, .. } = &m.body[0] else {
        panic!("expected assignment");
    };
    let Expr::Call { span, .. } = value else {
        panic!("expected call");
    };
    assert_eq!(span.start, 4);
    assert_eq!(span.end as usize, src.len());
}

#[test]
fn binop_span_covers_both_operands() {
    let src = "a + bb";
    let m = parse_str("<mem>", src).unwrap();
    assert_eq!(m.body[0].span().start, 0);
    assert_eq!(m.body[0].span().end, 6);
}
