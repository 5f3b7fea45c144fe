use biflow_ast::ast::{CmpOp, Expr, Lit, Operator, Stmt};
use biflow_parse::parse_str;

fn expr(src: &str) -> Expr {
    let m = parse_str("<mem>", src).unwrap();
    match m.body.into_iter().next() {
        Some(Stmt::Expr { expr, .. }) => expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    match expr("1 + 2 * 3") {
        Expr::BinOp {
            op: Operator::Add,
            right,
            ..
        } => assert!(matches!(*right, Expr::BinOp { op: Operator::Mult, .. })),
        other => panic!("{:?}", other),
    }
}

#[test]
fn subtraction_is_left_associative() {
    match expr("a - b - c") {
        Expr::BinOp {
            op: Operator::Sub,
            left,
            ..
        } => assert!(matches!(*left, Expr::BinOp { op: Operator::Sub, .. })),
        other => panic!("{:?}", other),
    }
}

#[test]
fn call_binds_tighter_than_infix() {
    match expr("f(1) + 2") {
        Expr::BinOp { left, .. } => assert!(matches!(*left, Expr::Call { .. })),
        other => panic!("{:?}", other),
    }
}

#[test]
fn method_call_on_attribute() {
    match expr("xs.append(1)") {
        Expr::Call { func, args, .. } => {
            assert_eq!(args.len(), 1);
            match *func {
                Expr::Attribute { value, attr, .. } => {
                    assert_eq!(attr.text, "append");
                    assert!(matches!(*value, Expr::Name(ref id) if id.text == "xs"));
                }
                other => panic!("{:?}", other),
            }
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn subscript_of_call() {
    assert!(matches!(expr("d[k]"), Expr::Subscript { .. }));
    match expr("f()[0]") {
        Expr::Subscript { value, index, .. } => {
            assert!(matches!(*value, Expr::Call { .. }));
            assert!(matches!(*index, Expr::Constant(Lit::Int(0), _)));
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn displays() {
    assert!(matches!(expr("[1, 2, 3,]"), Expr::List { ref elts, .. } if elts.len() == 3));
    assert!(matches!(expr("{1, 2}"), Expr::Set { ref elts, .. } if elts.len() == 2));
    match expr("{'a': 1, 'b': 2}") {
        Expr::Dict { keys, values, .. } => {
            assert_eq!(keys.len(), 2);
            assert_eq!(values.len(), 2);
        }
        other => panic!("{:?}", other),
    }
    assert!(matches!(expr("{}"), Expr::Dict { ref keys, .. } if keys.is_empty()));
}

#[test]
fn literals() {
    assert!(matches!(expr("True"), Expr::Constant(Lit::Bool(true), _)));
    assert!(matches!(expr("None"), Expr::Constant(Lit::None, _)));
    assert!(matches!(expr("..."), Expr::Constant(Lit::Ellipsis, _)));
    assert!(matches!(expr("2j"), Expr::Constant(Lit::Complex(_), _)));
    assert!(matches!(expr("b'x'"), Expr::Constant(Lit::Bytes(_), _)));
    match expr("'ab' \"cd\"") {
        Expr::Constant(Lit::Str(s), _) => assert_eq!(s, "abcd"),
        other => panic!("{:?}", other),
    }
}

#[test]
fn single_comparison() {
    match expr("x >= 1") {
        Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::GtE]),
        other => panic!("{:?}", other),
    }
}

#[test]
fn parenthesised_expression_is_not_a_tuple() {
    assert!(matches!(expr("(1 + 2)"), Expr::BinOp { .. }));
}
