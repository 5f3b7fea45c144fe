//! Integration tests: whole programs through the parser and the checker.

use biflow_parse::parse_str;
use biflow_types::{Binding, TypeChecker, TypeError};

fn infer(src: &str) -> biflow_types::Inference {
    let module = parse_str("<test>", src).expect("parse failed");
    TypeChecker::new().check_module(&module)
}

fn find<'a>(bindings: &'a [Binding], name: &str) -> &'a Binding {
    bindings
        .iter()
        .find(|b| b.name == name)
        .unwrap_or_else(|| panic!("no binding for {}", name))
}

#[test]
fn accumulator_loop() {
    let src = r#"
total = 0
for i in range(10):
    if i % 2 == 0:
        total = total + i
"#;
    let inf = infer(src);
    assert!(inf.is_ok(), "{:?}", inf.error());
    assert_eq!(inf.type_of("total").as_deref(), Some("int|float"));
}

#[test]
fn word_counts() {
    let src = r#"
def count(words):
    counts = {}
    for w in words:
        counts.update({w: 1})
    return counts

c = count(["a", "b"])
"#;
    let inf = infer(src);
    assert!(inf.is_ok(), "{:?}", inf.error());
    assert_eq!(inf.type_of("c").as_deref(), Some("dict[str,int]"));
}

#[test]
fn list_building_function() {
    let src = r#"
def squares(n):
    out = []
    for i in range(n):
        out.append(i * i)
    return out

s = squares(4)
first = s[0]
"#;
    let inf = infer(src);
    assert!(inf.is_ok(), "{:?}", inf.error());
    assert_eq!(inf.type_of("s").as_deref(), Some("list[float]"));
    assert_eq!(inf.type_of("first").as_deref(), Some("float"));
}

#[test]
fn higher_order_parameter() {
    let src = r#"
def apply(g, x):
    return g(x)

def inc(n):
    return n + 1

r = apply(inc, 2)
"#;
    let inf = infer(src);
    assert!(inf.is_ok(), "{:?}", inf.error());
    assert_eq!(inf.type_of("r").as_deref(), Some("float"));
}

#[test]
fn higher_order_argument_mismatch() {
    let src = r#"
def apply(g, x):
    return g(x)

def inc(n):
    return n + 1

r = apply(inc, "a")
"#;
    let err = infer(src).result().unwrap_err();
    assert_eq!(err.to_string(), "(Ln8 Col4) str is not a subtype of float");
}

#[test]
fn bindings_report_positions() {
    let src = "x = 1\nif x < 2:\n    x = 'a'\n";
    let inf = infer(src);
    let all = inf.all_bindings();
    assert_eq!(all.len(), 2);
    assert_eq!((all[0].line, all[0].col), (1, 0));
    assert_eq!((all[1].line, all[1].col), (3, 4));

    // a binding made in one branch only replaces the outer one
    let top = inf.bindings();
    let x = find(&top, "x");
    assert_eq!((x.line, x.ty.as_str()), (3, "str"));

    let src = "x = 1\nif x < 2:\n    x = 'a'\nelse:\n    x = None\n";
    let top = infer(src).bindings();
    let x = find(&top, "x");
    assert_eq!((x.line, x.ty.as_str()), (3, "str|none"));
}

#[test]
fn unsupported_statement_reports_position() {
    let src = "x = 1\ntry:\n    pass\nexcept:\n    pass\n";
    let err = infer(src).result().unwrap_err();
    match &err {
        TypeError::NotSupported { construct, span } => {
            assert_eq!(construct, "Try");
            assert_eq!(span.line, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn runs_are_independent() {
    let src = "def f(x):\n    return x\na = f(1)\n";
    let first = infer(src);
    let second = infer(src);
    assert_eq!(first.all_bindings(), second.all_bindings());
    assert_eq!(first.graph().len(), second.graph().len());
}

#[test]
fn unknown_callee_keeps_constraints() {
    let src = r#"
def call_pop(xs):
    return xs.pop()

a = call_pop([1])
b = call_pop({"k"})
"#;
    let inf = infer(src);
    assert!(inf.is_ok(), "{:?}", inf.error());
    assert_eq!(inf.type_of("a").as_deref(), Some("int"));
    assert_eq!(inf.type_of("b").as_deref(), Some("str"));
}
