use biflow_parse::{parse_str, MAX_NESTING_DEPTH};

#[test]
fn missing_colon_is_error() {
    let err = parse_str("<mem>", "if x\n    y = 1\n").unwrap_err().to_string();
    assert!(err.contains("expected Colon"), "{}", err);
}

#[test]
fn error_reports_file_line_and_column() {
    let err = parse_str("prog.py", "x = 1\ny = )\n").unwrap_err().to_string();
    assert!(err.starts_with("prog.py:2:4:"), "{}", err);
}

#[test]
fn unexpected_indent() {
    let err = parse_str("<mem>", "x = 1\n    y = 2\n").unwrap_err().to_string();
    assert!(err.contains("unexpected indent"), "{}", err);
}

#[test]
fn missing_indented_block() {
    let err = parse_str("<mem>", "def f():\nx = 1\n").unwrap_err().to_string();
    assert!(err.contains("expected an indented block"), "{}", err);
}

#[test]
fn lexer_errors_surface() {
    let err = parse_str("<mem>", "x = 'open\n").unwrap_err().to_string();
    assert!(err.contains("unterminated string"), "{}", err);
    let err = parse_str("<mem>", "x = 1 $ 2\n").unwrap_err().to_string();
    assert!(err.contains("unexpected character"), "{}", err);
}

#[test]
fn moderate_nesting_is_fine() {
    let depth = (MAX_NESTING_DEPTH / 2) as usize;
    let src = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
    assert!(parse_str("<mem>", &src).is_ok());
}

#[test]
fn deep_block_nesting_is_rejected() {
    let mut src = String::new();
    for level in 0..(MAX_NESTING_DEPTH as usize + 5) {
        src.push_str(&" ".repeat(level));
        src.push_str("if x:\n");
    }
    src.push_str(&" ".repeat(MAX_NESTING_DEPTH as usize + 5));
    src.push_str("pass\n");
    let err = parse_str("<mem>", &src).unwrap_err().to_string();
    assert!(err.contains("nesting depth"), "{}", err);
}

#[test]
fn not_inside_comparison_or_arithmetic_is_error() {
    for src in ["b = a == not a\n", "b = a < not a\n", "b = 1 + not a\n", "b = -not a\n"] {
        let err = parse_str("<mem>", src).unwrap_err().to_string();
        assert!(err.contains("`not` must be parenthesized"), "{}: {}", src, err);
    }
    for src in ["b = not a == a\n", "b = a and not a\n", "b = not not a\n", "b = a == (not a)\n"] {
        assert!(parse_str("<mem>", src).is_ok(), "{}", src);
    }
}
