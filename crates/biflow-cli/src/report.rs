//! Formatting of inferred bindings.

use anyhow::Result;
use biflow_types::{Binding, Inference};
use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

/// Which bindings a report includes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Selection {
    /// Every binding in the order it was made, not just the final top-level ones.
    pub all: bool,
    /// Prefix the report with the builtin environment.
    pub builtins: bool,
}

pub fn select(inference: &Inference, selection: Selection) -> Vec<Binding> {
    let mut out = Vec::new();
    if selection.builtins {
        out.extend(inference.builtin_bindings());
    }
    if selection.all {
        out.extend(inference.all_bindings());
    } else {
        out.extend(inference.bindings());
    }
    out
}

/// One `(Ln{line} Col{col}) type({name})={ty}` line per binding.
pub fn pretty_line(b: &Binding) -> String {
    format!("(Ln{} Col{}) type({})={}", b.line, b.col, b.name, b.ty)
}

pub fn render(bindings: &[Binding], format: Format) -> Result<String> {
    match format {
        Format::Pretty => {
            let mut out = String::new();
            for b in bindings {
                out.push_str(&pretty_line(b));
                out.push('\n');
            }
            Ok(out)
        }
        Format::Json => Ok(serde_json::to_string_pretty(bindings)? + "\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biflow_types::TypeChecker;

    fn inference(src: &str) -> Inference {
        let module = biflow_parse::parse_str("<test>", src).unwrap();
        TypeChecker::new().check_module(&module)
    }

    #[test]
    fn pretty_lines() {
        let inf = inference("x = 1\ny = 'a'\n");
        let text = render(&select(&inf, Selection::default()), Format::Pretty).unwrap();
        assert_eq!(text, "(Ln1 Col0) type(x)=int\n(Ln2 Col0) type(y)=str\n");
    }

    #[test]
    fn all_includes_shadowed_bindings() {
        let inf = inference("x = 1\nx = 'a'\n");
        let top = select(&inf, Selection::default());
        assert_eq!(top.len(), 1);
        let all = select(
            &inf,
            Selection {
                all: true,
                builtins: false,
            },
        );
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn builtins_come_first() {
        let inf = inference("x = 1\n");
        let bindings = select(
            &inf,
            Selection {
                all: false,
                builtins: true,
            },
        );
        assert_eq!(bindings[0].name, "print");
        assert_eq!(bindings.last().unwrap().name, "x");
    }

    #[test]
    fn json_objects() {
        let inf = inference("x = 1\n");
        let text = render(&select(&inf, Selection::default()), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "name": "x", "line": 1, "col": 0, "ty": "int" }])
        );
    }
}
