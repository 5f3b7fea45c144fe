pub mod span {
    use serde::Serialize;

    /// Byte range plus the 1-based line and 0-based column of `start`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
    pub struct Span {
        pub start: u32,
        pub end: u32,
        pub line: u32,
        pub col: u32,
    }

    impl Span {
        pub fn new(start: u32, end: u32, line: u32, col: u32) -> Self {
            Span {
                start,
                end,
                line,
                col,
            }
        }

        /// Span covering `self` through `other`, positioned at `self`.
        pub fn to(self, other: Span) -> Span {
            Span {
                start: self.start,
                end: other.end.max(self.end),
                line: self.line,
                col: self.col,
            }
        }
    }
}

pub mod ast {
    use super::span::Span;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    pub struct Module {
        pub body: Vec<Stmt>,
        pub span: Span,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct Ident {
        pub text: String,
        pub span: Span,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct FnDef {
        pub name: Ident,
        pub params: Vec<Ident>,
        pub body: Vec<Stmt>,
        pub span: Span,
    }

    #[derive(Debug, Clone, Serialize)]
    pub enum Stmt {
        /// `a = b = value`; targets share one value.
        Assign {
            targets: Vec<Expr>,
            value: Expr,
            span: Span,
        },
        AugAssign {
            target: Expr,
            op: Operator,
            value: Expr,
            span: Span,
        },
        If {
            test: Expr,
            body: Vec<Stmt>,
            orelse: Vec<Stmt>,
            span: Span,
        },
        While {
            test: Expr,
            body: Vec<Stmt>,
            span: Span,
        },
        For {
            target: Expr,
            iter: Expr,
            body: Vec<Stmt>,
            span: Span,
        },
        FunctionDef(FnDef),
        Return {
            value: Option<Expr>,
            span: Span,
        },
        Expr {
            expr: Expr,
            span: Span,
        },
        Pass(Span),
        Break(Span),
        Continue(Span),
        /// A statement outside the supported subset (class, try, with, ...).
        Unsupported {
            construct: String,
            span: Span,
        },
    }

    impl Stmt {
        pub fn span(&self) -> Span {
            match self {
                Stmt::Assign { span, .. }
                | Stmt::AugAssign { span, .. }
                | Stmt::If { span, .. }
                | Stmt::While { span, .. }
                | Stmt::For { span, .. }
                | Stmt::Return { span, .. }
                | Stmt::Expr { span, .. }
                | Stmt::Unsupported { span, .. } => *span,
                Stmt::FunctionDef(def) => def.span,
                Stmt::Pass(span) | Stmt::Break(span) | Stmt::Continue(span) => *span,
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    pub enum Expr {
        Name(Ident),
        Constant(Lit, Span),
        Call {
            func: Box<Expr>,
            args: Vec<Expr>,
            span: Span,
        },
        Attribute {
            value: Box<Expr>,
            attr: Ident,
            span: Span,
        },
        Subscript {
            value: Box<Expr>,
            index: Box<Expr>,
            span: Span,
        },
        /// `left op0 c0 op1 c1 ...`; only single comparisons are typed.
        Compare {
            left: Box<Expr>,
            ops: Vec<CmpOp>,
            comparators: Vec<Expr>,
            span: Span,
        },
        BoolOp {
            op: BoolOperator,
            values: Vec<Expr>,
            span: Span,
        },
        UnaryOp {
            op: UnaryOperator,
            operand: Box<Expr>,
            span: Span,
        },
        BinOp {
            left: Box<Expr>,
            op: Operator,
            right: Box<Expr>,
            span: Span,
        },
        List {
            elts: Vec<Expr>,
            span: Span,
        },
        Set {
            elts: Vec<Expr>,
            span: Span,
        },
        Dict {
            keys: Vec<Expr>,
            values: Vec<Expr>,
            span: Span,
        },
        /// An expression outside the supported subset (lambda, tuple, ...).
        Unsupported {
            construct: String,
            span: Span,
        },
    }

    impl Expr {
        pub fn span(&self) -> Span {
            match self {
                Expr::Name(id) => id.span,
                Expr::Constant(_, span) => *span,
                Expr::Call { span, .. }
                | Expr::Attribute { span, .. }
                | Expr::Subscript { span, .. }
                | Expr::Compare { span, .. }
                | Expr::BoolOp { span, .. }
                | Expr::UnaryOp { span, .. }
                | Expr::BinOp { span, .. }
                | Expr::List { span, .. }
                | Expr::Set { span, .. }
                | Expr::Dict { span, .. }
                | Expr::Unsupported { span, .. } => *span,
            }
        }

        /// Node-kind name, used when a construct is rejected.
        pub fn kind_name(&self) -> &'static str {
            match self {
                Expr::Name(_) => "Name",
                Expr::Constant(..) => "Constant",
                Expr::Call { .. } => "Call",
                Expr::Attribute { .. } => "Attribute",
                Expr::Subscript { .. } => "Subscript",
                Expr::Compare { .. } => "Compare",
                Expr::BoolOp { .. } => "BoolOp",
                Expr::UnaryOp { .. } => "UnaryOp",
                Expr::BinOp { .. } => "BinOp",
                Expr::List { .. } => "List",
                Expr::Set { .. } => "Set",
                Expr::Dict { .. } => "Dict",
                Expr::Unsupported { .. } => "Unsupported",
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    pub enum Lit {
        Int(i64),
        Float(f64),
        Str(String),
        Bool(bool),
        None,
        // parsed but rejected by inference
        Bytes(Vec<u8>),
        Complex(f64),
        Ellipsis,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum Operator {
        Add,
        Sub,
        Mult,
        Div,
        Mod,
        Pow,
        FloorDiv,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum CmpOp {
        Eq,
        NotEq,
        Lt,
        LtE,
        Gt,
        GtE,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum BoolOperator {
        And,
        Or,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum UnaryOperator {
        Not,
        /// `-x`
        Neg,
    }

    impl Operator {
        pub fn builtin_name(self) -> &'static str {
            match self {
                Operator::Add => "+",
                Operator::Sub => "-",
                Operator::Mult => "*",
                Operator::Div => "/",
                Operator::Mod => "%",
                Operator::Pow => "**",
                Operator::FloorDiv => "//",
            }
        }
    }

    impl CmpOp {
        pub fn builtin_name(self) -> &'static str {
            match self {
                CmpOp::Eq => "==",
                CmpOp::NotEq => "!=",
                CmpOp::Lt => "<",
                CmpOp::LtE => "<=",
                CmpOp::Gt => ">",
                CmpOp::GtE => ">=",
            }
        }
    }

    impl BoolOperator {
        pub fn builtin_name(self) -> &'static str {
            match self {
                BoolOperator::And => "and",
                BoolOperator::Or => "or",
            }
        }
    }

    impl UnaryOperator {
        pub fn builtin_name(self) -> &'static str {
            match self {
                UnaryOperator::Not => "not",
                UnaryOperator::Neg => "u-",
            }
        }
    }
}
