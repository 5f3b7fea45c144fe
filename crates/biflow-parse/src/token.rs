use biflow_ast::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    // layout / eof / error
    Eof,
    Newline,
    Indent,
    Dedent,
    /// Lexing failure (bad indentation, unterminated string, ...)
    Error(String),
    // punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis,
    Arrow, // -> in def headers
    At,
    // assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    SlashSlashEq,
    PercentEq,
    StarStarEq,
    /// `&=`, `|=`, `:=` and friends; never typed
    OtherAssign(&'static str),
    // arithmetic
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    // bitwise (parsed, rejected)
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    // comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    // idents / keywords
    Ident(String),
    KwFalse,
    KwNone,
    KwTrue,
    KwAnd,
    KwOr,
    KwNot,
    KwIn,
    KwIs,
    KwIf,
    KwElif,
    KwElse,
    KwWhile,
    KwFor,
    KwDef,
    KwReturn,
    KwPass,
    KwBreak,
    KwContinue,
    KwLambda,
    KwYield,
    KwAwait,
    /// Keywords that only start unsupported statements (class, try, ...)
    KwOther(&'static str),
    // literals
    Int(i64),
    Float(f64),
    Imag(f64),
    Str(String),
    Bytes(Vec<u8>),
    FStr(String),
}

#[derive(Debug, Clone)]
pub struct Tok {
    pub kind: TokKind,
    pub span: Span,
}
