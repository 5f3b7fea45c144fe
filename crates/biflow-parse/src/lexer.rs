use crate::token::{Tok, TokKind};
use biflow_ast::span::Span;
use std::collections::VecDeque;

const TAB_WIDTH: usize = 8;

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    /// Open brackets; newlines and indentation are ignored while > 0.
    depth: u32,
    indents: Vec<usize>,
    at_line_start: bool,
    pending: VecDeque<Tok>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            depth: 0,
            indents: vec![0],
            at_line_start: true,
            pending: VecDeque::new(),
        }
    }

    fn bump(&mut self) -> Option<u8> {
        if self.pos >= self.src.len() {
            None
        } else {
            let b = self.src[self.pos];
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.pos;
            }
            Some(b)
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }
    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }
    fn peek3(&self) -> Option<u8> {
        self.src.get(self.pos + 2).copied()
    }

    fn mark(&self) -> (usize, u32, u32) {
        (self.pos, self.line, (self.pos - self.line_start) as u32)
    }

    fn span(&self, (start, line, col): (usize, u32, u32)) -> Span {
        Span {
            start: start as u32,
            end: self.pos as u32,
            line,
            col,
        }
    }

    fn tok(&self, kind: TokKind, mark: (usize, u32, u32)) -> Tok {
        Tok {
            kind,
            span: self.span(mark),
        }
    }

    fn skip_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
    }

    /// Measure the indentation of a fresh logical line and queue INDENT/DEDENT.
    /// Returns false when the line is blank (nothing to emit).
    fn handle_line_start(&mut self) -> bool {
        let mut width = 0usize;
        loop {
            match self.peek() {
                Some(b' ') => {
                    width += 1;
                    self.bump();
                }
                Some(b'\t') => {
                    width = (width / TAB_WIDTH + 1) * TAB_WIDTH;
                    self.bump();
                }
                Some(b'\x0c') => {
                    width = 0;
                    self.bump();
                }
                _ => break,
            }
        }
        match self.peek() {
            None => return false,
            Some(b'#') => {
                self.skip_comment();
                if self.peek() == Some(b'\n') {
                    self.bump();
                }
                return false;
            }
            Some(b'\r') if self.peek2() == Some(b'\n') => {
                self.bump();
                self.bump();
                return false;
            }
            Some(b'\n') => {
                self.bump();
                return false;
            }
            _ => {}
        }

        self.at_line_start = false;
        let mark = self.mark();
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.pending.push_back(self.tok(TokKind::Indent, mark));
        } else if width < top {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.pending.push_back(self.tok(TokKind::Dedent, mark));
            }
            if self.indents.last().copied() != Some(width) {
                self.pending.push_back(self.tok(
                    TokKind::Error("unindent does not match any outer indentation level".into()),
                    mark,
                ));
            }
        }
        true
    }

    fn skip_inline_ws(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\x0c' | b'\r') => {
                    self.bump();
                }
                Some(b'#') => self.skip_comment(),
                Some(b'\\') if self.peek2() == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                Some(b'\\') if self.peek2() == Some(b'\r') && self.peek3() == Some(b'\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                }
                Some(b'\n') if self.depth > 0 => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn end_of_input(&mut self) -> Tok {
        let mark = self.mark();
        if !self.at_line_start {
            self.at_line_start = true;
            return self.tok(TokKind::Newline, mark);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending.push_back(self.tok(TokKind::Dedent, mark));
        }
        self.pending.push_back(self.tok(TokKind::Eof, mark));
        self.pending
            .pop_front()
            .unwrap_or_else(|| self.tok(TokKind::Eof, mark))
    }

    pub fn next_tok(&mut self) -> Tok {
        loop {
            if let Some(t) = self.pending.pop_front() {
                return t;
            }
            if self.at_line_start && self.depth == 0 {
                if self.peek().is_none() {
                    return self.end_of_input();
                }
                if !self.handle_line_start() {
                    continue;
                }
                if let Some(t) = self.pending.pop_front() {
                    return t;
                }
            }
            self.skip_inline_ws();

            let mark = self.mark();
            let Some(b) = self.peek() else {
                return self.end_of_input();
            };

            if b == b'\n' {
                self.bump();
                self.at_line_start = true;
                return self.tok(TokKind::Newline, mark);
            }

            return self.lex_token(mark);
        }
    }

    fn lex_token(&mut self, mark: (usize, u32, u32)) -> Tok {
        let c = self.peek().unwrap_or(0) as char;

        if c.is_ascii_digit() || (c == '.' && self.peek2().is_some_and(|b| b.is_ascii_digit())) {
            return self.lex_number(mark);
        }

        if c == '"' || c == '\'' {
            return self.lex_string(mark, "");
        }

        if c.is_ascii_alphabetic() || c == '_' || !c.is_ascii() {
            let start = self.pos;
            while let Some(p) = self.peek() {
                if p.is_ascii_alphanumeric() || p == b'_' || !p.is_ascii() {
                    self.bump();
                } else {
                    break;
                }
            }
            let word = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
            if matches!(self.peek(), Some(b'"' | b'\'')) && is_string_prefix(&word) {
                return self.lex_string(mark, &word.to_ascii_lowercase());
            }
            return self.tok(keyword_or_ident(word), mark);
        }

        self.bump();
        let kind = match c {
            '(' => {
                self.depth += 1;
                TokKind::LParen
            }
            '[' => {
                self.depth += 1;
                TokKind::LBracket
            }
            '{' => {
                self.depth += 1;
                TokKind::LBrace
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                TokKind::RParen
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                TokKind::RBracket
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                TokKind::RBrace
            }
            ',' => TokKind::Comma,
            ';' => TokKind::Semicolon,
            '~' => TokKind::Tilde,
            '.' => {
                if self.peek() == Some(b'.') && self.peek2() == Some(b'.') {
                    self.bump();
                    self.bump();
                    TokKind::Ellipsis
                } else {
                    TokKind::Dot
                }
            }
            ':' => self.with_eq(TokKind::Colon, TokKind::OtherAssign(":=")),
            '=' => self.with_eq(TokKind::Eq, TokKind::EqEq),
            '+' => self.with_eq(TokKind::Plus, TokKind::PlusEq),
            '%' => self.with_eq(TokKind::Percent, TokKind::PercentEq),
            '&' => self.with_eq(TokKind::Amp, TokKind::OtherAssign("&=")),
            '|' => self.with_eq(TokKind::Pipe, TokKind::OtherAssign("|=")),
            '^' => self.with_eq(TokKind::Caret, TokKind::OtherAssign("^=")),
            '@' => self.with_eq(TokKind::At, TokKind::OtherAssign("@=")),
            '-' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    TokKind::Arrow
                } else {
                    self.with_eq(TokKind::Minus, TokKind::MinusEq)
                }
            }
            '*' => {
                if self.peek() == Some(b'*') {
                    self.bump();
                    self.with_eq(TokKind::StarStar, TokKind::StarStarEq)
                } else {
                    self.with_eq(TokKind::Star, TokKind::StarEq)
                }
            }
            '/' => {
                if self.peek() == Some(b'/') {
                    self.bump();
                    self.with_eq(TokKind::SlashSlash, TokKind::SlashSlashEq)
                } else {
                    self.with_eq(TokKind::Slash, TokKind::SlashEq)
                }
            }
            '<' => {
                if self.peek() == Some(b'<') {
                    self.bump();
                    self.with_eq(TokKind::Shl, TokKind::OtherAssign("<<="))
                } else {
                    self.with_eq(TokKind::Lt, TokKind::Le)
                }
            }
            '>' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    self.with_eq(TokKind::Shr, TokKind::OtherAssign(">>="))
                } else {
                    self.with_eq(TokKind::Gt, TokKind::Ge)
                }
            }
            '!' if self.peek() == Some(b'=') => {
                self.bump();
                TokKind::NotEq
            }
            other => TokKind::Error(format!("unexpected character {:?}", other)),
        };
        self.tok(kind, mark)
    }

    /// `op` or, when followed by `=`, `op_eq`.
    fn with_eq(&mut self, op: TokKind, op_eq: TokKind) -> TokKind {
        if self.peek() == Some(b'=') {
            self.bump();
            op_eq
        } else {
            op
        }
    }

    fn lex_number(&mut self, mark: (usize, u32, u32)) -> Tok {
        let start = self.pos;

        if self.peek() == Some(b'0') {
            let radix = match self.peek2() {
                Some(b'x' | b'X') => Some(16),
                Some(b'o' | b'O') => Some(8),
                Some(b'b' | b'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                let mut digits = String::new();
                while let Some(p) = self.peek() {
                    if (p as char).is_ascii_alphanumeric() || p == b'_' {
                        if p != b'_' {
                            digits.push(p as char);
                        }
                        self.bump();
                    } else {
                        break;
                    }
                }
                let kind = match i64::from_str_radix(&digits, radix) {
                    Ok(v) => TokKind::Int(v),
                    Err(_) => TokKind::Error(format!(
                        "invalid integer literal {:?}",
                        String::from_utf8_lossy(&self.src[start..self.pos])
                    )),
                };
                return self.tok(kind, mark);
            }
        }

        let mut s = String::new();
        let mut is_float = false;
        self.take_digits(&mut s);
        if self.peek() == Some(b'.') && self.peek2() != Some(b'.') {
            is_float = true;
            s.push('.');
            self.bump();
            self.take_digits(&mut s);
        }
        if matches!(self.peek(), Some(b'e' | b'E'))
            && (self.peek2().is_some_and(|b| b.is_ascii_digit())
                || (matches!(self.peek2(), Some(b'+' | b'-'))
                    && self.peek3().is_some_and(|b| b.is_ascii_digit())))
        {
            is_float = true;
            s.push('e');
            self.bump();
            if let Some(sign @ (b'+' | b'-')) = self.peek() {
                s.push(sign as char);
                self.bump();
            }
            self.take_digits(&mut s);
        }

        let imaginary = matches!(self.peek(), Some(b'j' | b'J'));
        if imaginary {
            self.bump();
        }

        let kind = if imaginary || is_float {
            match s.parse::<f64>() {
                Ok(v) if imaginary => TokKind::Imag(v),
                Ok(v) => TokKind::Float(v),
                Err(_) => TokKind::Error(format!("invalid number literal {:?}", s)),
            }
        } else {
            match s.parse::<i64>() {
                Ok(v) => TokKind::Int(v),
                Err(_) => TokKind::Error(format!("integer literal {} is too large", s)),
            }
        };
        self.tok(kind, mark)
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(p) = self.peek() {
            if p.is_ascii_digit() {
                out.push(p as char);
                self.bump();
            } else if p == b'_' && self.peek2().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, mark: (usize, u32, u32), prefix: &str) -> Tok {
        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let formatted = prefix.contains('f');

        let Some(quote) = self.bump() else {
            return self.tok(TokKind::Error("unterminated string".into()), mark);
        };
        let triple = self.peek() == Some(quote) && self.peek2() == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut buf: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return self.tok(TokKind::Error("unterminated string".into()), mark);
            };
            if b == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek2() == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                buf.push(b);
                continue;
            }
            if b == b'\n' && !triple {
                return self.tok(TokKind::Error("unterminated string".into()), mark);
            }
            if b == b'\\' {
                let Some(esc) = self.bump() else {
                    return self.tok(TokKind::Error("unterminated string".into()), mark);
                };
                if raw {
                    buf.push(b'\\');
                    buf.push(esc);
                    continue;
                }
                match esc {
                    b'\n' => {}
                    b'n' => buf.push(b'\n'),
                    b't' => buf.push(b'\t'),
                    b'r' => buf.push(b'\r'),
                    b'0' => buf.push(0),
                    b'\\' => buf.push(b'\\'),
                    b'\'' => buf.push(b'\''),
                    b'"' => buf.push(b'"'),
                    b'x' => {
                        let hex: Vec<u8> = (0..2).filter_map(|_| self.bump()).collect();
                        match u8::from_str_radix(&String::from_utf8_lossy(&hex), 16) {
                            Ok(v) if bytes || v < 0x80 => buf.push(v),
                            Ok(v) => {
                                let mut tmp = [0u8; 4];
                                buf.extend_from_slice((v as char).encode_utf8(&mut tmp).as_bytes());
                            }
                            Err(_) => {
                                return self
                                    .tok(TokKind::Error("invalid \\x escape".into()), mark)
                            }
                        }
                    }
                    other => {
                        buf.push(b'\\');
                        buf.push(other);
                    }
                }
                continue;
            }
            buf.push(b);
        }

        let kind = if bytes {
            TokKind::Bytes(buf)
        } else if formatted {
            TokKind::FStr(String::from_utf8_lossy(&buf).into_owned())
        } else {
            TokKind::Str(String::from_utf8_lossy(&buf).into_owned())
        };
        self.tok(kind, mark)
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "b" | "f" | "u" | "rb" | "br" | "fr" | "rf"
    )
}

fn keyword_or_ident(word: String) -> TokKind {
    match word.as_str() {
        "False" => TokKind::KwFalse,
        "None" => TokKind::KwNone,
        "True" => TokKind::KwTrue,
        "and" => TokKind::KwAnd,
        "or" => TokKind::KwOr,
        "not" => TokKind::KwNot,
        "in" => TokKind::KwIn,
        "is" => TokKind::KwIs,
        "if" => TokKind::KwIf,
        "elif" => TokKind::KwElif,
        "else" => TokKind::KwElse,
        "while" => TokKind::KwWhile,
        "for" => TokKind::KwFor,
        "def" => TokKind::KwDef,
        "return" => TokKind::KwReturn,
        "pass" => TokKind::KwPass,
        "break" => TokKind::KwBreak,
        "continue" => TokKind::KwContinue,
        "lambda" => TokKind::KwLambda,
        "yield" => TokKind::KwYield,
        "await" => TokKind::KwAwait,
        "class" => TokKind::KwOther("class"),
        "try" => TokKind::KwOther("try"),
        "except" => TokKind::KwOther("except"),
        "finally" => TokKind::KwOther("finally"),
        "with" => TokKind::KwOther("with"),
        "as" => TokKind::KwOther("as"),
        "async" => TokKind::KwOther("async"),
        "del" => TokKind::KwOther("del"),
        "global" => TokKind::KwOther("global"),
        "nonlocal" => TokKind::KwOther("nonlocal"),
        "assert" => TokKind::KwOther("assert"),
        "raise" => TokKind::KwOther("raise"),
        "import" => TokKind::KwOther("import"),
        "from" => TokKind::KwOther("from"),
        _ => TokKind::Ident(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        let mut lex = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lex.next_tok();
            let done = t.kind == TokKind::Eof;
            out.push(t.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        let ks = kinds("if x:\n    y = 1\nz = 2\n");
        assert_eq!(
            ks,
            vec![
                TokKind::KwIf,
                TokKind::Ident("x".into()),
                TokKind::Colon,
                TokKind::Newline,
                TokKind::Indent,
                TokKind::Ident("y".into()),
                TokKind::Eq,
                TokKind::Int(1),
                TokKind::Newline,
                TokKind::Dedent,
                TokKind::Ident("z".into()),
                TokKind::Eq,
                TokKind::Int(2),
                TokKind::Newline,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let ks = kinds("x = 1\n\n   # note\n\ny = 2");
        assert_eq!(ks.iter().filter(|k| **k == TokKind::Newline).count(), 2);
        assert!(!ks.contains(&TokKind::Indent));
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        let ks = kinds("x = [1,\n     2]\n");
        assert_eq!(ks.iter().filter(|k| **k == TokKind::Newline).count(), 1);
        assert!(!ks.contains(&TokKind::Indent));
    }

    #[test]
    fn dedents_flushed_at_eof() {
        let ks = kinds("def f():\n    if x:\n        return 1");
        let dedents = ks.iter().filter(|k| **k == TokKind::Dedent).count();
        assert_eq!(dedents, 2);
        assert_eq!(ks.last(), Some(&TokKind::Eof));
    }

    #[test]
    fn bad_unindent_is_error() {
        let ks = kinds("if x:\n        y = 1\n    z = 2\n");
        assert!(ks.iter().any(|k| matches!(k, TokKind::Error(_))));
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("0x1f")[0], TokKind::Int(31));
        assert_eq!(kinds("1_000")[0], TokKind::Int(1000));
        assert_eq!(kinds("2.5")[0], TokKind::Float(2.5));
        assert_eq!(kinds("1e3")[0], TokKind::Float(1000.0));
        assert_eq!(kinds(".5")[0], TokKind::Float(0.5));
        assert_eq!(kinds("3j")[0], TokKind::Imag(3.0));
        assert!(matches!(kinds("99999999999999999999")[0], TokKind::Error(_)));
    }

    #[test]
    fn strings_and_prefixes() {
        assert_eq!(kinds(r#"'a\tb'"#)[0], TokKind::Str("a\tb".into()));
        assert_eq!(kinds(r#"r'a\tb'"#)[0], TokKind::Str("a\\tb".into()));
        assert_eq!(kinds("b'hi'")[0], TokKind::Bytes(b"hi".to_vec()));
        assert_eq!(kinds("f'{x}'")[0], TokKind::FStr("{x}".into()));
        assert_eq!(
            kinds("\"\"\"two\nlines\"\"\"")[0],
            TokKind::Str("two\nlines".into())
        );
        assert!(matches!(kinds("'open")[0], TokKind::Error(_)));
    }

    #[test]
    fn operators_longest_match() {
        let ks = kinds("a **= b // c -> d != e ...");
        assert!(ks.contains(&TokKind::StarStarEq));
        assert!(ks.contains(&TokKind::SlashSlash));
        assert!(ks.contains(&TokKind::Arrow));
        assert!(ks.contains(&TokKind::NotEq));
        assert!(ks.contains(&TokKind::Ellipsis));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let mut lex = Lexer::new("x = 1\n  \nfoo = 2\n");
        let mut toks = Vec::new();
        loop {
            let t = lex.next_tok();
            if t.kind == TokKind::Eof {
                break;
            }
            toks.push(t);
        }
        let foo = toks
            .iter()
            .find(|t| t.kind == TokKind::Ident("foo".into()))
            .expect("foo token");
        assert_eq!(foo.span.line, 3);
        assert_eq!(foo.span.col, 0);
        let one = toks
            .iter()
            .find(|t| t.kind == TokKind::Int(1))
            .expect("1 token");
        assert_eq!((one.span.line, one.span.col), (1, 4));
    }
}
