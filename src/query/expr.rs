//! Expression parsing for inline queries and inline field values.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or       := and ("or" and)*
//! and      := compare ("and" compare)*
//! compare  := additive (("=" | "!=" | "<" | "<=" | ">" | ">=") additive)?
//! additive := term (("+" | "-") term)*
//! term     := unary (("*" | "/" | "%") unary)*
//! unary    := ("-" | "!") unary | postfix
//! postfix  := primary ("." ident | "[" or "]" | "(" args ")")*
//! primary  := number | string | "true" | "false" | "null" | ident
//!           | "[" args "]" | "(" or ")"
//! ```

use std::fmt;

use super::Value;

/// Failure to parse query code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        f.write_str(s)
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    List(Vec<Self>),
    Unary(UnaryOp, Box<Self>),
    Binary(BinaryOp, Box<Self>, Box<Self>),
    Member(Box<Self>, String),
    Index(Box<Self>, Box<Self>),
    Call(String, Vec<Self>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", Value::Number(*n)),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Ident(s) => write!(f, "{s}"),
            Self::Punct(p) => write!(f, "{p}"),
        }
    }
}

const PUNCT: [&str; 18] = [
    "!=", "<=", ">=", "==", "+", "-", "*", "/", "%", "=", "<", ">", "!", "(", ")", "[", "]", ",",
];

fn tokenize(code: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &code[start..i];
            let n = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(format!("invalid number '{text}'"), start))?;
            tokens.push((Token::Number(n), start));
        } else if c == b'"' || c == b'\'' {
            let (s, end) = lex_string(code, i)?;
            tokens.push((Token::Str(s), i));
            i = end;
        } else if c == b'.' {
            tokens.push((Token::Punct("."), i));
            i += 1;
        } else if let Some(p) = PUNCT.iter().find(|p| code[i..].starts_with(**p)) {
            tokens.push((Token::Punct(*p), i));
            i += p.len();
        } else {
            let start = i;
            let rest = &code[i..];
            let len = rest
                .char_indices()
                .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
                .map_or(rest.len(), |(idx, _)| idx);
            if len == 0 {
                let ch = rest.chars().next().unwrap_or('?');
                return Err(ParseError::new(format!("unexpected character '{ch}'"), start));
            }
            tokens.push((Token::Ident(rest[..len].to_string()), start));
            i += len;
        }
    }
    Ok(tokens)
}

fn lex_string(code: &str, start: usize) -> Result<(String, usize), ParseError> {
    let quote = code.as_bytes()[start] as char;
    let mut out = String::new();
    let mut chars = code[start + 1..].char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c if c == quote => return Ok((out, start + 1 + idx + 1)),
            c => out.push(c),
        }
    }
    Err(ParseError::new("unterminated string literal", start))
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(q)) if *q == p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{p}'")))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(format!("{context}, found '{token}'"), self.offset()),
            None => ParseError::new(format!("{context}, found end of input"), self.end),
        }
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.compare()?;
        while self.eat_keyword("and") {
            let right = self.compare()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn compare(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Punct("=" | "==")) => BinaryOp::Eq,
            Some(Token::Punct("!=")) => BinaryOp::Ne,
            Some(Token::Punct("<")) => BinaryOp::Lt,
            Some(Token::Punct("<=")) => BinaryOp::Le,
            Some(Token::Punct(">")) => BinaryOp::Gt,
            Some(Token::Punct(">=")) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = if self.eat_punct("+") {
                BinaryOp::Add
            } else if self.eat_punct("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_punct("*") {
                BinaryOp::Mul
            } else if self.eat_punct("/") {
                BinaryOp::Div
            } else if self.eat_punct("%") {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat_punct("-") {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        if self.eat_punct("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                match self.bump() {
                    Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("expected a field name after '.'"));
                    }
                }
            } else if self.eat_punct("[") {
                let index = self.or()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if matches!(self.peek(), Some(Token::Punct("("))) {
                let Expr::Ident(name) = expr else {
                    return Err(self.unexpected("only named functions can be called"));
                };
                self.pos += 1;
                let args = self.args(")")?;
                expr = Expr::Call(name, args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn args(&mut self, close: &str) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat_punct(close) {
            return Ok(args);
        }
        loop {
            args.push(self.or()?);
            if self.eat_punct(close) {
                return Ok(args);
            }
            self.expect_punct(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name),
            }),
            Some(Token::Punct("[")) => Ok(Expr::List(self.args("]")?)),
            Some(Token::Punct("(")) => {
                let inner = self.or()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(token) => Err(ParseError::new(
                format!("expected an expression, found '{token}'"),
                offset,
            )),
            None => Err(ParseError::new(
                "expected an expression, found end of input",
                offset,
            )),
        }
    }
}

/// Parse inline query code into an expression.
///
/// # Errors
/// Returns a [`ParseError`] when the code is not a single well-formed
/// expression.
pub fn parse_field(code: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(code)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: code.len(),
    };
    let expr = parser.or()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected("unexpected trailing input"));
    }
    Ok(expr)
}

/// Interpret a raw inline field value.
///
/// Numbers, booleans, quoted strings and `[a, b]` lists become typed
/// values, a top-level comma list becomes a list, and anything else stays
/// text.
pub fn parse_inline_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
        && !inner.starts_with('[')
    {
        return Value::List(split_top_level(inner).map(parse_inline_value).collect());
    }
    let parts: Vec<&str> = split_top_level(trimmed).collect();
    if parts.len() > 1 {
        return Value::List(parts.into_iter().map(parse_inline_value).collect());
    }
    parse_scalar(trimmed)
}

fn parse_scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = text.parse::<f64>()
        && n.is_finite()
    {
        return Value::Number(n);
    }
    for quote in ['"', '\''] {
        if text.len() >= 2
            && let Some(inner) = text.strip_prefix(quote).and_then(|s| s.strip_suffix(quote))
        {
            return Value::String(inner.to_string());
        }
    }
    Value::String(text.to_string())
}

// Split on commas that are not inside quotes or brackets.
fn split_top_level(text: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arithmetic_precedence() {
        let expr = parse_field("2 + 2 * 3").unwrap();
        let Expr::Binary(BinaryOp::Add, left, right) = expr else {
            panic!("expected addition at the root");
        };
        assert_eq!(*left, Expr::Literal(Value::Number(2.0)));
        assert!(matches!(*right, Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_parse_member_call_and_index() {
        assert_eq!(
            parse_field("this.rating").unwrap(),
            Expr::Member(Box::new(Expr::Ident("this".into())), "rating".into())
        );
        assert!(matches!(parse_field("length(tags)").unwrap(), Expr::Call(name, args) if name == "length" && args.len() == 1));
        assert!(matches!(parse_field("tags[0]").unwrap(), Expr::Index(_, _)));
    }

    #[test]
    fn test_parse_keywords_are_case_insensitive_for_logic() {
        assert!(matches!(
            parse_field("a AND b").unwrap(),
            Expr::Binary(BinaryOp::And, _, _)
        ));
    }

    #[test]
    fn test_bad_syntax_reports_message_and_offset() {
        let err = parse_field("bad+++syntax").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("expected an expression"));
        assert!(err.to_string().contains("(at offset 4)"));
    }

    #[test]
    fn test_trailing_input_is_an_error() {
        let err = parse_field("1 2").unwrap_err();
        assert!(err.message.starts_with("unexpected trailing input"));
    }

    #[test]
    fn test_empty_code_is_an_error() {
        assert!(parse_field("").is_err());
        assert!(parse_field("(1").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_field("\"abc").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn test_inline_value_typing() {
        assert_eq!(parse_inline_value("[ 5 ]"), Value::List(vec![Value::Number(5.0)]));
        assert_eq!(parse_inline_value("5"), Value::Number(5.0));
        assert_eq!(parse_inline_value("true"), Value::Bool(true));
        assert_eq!(parse_inline_value("\"quoted\""), Value::from("quoted"));
        assert_eq!(
            parse_inline_value("a, b"),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(parse_inline_value("plain text"), Value::from("plain text"));
        assert_eq!(parse_inline_value("[[Some Page]]"), Value::from("[[Some Page]]"));
        assert_eq!(parse_inline_value(""), Value::Null);
    }
}
