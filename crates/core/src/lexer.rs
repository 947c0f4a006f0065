use crate::error::SyntaxError;
use crate::span::{Position, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords; the parser tells them apart
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Template literal, raw text between the backticks
    Template(String),
    Num(f64),
    Regex {
        pattern: String,
        flags: String,
    },
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semi,
    Comma,
    Colon,
    Dot,
    Ellipsis,
    Question,
    QuestionDot,
    Arrow,
    /// Every other operator (`+`, `===`, `>>>=`, ...)
    Op(&'static str),
    // End of input
    Eof,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self, Token::Op(o) if *o == op)
    }

    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w == word)
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

/// Words that can never name a variable or a bare property accessor.
pub static RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// True when `text` lexes to exactly one identifier token spanning all of it.
pub fn is_identifier_name(text: &str) -> bool {
    match lex(text) {
        Ok(tokens) => {
            tokens.len() == 2
                && tokens[0].span.start == 0
                && tokens[0].span.end == text.len()
                && matches!(&tokens[0].token, Token::Word(w) if !is_reserved_word(w))
        }
        Err(_) => false,
    }
}

// Longest first, so the first prefix match wins.
static OPERATORS: &[(&str, Token)] = &[
    ("...", Token::Ellipsis),
    ("=>", Token::Arrow),
    ("?.", Token::QuestionDot),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    (";", Token::Semi),
    (",", Token::Comma),
    (":", Token::Colon),
    (".", Token::Dot),
];

static OPS: &[&str] = &[
    ">>>=", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "==", "!=", "<=", ">=",
    "&&", "||", "??", "++", "--", "+=", "-=", "*=", "%=", "&=", "|=", "^=", "**", "<<", ">>", "<",
    ">", "+", "-", "*", "%", "&", "|", "^", "!", "~", "=", "@",
];

pub fn lex(src: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut lexer = Lexer::new(src);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'s> {
    src: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    column: u32,
    newline_before: bool,
    tokens: Vec<Spanned>,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 0,
            column: 0,
            newline_before: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.src.len())
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.offset()..].starts_with(s)
    }

    fn push(&mut self, token: Token, start: usize, start_pos: Position) {
        let span = Span::new(start, self.offset(), start_pos, self.position());
        self.tokens.push(Spanned {
            token,
            span,
            newline_before: self.newline_before,
        });
        self.newline_before = false;
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        if self.starts_with("#!") {
            while let Some(c) = self.peek(0) {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
        }

        while let Some(c) = self.peek(0) {
            // Line comment
            if c == '/' && self.peek(1) == Some('/') {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }

            // Block comment
            if c == '/' && self.peek(1) == Some('*') {
                let at = self.position();
                self.bump();
                self.bump();
                loop {
                    match self.peek(0) {
                        None => return Err(SyntaxError::new(at, "unterminated block comment")),
                        Some('*') if self.peek(1) == Some('/') => {
                            self.bump();
                            self.bump();
                            break;
                        }
                        Some(c) => {
                            if c == '\n' {
                                self.newline_before = true;
                            }
                            self.bump();
                        }
                    }
                }
                continue;
            }

            // Whitespace
            if c.is_whitespace() || c == '\u{feff}' {
                if c == '\n' {
                    self.newline_before = true;
                }
                self.bump();
                continue;
            }

            let start = self.offset();
            let start_pos = self.position();

            if c == '"' || c == '\'' {
                let s = self.lex_string(c)?;
                self.push(Token::Str(s), start, start_pos);
                continue;
            }

            if c == '`' {
                let raw = self.lex_template()?;
                self.push(Token::Template(raw), start, start_pos);
                continue;
            }

            if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit()))
            {
                let n = self.lex_number()?;
                self.push(Token::Num(n), start, start_pos);
                continue;
            }

            if is_id_start(c) {
                while self.peek(0).is_some_and(is_id_continue) {
                    self.bump();
                }
                let word = self.src[start..self.offset()].to_string();
                self.push(Token::Word(word), start, start_pos);
                continue;
            }

            if c == '\\' {
                return Err(SyntaxError::new(
                    start_pos,
                    "unicode escapes in identifiers are not supported",
                ));
            }

            if c == '/' {
                if self.regex_allowed() {
                    let (pattern, flags) = self.lex_regex()?;
                    self.push(Token::Regex { pattern, flags }, start, start_pos);
                } else if self.peek(1) == Some('=') {
                    self.bump();
                    self.bump();
                    self.push(Token::Op("/="), start, start_pos);
                } else {
                    self.bump();
                    self.push(Token::Op("/"), start, start_pos);
                }
                continue;
            }

            if let Some(token) = self.lex_punctuation() {
                self.push(token, start, start_pos);
                continue;
            }

            return Err(SyntaxError::new(
                start_pos,
                format!("unexpected character '{}'", c),
            ));
        }

        let end = self.src.len();
        let end_pos = self.position();
        self.tokens.push(Spanned {
            token: Token::Eof,
            span: Span::new(end, end, end_pos, end_pos),
            newline_before: self.newline_before,
        });
        Ok(())
    }

    /// Decide whether a `/` starts a regex literal, from the token before it.
    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.token) {
            None => true,
            Some(Token::Word(w)) => {
                is_reserved_word(w) && !matches!(w.as_str(), "this" | "super" | "null" | "true" | "false")
            }
            Some(Token::Str(_))
            | Some(Token::Template(_))
            | Some(Token::Num(_))
            | Some(Token::Regex { .. })
            | Some(Token::RParen)
            | Some(Token::RBracket)
            | Some(Token::RBrace) => false,
            Some(Token::Op(op)) => !matches!(*op, "++" | "--"),
            _ => true,
        }
    }

    fn lex_punctuation(&mut self) -> Option<Token> {
        // `?.5` is a conditional followed by a number, not optional chaining.
        if self.starts_with("?.") && self.peek(2).is_some_and(|d| d.is_ascii_digit()) {
            self.bump();
            return Some(Token::Question);
        }
        for (text, token) in OPERATORS {
            if self.starts_with(text) {
                for _ in 0..text.chars().count() {
                    self.bump();
                }
                return Some(token.clone());
            }
        }
        if self.peek(0) == Some('?') && !self.starts_with("??") {
            self.bump();
            return Some(Token::Question);
        }
        for op in OPS {
            if self.starts_with(op) {
                for _ in 0..op.len() {
                    self.bump();
                }
                return Some(Token::Op(op));
            }
        }
        None
    }

    fn lex_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let at = self.position();
        self.bump();
        let mut s = String::new();
        loop {
            let c = match self.peek(0) {
                None | Some('\n') => {
                    return Err(SyntaxError::new(at, "unterminated string literal"));
                }
                Some(c) => c,
            };
            self.bump();
            if c == quote {
                return Ok(s);
            }
            if c != '\\' {
                s.push(c);
                continue;
            }
            let esc = self
                .bump()
                .ok_or_else(|| SyntaxError::new(at, "unterminated escape in string"))?;
            match esc {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                'r' => s.push('\r'),
                'b' => s.push('\u{8}'),
                'f' => s.push('\u{c}'),
                'v' => s.push('\u{b}'),
                '0' if !self.peek(0).is_some_and(|d| d.is_ascii_digit()) => s.push('\0'),
                // Line continuation
                '\n' => {}
                '\r' => {
                    if self.peek(0) == Some('\n') {
                        self.bump();
                    }
                }
                'x' => {
                    let ch = self.hex_escape(2, at)?;
                    s.push(ch);
                }
                'u' => {
                    let ch = if self.peek(0) == Some('{') {
                        self.bump();
                        let mut digits = String::new();
                        while let Some(d) = self.peek(0) {
                            if d == '}' {
                                break;
                            }
                            digits.push(d);
                            self.bump();
                        }
                        if self.bump() != Some('}') {
                            return Err(SyntaxError::new(at, "unterminated unicode escape"));
                        }
                        u32::from_str_radix(&digits, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| SyntaxError::new(at, "invalid unicode escape"))?
                    } else {
                        self.hex_escape(4, at)?
                    };
                    s.push(ch);
                }
                other => s.push(other),
            }
        }
    }

    fn hex_escape(&mut self, len: usize, at: Position) -> Result<char, SyntaxError> {
        let mut digits = String::new();
        for _ in 0..len {
            match self.peek(0) {
                Some(d) if d.is_ascii_hexdigit() => {
                    digits.push(d);
                    self.bump();
                }
                _ => return Err(SyntaxError::new(at, "invalid hexadecimal escape")),
            }
        }
        // Lone surrogates have no `char`; keep the string well-formed.
        Ok(u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}'))
    }

    fn lex_template(&mut self) -> Result<String, SyntaxError> {
        let at = self.position();
        self.bump();
        let mut raw = String::new();
        // Brace depth inside `${ ... }` substitutions.
        let mut depth = 0usize;
        loop {
            let c = self
                .peek(0)
                .ok_or_else(|| SyntaxError::new(at, "unterminated template literal"))?;
            if depth == 0 {
                match c {
                    '`' => {
                        self.bump();
                        return Ok(raw);
                    }
                    '\\' => {
                        raw.push(c);
                        self.bump();
                        let next = self
                            .bump()
                            .ok_or_else(|| SyntaxError::new(at, "unterminated template literal"))?;
                        raw.push(next);
                        continue;
                    }
                    '$' if self.peek(1) == Some('{') => {
                        raw.push_str("${");
                        self.bump();
                        self.bump();
                        depth = 1;
                        continue;
                    }
                    _ => {}
                }
            } else {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    '`' => {
                        let inner = self.lex_template()?;
                        raw.push('`');
                        raw.push_str(&inner);
                        raw.push('`');
                        continue;
                    }
                    '"' | '\'' => {
                        let start = self.offset();
                        self.lex_string(c)?;
                        raw.push_str(&self.src[start..self.offset()]);
                        continue;
                    }
                    _ => {}
                }
            }
            raw.push(c);
            self.bump();
        }
    }

    fn lex_number(&mut self) -> Result<f64, SyntaxError> {
        let at = self.position();
        let radix = match (self.peek(0), self.peek(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(d) = self.peek(0) {
                if d == '_' {
                    self.bump();
                } else if d.is_digit(radix) {
                    digits.push(d);
                    self.bump();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(SyntaxError::new(at, "missing digits in numeric literal"));
            }
            u64::from_str_radix(&digits, radix)
                .map(|n| n as f64)
                .map_err(|_| SyntaxError::new(at, format!("invalid numeric literal '{}'", digits)))?
        } else {
            let mut text = String::new();
            self.take_digits(&mut text);
            if self.peek(0) == Some('.') {
                text.push('.');
                self.bump();
                self.take_digits(&mut text);
            }
            if matches!(self.peek(0), Some('e' | 'E')) {
                text.push('e');
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek(0) {
                    text.push(sign);
                    self.bump();
                }
                if !self.peek(0).is_some_and(|d| d.is_ascii_digit()) {
                    return Err(SyntaxError::new(at, "missing exponent in numeric literal"));
                }
                self.take_digits(&mut text);
            }
            if text.starts_with('.') {
                text.insert(0, '0');
            }
            text.parse::<f64>()
                .map_err(|_| SyntaxError::new(at, format!("invalid numeric literal '{}'", text)))?
        };

        // BigInt suffix
        if self.peek(0) == Some('n') {
            self.bump();
        }
        if self.peek(0).is_some_and(is_id_start) {
            return Err(SyntaxError::new(
                at,
                "identifier starts immediately after numeric literal",
            ));
        }
        Ok(value)
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(d) = self.peek(0) {
            if d.is_ascii_digit() {
                text.push(d);
            } else if d != '_' {
                break;
            }
            self.bump();
        }
    }

    fn lex_regex(&mut self) -> Result<(String, String), SyntaxError> {
        let at = self.position();
        self.bump();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let c = match self.peek(0) {
                None | Some('\n') => {
                    return Err(SyntaxError::new(at, "unterminated regular expression"));
                }
                Some(c) => c,
            };
            self.bump();
            match c {
                '\\' => {
                    pattern.push(c);
                    match self.peek(0) {
                        None | Some('\n') => {
                            return Err(SyntaxError::new(at, "unterminated regular expression"));
                        }
                        Some(next) => {
                            pattern.push(next);
                            self.bump();
                        }
                    }
                    continue;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
            pattern.push(c);
        }
        let mut flags = String::new();
        while let Some(f) = self.peek(0) {
            if !is_id_continue(f) {
                break;
            }
            flags.push(f);
            self.bump();
        }
        Ok((pattern, flags))
    }
}

pub fn is_id_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_id_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src)
            .expect("lex should succeed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn member_chain_tokens_carry_columns() {
        let tokens = lex("foo.bar").unwrap();
        assert_eq!(tokens[0].token, Token::Word("foo".into()));
        assert_eq!(tokens[1].token, Token::Dot);
        assert_eq!(tokens[2].token, Token::Word("bar".into()));
        assert_eq!(tokens[2].span.start_pos, Position::new(0, 4));
        assert_eq!(tokens[2].span.end_pos, Position::new(0, 7));
        assert_eq!(tokens[3].token, Token::Eof);
    }

    #[test]
    fn slash_after_identifier_is_division() {
        assert_eq!(
            kinds("a / b"),
            vec![
                Token::Word("a".into()),
                Token::Op("/"),
                Token::Word("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn slash_after_operator_is_regex() {
        let toks = kinds("x = /a[/]b/gi");
        assert_eq!(
            toks[2],
            Token::Regex {
                pattern: "a[/]b".into(),
                flags: "gi".into()
            }
        );
    }

    #[test]
    fn string_escapes_are_resolved() {
        assert_eq!(kinds(r#"'a\nb\x41B\u{43}'"#)[0], Token::Str("a\nbABC".into()));
    }

    #[test]
    fn numbers_in_every_radix() {
        let toks = kinds("0x1F 0o17 0b101 1_000 .5 2e3");
        assert_eq!(
            toks[..6],
            [
                Token::Num(31.0),
                Token::Num(15.0),
                Token::Num(5.0),
                Token::Num(1000.0),
                Token::Num(0.5),
                Token::Num(2000.0)
            ]
        );
    }

    #[test]
    fn template_with_nested_substitution_is_one_token() {
        let toks = kinds("`a ${ {b: `c`}.b } d`");
        assert_eq!(toks[0], Token::Template("a ${ {b: `c`}.b } d".into()));
        assert_eq!(toks[1], Token::Eof);
    }

    #[test]
    fn newline_before_is_tracked_through_block_comments() {
        let tokens = lex("a /*\n*/ b c").unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn compound_operators_lex_longest_first() {
        let toks = kinds("a >>>= b ?. c ?? d => ...e");
        assert!(toks.contains(&Token::Op(">>>=")));
        assert!(toks.contains(&Token::QuestionDot));
        assert!(toks.contains(&Token::Op("??")));
        assert!(toks.contains(&Token::Arrow));
        assert!(toks.contains(&Token::Ellipsis));
    }

    #[test]
    fn unterminated_constructs_are_errors() {
        assert!(lex("'abc").is_err());
        assert!(lex("/* abc").is_err());
        assert!(lex("`abc").is_err());
        assert!(lex("x = /abc").is_err());
        assert!(lex("3in").is_err());
    }

    #[test]
    fn identifier_name_check() {
        assert!(is_identifier_name("foo"));
        assert!(is_identifier_name("$el_2"));
        assert!(!is_identifier_name("0"));
        assert!(!is_identifier_name("foo-bar"));
        assert!(!is_identifier_name("default"));
        assert!(!is_identifier_name(""));
        assert!(!is_identifier_name(" foo"));
    }
}
