//! Caret contextualization: from a buffer and a caret to a completion
//! intent.
//!
//! Only a small slice of the buffer around the caret is tokenized. The
//! slice starts at a line boundary that lies outside any string, template
//! or comment, so a quote or comment opener earlier in the buffer can
//! never leak into it.

use augur_core::lexer::{self, is_reserved_word, Spanned, Token};
use augur_core::{LineIndex, Position};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    /// `foo.ba|`: the last chain segment is partially typed.
    Identifier,
    /// `foo.|`: the chain ends at a dot.
    Property,
    /// `'abc'.|` or `'abc'.to|`: members of a string value.
    String,
    /// `/re/.|`: members of a regular expression.
    Regex,
}

/// What the user is completing.
///
/// For `Identifier` intents the chain ends with the partially typed
/// segment. `Property` chains stop before the trailing dot. `String` and
/// `Regex` chains hold the segments after the literal, the last one
/// partial; right after the literal's dot the chain is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub chain: Vec<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, chain: Vec<String>) -> Self {
        Intent { kind, chain }
    }

    /// The already-typed text that completions replace.
    pub fn prefix(&self) -> &str {
        match self.kind {
            IntentKind::Property => "",
            _ => self.chain.last().map(String::as_str).unwrap_or(""),
        }
    }

    /// The chain with the partial segment always present (possibly
    /// empty), ready for resolution.
    pub fn lookup_chain(&self) -> Vec<String> {
        let mut chain = self.chain.clone();
        if self.kind == IntentKind::Property || chain.is_empty() {
            chain.push(String::new());
        }
        chain
    }
}

/// Classify the caret position in `source`. Returns `None` whenever no
/// completion makes sense there: inside comments, strings, numbers or
/// whitespace, on a caret outside the buffer, or on a tokenization error.
pub fn contextualize(source: &str, caret: Position) -> Option<Intent> {
    let index = LineIndex::new(source);
    let caret_offset = index.offset_of(source, caret)?;
    let slice = slice_around(source, &index, caret_offset)?;
    let text = &source[slice.start..slice.end];

    let tokens = match lexer::lex(text) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::trace!(%err, "caret slice does not tokenize");
            return None;
        }
    };
    classify(text, &tokens, caret_offset - slice.start)
}

// ──────────────────────────────────────────────
// Slicing
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    Quote(char),
    Template,
    Regex { in_class: bool },
}

struct Slice {
    start: usize,
    end: usize,
}

/// Byte range to tokenize: from the last code-state line start at or
/// before the caret to the end of the caret's line, stretched to close
/// any literal or comment still open there.
fn slice_around(source: &str, index: &LineIndex, caret: usize) -> Option<Slice> {
    let mut scanner = Scanner::new();
    let mut start = 0;

    for (i, c) in source[..caret].char_indices() {
        scanner.step(source, i, c);
        if c == '\n' && scanner.state == ScanState::Code {
            start = i + 1;
        }
    }
    if scanner.state != ScanState::Code {
        return None;
    }

    let line_end = index.line_end(index.position_of(source, caret).line)?;
    let mut end = line_end;
    for (i, c) in source[caret..].char_indices() {
        let at = caret + i;
        if at >= line_end && scanner.state == ScanState::Code {
            break;
        }
        scanner.step(source, at, c);
        end = (at + c.len_utf8()).max(line_end);
    }
    Some(Slice { start, end })
}

/// Character-level state machine tracking just enough lexical state to
/// know whether a position is code.
struct Scanner {
    state: ScanState,
    /// Open `${` braces, one counter per enclosing template.
    templates: Vec<usize>,
    prev: Option<char>,
    /// Last non-whitespace code character, for regex detection.
    last_significant: Option<char>,
    escaped: bool,
    /// Second character of a two-character opener (`/*`, `${`).
    skip: bool,
}

impl Scanner {
    fn new() -> Self {
        Scanner {
            state: ScanState::Code,
            templates: Vec::new(),
            prev: None,
            last_significant: None,
            escaped: false,
            skip: false,
        }
    }

    fn step(&mut self, source: &str, at: usize, c: char) {
        if self.skip {
            self.skip = false;
            self.prev = None;
            return;
        }
        let next = source[at + c.len_utf8()..].chars().next();
        match self.state {
            ScanState::Code => self.step_code(c, next),
            ScanState::LineComment => {
                if c == '\n' {
                    self.state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '/' && self.prev == Some('*') {
                    self.state = ScanState::Code;
                }
            }
            ScanState::Quote(quote) => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == quote || c == '\n' {
                    self.close_literal();
                }
            }
            ScanState::Template => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '`' {
                    self.templates.pop();
                    self.close_literal();
                } else if c == '$' && next == Some('{') {
                    if let Some(depth) = self.templates.last_mut() {
                        *depth = 1;
                    }
                    self.state = ScanState::Code;
                    self.last_significant = Some('{');
                    self.skip = true;
                }
            }
            ScanState::Regex { in_class } => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '\n' {
                    // Not a regex after all.
                    self.state = ScanState::Code;
                } else if in_class {
                    if c == ']' {
                        self.state = ScanState::Regex { in_class: false };
                    }
                } else if c == '[' {
                    self.state = ScanState::Regex { in_class: true };
                } else if c == '/' {
                    self.close_literal();
                }
            }
        }
        self.prev = Some(c);
    }

    /// Back to code after a string, template or regex: what follows is an
    /// operator position, like after `)`.
    fn close_literal(&mut self) {
        self.state = ScanState::Code;
        self.last_significant = Some(')');
    }

    fn step_code(&mut self, c: char, next: Option<char>) {
        match c {
            '/' if next == Some('/') => self.state = ScanState::LineComment,
            '/' if next == Some('*') => {
                self.state = ScanState::BlockComment;
                self.skip = true;
                return;
            }
            '/' if self.regex_allowed() => {
                self.state = ScanState::Regex { in_class: false };
                return;
            }
            '\'' | '"' => {
                self.state = ScanState::Quote(c);
                return;
            }
            '`' => {
                self.templates.push(0);
                self.state = ScanState::Template;
                return;
            }
            '{' => {
                if let Some(depth) = self.templates.last_mut() {
                    if *depth > 0 {
                        *depth += 1;
                    }
                }
            }
            '}' => {
                if let Some(depth) = self.templates.last_mut() {
                    if *depth == 1 {
                        *depth = 0;
                        self.state = ScanState::Template;
                        return;
                    } else if *depth > 1 {
                        *depth -= 1;
                    }
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            self.last_significant = Some(c);
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant {
            None => true,
            Some(c) => !(lexer::is_id_continue(c) || matches!(c, ')' | ']' | '}')),
        }
    }
}

// ──────────────────────────────────────────────
// Classification
// ──────────────────────────────────────────────

fn is_dot(token: &Token) -> bool {
    matches!(token, Token::Dot | Token::QuestionDot)
}

fn is_chain_word(word: &str) -> bool {
    word == "this" || !is_reserved_word(word)
}

/// Index of the token under the caret: the first token ending at or
/// after it that also starts before it.
fn token_at(tokens: &[Spanned], caret: usize) -> Option<usize> {
    let idx = tokens.partition_point(|t| t.span.end < caret);
    let token = tokens.get(idx)?;
    if token.token == Token::Eof || token.span.start >= caret {
        return None;
    }
    Some(idx)
}

/// Walk backward from the dot at `dot` through `ident (. ident)*`.
/// Returns the chain in source order and the kind of value it hangs off:
/// `Identifier` for a plain name or `this`, `String` or `Regex` for a
/// literal.
fn chain_before(tokens: &[Spanned], dot: usize) -> Option<(Vec<String>, IntentKind)> {
    let mut chain = Vec::new();
    let mut dot = dot;
    let kind = loop {
        let prev = dot.checked_sub(1)?;
        match &tokens[prev].token {
            Token::Word(w) if is_chain_word(w) => {
                chain.push(w.clone());
                match prev.checked_sub(1) {
                    Some(before) if is_dot(&tokens[before].token) => dot = before,
                    _ => break IntentKind::Identifier,
                }
            }
            Token::Str(_) | Token::Template(_) => break IntentKind::String,
            Token::Regex { .. } => break IntentKind::Regex,
            _ => return None,
        }
    };
    chain.reverse();
    Some((chain, kind))
}

fn classify(text: &str, tokens: &[Spanned], caret: usize) -> Option<Intent> {
    let idx = token_at(tokens, caret)?;
    let token = &tokens[idx];

    match &token.token {
        Token::Dot | Token::QuestionDot => {
            let (mut chain, kind) = chain_before(tokens, idx)?;
            match kind {
                IntentKind::Identifier => Some(Intent::new(IntentKind::Property, chain)),
                _ => {
                    if !chain.is_empty() {
                        chain.push(String::new());
                    }
                    Some(Intent::new(kind, chain))
                }
            }
        }
        Token::Word(_) => {
            let partial = text.get(token.span.start..caret)?.to_owned();
            let (mut chain, kind) = match idx.checked_sub(1) {
                Some(prev) if is_dot(&tokens[prev].token) => chain_before(tokens, prev)?,
                _ => (Vec::new(), IntentKind::Identifier),
            };
            chain.push(partial);
            Some(Intent::new(kind, chain))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_end(source: &str) -> Option<Intent> {
        let index = LineIndex::new(source);
        let caret = index.position_of(source, source.len());
        contextualize(source, caret)
    }

    fn chain(intent: &Intent) -> Vec<&str> {
        intent.chain.iter().map(String::as_str).collect()
    }

    #[test]
    fn identifier_chain_includes_partial_segment() {
        let intent = at_end("var x = 1;\nfoo.bar.ba").unwrap();
        assert_eq!(intent.kind, IntentKind::Identifier);
        assert_eq!(chain(&intent), ["foo", "bar", "ba"]);
        assert_eq!(intent.prefix(), "ba");
    }

    #[test]
    fn partial_token_is_cut_at_the_caret() {
        let intent = contextualize("foo.bar.baz", Position::new(0, 10)).unwrap();
        assert_eq!(chain(&intent), ["foo", "bar", "ba"]);
    }

    #[test]
    fn trailing_dot_is_a_property_intent() {
        let intent = at_end("this.el.").unwrap();
        assert_eq!(intent.kind, IntentKind::Property);
        assert_eq!(chain(&intent), ["this", "el"]);
        assert_eq!(intent.prefix(), "");
        assert_eq!(intent.lookup_chain(), ["this", "el", ""]);
    }

    #[test]
    fn string_and_regex_receivers() {
        let intent = at_end("var s = 'abc'.").unwrap();
        assert_eq!(intent.kind, IntentKind::String);
        assert!(intent.chain.is_empty());
        assert_eq!(intent.lookup_chain(), [""]);

        let intent = at_end("'abc'.toUp").unwrap();
        assert_eq!(intent.kind, IntentKind::String);
        assert_eq!(chain(&intent), ["toUp"]);

        let intent = at_end("x = /ab+/g.").unwrap();
        assert_eq!(intent.kind, IntentKind::Regex);
    }

    #[test]
    fn no_intent_inside_comments_strings_or_whitespace() {
        assert_eq!(at_end("// foo.b"), None);
        assert_eq!(at_end("/* foo.\nbar.b"), None);
        assert_eq!(at_end("var s = 'foo.b"), None);
        assert_eq!(at_end("foo "), None);
        assert_eq!(at_end("1."), None);
        assert_eq!(at_end("foo()."), None);
    }

    #[test]
    fn multiline_literals_before_the_caret_do_not_break_slicing() {
        let src = "var t = `line one\nline ${two}`;\n/* a\n' b */ foo.b";
        let intent = at_end(src).unwrap();
        assert_eq!(chain(&intent), ["foo", "b"]);
    }

    #[test]
    fn caret_outside_buffer_is_none() {
        assert_eq!(contextualize("foo", Position::new(0, 9)), None);
        assert_eq!(contextualize("foo", Position::new(3, 0)), None);
    }

    #[test]
    fn caret_between_dot_and_name_prefers_the_dot() {
        let intent = contextualize("foo.bar", Position::new(0, 4)).unwrap();
        assert_eq!(intent.kind, IntentKind::Property);
        assert_eq!(chain(&intent), ["foo"]);
    }

    #[test]
    fn unterminated_string_after_the_caret_yields_none() {
        assert_eq!(contextualize("foo.b + 'abc", Position::new(0, 5)), None);
    }
}
