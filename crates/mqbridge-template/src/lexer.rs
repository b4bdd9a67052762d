//! Template lexer
//!
//! Lexing happens in two passes. [`split`] cuts the source into literal text
//! and action bodies (handling `{{-`/`-}}` trim markers and comments), then
//! [`tokenize`] turns one action body into tokens for the parser.

use std::ops::Range;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

/// A lexing failure at a byte offset into the template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Byte offset of the problem
    pub offset: usize,
    /// Description of the problem
    pub message: String,
}

impl LexError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A top-level piece of template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, already trimmed according to adjacent trim markers
    Text(String),

    /// An action between delimiters
    Action {
        /// Byte offset of the opening `{{`
        start: usize,
        /// Byte range of the action body (without delimiters or trim markers)
        body: Range<usize>,
    },
}

/// Token kinds inside an action
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `.name`
    Field(String),
    /// A bare `.`
    Dot,
    /// `$` or `$name`
    Variable(String),
    /// A bare identifier (function name or keyword)
    Ident(String),
    /// A decoded string literal
    Str(String),
    /// Number literal text
    Number(String),
    /// `true` or `false`
    Bool(bool),
    /// `nil`
    Nil,
    /// `|`
    Pipe,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
}

/// A token with its position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was lexed
    pub kind: TokenKind,
    /// Byte offset into the template source
    pub offset: usize,
    /// Whether whitespace separated this token from the previous one
    pub spaced: bool,
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Split template source into text and action segments.
pub fn split(source: &str) -> Result<Vec<Segment>, LexError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut trim_next_text = false;

    loop {
        let Some(found) = source[pos..].find(LEFT_DELIM) else {
            let mut text = &source[pos..];
            if trim_next_text {
                text = text.trim_start_matches(is_space);
            }
            if !text.is_empty() {
                segments.push(Segment::Text(text.to_string()));
            }
            return Ok(segments);
        };

        let open = pos + found;
        let mut after = open + LEFT_DELIM.len();
        let mut text = &source[pos..open];
        if trim_next_text {
            text = text.trim_start_matches(is_space);
        }
        let trim_left = bytes.get(after) == Some(&b'-')
            && bytes
                .get(after + 1)
                .is_some_and(|b| is_space(char::from(*b)));
        if trim_left {
            text = text.trim_end_matches(is_space);
            after += 1;
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text.to_string()));
        }

        let inner = after + (source[after..].len() - source[after..].trim_start_matches(is_space).len());
        if source[inner..].starts_with("/*") {
            let (end, trim_right) = scan_comment(source, open, inner)?;
            trim_next_text = trim_right;
            pos = end;
            continue;
        }

        let close = find_close(source, open, after)?;
        let (body_end, trim_right) = strip_right_trim(source, after, close);
        segments.push(Segment::Action {
            start: open,
            body: after..body_end,
        });
        trim_next_text = trim_right;
        pos = close + RIGHT_DELIM.len();
    }
}

/// Returns the offset just past the comment's closing delimiter and whether
/// it carried a right trim marker.
fn scan_comment(source: &str, open: usize, start: usize) -> Result<(usize, bool), LexError> {
    let body = start + 2;
    let Some(end) = source[body..].find("*/") else {
        return Err(LexError::new(open, "unclosed comment"));
    };
    let tail_start = body + end + 2;
    let tail = &source[tail_start..];
    let trimmed = tail.trim_start_matches(is_space);
    let skipped = tail.len() - trimmed.len();
    if trimmed.starts_with(RIGHT_DELIM) {
        return Ok((tail_start + skipped + RIGHT_DELIM.len(), false));
    }
    if skipped > 0 && trimmed.starts_with("-}}") {
        return Ok((tail_start + skipped + 3, true));
    }
    Err(LexError::new(open, "comment ends before closing delimiter"))
}

fn find_close(source: &str, open: usize, from: usize) -> Result<usize, LexError> {
    let bytes = source.as_bytes();
    let mut quote: Option<(u8, usize)> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some((b'"', start)) => match b {
                b'\\' => i += 1,
                b'"' => quote = None,
                b'\n' => return Err(LexError::new(start, "unterminated quoted string")),
                _ => {}
            },
            Some((_, _)) => {
                if b == b'`' {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'`' => quote = Some((b, i)),
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i),
                _ => {}
            },
        }
        i += 1;
    }
    match quote {
        Some((b'"', start)) => Err(LexError::new(start, "unterminated quoted string")),
        Some((_, start)) => Err(LexError::new(start, "unterminated raw quoted string")),
        None => Err(LexError::new(open, "unclosed action")),
    }
}

/// Detect a ` -` trim marker before the closing delimiter.
fn strip_right_trim(source: &str, body_start: usize, close: usize) -> (usize, bool) {
    let body = &source[body_start..close];
    if let Some(rest) = body.strip_suffix('-')
        && rest.ends_with(is_space)
    {
        return (body_start + rest.len(), true);
    }
    (close, false)
}

/// Tokenize one action body.
pub fn tokenize(source: &str, body: Range<usize>) -> Result<Vec<Token>, LexError> {
    let text = &source[body.clone()];
    let base = body.start;
    let mut chars = text.char_indices().peekable();
    let mut tokens = Vec::new();
    let mut spaced = false;

    while let Some(&(i, c)) = chars.peek() {
        let offset = base + i;
        if is_space(c) {
            chars.next();
            spaced = true;
            continue;
        }

        let kind = match c {
            '|' => {
                chars.next();
                TokenKind::Pipe
            }
            '(' => {
                chars.next();
                TokenKind::LeftParen
            }
            ')' => {
                chars.next();
                TokenKind::RightParen
            }
            '"' => {
                chars.next();
                TokenKind::Str(lex_quoted(&mut chars, offset)?)
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, ch)) => value.push(ch),
                        None => {
                            return Err(LexError::new(offset, "unterminated raw quoted string"));
                        }
                    }
                }
                TokenKind::Str(value)
            }
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, n)) if n.is_ascii_digit() => {
                        TokenKind::Number(format!(".{}", take_number(&mut chars)))
                    }
                    Some(&(_, n)) if is_ident_char(n) => {
                        TokenKind::Field(take_while(&mut chars, is_ident_char))
                    }
                    _ => TokenKind::Dot,
                }
            }
            '$' => {
                chars.next();
                TokenKind::Variable(take_while(&mut chars, is_ident_char))
            }
            '-' | '+' | '0'..='9' => {
                chars.next();
                let rest = take_number(&mut chars);
                let literal = format!("{c}{rest}");
                if !literal.chars().any(|ch| ch.is_ascii_digit()) {
                    return Err(LexError::new(offset, format!("bad number syntax: {literal:?}")));
                }
                TokenKind::Number(literal)
            }
            ':' | '=' => {
                return Err(LexError::new(
                    offset,
                    "variable declarations and assignments are not supported",
                ));
            }
            c if is_ident_char(c) => {
                let word = take_while(&mut chars, is_ident_char);
                match word.as_str() {
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    "nil" => TokenKind::Nil,
                    _ => TokenKind::Ident(word),
                }
            }
            other => {
                return Err(LexError::new(
                    offset,
                    format!("unexpected {other:?} in action"),
                ));
            }
        };

        tokens.push(Token {
            kind,
            offset,
            spaced,
        });
        spaced = false;
    }

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn take_while(chars: &mut Chars<'_>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// Number bodies: digits, separators, exponents and signs after exponents.
fn take_number(chars: &mut Chars<'_>) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        let exponent_sign = matches!(c, '+' | '-') && out.ends_with(['e', 'E']);
        if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn lex_quoted(chars: &mut Chars<'_>, start: usize) -> Result<String, LexError> {
    let mut value = String::new();
    loop {
        let Some((i, c)) = chars.next() else {
            return Err(LexError::new(start, "unterminated quoted string"));
        };
        match c {
            '"' => return Ok(value),
            '\n' => return Err(LexError::new(start, "unterminated quoted string")),
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    return Err(LexError::new(start, "unterminated quoted string"));
                };
                let decoded = match esc {
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'a' => '\u{07}',
                    'b' => '\u{08}',
                    'f' => '\u{0C}',
                    'v' => '\u{0B}',
                    'x' => hex_escape(chars, 2, start + i)?,
                    'u' => hex_escape(chars, 4, start + i)?,
                    'U' => hex_escape(chars, 8, start + i)?,
                    '0'..='7' => {
                        let mut code = esc.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match chars.next() {
                                Some((_, d)) if d.is_digit(8) => {
                                    code = code * 8 + d.to_digit(8).unwrap_or(0);
                                }
                                _ => return Err(LexError::new(start + i, "invalid octal escape")),
                            }
                        }
                        char::from_u32(code)
                            .ok_or_else(|| LexError::new(start + i, "invalid octal escape"))?
                    }
                    other => {
                        return Err(LexError::new(
                            start + i,
                            format!("unknown escape sequence \\{other}"),
                        ));
                    }
                };
                value.push(decoded);
            }
            other => value.push(other),
        }
    }
}

fn hex_escape(chars: &mut Chars<'_>, digits: usize, offset: usize) -> Result<char, LexError> {
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|(_, d)| d.to_digit(16))
            .ok_or_else(|| LexError::new(offset, "invalid hex escape"))?;
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or_else(|| LexError::new(offset, "escape is not a valid code point"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(action: &str) -> Vec<TokenKind> {
        tokenize(action, 0..action.len())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_split_text_and_actions() {
        let src = r#"{"id":"{{.x}}"}"#;
        let segments = split(src).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text(r#"{"id":""#.to_string()));
        match &segments[1] {
            Segment::Action { start, body } => {
                assert_eq!(*start, 7);
                assert_eq!(&src[body.clone()], ".x");
            }
            other => panic!("Expected action, got {other:?}"),
        }
        assert_eq!(segments[2], Segment::Text(r#""}"#.to_string()));
    }

    #[test]
    fn test_split_trim_markers() {
        let segments = split("a  \n {{- .x -}} \n b").unwrap();
        assert_eq!(segments[0], Segment::Text("a".to_string()));
        assert_eq!(segments[2], Segment::Text("b".to_string()));
    }

    #[test]
    fn test_negative_number_is_not_a_trim_marker() {
        let src = "x {{-3}}";
        let segments = split(src).unwrap();
        assert_eq!(segments[0], Segment::Text("x ".to_string()));
        match &segments[1] {
            Segment::Action { body, .. } => assert_eq!(&src[body.clone()], "-3"),
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn test_split_drops_comments() {
        let segments = split("a{{/* note */}}b {{- /* trimmed */ -}} c").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("a".to_string()),
                Segment::Text("b".to_string()),
                Segment::Text("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_close_delimiter_inside_string() {
        let src = r#"{{toJSON "}}"}}"#;
        let segments = split(src).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_split_unclosed_action() {
        let err = split("abc {{ .x").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.message, "unclosed action");
    }

    #[test]
    fn test_split_unclosed_comment() {
        let err = split("{{/* never ends }}").unwrap_err();
        assert_eq!(err.message, "unclosed comment");
    }

    #[test]
    fn test_tokenize_fields_and_functions() {
        assert_eq!(
            kinds("num .a.b | toJSON"),
            vec![
                TokenKind::Ident("num".to_string()),
                TokenKind::Field("a".to_string()),
                TokenKind::Field("b".to_string()),
                TokenKind::Pipe,
                TokenKind::Ident("toJSON".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds(r#""a\"bé" `raw\n` 12.5e-3 -7 true nil"#),
            vec![
                TokenKind::Str("a\"bé".to_string()),
                TokenKind::Str("raw\\n".to_string()),
                TokenKind::Number("12.5e-3".to_string()),
                TokenKind::Number("-7".to_string()),
                TokenKind::Bool(true),
                TokenKind::Nil,
            ]
        );
    }

    #[test]
    fn test_tokenize_spacing_flags() {
        let tokens = tokenize("$.a (.b).c", 0..10).unwrap();
        let spaced: Vec<bool> = tokens.iter().map(|t| t.spaced).collect();
        assert_eq!(spaced, vec![false, false, true, false, false, false]);
    }

    #[test]
    fn test_tokenize_rejects_declarations() {
        let err = tokenize("$x := .a", 0..8).unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[test]
    fn test_tokenize_unknown_escape() {
        let src = r#""\q""#;
        let err = tokenize(src, 0..src.len()).unwrap_err();
        assert!(err.message.contains("unknown escape"));
    }
}
