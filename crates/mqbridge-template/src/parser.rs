//! Action parser
//!
//! Builds [`Pipeline`] IR from the tokens of a single action, resolving
//! function names against the fixed vocabulary and checking arity so that
//! every compiled template is executable.

use serde_json::{Number, Value};

use crate::functions::Function;
use crate::ir::{Command, Operand, Pipeline};
use crate::lexer::{Token, TokenKind};

/// Words that introduce control flow or definitions in Go templates
const KEYWORDS: &[&str] = &[
    "if", "else", "end", "range", "with", "define", "template", "block", "break", "continue",
];

/// A parse failure at a byte offset into the template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Byte offset of the offending token
    pub offset: usize,
    /// Description of the problem
    pub message: String,
}

type ParseResult<T> = std::result::Result<T, ParseError>;

fn fail<T>(offset: usize, message: impl Into<String>) -> ParseResult<T> {
    Err(ParseError {
        offset,
        message: message.into(),
    })
}

/// Parser for the tokens of one action
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Offset reported for errors at the end of the action
    end_offset: usize,
}

impl<'t> Parser<'t> {
    /// Create a parser over an action's tokens
    pub fn new(tokens: &'t [Token], end_offset: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_offset,
        }
    }

    /// Parse the whole action as one pipeline
    pub fn parse_action(mut self) -> ParseResult<Pipeline> {
        if self.tokens.is_empty() {
            return fail(self.end_offset, "missing value for command");
        }
        let pipeline = self.parse_pipeline()?;
        if let Some(token) = self.peek() {
            return fail(token.offset, format!("unexpected {} in action", describe(&token.kind)));
        }
        Ok(pipeline)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.end_offset, |t| t.offset)
    }

    fn parse_pipeline(&mut self) -> ParseResult<Pipeline> {
        let mut commands = Vec::new();
        loop {
            let piped = !commands.is_empty();
            commands.push(self.parse_command(piped)?);
            match self.peek() {
                Some(Token {
                    kind: TokenKind::Pipe,
                    ..
                }) => {
                    self.next();
                }
                _ => break,
            }
        }
        Ok(Pipeline { commands })
    }

    fn at_command_end(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            None | Some(TokenKind::Pipe) | Some(TokenKind::RightParen)
        )
    }

    fn parse_command(&mut self, piped: bool) -> ParseResult<Command> {
        let start = self.current_offset();
        if self.at_command_end() {
            return fail(start, "missing value for command");
        }

        let head = self.peek().map(|t| t.kind.clone());
        if let Some(TokenKind::Ident(name)) = head {
            self.next();
            let function = resolve_function(&name, start)?;
            let mut args = Vec::new();
            while !self.at_command_end() {
                args.push(self.parse_operand()?);
            }
            let given = args.len() + usize::from(piped);
            if given != function.arity() {
                return fail(
                    start,
                    format!(
                        "wrong number of args for {}: want {} got {}",
                        function.name(),
                        function.arity(),
                        given
                    ),
                );
            }
            return Ok(Command::Call { function, args });
        }

        if matches!(head, Some(TokenKind::Nil)) {
            return fail(start, "nil is not a command");
        }

        let operand = self.parse_operand()?;
        if !self.at_command_end() {
            return fail(
                self.current_offset(),
                format!("can't give argument to non-function {}", describe_operand(&operand)),
            );
        }
        if piped {
            return fail(
                start,
                format!("can't give argument to non-function {}", describe_operand(&operand)),
            );
        }
        Ok(Command::Operand(operand))
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let offset = self.current_offset();
        let Some(token) = self.next() else {
            return fail(offset, "missing value for command");
        };

        match &token.kind {
            TokenKind::Field(name) => {
                let mut chain = vec![name.clone()];
                chain.extend(self.parse_field_chain());
                Ok(Operand::Field(chain))
            }
            TokenKind::Dot => Ok(Operand::Field(Vec::new())),
            TokenKind::Variable(name) if name.is_empty() => Ok(Operand::Field(self.parse_field_chain())),
            TokenKind::Variable(name) => fail(offset, format!("undefined variable \"${name}\"")),
            TokenKind::Str(s) => Ok(Operand::Literal(Value::String(s.clone()))),
            TokenKind::Number(text) => Ok(Operand::Literal(Value::Number(parse_number(text, offset)?))),
            TokenKind::Bool(b) => Ok(Operand::Literal(Value::Bool(*b))),
            TokenKind::Nil => Ok(Operand::Nil),
            TokenKind::Ident(name) => {
                let function = resolve_function(name, offset)?;
                if function.arity() != 0 {
                    return fail(
                        offset,
                        format!(
                            "wrong number of args for {}: want {} got 0",
                            function.name(),
                            function.arity()
                        ),
                    );
                }
                Ok(Operand::Call(function))
            }
            TokenKind::LeftParen => {
                let pipeline = self.parse_pipeline()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => {}
                    _ => return fail(offset, "unclosed left paren"),
                }
                Ok(Operand::Group {
                    pipeline: Box::new(pipeline),
                    fields: self.parse_field_chain(),
                })
            }
            TokenKind::RightParen => fail(offset, "unexpected right paren"),
            TokenKind::Pipe => fail(offset, "missing value for command"),
        }
    }

    /// Consume `.a.b` tokens written directly after the previous token.
    fn parse_field_chain(&mut self) -> Vec<String> {
        let mut chain = Vec::new();
        while let Some(Token {
            kind: TokenKind::Field(name),
            spaced: false,
            ..
        }) = self.peek()
        {
            chain.push(name.clone());
            self.pos += 1;
        }
        chain
    }
}

fn resolve_function(name: &str, offset: usize) -> ParseResult<Function> {
    if KEYWORDS.contains(&name) {
        return fail(
            offset,
            format!("{name} actions are not supported; rule templates are expressions only"),
        );
    }
    Function::from_name(name).ok_or_else(|| ParseError {
        offset,
        message: format!("function \"{name}\" not defined"),
    })
}

/// Number literals become JSON numbers. Forms JSON cannot spell directly
/// (`+1`, `.5`, `1_000`, `0x1F`) are normalised through integer or float parsing.
fn parse_number(text: &str, offset: usize) -> ParseResult<Number> {
    if let Ok(n) = serde_json::from_str::<Number>(text) {
        return Ok(n);
    }
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned.as_str())),
    };
    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|&(prefix, radix)| digits.strip_prefix(prefix).map(|rest| (rest, radix)));
    if let Some((rest, radix)) = radix
        && let Ok(value) = i64::from_str_radix(rest, radix)
    {
        return Ok(Number::from(if negative { -value } else { value }));
    }
    if let Ok(value) = digits.parse::<i64>() {
        return Ok(Number::from(if negative { -value } else { value }));
    }
    if let Ok(value) = digits.parse::<f64>()
        && let Some(n) = Number::from_f64(if negative { -value } else { value })
    {
        return Ok(n);
    }
    fail(offset, format!("bad number syntax: {text:?}"))
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Field(name) => format!("field .{name}"),
        TokenKind::Dot => "\".\"".to_string(),
        TokenKind::Variable(name) => format!("variable ${name}"),
        TokenKind::Ident(name) => format!("identifier {name}"),
        TokenKind::Str(_) => "string".to_string(),
        TokenKind::Number(text) => format!("number {text}"),
        TokenKind::Bool(b) => b.to_string(),
        TokenKind::Nil => "nil".to_string(),
        TokenKind::Pipe => "\"|\"".to_string(),
        TokenKind::LeftParen => "\"(\"".to_string(),
        TokenKind::RightParen => "right paren".to_string(),
    }
}

fn describe_operand(operand: &Operand) -> String {
    match operand {
        Operand::Field(chain) if chain.is_empty() => ".".to_string(),
        Operand::Field(chain) => format!(".{}", chain.join(".")),
        Operand::Literal(value) => value.to_string(),
        Operand::Nil => "nil".to_string(),
        Operand::Call(function) => function.name().to_string(),
        Operand::Group { .. } => "(pipeline)".to_string(),
    }
}
