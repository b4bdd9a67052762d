//! Template compiler
//!
//! Compiles template text into a [`CompiledTemplate`]. Compilation does all
//! syntax and vocabulary checking up front; rendering can only fail on the
//! shape of the input document.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::ir::{Node, Pos};
use crate::lexer::{self, Segment};
use crate::parser::Parser;
use crate::render;

/// An immutable, executable template
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    name: String,
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// Template name (the rule id it was compiled for)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed nodes
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against a decoded document, appending to `out`.
    ///
    /// On error `out` may hold partial output; callers reusing buffers must
    /// clear it.
    pub fn render(&self, data: &Value, out: &mut Vec<u8>) -> Result<()> {
        render::render(&self.name, &self.nodes, data, out)
    }

    /// Dotted paths of the input fields the template reads, in order of first use
    pub fn input_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for node in &self.nodes {
            if let Node::Action { pipeline, .. } = node {
                pipeline.collect_fields(&mut fields);
            }
        }
        let mut seen = std::collections::HashSet::new();
        fields.retain(|f| seen.insert(f.clone()));
        fields
    }
}

/// Compile `source` under `name`.
pub fn compile(name: &str, source: &str) -> Result<CompiledTemplate> {
    let index = LineIndex::new(source);
    let segments = lexer::split(source)
        .map_err(|e| Error::compile(name, index.pos(e.offset), e.message))?;

    let mut nodes = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => nodes.push(Node::Text(text)),
            Segment::Action { start, body } => {
                let end = body.end;
                let tokens = lexer::tokenize(source, body)
                    .map_err(|e| Error::compile(name, index.pos(e.offset), e.message))?;
                let pipeline = Parser::new(&tokens, end)
                    .parse_action()
                    .map_err(|e| Error::compile(name, index.pos(e.offset), e.message))?;
                nodes.push(Node::Action {
                    pos: index.pos(start),
                    pipeline,
                });
            }
        }
    }

    Ok(CompiledTemplate {
        name: name.to_string(),
        nodes,
    })
}

/// Byte offset to line/column conversion
struct LineIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn pos(&self, offset: usize) -> Pos {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        Pos {
            line: line.max(1),
            column: column + 1,
        }
    }
}
