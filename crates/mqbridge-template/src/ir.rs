//! Intermediate representation of a parsed template
//!
//! The IR is immutable once built; rendering walks it by shared reference so
//! one compiled template serves any number of concurrent renders.

use serde_json::Value;

use crate::functions::Function;

/// A 1-based line/column position in the template source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    /// Line number, starting at 1
    pub line: usize,
    /// Column number (in characters), starting at 1
    pub column: usize,
}

/// A top-level template node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied to the output
    Text(String),

    /// An `{{ ... }}` action whose result is printed
    Action {
        /// Position of the opening delimiter
        pos: Pos,
        /// The expression to evaluate
        pipeline: Pipeline,
    },
}

/// A sequence of commands joined by `|`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Commands in evaluation order; never empty
    pub commands: Vec<Command>,
}

/// One stage of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Call a vocabulary function. When the command is not the first in its
    /// pipeline, the previous result is appended as the final argument.
    Call {
        /// The function to call
        function: Function,
        /// Explicit arguments
        args: Vec<Operand>,
    },

    /// Evaluate a single operand (only valid as the first command)
    Operand(Operand),
}

/// An argument or standalone value
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Field chain from the document root; empty means the document itself
    Field(Vec<String>),

    /// A string, number or boolean literal
    Literal(Value),

    /// The `nil` keyword
    Nil,

    /// A niladic function used as an argument, e.g. `toJSON now`
    Call(Function),

    /// A parenthesised pipeline, optionally followed by a field chain
    Group {
        /// The nested pipeline
        pipeline: Box<Pipeline>,
        /// Fields accessed on the pipeline's result
        fields: Vec<String>,
    },
}

impl Operand {
    /// Dotted paths of every document field this operand reads
    pub(crate) fn collect_fields(&self, out: &mut Vec<String>) {
        match self {
            Self::Field(chain) if !chain.is_empty() => out.push(chain.join(".")),
            Self::Group { pipeline, .. } => pipeline.collect_fields(out),
            _ => {}
        }
    }
}

impl Pipeline {
    pub(crate) fn collect_fields(&self, out: &mut Vec<String>) {
        for command in &self.commands {
            match command {
                Command::Call { args, .. } => args.iter().for_each(|a| a.collect_fields(out)),
                Command::Operand(operand) => operand.collect_fields(out),
            }
        }
    }
}
