//! Template evaluation and value printing

use serde_json::Value;

use crate::error::{Error, Result};
use crate::ir::{Command, Node, Operand, Pipeline};

/// An intermediate value during evaluation
#[derive(Debug, Clone)]
pub(crate) enum Datum<'a> {
    /// No value: a missing key or a failed `fromJSON`
    Missing,
    /// A value borrowed from the input document or the template
    Ref(&'a Value),
    /// A value produced by a function
    Owned(Value),
}

impl<'a> Datum<'a> {
    pub(crate) fn value(&self) -> Option<&Value> {
        match self {
            Self::Missing => None,
            Self::Ref(v) => Some(v),
            Self::Owned(v) => Some(v),
        }
    }

    fn field(self, name: &str) -> std::result::Result<Datum<'a>, String> {
        match self {
            Self::Missing => Err(nil_field(name)),
            Self::Ref(Value::Object(map)) => Ok(map.get(name).map_or(Self::Missing, Self::Ref)),
            Self::Ref(other) => Err(field_error(other, name)),
            Self::Owned(Value::Object(mut map)) => {
                Ok(map.remove(name).map_or(Self::Missing, Self::Owned))
            }
            Self::Owned(other) => Err(field_error(&other, name)),
        }
    }
}

fn nil_field(name: &str) -> String {
    format!("nil pointer evaluating interface {{}}.{name}")
}

fn field_error(value: &Value, name: &str) -> String {
    let type_name = match value {
        Value::Null => return nil_field(name),
        Value::Bool(_) => "bool",
        Value::Number(_) => "json.Number",
        Value::String(_) => "string",
        Value::Array(_) => "[]interface {}",
        Value::Object(_) => "map[string]interface {}",
    };
    format!("can't evaluate field {name} in type {type_name}")
}

/// Evaluate `nodes` against `root`, appending the output to `out`.
pub(crate) fn render<'a>(
    name: &str,
    nodes: &'a [Node],
    root: &'a Value,
    out: &mut Vec<u8>,
) -> Result<()> {
    let eval = Evaluator { root };
    for node in nodes {
        match node {
            Node::Text(text) => out.extend_from_slice(text.as_bytes()),
            Node::Action { pos, pipeline } => {
                let datum = eval
                    .pipeline(pipeline)
                    .map_err(|message| Error::execution(name, *pos, message))?;
                print(&datum, out);
            }
        }
    }
    Ok(())
}

struct Evaluator<'a> {
    root: &'a Value,
}

impl<'a> Evaluator<'a> {
    fn pipeline(&self, pipeline: &'a Pipeline) -> std::result::Result<Datum<'a>, String> {
        let mut result: Option<Datum<'a>> = None;
        for command in &pipeline.commands {
            let next = match command {
                Command::Call { function, args } => {
                    let mut values = args
                        .iter()
                        .map(|arg| self.operand(arg))
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    if let Some(previous) = result.take() {
                        values.push(previous);
                    }
                    function.call(&values)
                }
                Command::Operand(operand) => self.operand(operand)?,
            };
            result = Some(next);
        }
        Ok(result.unwrap_or(Datum::Missing))
    }

    fn operand(&self, operand: &'a Operand) -> std::result::Result<Datum<'a>, String> {
        match operand {
            Operand::Field(chain) => walk(Datum::Ref(self.root), chain),
            Operand::Literal(value) => Ok(Datum::Ref(value)),
            Operand::Nil => Ok(Datum::Owned(Value::Null)),
            Operand::Call(function) => Ok(function.call(&[])),
            Operand::Group { pipeline, fields } => walk(self.pipeline(pipeline)?, fields),
        }
    }
}

fn walk<'a>(start: Datum<'a>, chain: &[String]) -> std::result::Result<Datum<'a>, String> {
    chain.iter().try_fold(start, |datum, name| datum.field(name))
}

fn print(datum: &Datum<'_>, out: &mut Vec<u8>) {
    match datum.value() {
        Some(value) => print_value(value, out),
        None => out.extend_from_slice(b"<no value>"),
    }
}

/// Values print the way Go's `fmt` prints decoded JSON: strings raw,
/// `[a b]` for arrays and `map[k:v]` (sorted keys) for objects.
fn print_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"<nil>"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => out.extend_from_slice(s.as_bytes()),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                print_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.extend_from_slice(b"map[");
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                out.extend_from_slice(key.as_bytes());
                out.push(b':');
                print_value(item, out);
            }
            out.push(b']');
        }
    }
}
