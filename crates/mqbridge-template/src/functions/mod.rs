//! The fixed template function vocabulary
//!
//! Functions are resolved by name at compile time into a closed [`Function`]
//! enum; nothing can be registered at runtime. None of them fail: malformed
//! arguments degrade to documented defaults (`"0"`, `"false"`, `null`).

pub mod boolean;
pub mod generate;
pub mod json;
pub mod numeric;

use serde_json::Value;

use crate::render::Datum;

/// A vocabulary function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `now`: current UTC time in RFC 3339
    Now,
    /// `num v`: numeric literal text
    Num,
    /// `bool v`: `"true"` or `"false"`
    Bool,
    /// `toJSON v`: compact JSON text
    ToJson,
    /// `fromJSON s`: parsed JSON value
    FromJson,
    /// `uuid7`: time-ordered UUID text
    Uuid7,
}

impl Function {
    /// Every function in the vocabulary
    pub const ALL: [Function; 6] = [
        Function::Now,
        Function::Num,
        Function::Bool,
        Function::ToJson,
        Function::FromJson,
        Function::Uuid7,
    ];

    /// Resolve a function by its template name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// The name used in template text
    pub fn name(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Num => "num",
            Self::Bool => "bool",
            Self::ToJson => "toJSON",
            Self::FromJson => "fromJSON",
            Self::Uuid7 => "uuid7",
        }
    }

    /// Number of arguments the function takes
    pub fn arity(self) -> usize {
        match self {
            Self::Now | Self::Uuid7 => 0,
            Self::Num | Self::Bool | Self::ToJson | Self::FromJson => 1,
        }
    }

    /// Apply the function. Arity has already been checked by the parser.
    pub(crate) fn call<'a>(self, args: &[Datum<'a>]) -> Datum<'a> {
        let arg = args.first().and_then(Datum::value);
        match self {
            Self::Now => text(generate::now()),
            Self::Uuid7 => text(generate::uuid7()),
            Self::Num => text(numeric::num(arg)),
            Self::Bool => text(boolean::bool(arg).to_string()),
            Self::ToJson => text(json::to_json(arg)),
            Self::FromJson => json::from_json(arg).map_or(Datum::Missing, Datum::Owned),
        }
    }
}

fn text<'a>(s: String) -> Datum<'a> {
    Datum::Owned(Value::String(s))
}
