//! mqbridge Template Engine
//!
//! Rule templates turn a decoded JSON request into the JSON payload that is
//! published to the broker. The syntax is the action syntax of Go's
//! `text/template`, restricted to expressions over a fixed function
//! vocabulary (`now`, `num`, `bool`, `toJSON`, `fromJSON`, `uuid7`).
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌──────────┐     ┌─────────┐     ┌─────────┐     ┌──────────┐
//! │ Template │────▶│  Lexer  │────▶│ Parser  │────▶│ Compiled │
//! │   text   │     │(segments│     │  (IR)   │     │ Template │
//! └──────────┘     │ tokens) │     └─────────┘     └──────────┘
//!                  └─────────┘                          │ render
//!                                                       ▼
//!                                                  output bytes
//! ```
//!
//! # Example
//!
//! ```rust
//! use mqbridge_template::compile;
//!
//! let template = compile("orders", r#"{"id":"{{.x}}","v":{{num .y}}}"#).unwrap();
//! let input = serde_json::from_str(r#"{"x":"a","y":42}"#).unwrap();
//! let mut out = Vec::new();
//! template.render(&input, &mut out).unwrap();
//! assert_eq!(out, br#"{"id":"a","v":42}"#);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compiler;
pub mod error;
pub mod functions;
pub mod ir;
pub mod lexer;
pub mod parser;
mod render;

pub use compiler::{CompiledTemplate, compile};
pub use error::{Error, Result};
pub use functions::Function;
