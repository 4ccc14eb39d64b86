//! vibexpr - a pluggable expression-language engine.
//!
//! Tokenizes a textual infix expression against a `Vocabulary` of
//! operator/function/constant rules, precedence-orders it into a postfix
//! `Expression`, and evaluates, substitutes, partially evaluates, and
//! re-serializes it against runtime-supplied variable bindings.

pub mod error;
pub mod expression;
pub mod fields;
pub mod parser;
pub mod value;
pub mod vocabulary;

pub use error::{Error, EvalError, EvalResult, ParseError, ParseResult};
pub use expression::Expression;
pub use parser::{Parser, Token};
pub use value::{NativeFn, Value, ValueKind};
pub use vocabulary::{Assoc, Rule, RuleBody, SymbolKind, Vocabulary};
