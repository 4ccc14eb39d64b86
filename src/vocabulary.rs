//! Symbol tables ("vocabularies") driving the parser and evaluator.
//!
//! A `Vocabulary` is an immutable catalog of `Rule`s, each describing one
//! operator, function, or named constant. Three stock vocabularies ship:
//! - `Vocabulary::infix()` - arithmetic/bitwise/comparison/logic operators
//! - `Vocabulary::host_builtins()` - infix plus a curated builtin function set
//! - `Vocabulary::legacy()` - a reduced spreadsheet-like formula grammar
//!
//! Vocabularies are built mutably, then published behind `Arc` and shared
//! across parsers and threads without locking.

pub mod builtins;
pub mod catalog;
pub mod infix;
pub mod legacy;
pub mod rule;

pub use catalog::Vocabulary;
pub use rule::{Assoc, BinaryFn, Rule, RuleBody, SymbolKind, UnaryFn};
