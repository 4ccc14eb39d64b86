//! Tokenizer and shunting-yard parser.
//!
//! `Parser` consumes an expression string together with a vocabulary and
//! produces an `Expression` whose token sequence is already in postfix
//! (evaluation) order. Parsing is all-or-nothing: any violation is a
//! `ParseError` carrying the scan column.

pub mod shunting;
pub mod token;

pub use shunting::{Parser, MAX_DEPTH};
pub use token::Token;
