//! The parser's output artifact.
//!
//! An `Expression` is a postfix token sequence bound to its vocabulary.
//! It is immutable; `simplify` and `subst` return new instances. This
//! module provides:
//! - evaluation against variable bindings (`eval`)
//! - partial evaluation folding constant subexpressions (`simplify`)
//! - symbolic substitution (`subst`, `subst_text`)
//! - infix re-serialization (`to_infix`, `Display`)
//! - symbol enumeration (`symbols`, `variables`)

pub mod display;
pub mod eval;
pub mod expr;

pub use expr::Expression;
