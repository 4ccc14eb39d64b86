//! Postfix token representation.

use crate::value::Value;

/// One element of an expression's postfix token sequence.
///
/// Operator tokens carry the stack priority they were pushed with
/// (rule priority plus the parenthesis-depth offset); it drives the
/// shunting-yard pop rule and is vestigial after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A literal operand.
    Constant(Value),
    /// A name resolved against bindings and the vocabulary at eval time.
    Variable(String),
    /// A unary operator application.
    Unary { name: String, priority: i32 },
    /// A binary operator application.
    Binary { name: String, priority: i32 },
    /// A function-call marker: pops one argument (or argument list) and
    /// one callable.
    Call { priority: i32 },
}

impl Token {
    /// Stack priority; operand tokens never sit on the operator stack.
    pub(crate) fn priority(&self) -> i32 {
        match self {
            Token::Unary { priority, .. }
            | Token::Binary { priority, .. }
            | Token::Call { priority } => *priority,
            Token::Constant(_) | Token::Variable(_) => 0,
        }
    }
}
