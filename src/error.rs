//! Engine error types.

use serde::Serialize;
use thiserror::Error;

use crate::value::ValueKind;

/// Error raised while tokenizing or parsing an expression string.
///
/// Carries the 0-based character column of the offending position so a
/// formula-editing frontend can highlight it.
#[derive(Error, Debug, Clone, Serialize)]
#[error("parse error at column {column}: {message}")]
pub struct ParseError {
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        ParseError {
            column,
            message: message.into(),
        }
    }
}

/// Errors that can occur while evaluating an expression.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Undefined symbol '{0}'")]
    UndefinedSymbol(String),

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Type mismatch: operator '{operator}' is not defined for {operands}")]
    TypeMismatch { operator: String, operands: String },

    #[error("Value of type {kind} is not callable")]
    NotCallable { kind: ValueKind },

    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in '{0}'")]
    Overflow(&'static str),
}

impl EvalError {
    /// Type mismatch for a binary operator.
    pub fn binary_mismatch(operator: &str, lhs: ValueKind, rhs: ValueKind) -> Self {
        EvalError::TypeMismatch {
            operator: operator.to_string(),
            operands: format!("{} and {}", lhs, rhs),
        }
    }

    /// Type mismatch for a unary operator or single-argument function.
    pub fn unary_mismatch(operator: &str, operand: ValueKind) -> Self {
        EvalError::TypeMismatch {
            operator: operator.to_string(),
            operands: operand.to_string(),
        }
    }

    pub fn argument_count(
        function: &str,
        expected: impl Into<String>,
        actual: usize,
    ) -> Self {
        EvalError::ArgumentCount {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }
}

/// Either side of the engine: parse-time or eval-time failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::new(7, "unexpected character '?'");
        assert_eq!(err.to_string(), "parse error at column 7: unexpected character '?'");

        let err = EvalError::UndefinedSymbol("x".to_string());
        assert_eq!(err.to_string(), "Undefined symbol 'x'");

        let err = EvalError::binary_mismatch("+", ValueKind::Int, ValueKind::Str);
        assert_eq!(
            err.to_string(),
            "Type mismatch: operator '+' is not defined for int and str"
        );

        let err = EvalError::argument_count("sin", "1", 3);
        assert_eq!(err.to_string(), "Function 'sin' expects 1 argument(s), got 3");
    }

    #[test]
    fn test_parse_error_serializes_column_and_message() {
        let err = ParseError::new(3, "unexpected ')'");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["column"], 3);
        assert_eq!(json["message"], "unexpected ')'");
    }
}
