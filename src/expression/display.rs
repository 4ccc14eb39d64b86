//! Infix re-serialization of the postfix token sequence.

use std::fmt;

use crate::error::{EvalError, EvalResult};
use crate::expression::Expression;
use crate::parser::Token;
use crate::value::Value;

fn pop(stack: &mut Vec<String>) -> EvalResult<String> {
    stack
        .pop()
        .ok_or_else(|| EvalError::MalformedExpression("operand stack underflow".to_string()))
}

fn is_word_like(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Strips one outer parenthesis pair, but only when the opening paren
/// actually matches the closing one (`(a)+(b)` stays intact).
fn strip_outer_parens(text: &str) -> &str {
    if !text.starts_with('(') || !text.ends_with(')') {
        return text;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i + 1 < text.len() {
                    return text;
                }
            }
            _ => {}
        }
    }
    &text[1..text.len() - 1]
}

impl Expression {
    /// Reconstructs an infix textual form by replaying the postfix
    /// sequence over a stack of strings.
    ///
    /// With `dialect` set, the legacy power operator `^` renders as `**`
    /// so the result parses under the infix grammar.
    pub fn to_infix(&self, dialect: bool) -> EvalResult<String> {
        let mut stack: Vec<String> = Vec::new();
        for token in self.tokens() {
            match token {
                // The zero-argument call sentinel renders as an empty
                // argument string so `f()` round-trips.
                Token::Constant(Value::List(items)) if items.is_empty() => {
                    stack.push(String::new());
                }
                Token::Constant(value) => stack.push(value.to_string()),
                Token::Variable(name) => stack.push(name.clone()),
                Token::Unary { name, .. } => {
                    let operand = pop(&mut stack)?;
                    stack.push(if name == "-" {
                        format!("(-{})", operand)
                    } else {
                        format!("{}({})", name, operand)
                    });
                }
                Token::Binary { name, .. } => {
                    let rhs = pop(&mut stack)?;
                    let lhs = pop(&mut stack)?;
                    stack.push(if name == "," {
                        format!("{}, {}", lhs, rhs)
                    } else if name == "^" && dialect {
                        format!("{}**{}", lhs, rhs)
                    } else if is_word_like(name) {
                        format!("({} {} {})", lhs, name, rhs)
                    } else {
                        format!("({}{}{})", lhs, name, rhs)
                    });
                }
                Token::Call { .. } => {
                    let arguments = pop(&mut stack)?;
                    let callee = pop(&mut stack)?;
                    stack.push(format!("{}({})", callee, arguments));
                }
            }
        }
        let text = pop(&mut stack)?;
        if !stack.is_empty() {
            return Err(EvalError::MalformedExpression(format!(
                "{} fragments left on the stack",
                stack.len() + 1
            )));
        }
        Ok(strip_outer_parens(&text).to_string())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_infix(false).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::value::Value;
    use crate::vocabulary::Vocabulary;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn parse(text: &str) -> Expression {
        Parser::default().parse(text).unwrap()
    }

    #[test]
    fn test_rendering() {
        assert_eq!(parse("1 + 2 * 3").to_string(), "1+(2*3)");
        assert_eq!(parse("-x").to_string(), "-x");
        assert_eq!(parse("2 - -x").to_string(), "2-(-x)");
        assert_eq!(parse("concat('a', 'b')").to_string(), "concat('a', 'b')");
        assert_eq!(parse("x and y").to_string(), "x and y");
    }

    #[test]
    fn test_outer_parens_stripped_only_when_matching() {
        assert_eq!(parse("(1 + 2)").to_string(), "1+2");
        assert_eq!(parse("(1 + 2) * (3 + 4)").to_string(), "(1+2)*(3+4)");
    }

    #[test]
    fn test_dialect_renders_power_as_infix_operator() {
        let expr = parse("2 ^ x");
        assert_eq!(expr.to_infix(false).unwrap(), "2^x");
        assert_eq!(expr.to_infix(true).unwrap(), "2**x");
    }

    #[test]
    fn test_empty_call_round_trips() {
        let parser = Parser::new(Arc::new(Vocabulary::host_builtins()));
        let expr = parser.parse("f()").unwrap();
        assert_eq!(expr.to_string(), "f()");
        assert_eq!(parser.parse("f()").unwrap(), parser.parse(&expr.to_string()).unwrap());
    }

    #[test]
    fn test_round_trip_preserves_evaluation() {
        let parser = Parser::new(Arc::new(Vocabulary::infix()));
        let bindings: HashMap<String, Value> = [
            ("x".to_string(), Value::Int(2)),
            ("y".to_string(), Value::Int(3)),
        ]
        .into_iter()
        .collect();

        for text in [
            "2 + 3 * 4",
            "(2 + 3) * 4",
            "2 ** 3 ** 2",
            "x << y + 1",
            "-x ** y",
            "'a' in 'ba'",
        ] {
            let expr = parser.parse(text).unwrap();
            let reparsed = parser.parse(&expr.to_string()).unwrap();
            assert_eq!(
                expr.eval(&bindings).unwrap(),
                reparsed.eval(&bindings).unwrap(),
                "round trip changed {text:?}"
            );
        }
    }

    #[test]
    fn test_string_constants_requote() {
        let expr = parse(r"'it\'s' || ' ok'");
        assert_eq!(expr.to_string(), r"'it\'s'||' ok'");
    }
}
