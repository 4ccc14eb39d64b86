//! The infix-operator vocabulary, mirroring common language conventions.

use super::catalog::Vocabulary;
use super::rule::Rule;
use crate::value::Value;

/// Appends `b` to `a` when `a` is already a list, otherwise starts a new
/// two-element list. This is what makes `a, b, c` accumulate arguments.
pub(super) fn bind(a: &Value, b: &Value) -> crate::error::EvalResult<Value> {
    match a {
        Value::List(items) => {
            let mut items = items.clone();
            items.push(b.clone());
            Ok(Value::List(items))
        }
        single => Ok(Value::List(vec![single.clone(), b.clone()])),
    }
}

/// Logical and, returning the deciding operand itself.
pub(super) fn logic_and(a: &Value, b: &Value) -> crate::error::EvalResult<Value> {
    Ok(if a.truthy() { b.clone() } else { a.clone() })
}

/// Logical or, returning the deciding operand itself.
pub(super) fn logic_or(a: &Value, b: &Value) -> crate::error::EvalResult<Value> {
    Ok(if a.truthy() { a.clone() } else { b.clone() })
}

pub(super) fn install(vocab: &mut Vocabulary) {
    // Sequence binding
    vocab.add(Rule::binary(",", 12, bind));

    // Unary operators
    vocab.add(Rule::unary("+", 9, |v| v.pos()));
    vocab.add(Rule::unary("-", 9, |v| v.neg()));
    vocab.add(Rule::unary("~", 9, |v| v.invert()));

    // Binary arithmetic operators
    vocab.add(Rule::binary("**", 9, |a, b| a.pow(b)).right_assoc());
    vocab.add(Rule::binary("@", 8, |a, b| a.dot(b)));
    vocab.add(Rule::binary("/", 8, |a, b| a.div(b)));
    vocab.add(Rule::binary("//", 8, |a, b| a.floor_div(b)));
    vocab.add(Rule::binary("%", 8, |a, b| a.rem(b)));
    vocab.add(Rule::binary("*", 8, |a, b| a.mul(b)));
    vocab.add(Rule::binary("+", 7, |a, b| a.add(b)));
    vocab.add(Rule::binary("-", 7, |a, b| a.sub(b)));

    // Binary bitwise operators
    vocab.add(Rule::binary(">>", 6, |a, b| a.shr(b)));
    vocab.add(Rule::binary("<<", 6, |a, b| a.shl(b)));
    vocab.add(Rule::binary("&", 5, |a, b| a.bit_and(b)));
    vocab.add(Rule::binary("^", 4, |a, b| a.bit_xor(b)));
    vocab.add(Rule::binary("|", 3, |a, b| a.bit_or(b)));

    // Comparisons and containment
    vocab.add(Rule::binary("==", 2, |a, b| Ok(Value::Bool(a.eq_value(b)))));
    vocab.add(Rule::binary("!=", 2, |a, b| Ok(Value::Bool(!a.eq_value(b)))));
    vocab.add(Rule::binary(">", 2, |a, b| a.gt(b)));
    vocab.add(Rule::binary("<", 2, |a, b| a.lt(b)));
    vocab.add(Rule::binary(">=", 2, |a, b| a.ge(b)));
    vocab.add(Rule::binary("<=", 2, |a, b| a.le(b)));
    vocab.add(Rule::binary("in", 2, |a, b| a.contained_in(b)));

    // Boolean operators
    vocab.add(Rule::binary("and", 1, logic_and));
    vocab.add(Rule::binary("or", 0, logic_or));
}

impl Vocabulary {
    /// The infix-operator vocabulary: arithmetic, bitwise, comparison, and
    /// logical operators plus the list-building comma.
    pub fn infix() -> Self {
        let mut vocab = Vocabulary::new();
        install(&mut vocab);
        vocab
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::rule::{Assoc, SymbolKind};

    #[test]
    fn test_multi_character_symbols_come_first() {
        let vocab = Vocabulary::infix();
        let names: Vec<&str> = vocab
            .get(SymbolKind::Binary)
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        let pos = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(pos(">=") < pos(">"));
        assert!(pos("<=") < pos("<"));
        assert!(pos("**") < pos("*"));
        assert!(pos("//") < pos("/"));
        assert!(pos(">>") < pos(">"));
    }

    #[test]
    fn test_only_power_is_right_associative() {
        let vocab = Vocabulary::infix();
        for (name, rule) in vocab.get(SymbolKind::Binary) {
            if name == "**" {
                assert_eq!(rule.assoc(), Assoc::Right);
            } else {
                assert_eq!(rule.assoc(), Assoc::Left);
            }
        }
    }

    #[test]
    fn test_bind_accumulates_lists() {
        let pair = bind(&Value::Int(1), &Value::Int(2)).unwrap();
        assert_eq!(pair, Value::List(vec![Value::Int(1), Value::Int(2)]));

        let triple = bind(&pair, &Value::Int(3)).unwrap();
        assert_eq!(
            triple,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_logic_returns_deciding_operand() {
        assert_eq!(
            logic_and(&Value::Int(1), &Value::Int(2)).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            logic_and(&Value::Int(0), &Value::Int(2)).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            logic_or(&Value::Int(1), &Value::Int(2)).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            logic_or(&Value::Int(0), &Value::Int(2)).unwrap(),
            Value::Int(2)
        );
    }
}
