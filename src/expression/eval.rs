//! Evaluation and partial evaluation over the postfix token sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;

use crate::error::{EvalError, EvalResult};
use crate::expression::Expression;
use crate::parser::Token;
use crate::value::Value;
use crate::vocabulary::{RuleBody, SymbolKind};

fn pop(stack: &mut Vec<Value>) -> EvalResult<Value> {
    stack
        .pop()
        .ok_or_else(|| EvalError::MalformedExpression("operand stack underflow".to_string()))
}

impl Expression {
    /// Evaluates the expression against `bindings` in one left-to-right
    /// stack pass.
    ///
    /// A variable resolves, in order, against the bindings, the
    /// vocabulary's function rules (pushing the callable itself, so
    /// functions can be passed as call targets), and the vocabulary's
    /// constant rules.
    pub fn eval(&self, bindings: &HashMap<String, Value>) -> EvalResult<Value> {
        let vocab = self.vocabulary();
        let mut stack: Vec<Value> = Vec::new();
        for token in self.tokens() {
            match token {
                Token::Constant(value) => stack.push(value.clone()),
                Token::Variable(name) => {
                    if let Some(value) = bindings.get(name) {
                        stack.push(value.clone());
                    } else if let Some(f) = vocab
                        .lookup(SymbolKind::Function, name)
                        .and_then(|rule| rule.callable())
                    {
                        stack.push(Value::Func(Arc::clone(f)));
                    } else if let Some(value) = vocab
                        .lookup(SymbolKind::Constant, name)
                        .and_then(|rule| rule.literal())
                    {
                        stack.push(value.clone());
                    } else {
                        return Err(EvalError::UndefinedSymbol(name.clone()));
                    }
                }
                Token::Unary { name, .. } => {
                    let rule = vocab
                        .lookup(SymbolKind::Unary, name)
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))?;
                    let operand = pop(&mut stack)?;
                    match rule.body() {
                        RuleBody::Unary(f) => stack.push(f(&operand)?),
                        _ => {
                            return Err(EvalError::MalformedExpression(format!(
                                "rule '{}' is not a unary operator",
                                name
                            )))
                        }
                    }
                }
                Token::Binary { name, .. } => {
                    let rule = vocab
                        .lookup(SymbolKind::Binary, name)
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))?;
                    let rhs = pop(&mut stack)?;
                    let lhs = pop(&mut stack)?;
                    match rule.body() {
                        RuleBody::Binary(f) => stack.push(f(&lhs, &rhs)?),
                        _ => {
                            return Err(EvalError::MalformedExpression(format!(
                                "rule '{}' is not a binary operator",
                                name
                            )))
                        }
                    }
                }
                Token::Call { .. } => {
                    let argument = pop(&mut stack)?;
                    let callee = pop(&mut stack)?;
                    let Value::Func(f) = callee else {
                        return Err(EvalError::NotCallable {
                            kind: callee.kind(),
                        });
                    };
                    // A list argument spreads as positional arguments;
                    // the empty-list sentinel passes zero.
                    let result = match argument {
                        Value::List(items) => f(&items)?,
                        single => f(&[single])?,
                    };
                    stack.push(result);
                }
            }
        }
        let value = pop(&mut stack)?;
        if !stack.is_empty() {
            return Err(EvalError::MalformedExpression(format!(
                "{} values left on the stack",
                stack.len() + 1
            )));
        }
        Ok(value)
    }

    /// Partial evaluation: folds every subexpression whose operands are
    /// all constants (or variables resolved by `bindings`) into a single
    /// constant token, copying unresolved parts through unchanged.
    ///
    /// Call markers are never folded; errors raised by folding callables
    /// propagate.
    pub fn simplify(&self, bindings: &HashMap<String, Value>) -> EvalResult<Expression> {
        let vocab = self.vocabulary();
        let mut pending: VecDeque<Value> = VecDeque::new();
        let mut tokens: Vec<Token> = Vec::new();

        let flush = |pending: &mut VecDeque<Value>, tokens: &mut Vec<Token>| {
            for value in pending.drain(..) {
                tokens.push(Token::Constant(value));
            }
        };

        for token in self.tokens() {
            match token {
                Token::Constant(value) => pending.push_back(value.clone()),
                Token::Variable(name) if bindings.contains_key(name) => {
                    if let Some(value) = bindings.get(name) {
                        pending.push_back(value.clone());
                    }
                }
                Token::Binary { name, .. } if pending.len() >= 2 => {
                    let rule = vocab
                        .lookup(SymbolKind::Binary, name)
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))?;
                    let (Some(rhs), Some(lhs)) = (pending.pop_back(), pending.pop_back()) else {
                        return Err(EvalError::MalformedExpression(
                            "operand stack underflow".to_string(),
                        ));
                    };
                    match rule.body() {
                        RuleBody::Binary(f) => pending.push_back(f(&lhs, &rhs)?),
                        _ => {
                            return Err(EvalError::MalformedExpression(format!(
                                "rule '{}' is not a binary operator",
                                name
                            )))
                        }
                    }
                }
                Token::Unary { name, .. } if !pending.is_empty() => {
                    let rule = vocab
                        .lookup(SymbolKind::Unary, name)
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))?;
                    let Some(operand) = pending.pop_back() else {
                        return Err(EvalError::MalformedExpression(
                            "operand stack underflow".to_string(),
                        ));
                    };
                    match rule.body() {
                        RuleBody::Unary(f) => pending.push_back(f(&operand)?),
                        _ => {
                            return Err(EvalError::MalformedExpression(format!(
                                "rule '{}' is not a unary operator",
                                name
                            )))
                        }
                    }
                }
                other => {
                    flush(&mut pending, &mut tokens);
                    tokens.push(other.clone());
                }
            }
        }
        flush(&mut pending, &mut tokens);

        if tokens.len() < self.tokens().len() {
            debug!(
                "simplify folded {} tokens down to {}",
                self.tokens().len(),
                tokens.len()
            );
        }
        Ok(Expression::new(tokens, Arc::clone(vocab)))
    }
}
