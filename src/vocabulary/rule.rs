//! Rule: one immutable symbol-table entry.

use std::fmt;
use std::sync::Arc;

use crate::error::EvalResult;
use crate::value::{NativeFn, Value};

/// Callable stored in a unary-operator rule.
pub type UnaryFn = Arc<dyn Fn(&Value) -> EvalResult<Value> + Send + Sync>;

/// Callable stored in a binary-operator rule.
pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> EvalResult<Value> + Send + Sync>;

/// The symbol classes a vocabulary distinguishes.
///
/// `Variable` never appears inside a vocabulary; it exists so that token
/// kinds and rule kinds share one naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Unary,
    Binary,
    Function,
    Constant,
    Variable,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Unary => "unary operator",
            SymbolKind::Binary => "binary operator",
            SymbolKind::Function => "function",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
        };
        f.write_str(name)
    }
}

/// Associativity of a binary operator in the shunting-yard pop rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Payload of a rule. The variant fixes both the rule's kind and the arity
/// of its callable, so a kind/arity mismatch is unrepresentable.
#[derive(Clone)]
pub enum RuleBody {
    Literal(Value),
    Unary(UnaryFn),
    Binary(BinaryFn),
    Function(NativeFn),
}

impl fmt::Debug for RuleBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleBody::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            RuleBody::Unary(_) => f.write_str("Unary(<native>)"),
            RuleBody::Binary(_) => f.write_str("Binary(<native>)"),
            RuleBody::Function(_) => f.write_str("Function(<native>)"),
        }
    }
}

/// One symbol-table entry: kind, name, callable or literal, priority,
/// associativity, and the builtin flag. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    body: RuleBody,
    priority: i32,
    assoc: Assoc,
    builtin: bool,
}

impl Rule {
    /// A unary operator rule.
    pub fn unary(
        name: impl Into<String>,
        priority: i32,
        f: impl Fn(&Value) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name: name.into(),
            body: RuleBody::Unary(Arc::new(f)),
            priority,
            assoc: Assoc::Left,
            builtin: false,
        }
    }

    /// A binary operator rule. Left-associative unless `right_assoc` is
    /// chained on.
    pub fn binary(
        name: impl Into<String>,
        priority: i32,
        f: impl Fn(&Value, &Value) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name: name.into(),
            body: RuleBody::Binary(Arc::new(f)),
            priority,
            assoc: Assoc::Left,
            builtin: false,
        }
    }

    /// A named function rule. Arguments arrive already spread.
    pub fn function(
        name: impl Into<String>,
        priority: i32,
        f: impl Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name: name.into(),
            body: RuleBody::Function(Arc::new(f)),
            priority,
            assoc: Assoc::Left,
            builtin: false,
        }
    }

    /// A named constant rule.
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule {
            name: name.into(),
            body: RuleBody::Literal(value.into()),
            priority: 0,
            assoc: Assoc::Left,
            builtin: false,
        }
    }

    /// Marks the operator right-associative (`**` is the only stock one).
    pub fn right_assoc(mut self) -> Self {
        self.assoc = Assoc::Right;
        self
    }

    /// Marks the symbol as part of the always-available core set.
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Kind derived from the payload variant.
    pub fn kind(&self) -> SymbolKind {
        match self.body {
            RuleBody::Literal(_) => SymbolKind::Constant,
            RuleBody::Unary(_) => SymbolKind::Unary,
            RuleBody::Binary(_) => SymbolKind::Binary,
            RuleBody::Function(_) => SymbolKind::Function,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &RuleBody {
        &self.body
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn assoc(&self) -> Assoc {
        self.assoc
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The callable of a function rule, `None` for other kinds.
    pub fn callable(&self) -> Option<&NativeFn> {
        match &self.body {
            RuleBody::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The literal of a constant rule, `None` for other kinds.
    pub fn literal(&self) -> Option<&Value> {
        match &self.body {
            RuleBody::Literal(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_payload() {
        let rule = Rule::constant("PI", std::f64::consts::PI);
        assert_eq!(rule.kind(), SymbolKind::Constant);
        assert_eq!(rule.literal(), Some(&Value::Float(std::f64::consts::PI)));
        assert!(rule.callable().is_none());

        let rule = Rule::unary("-", 5, |v| v.neg());
        assert_eq!(rule.kind(), SymbolKind::Unary);
        assert_eq!(rule.priority(), 5);

        let rule = Rule::binary("+", 2, |a, b| a.add(b));
        assert_eq!(rule.kind(), SymbolKind::Binary);
        assert_eq!(rule.assoc(), Assoc::Left);

        let rule = Rule::function("abs", 0, |_| Ok(Value::Null));
        assert_eq!(rule.kind(), SymbolKind::Function);
        assert!(rule.callable().is_some());
    }

    #[test]
    fn test_builder_flags() {
        let rule = Rule::binary("**", 9, |a, b| a.pow(b)).right_assoc();
        assert_eq!(rule.assoc(), Assoc::Right);
        assert!(!rule.is_builtin());

        let rule = Rule::binary("+", 2, |a, b| a.add(b)).builtin();
        assert!(rule.is_builtin());
    }
}
