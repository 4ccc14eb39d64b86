//! Runtime values computed by the engine.
//!
//! `Value` is what expressions evaluate to and what callers supply as
//! variable bindings. Operator rules in a vocabulary dispatch to the
//! methods here; all of them report `EvalError` instead of panicking.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{EvalError, EvalResult};

/// Native callable stored in FUNCTION rules and passable as a value.
///
/// Arguments arrive already spread: `f(a, b)` invokes with two elements.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync>;

/// Names a value variant for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Func,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Func => "function",
        };
        f.write_str(name)
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Func(NativeFn),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Func(_) => ValueKind::Func,
        }
    }

    /// Truthiness used by `and`/`or` and the legacy `iif`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Func(_) => true,
        }
    }

    /// Numeric view, promoting `Int` to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// String content for concatenation-style coercions (`str`, `concat`).
    pub fn coerce_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    // Arithmetic operators

    pub fn add(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or(EvalError::Overflow("+")),
            (Value::Str(a), Value::Str(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::Str(s))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::List(items))
            }
            _ => self.float_binary(rhs, "+", |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or(EvalError::Overflow("-")),
            _ => self.float_binary(rhs, "-", |a, b| a - b),
        }
    }

    pub fn mul(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or(EvalError::Overflow("*")),
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                Ok(Value::Str(s.repeat((*n).max(0) as usize)))
            }
            _ => self.float_binary(rhs, "*", |a, b| a * b),
        }
    }

    /// True division. Always yields `Float`; zero divisors are errors.
    pub fn div(&self, rhs: &Value) -> EvalResult<Value> {
        let (a, b) = self.float_operands(rhs, "/")?;
        if b == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Value::Float(a / b))
    }

    /// Floor division: rounds toward negative infinity, `Int` stays `Int`.
    pub fn floor_div(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                let q = a.checked_div(*b).ok_or(EvalError::Overflow("//"))?;
                let r = a % b;
                if r != 0 && (r < 0) != (*b < 0) {
                    Ok(Value::Int(q - 1))
                } else {
                    Ok(Value::Int(q))
                }
            }
            _ => {
                let (a, b) = self.float_operands(rhs, "//")?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                // Quotient via the remainder, so `1 // 0.2` floors to 4.0
                // instead of riding the rounded 1.0/0.2 == 5.0 quotient.
                let m = a % b;
                let mut d = (a - m) / b;
                if m != 0.0 && (m < 0.0) != (b < 0.0) {
                    d -= 1.0;
                }
                let floored = d.floor();
                Ok(Value::Float(if d - floored > 0.5 {
                    floored + 1.0
                } else {
                    floored
                }))
            }
        }
    }

    /// Modulo taking the sign of the divisor.
    pub fn rem(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                let r = a.checked_rem(*b).ok_or(EvalError::Overflow("%"))?;
                if r != 0 && (r < 0) != (*b < 0) {
                    Ok(Value::Int(r + b))
                } else {
                    Ok(Value::Int(r))
                }
            }
            _ => {
                let (a, b) = self.float_operands(rhs, "%")?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    Ok(Value::Float(r + b))
                } else {
                    Ok(Value::Float(r))
                }
            }
        }
    }

    /// Power. Non-negative integer exponents stay `Int`; everything else
    /// goes through `f64`.
    pub fn pow(&self, rhs: &Value) -> EvalResult<Value> {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            if *b >= 0 {
                let exp = u32::try_from(*b).map_err(|_| EvalError::Overflow("**"))?;
                return a.checked_pow(exp).map(Value::Int).ok_or(EvalError::Overflow("**"));
            }
        }
        let (a, b) = self.float_operands(rhs, "**")?;
        if a == 0.0 && b < 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Value::Float(a.powf(b)))
    }

    /// Dot product of two equal-length numeric lists.
    pub fn dot(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Err(EvalError::TypeMismatch {
                        operator: "@".to_string(),
                        operands: "lists of unequal length".to_string(),
                    });
                }
                let mut acc = Value::Int(0);
                for (x, y) in a.iter().zip(b.iter()) {
                    acc = acc.add(&x.mul(y)?)?;
                }
                Ok(acc)
            }
            _ => Err(EvalError::binary_mismatch("@", self.kind(), rhs.kind())),
        }
    }

    // Unary operators

    /// Unary minus.
    pub fn neg(&self) -> EvalResult<Value> {
        match self {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow("-")),
            Value::Float(x) => Ok(Value::Float(-x)),
            _ => Err(EvalError::unary_mismatch("-", self.kind())),
        }
    }

    /// Unary plus: identity on numbers.
    pub fn pos(&self) -> EvalResult<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(EvalError::unary_mismatch("+", self.kind())),
        }
    }

    /// Bitwise complement.
    pub fn invert(&self) -> EvalResult<Value> {
        match self {
            Value::Int(n) => Ok(Value::Int(!n)),
            _ => Err(EvalError::unary_mismatch("~", self.kind())),
        }
    }

    // Bitwise operators (Int only)

    pub fn bit_and(&self, rhs: &Value) -> EvalResult<Value> {
        self.int_binary(rhs, "&", |a, b| Ok(a & b))
    }

    pub fn bit_xor(&self, rhs: &Value) -> EvalResult<Value> {
        self.int_binary(rhs, "^", |a, b| Ok(a ^ b))
    }

    pub fn bit_or(&self, rhs: &Value) -> EvalResult<Value> {
        self.int_binary(rhs, "|", |a, b| Ok(a | b))
    }

    pub fn shl(&self, rhs: &Value) -> EvalResult<Value> {
        self.int_binary(rhs, "<<", |a, b| {
            let n = Self::shift_count("<<", b)?;
            a.checked_shl(n).ok_or(EvalError::Overflow("<<"))
        })
    }

    pub fn shr(&self, rhs: &Value) -> EvalResult<Value> {
        self.int_binary(rhs, ">>", |a, b| {
            let n = Self::shift_count(">>", b)?;
            a.checked_shr(n).ok_or(EvalError::Overflow(">>"))
        })
    }

    // Comparisons

    pub fn lt(&self, rhs: &Value) -> EvalResult<Value> {
        Ok(Value::Bool(self.order_against(rhs, "<")? == Some(Ordering::Less)))
    }

    pub fn le(&self, rhs: &Value) -> EvalResult<Value> {
        let ord = self.order_against(rhs, "<=")?;
        Ok(Value::Bool(matches!(ord, Some(Ordering::Less | Ordering::Equal))))
    }

    pub fn gt(&self, rhs: &Value) -> EvalResult<Value> {
        Ok(Value::Bool(self.order_against(rhs, ">")? == Some(Ordering::Greater)))
    }

    pub fn ge(&self, rhs: &Value) -> EvalResult<Value> {
        let ord = self.order_against(rhs, ">=")?;
        Ok(Value::Bool(matches!(ord, Some(Ordering::Greater | Ordering::Equal))))
    }

    /// Equality across values: Int/Float compare numerically, other kinds
    /// structurally, mixed kinds are unequal (never an error).
    pub fn eq_value(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Containment: the left value searched inside the right one.
    pub fn contained_in(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Str(needle), Value::Str(haystack)) => {
                Ok(Value::Bool(haystack.contains(needle.as_str())))
            }
            (needle, Value::List(items)) => {
                Ok(Value::Bool(items.iter().any(|item| needle.eq_value(item))))
            }
            _ => Err(EvalError::binary_mismatch("in", self.kind(), rhs.kind())),
        }
    }

    /// Ordering between two values. `Ok(None)` means unordered (NaN).
    fn order_against(&self, rhs: &Value, operator: &str) -> EvalResult<Option<Ordering>> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.order_against(y, operator)? {
                        Some(Ordering::Equal) => continue,
                        other => return Ok(other),
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(EvalError::binary_mismatch(operator, self.kind(), rhs.kind())),
            },
        }
    }

    fn float_operands(&self, rhs: &Value, operator: &str) -> EvalResult<(f64, f64)> {
        match (self.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(EvalError::binary_mismatch(operator, self.kind(), rhs.kind())),
        }
    }

    fn float_binary(
        &self,
        rhs: &Value,
        operator: &str,
        f: impl FnOnce(f64, f64) -> f64,
    ) -> EvalResult<Value> {
        let (a, b) = self.float_operands(rhs, operator)?;
        Ok(Value::Float(f(a, b)))
    }

    fn int_binary(
        &self,
        rhs: &Value,
        operator: &str,
        f: impl FnOnce(i64, i64) -> EvalResult<i64>,
    ) -> EvalResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => f(*a, *b).map(Value::Int),
            _ => Err(EvalError::binary_mismatch(operator, self.kind(), rhs.kind())),
        }
    }

    fn shift_count(operator: &'static str, count: i64) -> EvalResult<u32> {
        if count < 0 {
            return Err(EvalError::TypeMismatch {
                operator: operator.to_string(),
                operands: "a negative shift count".to_string(),
            });
        }
        u32::try_from(count).map_err(|_| EvalError::Overflow(operator))
    }
}

impl PartialEq for Value {
    /// Structural equality (used for token comparison). Unlike the `==`
    /// operator rule, `Int(1)` and `Float(1.0)` are not equal here.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Func(_) => write!(f, "Func(<native>)"),
        }
    }
}

/// Expression-text rendering: constants printed this way re-parse to the
/// same value (`Float` always keeps a decimal point, strings re-quote).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(&quote_str(s)),
            Value::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Value::Func(_) => f.write_str("<function>"),
        }
    }
}

fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

/// Single-quote a string, re-encoding the escapes `unescape` understands.
fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{Error, SerializeSeq};
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Func(_) => Err(S::Error::custom("function values are not serializable")),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("null, a boolean, a number, a string, or a sequence")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_bool<E: serde::de::Error>(self, b: bool) -> Result<Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E: serde::de::Error>(self, n: i64) -> Result<Value, E> {
                Ok(Value::Int(n))
            }

            fn visit_u64<E: serde::de::Error>(self, n: u64) -> Result<Value, E> {
                match i64::try_from(n) {
                    Ok(n) => Ok(Value::Int(n)),
                    Err(_) => Ok(Value::Float(n as f64)),
                }
            }

            fn visit_f64<E: serde::de::Error>(self, x: f64) -> Result<Value, E> {
                Ok(Value::Float(x))
            }

            fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Value, E> {
                Ok(Value::Str(s.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, s: String) -> Result<Value, E> {
                Ok(Value::Str(s))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::List(items))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
