//! The host-builtins vocabulary.
//!
//! The original engine populated this set by introspecting the ambient
//! runtime's global namespace; here it is an explicit curated table of
//! functions with documented arity, plus the `True`/`False`/`None`
//! constants.

use super::catalog::Vocabulary;
use super::rule::Rule;
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

/// Priority shared by every builtin function rule.
const FUNCTION_PRIORITY: i32 = 11;

fn exactly<'a>(name: &str, args: &'a [Value], count: usize) -> EvalResult<&'a [Value]> {
    if args.len() != count {
        return Err(EvalError::argument_count(name, count.to_string(), args.len()));
    }
    Ok(args)
}

fn at_least<'a>(name: &str, args: &'a [Value], count: usize) -> EvalResult<&'a [Value]> {
    if args.len() < count {
        return Err(EvalError::argument_count(
            name,
            format!("at least {}", count),
            args.len(),
        ));
    }
    Ok(args)
}

fn abs(args: &[Value]) -> EvalResult<Value> {
    match exactly("abs", args, 1)? {
        [Value::Int(n)] => n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow("abs")),
        [Value::Float(x)] => Ok(Value::Float(x.abs())),
        [other] => Err(EvalError::unary_mismatch("abs", other.kind())),
        _ => Err(EvalError::argument_count("abs", "1", args.len())),
    }
}

fn all(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(args.iter().all(Value::truthy)))
}

fn any(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(args.iter().any(Value::truthy)))
}

fn to_bool(args: &[Value]) -> EvalResult<Value> {
    let [value] = exactly("bool", args, 1)? else {
        return Err(EvalError::argument_count("bool", "1", args.len()));
    };
    Ok(Value::Bool(value.truthy()))
}

fn to_float(args: &[Value]) -> EvalResult<Value> {
    match exactly("float", args, 1)? {
        [Value::Int(n)] => Ok(Value::Float(*n as f64)),
        [Value::Float(x)] => Ok(Value::Float(*x)),
        [Value::Bool(b)] => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        [Value::Str(s)] => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EvalError::unary_mismatch("float", ValueKind::Str)),
        [other] => Err(EvalError::unary_mismatch("float", other.kind())),
        _ => Err(EvalError::argument_count("float", "1", args.len())),
    }
}

fn to_int(args: &[Value]) -> EvalResult<Value> {
    match exactly("int", args, 1)? {
        [Value::Int(n)] => Ok(Value::Int(*n)),
        [Value::Bool(b)] => Ok(Value::Int(i64::from(*b))),
        [Value::Float(x)] => {
            let truncated = x.trunc();
            if truncated.is_finite()
                && truncated >= -(2f64.powi(63))
                && truncated < 2f64.powi(63)
            {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(EvalError::Overflow("int"))
            }
        }
        [Value::Str(s)] => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::unary_mismatch("int", ValueKind::Str)),
        [other] => Err(EvalError::unary_mismatch("int", other.kind())),
        _ => Err(EvalError::argument_count("int", "1", args.len())),
    }
}

fn len(args: &[Value]) -> EvalResult<Value> {
    match exactly("len", args, 1)? {
        [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
        [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
        [other] => Err(EvalError::unary_mismatch("len", other.kind())),
        _ => Err(EvalError::argument_count("len", "1", args.len())),
    }
}

fn max(args: &[Value]) -> EvalResult<Value> {
    let args = at_least("max", args, 1)?;
    let mut best = args[0].clone();
    for value in &args[1..] {
        if value.gt(&best)?.truthy() {
            best = value.clone();
        }
    }
    Ok(best)
}

fn min(args: &[Value]) -> EvalResult<Value> {
    let args = at_least("min", args, 1)?;
    let mut best = args[0].clone();
    for value in &args[1..] {
        if value.lt(&best)?.truthy() {
            best = value.clone();
        }
    }
    Ok(best)
}

fn pow(args: &[Value]) -> EvalResult<Value> {
    let [base, exponent] = exactly("pow", args, 2)? else {
        return Err(EvalError::argument_count("pow", "2", args.len()));
    };
    base.pow(exponent)
}

/// `round(x)` or `round(x, ndigits)`, rounding halves to even like the
/// host runtime's rounding this table replaces.
fn round(args: &[Value]) -> EvalResult<Value> {
    match args {
        [Value::Int(n)] => Ok(Value::Int(*n)),
        [Value::Float(x)] => {
            let rounded = x.round_ties_even();
            if rounded >= -(2f64.powi(63)) && rounded < 2f64.powi(63) {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(EvalError::Overflow("round"))
            }
        }
        [value, Value::Int(digits)] => {
            let x = value
                .as_f64()
                .ok_or_else(|| EvalError::unary_mismatch("round", value.kind()))?;
            Ok(Value::Float(round_to_digits(x, *digits)))
        }
        [other] => Err(EvalError::unary_mismatch("round", other.kind())),
        _ => Err(EvalError::argument_count("round", "1 or 2", args.len())),
    }
}

// Scaling by powers of ten in binary misses the decimal midpoints
// (2.675 * 100 lands on exactly 267.5), so non-negative ndigits round
// through the decimal formatter instead.
fn round_to_digits(x: f64, digits: i64) -> f64 {
    if !x.is_finite() || digits >= 17 {
        return x;
    }
    if digits >= 0 {
        format!("{:.1$}", x, digits as usize).parse().unwrap_or(x)
    } else {
        let factor = 10f64.powi((-digits).min(400) as i32);
        (x / factor).round_ties_even() * factor
    }
}

fn to_str(args: &[Value]) -> EvalResult<Value> {
    let [value] = exactly("str", args, 1)? else {
        return Err(EvalError::argument_count("str", "1", args.len()));
    };
    Ok(Value::Str(value.coerce_str()))
}

fn sum(args: &[Value]) -> EvalResult<Value> {
    let mut total = Value::Int(0);
    for value in args {
        total = total.add(value)?;
    }
    Ok(total)
}

pub(super) fn install(vocab: &mut Vocabulary) {
    let functions: &[(&str, fn(&[Value]) -> EvalResult<Value>)] = &[
        ("abs", abs),
        ("all", all),
        ("any", any),
        ("bool", to_bool),
        ("float", to_float),
        ("int", to_int),
        ("len", len),
        ("max", max),
        ("min", min),
        ("pow", pow),
        ("round", round),
        ("str", to_str),
        ("sum", sum),
    ];
    for (name, f) in functions {
        vocab.add(Rule::function(*name, FUNCTION_PRIORITY, *f));
    }

    vocab.add(Rule::constant("True", true));
    vocab.add(Rule::constant("False", false));
    vocab.add(Rule::constant("None", Value::Null));
}

impl Vocabulary {
    /// The infix vocabulary extended with the curated builtin function and
    /// constant table.
    pub fn host_builtins() -> Self {
        let mut vocab = Vocabulary::infix();
        install(&mut vocab);
        vocab
    }
}
