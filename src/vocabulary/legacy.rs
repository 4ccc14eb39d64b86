//! The legacy-compatibility vocabulary.
//!
//! A reduced, spreadsheet-like formula grammar kept for backward-compatible
//! formula strings: `^` is power (always a float), `||` concatenates
//! strings, and `iif` is the ternary conditional. Rules flagged `builtin`
//! form the always-available core; the rest the caller opts into.

use super::catalog::Vocabulary;
use super::infix::{bind, logic_and, logic_or};
use super::rule::Rule;
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

fn float_operands(name: &str, a: &Value, b: &Value) -> EvalResult<(f64, f64)> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(EvalError::binary_mismatch(name, a.kind(), b.kind())),
    }
}

/// Power in the legacy grammar always computes through floats, so
/// `2^3` is `8.0` rather than `8`.
fn float_pow(a: &Value, b: &Value) -> EvalResult<Value> {
    let (x, y) = float_operands("^", a, b)?;
    if x == 0.0 && y < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Float(x.powf(y)))
}

fn concat(args: &[Value]) -> EvalResult<Value> {
    let mut out = String::new();
    for value in args {
        out.push_str(&value.coerce_str());
    }
    Ok(Value::Str(out))
}

fn iif(args: &[Value]) -> EvalResult<Value> {
    let [cond, when_true, when_false] = args else {
        return Err(EvalError::argument_count("iif", "3", args.len()));
    };
    Ok(if cond.truthy() {
        when_true.clone()
    } else {
        when_false.clone()
    })
}

fn one_float(name: &'static str, args: &[Value]) -> EvalResult<f64> {
    let [value] = args else {
        return Err(EvalError::argument_count(name, "1", args.len()));
    };
    value
        .as_f64()
        .ok_or_else(|| EvalError::unary_mismatch(name, value.kind()))
}

/// Single-argument float function with a domain check: an out-of-domain
/// argument (`sqrt(-1)`, `log(0)`) is an error, not a silent NaN.
fn math1(name: &'static str, f: fn(f64) -> f64) -> Rule {
    Rule::function(name, 0, move |args: &[Value]| {
        let x = one_float(name, args)?;
        let y = f(x);
        if y.is_nan() && !x.is_nan() {
            return Err(EvalError::TypeMismatch {
                operator: name.to_string(),
                operands: "an argument outside the function's domain".to_string(),
            });
        }
        Ok(Value::Float(y))
    })
}

/// `ceil`/`floor` return integers.
fn math1_int(name: &'static str, f: fn(f64) -> f64) -> Rule {
    Rule::function(name, 0, move |args: &[Value]| {
        let y = f(one_float(name, args)?);
        if y >= -(2f64.powi(63)) && y < 2f64.powi(63) {
            Ok(Value::Int(y as i64))
        } else {
            Err(EvalError::Overflow(name))
        }
    })
}

/// Natural logarithm, with an optional second base argument.
fn log(args: &[Value]) -> EvalResult<Value> {
    let value = match args {
        [value] | [value, _] => value,
        _ => return Err(EvalError::argument_count("log", "1 or 2", args.len())),
    };
    let x = value
        .as_f64()
        .ok_or_else(|| EvalError::unary_mismatch("log", value.kind()))?;
    if x <= 0.0 {
        return Err(EvalError::TypeMismatch {
            operator: "log".to_string(),
            operands: "an argument outside the function's domain".to_string(),
        });
    }
    match args {
        [_] => Ok(Value::Float(x.ln())),
        [_, base] => {
            let b = base
                .as_f64()
                .ok_or_else(|| EvalError::unary_mismatch("log", base.kind()))?;
            if b <= 0.0 || b == 1.0 {
                return Err(EvalError::TypeMismatch {
                    operator: "log".to_string(),
                    operands: "an invalid base".to_string(),
                });
            }
            Ok(Value::Float(x.ln() / b.ln()))
        }
        _ => Err(EvalError::argument_count("log", "1 or 2", args.len())),
    }
}

fn fac(args: &[Value]) -> EvalResult<Value> {
    let [value] = args else {
        return Err(EvalError::argument_count("fac", "1", args.len()));
    };
    let Value::Int(n) = value else {
        return Err(EvalError::unary_mismatch("fac", value.kind()));
    };
    if *n < 0 {
        return Err(EvalError::unary_mismatch("fac", ValueKind::Int));
    }
    let mut product: i64 = 1;
    for k in 2..=*n {
        product = product.checked_mul(k).ok_or(EvalError::Overflow("fac"))?;
    }
    Ok(Value::Int(product))
}

/// Uniform sample in `[0, x]`.
fn random(args: &[Value]) -> EvalResult<Value> {
    let x = one_float("random", args)?;
    Ok(Value::Float(rand::random::<f64>() * x))
}

fn atan2(args: &[Value]) -> EvalResult<Value> {
    let [y, x] = args else {
        return Err(EvalError::argument_count("atan2", "2", args.len()));
    };
    match (y.as_f64(), x.as_f64()) {
        (Some(y), Some(x)) => Ok(Value::Float(y.atan2(x))),
        _ => Err(EvalError::binary_mismatch("atan2", y.kind(), x.kind())),
    }
}

fn legacy_pow(args: &[Value]) -> EvalResult<Value> {
    let [base, exponent] = args else {
        return Err(EvalError::argument_count("pow", "2", args.len()));
    };
    float_pow(base, exponent)
}

fn round(args: &[Value]) -> EvalResult<Value> {
    let x = one_float("round", args)?;
    let rounded = x.round_ties_even();
    if rounded >= -(2f64.powi(63)) && rounded < 2f64.powi(63) {
        Ok(Value::Int(rounded as i64))
    } else {
        Err(EvalError::Overflow("round"))
    }
}

fn abs(args: &[Value]) -> EvalResult<Value> {
    let [value] = args else {
        return Err(EvalError::argument_count("abs", "1", args.len()));
    };
    match value {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow("abs")),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(EvalError::unary_mismatch("abs", other.kind())),
    }
}

fn spread_minmax(name: &'static str, pick_greater: bool) -> Rule {
    Rule::function(name, 0, move |args: &[Value]| {
        if args.is_empty() {
            return Err(EvalError::argument_count(name, "at least 1", 0));
        }
        let mut best = args[0].clone();
        for value in &args[1..] {
            let wins = if pick_greater {
                value.gt(&best)?
            } else {
                value.lt(&best)?
            };
            if wins.truthy() {
                best = value.clone();
            }
        }
        Ok(best)
    })
}

pub(super) fn install(vocab: &mut Vocabulary) {
    vocab.add(Rule::unary("-", 5, |v| v.neg()).builtin());

    vocab.add(Rule::binary("+", 2, |a, b| a.add(b)).builtin());
    vocab.add(Rule::binary("-", 2, |a, b| a.sub(b)).builtin());
    vocab.add(Rule::binary("*", 3, |a, b| a.mul(b)).builtin());
    vocab.add(Rule::binary("/", 4, |a, b| a.div(b)).builtin());
    vocab.add(Rule::binary("%", 4, |a, b| a.rem(b)).builtin());
    vocab.add(Rule::binary("^", 6, float_pow));
    vocab.add(Rule::binary("||", 1, |a, b| {
        concat(&[a.clone(), b.clone()])
    }));
    vocab.add(Rule::binary("==", 1, |a, b| Ok(Value::Bool(a.eq_value(b)))).builtin());
    vocab.add(Rule::binary("!=", 1, |a, b| Ok(Value::Bool(!a.eq_value(b)))).builtin());
    vocab.add(Rule::binary(">", 1, |a, b| a.gt(b)).builtin());
    vocab.add(Rule::binary("<", 1, |a, b| a.lt(b)).builtin());
    vocab.add(Rule::binary(">=", 1, |a, b| a.ge(b)).builtin());
    vocab.add(Rule::binary("<=", 1, |a, b| a.le(b)).builtin());
    vocab.add(Rule::binary(",", 0, bind).builtin());
    vocab.add(Rule::binary("and", 0, logic_and).builtin());
    vocab.add(Rule::binary("or", 0, logic_or).builtin());

    vocab.add(Rule::function("abs", 0, abs).builtin());
    vocab.add(Rule::function("round", 0, round).builtin());
    vocab.add(spread_minmax("min", false).builtin());
    vocab.add(spread_minmax("max", true).builtin());
    vocab.add(math1("sin", f64::sin));
    vocab.add(math1("cos", f64::cos));
    vocab.add(math1("tan", f64::tan));
    vocab.add(math1("asin", f64::asin));
    vocab.add(math1("acos", f64::acos));
    vocab.add(math1("atan", f64::atan));
    vocab.add(math1("sqrt", f64::sqrt));
    vocab.add(Rule::function("log", 0, log));
    vocab.add(math1_int("ceil", f64::ceil));
    vocab.add(math1_int("floor", f64::floor));
    vocab.add(math1("exp", f64::exp));
    vocab.add(Rule::function("random", 0, random));
    vocab.add(Rule::function("fac", 0, fac));
    vocab.add(Rule::function("pow", 0, legacy_pow));
    vocab.add(Rule::function("atan2", 0, atan2));
    vocab.add(Rule::function("concat", 0, concat));
    vocab.add(Rule::function("iif", 0, iif));

    vocab.add(Rule::constant("E", std::f64::consts::E));
    vocab.add(Rule::constant("PI", std::f64::consts::PI));
}

impl Vocabulary {
    /// The legacy-compatibility vocabulary; this is what
    /// `Parser::default()` parses with.
    pub fn legacy() -> Self {
        let mut vocab = Vocabulary::new();
        install(&mut vocab);
        vocab
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::rule::SymbolKind;

    fn call(name: &str, args: &[Value]) -> EvalResult<Value> {
        let vocab = Vocabulary::legacy();
        let rule = vocab.lookup(SymbolKind::Function, name).unwrap();
        rule.callable().unwrap()(args)
    }

    #[test]
    fn test_power_is_float() {
        assert_eq!(
            float_pow(&Value::Int(2), &Value::Int(3)).unwrap(),
            Value::Float(8.0)
        );
        assert_eq!(
            float_pow(&Value::Int(16), &Value::Float(0.5)).unwrap(),
            Value::Float(4.0)
        );
    }

    #[test]
    fn test_concat_and_iif() {
        assert_eq!(
            call("concat", &[Value::from("hi"), Value::from(" "), Value::from("u")]).unwrap(),
            Value::from("hi u")
        );
        assert_eq!(
            call("iif", &[Value::Bool(true), Value::Int(5), Value::Int(6)]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            call("iif", &[Value::Int(0), Value::Int(5), Value::Int(6)]).unwrap(),
            Value::Int(6)
        );
        assert!(call("iif", &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(call("sqrt", &[Value::Int(9)]).unwrap(), Value::Float(3.0));
        assert!(call("sqrt", &[Value::Int(-1)]).is_err());
        assert!(call("log", &[Value::Int(0)]).is_err());
        assert_eq!(
            call("log", &[Value::Int(8), Value::Int(2)]).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(call("ceil", &[Value::Float(1.2)]).unwrap(), Value::Int(2));
        assert_eq!(call("floor", &[Value::Float(-1.2)]).unwrap(), Value::Int(-2));
        assert_eq!(call("fac", &[Value::Int(5)]).unwrap(), Value::Int(120));
        assert!(call("fac", &[Value::Int(-1)]).is_err());
        assert!(call("fac", &[Value::Int(30)]).is_err());
    }

    #[test]
    fn test_random_range() {
        for _ in 0..32 {
            let Value::Float(x) = call("random", &[Value::Int(10)]).unwrap() else {
                panic!("random() should yield a float");
            };
            assert!((0.0..=10.0).contains(&x));
        }
    }

    #[test]
    fn test_builtin_flags() {
        let vocab = Vocabulary::legacy();
        assert!(vocab
            .lookup(SymbolKind::Binary, "+")
            .unwrap()
            .is_builtin());
        assert!(!vocab.lookup(SymbolKind::Binary, "^").unwrap().is_builtin());
        assert!(vocab
            .lookup(SymbolKind::Function, "abs")
            .unwrap()
            .is_builtin());
        assert!(!vocab
            .lookup(SymbolKind::Function, "sin")
            .unwrap()
            .is_builtin());
        assert!(!vocab.lookup(SymbolKind::Constant, "PI").unwrap().is_builtin());
    }
}
