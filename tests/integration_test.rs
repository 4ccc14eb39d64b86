use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use vibexpr::fields::{build_identifier_mapping, parse_with_fields, rewrite};
use vibexpr::{EvalError, Parser, Rule, Value, Vocabulary};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bindings(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn infix() -> Parser {
    Parser::new(Arc::new(Vocabulary::infix()))
}

#[test]
fn test_infix_operator_precedence() -> Result<()> {
    init_logging();
    let parser = infix();
    let none = HashMap::new();

    assert_eq!(parser.eval("2 + 3 * 4", &none)?, Value::Int(14));
    assert_eq!(parser.eval("(2 + 3) * 4", &none)?, Value::Int(20));
    assert_eq!(parser.eval("2 ** 3 ** 2", &none)?, Value::Int(512));

    let b = bindings(&[("x", Value::Int(1)), ("y", Value::Int(0)), ("z", Value::Int(0))]);
    assert!(parser.eval("x or y and z", &b)?.truthy());

    let b = bindings(&[("x", Value::Int(1)), ("y", Value::Int(0))]);
    assert_eq!(parser.eval("~(x | y)", &b)?, Value::Int(-2));

    let b = bindings(&[("x", Value::Int(1)), ("y", Value::Int(2)), ("z", Value::Int(3))]);
    assert_eq!(parser.eval("x ^ y & z", &b)?, Value::Int(3));

    let b = bindings(&[("x", Value::Int(2)), ("y", Value::Int(4)), ("z", Value::Int(1))]);
    assert_eq!(parser.eval("x & y >> z", &b)?, Value::Int(2));

    let b = bindings(&[("x", Value::Int(2)), ("y", Value::Int(2)), ("z", Value::Int(2))]);
    assert_eq!(parser.eval("x * y ** z", &b)?, Value::Int(8));

    let b = bindings(&[("x", Value::Int(2)), ("y", Value::Int(3)), ("z", Value::Int(1))]);
    assert_eq!(parser.eval("x << y + z", &b)?, Value::Int(32));

    Ok(())
}

#[test]
fn test_chained_comparisons_evaluate_left_to_right() {
    // (1 < 2) < 0 becomes True < 0, which this value model rejects;
    // comparisons do not chain mathematically.
    let parser = infix();
    let err = parser.eval("1 < 2 < 0", &HashMap::new()).unwrap_err();
    assert!(err.to_string().contains("Type mismatch"));
}

#[test]
fn test_parse_errors_carry_columns() {
    let parser = Parser::default();

    assert!(parser.parse("1 +").is_err());
    assert!(parser.parse("+ 1 2").is_err());
    assert!(parser.parse("..5").is_err());

    let err = parser.parse("(1 + 2").unwrap_err();
    assert!(err.message.contains("parentheses"));

    let err = parser.parse("1 + ?").unwrap_err();
    assert_eq!(err.column, 4);
    assert_eq!(err.to_string(), "parse error at column 4: unknown character '?'");
}

#[test]
fn test_undefined_symbols_are_named() {
    let parser = infix();
    let expr = parser.parse("x + 1").unwrap();

    match expr.eval(&HashMap::new()) {
        Err(EvalError::UndefinedSymbol(name)) => assert_eq!(name, "x"),
        other => panic!("expected UndefinedSymbol, got {other:?}"),
    }
    assert_eq!(
        expr.eval(&bindings(&[("x", Value::Int(2))])).unwrap(),
        Value::Int(3)
    );
}

#[test]
fn test_legacy_formula_battery() -> Result<()> {
    init_logging();
    let parser = Parser::default();

    let b = bindings(&[("x", Value::Int(3))]);
    assert_eq!(parser.eval("2^x", &b)?, Value::Float(8.0));

    let b = bindings(&[("x", Value::Int(4))]);
    assert_eq!(parser.eval("2 - 3^x", &b)?, Value::Float(-79.0));
    assert_eq!(parser.eval("-2 - 3^x", &b)?, Value::Float(-83.0));
    assert_eq!(parser.eval("-3^x", &b)?, Value::Float(-81.0));
    assert_eq!(parser.eval("(-3)^x", &b)?, Value::Float(81.0));

    assert_eq!(parser.eval("'x' == 'x'", &HashMap::new())?, Value::Bool(true));

    let b = bindings(&[("x", Value::from("hi ")), ("y", Value::from("u"))]);
    assert_eq!(parser.eval("x || y", &b)?, Value::from("hi u"));
    assert_eq!(
        parser.eval("concat('hi', ' ', 'u')", &HashMap::new())?,
        Value::from("hi u")
    );

    let b = bindings(&[("a", Value::Int(1)), ("b", Value::Int(0))]);
    assert_eq!(parser.eval("iif(a > b, 5, 6)", &b)?, Value::Int(5));

    let b = bindings(&[("a", Value::List(vec![Value::Int(1), Value::Int(2)]))]);
    assert_eq!(
        parser.eval("a, 3", &b)?,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    assert_eq!(parser.eval(".5^3", &HashMap::new())?, Value::Float(0.125));
    assert_eq!(parser.eval("16^.5", &HashMap::new())?, Value::Float(4.0));
    assert_eq!(parser.eval("8300*.8", &HashMap::new())?, Value::Float(6640.0));

    // quoted compound identifiers keep their quotes in the binding key
    let b = bindings(&[("\"a b\"", Value::Int(2))]);
    assert_eq!(parser.eval("\"a b\" * 2", &b)?, Value::Int(4));

    Ok(())
}

#[test]
fn test_host_builtins_vocabulary() -> Result<()> {
    let parser = Parser::new(Arc::new(Vocabulary::host_builtins()));
    let none = HashMap::new();

    assert_eq!(parser.eval("abs(-3)", &none)?, Value::Int(3));
    assert_eq!(parser.eval("len('abc')", &none)?, Value::Int(3));
    assert_eq!(parser.eval("max(2, 3, 1)", &none)?, Value::Int(3));
    assert_eq!(parser.eval("round(2.5)", &none)?, Value::Int(2));
    assert_eq!(parser.eval("sum(1, 2, 3.5)", &none)?, Value::Float(6.5));
    assert_eq!(parser.eval("pow(2, 10)", &none)?, Value::Int(1024));
    assert_eq!(parser.eval("True and False", &none)?, Value::Bool(false));
    assert_eq!(parser.eval("int('42') + float(1)", &none)?, Value::Float(43.0));
    assert_eq!(parser.eval("str(None)", &none)?, Value::from("None"));

    Ok(())
}

#[test]
fn test_vocabulary_extension_and_override() -> Result<()> {
    let mut vocab = Vocabulary::legacy();
    vocab.add(Rule::function("mean", 0, |args| {
        let mut total = Value::Int(0);
        for value in args {
            total = total.add(value)?;
        }
        total.div(&Value::Int(args.len() as i64))
    }));
    // overriding by (kind, name) replaces the stock rule
    vocab.add(Rule::binary("+", 2, |a, b| a.add(b)?.add(&Value::Int(100))));
    let parser = Parser::new(Arc::new(vocab));
    let none = HashMap::new();

    assert_eq!(parser.eval("mean(1, 2, 3)", &none)?, Value::Float(2.0));
    assert_eq!(parser.eval("1 + 2", &none)?, Value::Int(103));

    Ok(())
}

#[test]
fn test_simplify_recreates_shorter_expressions() -> Result<()> {
    let parser = Parser::default();
    let none = HashMap::new();

    let expr = parser.parse("x/((x+y))")?;
    let folded = expr.simplify(&none)?;
    let b = bindings(&[("x", Value::Int(1)), ("y", Value::Int(1))]);
    assert_eq!(folded.eval(&b)?, expr.eval(&b)?);

    let expr = parser.parse("x*(y*atan(1))")?;
    let partial = expr.simplify(&bindings(&[("y", Value::Int(4))]))?;
    assert_eq!(partial.variables(), vec!["x"]);
    assert_eq!(
        partial.eval(&bindings(&[("x", Value::Int(2))]))?,
        Value::Float(2.0 * (4.0 * 1.0_f64.atan()))
    );

    // idempotence, compared as token sequences
    let once = parser.parse("2 + 3 * 4 + x")?.simplify(&none)?;
    assert_eq!(once.simplify(&none)?, once);

    Ok(())
}

#[test]
fn test_substitution() -> Result<()> {
    let parser = Parser::default();

    let expr = parser.parse("2*x + 1")?;
    let substituted = expr.subst_text("x", "4*x")?;
    assert_eq!(
        substituted.eval(&bindings(&[("x", Value::Int(3))]))?,
        Value::Int(25)
    );

    let expr = parser.parse("func(a, 1.51, 'ok')")?;
    let renamed = expr.subst("a", &parser.parse("b")?);
    assert_eq!(renamed.to_string(), "func(b, 1.51, 'ok')");

    Ok(())
}

#[test]
fn test_round_trip_through_to_string() -> Result<()> {
    let parser = infix();
    let b = bindings(&[("x", Value::Int(2)), ("y", Value::Int(3))]);

    for text in [
        "2 + 3 * 4",
        "2 ** 3 ** 2",
        "-x ** y",
        "x * y + 1",
        "'a' in 'ba'",
        "x == 2 and y > 1",
    ] {
        let expr = parser.parse(text)?;
        let reparsed = parser.parse(&expr.to_string())?;
        assert_eq!(expr.eval(&b)?, reparsed.eval(&b)?, "round trip changed {text:?}");
    }
    Ok(())
}

#[test]
fn test_symbol_enumeration() -> Result<()> {
    let parser = Parser::default();

    let expr = parser.parse("pow(x, y) + x")?;
    assert_eq!(expr.symbols(), vec!["pow", "x", "y"]);
    assert_eq!(expr.variables(), vec!["x", "y"]);

    // constants match on word boundaries, so near-misses stay variables
    let expr = parser.parse("E + PI + E1 + PI2 + Pie + Engage")?;
    assert_eq!(expr.variables(), vec!["E1", "PI2", "Pie", "Engage"]);

    Ok(())
}

#[test]
fn test_identifier_safety_layer() -> Result<()> {
    init_logging();
    let text = "2 * unit price + 'unit price'";
    let mapping = build_identifier_mapping(text, &["unit price", "x"]);
    assert_eq!(mapping["x"], "x");
    assert_eq!(mapping["unit price"], "X0");

    // free-standing occurrences are rewritten, quoted ones never
    let rewritten = rewrite(text, &mapping);
    assert_eq!(rewritten, "2 * X0 + 'unit price'");

    let parser = Parser::default();
    let (expr, mapping) =
        parse_with_fields(&parser, "unit price * count", &["unit price", "count"])?;
    let b = bindings(&[
        (mapping["unit price"].as_str(), Value::Int(3)),
        (mapping["count"].as_str(), Value::Int(5)),
    ]);
    assert_eq!(expr.eval(&b)?, Value::Int(15));

    Ok(())
}

#[test]
fn test_bindings_deserialize_from_json() -> Result<()> {
    let parser = infix();
    let b: HashMap<String, Value> =
        serde_json::from_str(r#"{"x": 2, "y": [1, 2, 3], "s": "ba"}"#)?;

    assert_eq!(parser.eval("x in y", &b)?, Value::Bool(true));
    assert_eq!(parser.eval("'a' in s", &b)?, Value::Bool(true));
    Ok(())
}

#[test]
fn test_vocabulary_and_expressions_shared_across_threads() {
    let vocabulary = Arc::new(Vocabulary::infix());
    let expr = Arc::new(
        Parser::new(Arc::clone(&vocabulary))
            .parse("x * x + 1")
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let vocabulary = Arc::clone(&vocabulary);
            let expr = Arc::clone(&expr);
            thread::spawn(move || {
                let parser = Parser::new(vocabulary);
                let b = bindings(&[("x", Value::Int(i))]);
                let parsed = parser.parse("x * x + 1").unwrap().eval(&b).unwrap();
                let shared = expr.eval(&b).unwrap();
                assert_eq!(parsed, shared);
                assert_eq!(shared, Value::Int(i * i + 1));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
