//! Evaluator for the expression AST.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::parser::parse_expression;
use crate::error::{EvalError, EvalResult};
use crate::functions;
use crate::value::{Context, Kind, Value};
use std::cmp::Ordering;

/// Evaluate expression text against a context and report whether it matches.
///
/// Empty text always matches. A missing context (`None`, as opposed to an
/// empty map) never matches, and the text is not parsed in that case.
///
/// The result is coerced to bool the same way `&&`, `||` and `!` coerce
/// their operands: absent and `""` are false, boolean text such as `"true"`
/// or `"0"` is parsed. Anything else is a `TypeMismatch`.
pub fn matches(expr: &str, ctx: Option<&Context>) -> EvalResult<bool> {
    if expr.trim().is_empty() {
        tracing::debug!("empty expression matches unconditionally");
        return Ok(true);
    }

    let Some(ctx) = ctx else {
        tracing::debug!(expr, "no context supplied, expression does not match");
        return Ok(false);
    };

    let result = evaluate(expr, ctx)?;
    result.as_bool().map_err(|_| {
        EvalError::TypeMismatch(format!(
            "expression must produce a bool, got {} {}",
            result.type_name(),
            result
        ))
    })
}

/// Parse and evaluate expression text, returning whatever value it produces.
pub fn evaluate(expr: &str, ctx: &Context) -> EvalResult<Value> {
    let ast = parse_expression(expr).map_err(EvalError::Parse)?;
    eval(&ast, ctx)
}

/// Evaluate a syntax node against a context.
pub fn eval(expr: &Expr, ctx: &Context) -> EvalResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Ident(name) => Ok(ctx.get(name).cloned().unwrap_or(Value::Absent)),

        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::List),

        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.as_bool()?)),
                UnaryOp::Neg => negate(&value),
            }
        }

        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                if !eval(left, ctx)?.as_bool()? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval(right, ctx)?.as_bool()?))
            }
            BinaryOp::Or => {
                if eval(left, ctx)?.as_bool()? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval(right, ctx)?.as_bool()?))
            }
            op => {
                let l = eval(left, ctx)?;
                let r = eval(right, ctx)?;
                if op.is_arithmetic() {
                    arithmetic(*op, &l, &r)
                } else {
                    compare(*op, &l, &r).map(Value::Bool)
                }
            }
        },

        Expr::Call { name, args } => {
            let func = functions::lookup(name)
                .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
            tracing::trace!(function = %name, args = args.len(), "calling function");
            func(args, ctx)
        }
    }
}

/// Numeric kind a value would take part in arithmetic as, if any.
fn numeric_kind(value: &Value) -> Option<Kind> {
    match value {
        Value::Int(_) | Value::Absent => Some(Kind::Int64),
        Value::Float(_) => Some(Kind::Float),
        Value::Str(s) => {
            let s = s.trim();
            if s.parse::<i64>().is_ok() {
                Some(Kind::Int64)
            } else if s.parse::<f64>().is_ok() {
                Some(Kind::Float)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Common numeric kind for a comparison. Only applies when at least one side
/// is a number and the other side is numeric-compatible.
fn comparison_kind(l: &Value, r: &Value) -> Option<Kind> {
    if !l.is_number() && !r.is_number() {
        return None;
    }
    match (numeric_kind(l)?, numeric_kind(r)?) {
        (Kind::Float, _) | (_, Kind::Float) => Some(Kind::Float),
        _ => Some(Kind::Int64),
    }
}

fn ordering(l: &Value, r: &Value) -> EvalResult<Option<Ordering>> {
    if let Some(kind) = comparison_kind(l, r) {
        return Ok(match kind {
            Kind::Float => l.as_f64()?.partial_cmp(&r.as_f64()?),
            _ => Some(l.as_i64()?.cmp(&r.as_i64()?)),
        });
    }

    Ok(match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Str(a), Value::Absent) => Some(a.as_str().cmp("")),
        (Value::Absent, Value::Str(b)) => Some("".cmp(b.as_str())),
        (Value::Absent, Value::Absent) => Some(Ordering::Equal),
        _ => None,
    })
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<bool> {
    let ord = ordering(l, r)?;

    match op {
        BinaryOp::Eq => Ok(equal(ord, l, r)),
        BinaryOp::Ne => Ok(!equal(ord, l, r)),
        _ => {
            let ord = ord.ok_or_else(|| {
                EvalError::TypeMismatch(format!(
                    "cannot apply {} to {} and {}",
                    op,
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            Ok(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            })
        }
    }
}

fn equal(ord: Option<Ordering>, l: &Value, r: &Value) -> bool {
    match (ord, l, r) {
        (Some(o), _, _) => o == Ordering::Equal,
        (None, Value::Bool(b), Value::Absent) | (None, Value::Absent, Value::Bool(b)) => !b,
        (None, l, r) => l == r,
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    let float = matches!(numeric_kind(l), Some(Kind::Float))
        || matches!(numeric_kind(r), Some(Kind::Float));

    if float {
        let (a, b) = (l.as_f64()?, r.as_f64()?);
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            _ => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                a / b
            }
        };
        return Ok(Value::Float(result));
    }

    let (a, b) = (l.as_i64()?, r.as_i64()?);
    let result = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        _ => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
    };
    Ok(Value::Int(result))
}

fn negate(value: &Value) -> EvalResult<Value> {
    match numeric_kind(value) {
        Some(Kind::Float) => Ok(Value::Float(-value.as_f64()?)),
        _ => Ok(Value::Int(value.as_i64()?.wrapping_neg())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn check(expr: &str, pairs: &[(&str, Value)]) -> EvalResult<bool> {
        matches(expr, Some(&ctx(pairs)))
    }

    #[test]
    fn test_guards() {
        assert!(matches("", None).unwrap());
        assert!(matches("", Some(&Context::new())).unwrap());
        assert!(!matches("1 == 1", None).unwrap());
        // never parsed without a context
        assert!(!matches("((", None).unwrap());
        assert!(matches("1 == 1", Some(&Context::new())).unwrap());
    }

    #[test]
    fn test_cross_kind_numeric_equality() {
        assert!(check("a == 1", &[("a", Value::Float(1.0))]).unwrap());
        assert!(check("a == \"1\"", &[("a", Value::Int(1))]).unwrap());
        assert!(check("a < \"1.5\"", &[("a", Value::Int(1))]).unwrap());
        assert!(!check("a == \"one\"", &[("a", Value::Int(1))]).unwrap());
        assert!(check("a != \"one\"", &[("a", Value::Int(1))]).unwrap());
    }

    #[test]
    fn test_ordering_on_incompatible_kinds() {
        let err = check("a > \"one\"", &[("a", Value::Int(1))]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
        let err = check("a > true", &[("a", Value::Bool(false))]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
    }

    #[test]
    fn test_string_comparison() {
        assert!(check("name == \"haha\"", &[("name", "haha".into())]).unwrap());
        assert!(check("name < \"b\"", &[("name", "abc".into())]).unwrap());
        // both strings: lexicographic even when numeric-looking
        assert!(check("v > \"10\"", &[("v", "9".into())]).unwrap());
    }

    #[test]
    fn test_missing_fields_are_zero_values() {
        assert!(!check("age > 43", &[]).unwrap());
        assert!(check("age == 0", &[]).unwrap());
        assert!(check("name == \"\"", &[]).unwrap());
        assert!(check("flag == false", &[]).unwrap());
        assert!(!check("a == 1 && b == 2", &[("a", Value::Int(1))]).unwrap());
    }

    #[test]
    fn test_arithmetic() {
        assert!(check("a + b == 7", &[("a", 3.into()), ("b", 4.into())]).unwrap());
        assert!(check("a * 2 == 5", &[("a", Value::Float(2.5))]).unwrap());
        assert!(check("a / 2 == 3", &[("a", 7.into())]).unwrap());
        assert!(check("a - \"2\" == 1", &[("a", 3.into())]).unwrap());
        assert_eq!(
            evaluate("a / 2", &ctx(&[("a", Value::Float(7.0))])).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(evaluate("-a", &ctx(&[("a", 4.into())])).unwrap(), Value::Int(-4));
    }

    #[test]
    fn test_division_by_zero() {
        let err = check("a / b == 1", &[("a", 4.into()), ("b", 0.into())]).unwrap_err();
        assert_eq!(err, EvalError::DivisionByZero);
        let err = check("a / 0.0 == 1", &[("a", 4.into())]).unwrap_err();
        assert_eq!(err, EvalError::DivisionByZero);
    }

    #[test]
    fn test_arithmetic_cast_failure() {
        let err = check("a + 1 == 2", &[("a", "x".into())]).unwrap_err();
        assert!(matches!(err, EvalError::Cast(_)));
        let err = check("a + 1 == 2", &[("a", true.into())]).unwrap_err();
        assert!(matches!(err, EvalError::Cast(_)));
    }

    #[test]
    fn test_short_circuit() {
        assert!(check("a == 1 || undefined_fn(b)", &[("a", 1.into())]).unwrap());
        assert!(!check("a == 2 && 1 / 0 == 1", &[("a", 1.into())]).unwrap());
        assert!(check("a == 1 || missing > 3", &[("a", 1.into())]).unwrap());
    }

    #[test]
    fn test_logical_operands_must_be_bool() {
        let err = check("a && true", &[("a", 1.into())]).unwrap_err();
        assert!(matches!(err, EvalError::Cast(_)));
        assert!(check("a && true", &[("a", "true".into())]).unwrap());
    }

    #[test]
    fn test_not() {
        assert!(check("!(a == 1)", &[("a", 2.into())]).unwrap());
        assert!(check("!missing", &[]).unwrap());
    }

    #[test]
    fn test_top_level_must_be_bool() {
        let err = check("a + 1", &[("a", 1.into())]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
        assert!(!check("flag", &[]).unwrap());
        assert!(check("flag", &[("flag", true.into())]).unwrap());
    }

    #[test]
    fn test_top_level_coerces_like_operands() {
        let flag = [("flag", Value::from("true"))];
        assert!(check("flag", &flag).unwrap());
        assert_eq!(check("flag", &flag), check("flag && true", &flag));
        assert!(!check("flag", &[("flag", "".into())]).unwrap());
        assert!(!check("flag", &[("flag", "F".into())]).unwrap());

        let err = check("flag", &[("flag", "maybe".into())]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
        let err = check("flag", &[("flag", Value::Float(1.0))]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
    }

    #[test]
    fn test_unknown_function() {
        let err = check("nope(a)", &[]).unwrap_err();
        assert_eq!(err, EvalError::UnknownFunction("nope".into()));
    }

    #[test]
    fn test_parse_error() {
        let err = check("a == ", &[]).unwrap_err();
        assert!(matches!(err, EvalError::Parse(_)));
    }

    #[test]
    fn test_list_evaluates_elements() {
        assert_eq!(
            evaluate("[a, 2]", &ctx(&[("a", 1.into())])).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }
}
