//! Operators and builtin functions.
//!
//! Numbers stay integers while every operand is an integer and the result
//! fits; anything else is computed in `f64`. `null` propagates through
//! arithmetic and compares false.

use std::cmp::Ordering;

use cadence_foundation::{Error, ErrorKind, PVec, Result, Value};
use cadence_ir::BinaryOp;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Names of the builtin functions, in the order they are documented.
pub const BUILTINS: &[&str] = &[
    "min",
    "max",
    "abs",
    "floor",
    "ceil",
    "round",
    "random",
    "random_range",
    "len",
    "list",
    "get",
];

/// Returns true if `name` is a builtin.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

// =============================================================================
// Operators
// =============================================================================

/// Applies a non-short-circuiting binary operator.
///
/// # Errors
///
/// Returns `TypeMismatch` for operands the operator does not accept and
/// `DivisionByZero` for a zero divisor.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo => arithmetic(op, left, right),
        BinaryOp::Eq => Ok(Value::Bool(left.loose_eq(right))),
        BinaryOp::Neq => Ok(Value::Bool(!left.loose_eq(right))),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => compare(op, left, right),
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::String(a), b) if op == BinaryOp::Add => Ok(Value::from(format!("{a}{b}"))),
        (a, Value::String(b)) if op == BinaryOp::Add => Ok(Value::from(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => float_arithmetic(op, a, b),
            _ => Err(operand_mismatch(op, left, right)),
        },
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let widened = || float_arithmetic(op, a as f64, b as f64);
    match op {
        BinaryOp::Add => a.checked_add(b).map_or_else(widened, |n| Ok(Value::Int(n))),
        BinaryOp::Subtract => a.checked_sub(b).map_or_else(widened, |n| Ok(Value::Int(n))),
        BinaryOp::Multiply => a.checked_mul(b).map_or_else(widened, |n| Ok(Value::Int(n))),
        BinaryOp::Divide => {
            if b == 0 {
                return Err(Error::new(ErrorKind::DivisionByZero));
            }
            match a.checked_rem(b) {
                Some(0) => a.checked_div(b).map_or_else(widened, |n| Ok(Value::Int(n))),
                _ => widened(),
            }
        }
        BinaryOp::Modulo => {
            if b == 0 {
                return Err(Error::new(ErrorKind::DivisionByZero));
            }
            // i64::MIN % -1 overflows but is mathematically zero.
            Ok(Value::Int(a.checked_rem(b).unwrap_or(0)))
        }
        _ => Err(Error::internal(format!("{op} is not arithmetic"))),
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => {
            return Err(Error::new(ErrorKind::DivisionByZero));
        }
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => return Err(Error::internal(format!("{op} is not arithmetic"))),
    };
    Ok(Value::Float(n))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Bool(false));
    }
    let Some(ordering) = left.partial_cmp(right) else {
        // NaN against a number is unordered, not a type error.
        if left.as_number().is_some() && right.as_number().is_some() {
            return Ok(Value::Bool(false));
        }
        return Err(operand_mismatch(op, left, right));
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Lte => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn operand_mismatch(op: BinaryOp, left: &Value, right: &Value) -> Error {
    Error::type_mismatch(
        format!("operands for `{}`", op.symbol()),
        format!("{} and {}", left.type_name(), right.type_name()),
    )
}

/// Negates a number. `null` stays `null`.
///
/// # Errors
///
/// Returns `TypeMismatch` for non-numeric operands.
pub fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(n) => Ok(n.checked_neg().map_or(Value::Float(-value_f64(*n)), Value::Int)),
        Value::Float(n) => Ok(Value::Float(-n)),
        other => Err(Error::type_mismatch("number", other.type_name())),
    }
}

#[allow(clippy::cast_precision_loss)]
fn value_f64(n: i64) -> f64 {
    n as f64
}

// =============================================================================
// Builtins
// =============================================================================

/// Calls a builtin with evaluated arguments.
///
/// # Errors
///
/// Returns `UnknownFunction` if `name` is not a builtin, `ArityMismatch` for
/// a wrong argument count and `TypeMismatch` for unusable arguments.
pub fn call(name: &str, args: &[Value], rng: &mut ChaCha8Rng) -> Result<Value> {
    match name {
        "min" => extremum(name, args, Ordering::Less),
        "max" => extremum(name, args, Ordering::Greater),
        "abs" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => Ok(n
                    .checked_abs()
                    .map_or(Value::Float(value_f64(*n).abs()), Value::Int)),
                Value::Float(n) => Ok(Value::Float(n.abs())),
                other => Err(Error::type_mismatch("number", other.type_name())),
            }
        }
        "floor" => rounding(name, args, f64::floor),
        "ceil" => rounding(name, args, f64::ceil),
        "round" => rounding(name, args, f64::round),
        "random" => {
            exact::<0>(name, args)?;
            Ok(Value::Float(rng.r#gen::<f64>()))
        }
        "random_range" => {
            let [low, high] = exact::<2>(name, args)?;
            random_range(low, high, rng)
        }
        "len" => {
            let [value] = exact::<1>(name, args)?;
            let len = match value {
                Value::Null => 0,
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => return Err(Error::type_mismatch("list, map or string", other.type_name())),
            };
            Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        }
        "list" => Ok(Value::List(args.iter().cloned().collect::<PVec<_>>())),
        "get" => {
            let [container, key] = exact::<2>(name, args)?;
            get(container, key)
        }
        _ => Err(Error::unknown_function(name)),
    }
}

fn exact<'v, const N: usize>(name: &str, args: &'v [Value]) -> Result<&'v [Value; N]> {
    args.try_into()
        .map_err(|_| Error::arity_mismatch(name, N.to_string(), args.len()))
}

/// `min`/`max` over either the arguments or a single list argument. The
/// winning value is returned unchanged, so integer inputs stay integers.
fn extremum(name: &str, args: &[Value], wanted: Ordering) -> Result<Value> {
    let items: Vec<&Value> = match args {
        [Value::List(items)] => items.iter().collect(),
        _ => args.iter().collect(),
    };
    if items.is_empty() {
        return Err(Error::arity_mismatch(name, "at least 1", 0));
    }

    let mut best: Option<&Value> = None;
    for item in items {
        if item.as_number().is_none() {
            return Err(Error::type_mismatch("number", item.type_name()));
        }
        best = match best {
            Some(current) if item.partial_cmp(current) != Some(wanted) => Some(current),
            _ => Some(item),
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn rounding(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value> {
    let [value] = exact::<1>(name, args)?;
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => {
            let rounded = f(*n);
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
        other => Err(Error::type_mismatch("number", other.type_name())),
    }
}

fn random_range(low: &Value, high: &Value, rng: &mut ChaCha8Rng) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (low, high) {
        let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
        return Ok(Value::Int(rng.gen_range(lo..=hi)));
    }
    let (Some(a), Some(b)) = (low.as_number(), high.as_number()) else {
        return Err(Error::type_mismatch(
            "two numbers",
            format!("{} and {}", low.type_name(), high.type_name()),
        ));
    };
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo < hi && (hi - lo).is_finite() {
        Ok(Value::Float(rng.gen_range(lo..hi)))
    } else {
        Ok(Value::Float(lo))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn get(container: &Value, key: &Value) -> Result<Value> {
    match (container, key) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(items), index) => {
            let Some(n) = index.as_number() else {
                return Err(Error::type_mismatch("list index", index.type_name()));
            };
            if n < 0.0 || n.fract() != 0.0 {
                return Ok(Value::Null);
            }
            Ok(items.get(n as usize).cloned().unwrap_or(Value::Null))
        }
        (Value::Map(entries), Value::String(key)) => {
            Ok(entries.get(&**key).cloned().unwrap_or(Value::Null))
        }
        (Value::Map(_), other) => Err(Error::type_mismatch("string key", other.type_name())),
        (other, _) => Err(Error::type_mismatch("list or map", other.type_name())),
    }
}
