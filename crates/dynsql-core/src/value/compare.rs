use crate::value::Value;
use std::cmp::Ordering;

/// Equality used by in-memory matching.
///
/// Numeric variants compare by numeric value, so `Int(1)`, `Uint(1)` and
/// `Float64(1.0)` are equal. Everything else compares structurally.
#[must_use]
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (numeric(left), numeric(right)) {
        return numeric_cmp(a, b) == Some(Ordering::Equal);
    }

    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        _ => left == right,
    }
}

/// Strict comparator for orderable values.
///
/// Returns `None` for mismatched or non-orderable variants, which the
/// matcher treats as "not comparable".
#[must_use]
pub fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (numeric(left), numeric(right)) {
        return numeric_cmp(a, b);
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

fn numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Int(v) => Some(Numeric::Int(i128::from(*v))),
        Value::Uint(v) => Some(Numeric::Int(i128::from(*v))),
        Value::Float64(v) => Some(Numeric::Float(*v)),
        _ => None,
    }
}

#[expect(clippy::cast_precision_loss)]
fn numeric_cmp(left: Numeric, right: Numeric) -> Option<Ordering> {
    match (left, right) {
        (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
        (Numeric::Int(a), Numeric::Float(b)) => (a as f64).partial_cmp(&b),
        (Numeric::Float(a), Numeric::Int(b)) => a.partial_cmp(&(b as f64)),
        (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(&b),
    }
}

///
/// TESTS
///
