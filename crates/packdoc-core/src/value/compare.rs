use crate::{
    heap::ValueRef,
    value::{Value, ValueType},
};
use std::cmp::Ordering;

/// Total order over encoded values.
///
/// Kinds order by [`ValueType`]. Numbers compare by exact value, so
/// integers above 2^53 still order correctly against floats and both zeros
/// equal integer zero. Containers compare element-wise with dict pairs
/// taken in encoded order.
#[must_use]
pub fn canonical_cmp(left: Value<'_>, right: Value<'_>) -> Ordering {
    let (lt, rt) = (left.value_type(), right.value_type());
    if lt != rt {
        return lt.cmp(&rt);
    }

    match lt {
        ValueType::Null | ValueType::Undefined => Ordering::Equal,
        ValueType::Boolean => left.as_bool().cmp(&right.as_bool()),
        ValueType::Number => cmp_numbers(left, right),
        ValueType::String => left.as_str().cmp(&right.as_str()),
        ValueType::Data => left.as_data().cmp(&right.as_data()),
        ValueType::Array => match (left.as_array(), right.as_array()) {
            (Some(l), Some(r)) => l
                .iter()
                .zip(r.iter())
                .map(|(a, b)| canonical_cmp(a, b))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| l.len().cmp(&r.len())),
            _ => Ordering::Equal,
        },
        ValueType::Dict => match (left.as_dict(), right.as_dict()) {
            (Some(l), Some(r)) => l
                .iter()
                .zip(r.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| canonical_cmp(va, vb)))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| l.len().cmp(&r.len())),
            _ => Ordering::Equal,
        },
    }
}

/// [`canonical_cmp`] over owned or borrowed value references.
#[must_use]
pub fn canonical_cmp_ref(left: &ValueRef<'_>, right: &ValueRef<'_>) -> Ordering {
    let (l, r) = (left.encoded(), right.encoded());

    canonical_cmp(Value::from_trusted(&l), Value::from_trusted(&r))
}

fn cmp_numbers(left: Value<'_>, right: Value<'_>) -> Ordering {
    match (Number::of(left), Number::of(right)) {
        (Number::Int(l), Number::Int(r)) => l.cmp(&r),
        (Number::Int(l), Number::Float(r)) => cmp_int_float(l, r),
        (Number::Float(l), Number::Int(r)) => cmp_int_float(r, l).reverse(),
        (Number::Float(l), Number::Float(r)) => cmp_floats(l, r),
    }
}

///
/// Number
///

#[derive(Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn of(value: Value<'_>) -> Self {
        if value.is_integer() {
            let exact = value
                .as_int()
                .map(i128::from)
                .or_else(|| value.as_unsigned().map(i128::from))
                .unwrap_or_default();

            return Self::Int(exact);
        }

        Self::Float(value.as_double().unwrap_or(f64::NAN))
    }
}

// Zeros of either sign are equal so they agree with integer zero. NaNs
// sit past the infinities on the side of their sign bit.
fn cmp_floats(left: f64, right: f64) -> Ordering {
    left.partial_cmp(&right).unwrap_or_else(|| left.total_cmp(&right))
}

// 2^64 and -2^63 bound every stored integer.
const INT_CEIL: f64 = 18_446_744_073_709_551_616.0;
const INT_FLOOR: f64 = -9_223_372_036_854_775_808.0;

#[allow(clippy::cast_possible_truncation)]
fn cmp_int_float(int: i128, float: f64) -> Ordering {
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= INT_CEIL {
        return Ordering::Less;
    }
    if float < INT_FLOOR {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    int.cmp(&(whole as i128)).then_with(|| {
        let fraction = float - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}
