//! Arithmétique et comparaisons sur `Value`.
//!
//! Int `+ - *` stays an integer (checked), `/` always yields a float, any float
//! operand promotes to float, `+` also concatenates two strings. The remainder
//! takes the sign of the divisor (floored). A zero divisor of either kind is refused.

use core::cmp::Ordering;

use bu_core::Value;

use crate::RuntimeErrorKind;

type ArithResult = Result<Value, RuntimeErrorKind>;

/// Arithmetic operator applied by the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl ArithOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// `left op right`.
pub fn binary(op: ArithOp, left: &Value, right: &Value) -> ArithResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == ArithOp::Add => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::Str(s))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_op(op, a, b),
            _ => Err(mismatch(op.symbol(), left, Some(right))),
        },
    }
}

fn int_op(op: ArithOp, a: i64, b: i64) -> ArithResult {
    let r = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div | ArithOp::Rem if b == 0 => return Err(RuntimeErrorKind::DivisionByZero),
        #[allow(clippy::cast_precision_loss)]
        ArithOp::Div => return Ok(Value::Float(a as f64 / b as f64)),
        ArithOp::Rem => {
            // `i64::MIN % -1` is 0, never an overflow.
            let r = a.wrapping_rem(b);
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
    };
    r.map(Value::Int).ok_or(RuntimeErrorKind::IntegerOverflow)
}

fn float_op(op: ArithOp, a: f64, b: f64) -> ArithResult {
    let r = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Rem if b == 0.0 => return Err(RuntimeErrorKind::DivisionByZero),
        ArithOp::Div => a / b,
        ArithOp::Rem => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
        }
    };
    Ok(Value::Float(r))
}

/// `-v`.
pub fn negate(v: &Value) -> ArithResult {
    match v {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(RuntimeErrorKind::IntegerOverflow),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => Err(mismatch("-", v, None)),
    }
}

/// `v + delta` for `INC` (`delta = 1`) and `DEC` (`delta = -1`).
pub fn step(v: &Value, delta: i64) -> ArithResult {
    let symbol = if delta >= 0 { "++" } else { "--" };
    match v {
        Value::Int(i) => i.checked_add(delta).map(Value::Int).ok_or(RuntimeErrorKind::IntegerOverflow),
        #[allow(clippy::cast_precision_loss)]
        Value::Float(x) => Ok(Value::Float(x + delta as f64)),
        _ => Err(mismatch(symbol, v, None)),
    }
}

/// Language-level `==`: numbers compare by value across int/float,
/// other values by tag and content. Never fails.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => left.as_f64() == right.as_f64(),
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`: two numbers or two strings.
///
/// `Ok(None)` when a float operand is NaN (every comparison is then false).
pub fn compare(symbol: &'static str, left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeErrorKind> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(mismatch(symbol, left, Some(right))),
        },
    }
}

fn mismatch(op: &'static str, left: &Value, right: Option<&Value>) -> RuntimeErrorKind {
    let operands = match right {
        Some(r) => format!("{} and {}", left.type_name(), r.type_name()),
        None => left.type_name().to_owned(),
    };
    RuntimeErrorKind::TypeMismatch { op, operands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn integer_ops_stay_integers() {
        assert_eq!(binary(ArithOp::Sub, &Value::Int(5), &Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(binary(ArithOp::Mul, &Value::Int(-4), &Value::Int(3)), Ok(Value::Int(-12)));
        assert_eq!(binary(ArithOp::Rem, &Value::Int(7), &Value::Int(4)), Ok(Value::Int(3)));
    }

    #[test]
    fn division_is_true_division() {
        assert_eq!(binary(ArithOp::Div, &Value::Int(7), &Value::Int(2)), Ok(Value::Float(3.5)));
        assert_eq!(binary(ArithOp::Div, &Value::Int(10), &Value::Int(4)), Ok(Value::Float(2.5)));
        assert_eq!(binary(ArithOp::Div, &Value::Int(8), &Value::Int(2)), Ok(Value::Float(4.0)));
        assert_eq!(binary(ArithOp::Div, &Value::Int(-7), &Value::Int(2)), Ok(Value::Float(-3.5)));
    }

    #[test]
    fn remainder_follows_the_divisor_sign() {
        assert_eq!(binary(ArithOp::Rem, &Value::Int(-7), &Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(binary(ArithOp::Rem, &Value::Int(7), &Value::Int(-3)), Ok(Value::Int(-2)));
        assert_eq!(binary(ArithOp::Rem, &Value::Int(-7), &Value::Int(-3)), Ok(Value::Int(-1)));
        assert_eq!(binary(ArithOp::Rem, &Value::Int(-6), &Value::Int(3)), Ok(Value::Int(0)));
        assert_eq!(binary(ArithOp::Rem, &Value::Int(i64::MIN), &Value::Int(-1)), Ok(Value::Int(0)));
        assert_eq!(binary(ArithOp::Rem, &Value::Float(-7.5), &Value::Int(2)), Ok(Value::Float(0.5)));
    }

    #[test]
    fn mixed_operands_promote() {
        assert_eq!(binary(ArithOp::Add, &Value::Int(1), &Value::Float(0.5)), Ok(Value::Float(1.5)));
        assert_eq!(binary(ArithOp::Div, &Value::Float(7.0), &Value::Int(2)), Ok(Value::Float(3.5)));
    }

    #[test]
    fn strings_concatenate_only_with_plus() {
        assert_eq!(binary(ArithOp::Add, &Value::from("ab"), &Value::from("cd")), Ok(Value::from("abcd")));
        assert_eq!(
            binary(ArithOp::Mul, &Value::from("ab"), &Value::Int(2)),
            Err(RuntimeErrorKind::TypeMismatch { op: "*", operands: "string and int".into() })
        );
    }

    #[test]
    fn zero_divisors_and_overflow() {
        assert_eq!(binary(ArithOp::Div, &Value::Int(1), &Value::Int(0)), Err(RuntimeErrorKind::DivisionByZero));
        assert_eq!(binary(ArithOp::Rem, &Value::Float(1.0), &Value::Int(0)), Err(RuntimeErrorKind::DivisionByZero));
        assert_eq!(binary(ArithOp::Add, &Value::Int(i64::MAX), &Value::Int(1)), Err(RuntimeErrorKind::IntegerOverflow));
        assert_eq!(binary(ArithOp::Mul, &Value::Int(i64::MIN), &Value::Int(-1)), Err(RuntimeErrorKind::IntegerOverflow));
        assert_eq!(negate(&Value::Int(i64::MIN)), Err(RuntimeErrorKind::IntegerOverflow));
    }

    #[test]
    fn steps() {
        assert_eq!(step(&Value::Int(5), 1), Ok(Value::Int(6)));
        assert_eq!(step(&Value::Float(0.5), -1), Ok(Value::Float(-0.5)));
        assert!(matches!(step(&Value::Nil, 1), Err(RuntimeErrorKind::TypeMismatch { op: "++", .. })));
    }

    #[test]
    fn equality_and_ordering() {
        assert!(equals(&Value::Int(1), &Value::Float(1.0)));
        assert!(!equals(&Value::Int(1), &Value::from("1")));
        assert!(equals(&Value::Nil, &Value::Nil));
        assert!(!equals(&Value::Bool(false), &Value::Nil));
        assert_eq!(compare("<", &Value::from("a"), &Value::from("b")), Ok(Some(Ordering::Less)));
        assert_eq!(compare("<", &Value::Int(2), &Value::Float(1.5)), Ok(Some(Ordering::Greater)));
        assert!(compare("<", &Value::Int(2), &Value::Nil).is_err());
    }

    proptest! {
        #[test]
        fn sub_is_not_commutative(a in -1000i64..1000, b in -1000i64..1000) {
            let ab = binary(ArithOp::Sub, &Value::Int(a), &Value::Int(b));
            prop_assert_eq!(ab, Ok(Value::Int(a - b)));
        }
    }
}
