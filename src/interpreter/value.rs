use std::fmt;

use crate::ast::BinaryOperator;

use super::error::RuntimeErrorKind;
use super::heap::ObjectId;

/// A run-time value. Chars are one-character strings; objects are handles
/// into the heap, so copying a value aliases the object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Nil,
    Object(ObjectId),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Nil => "nil",
            Value::Object(_) => "object",
        }
    }

    pub(super) fn negate(self) -> Result<Value, RuntimeErrorKind> {
        match self {
            Value::Int(value) => value
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuntimeErrorKind::IntegerOverflow {
                    op: "neg".to_string(),
                }),
            Value::Double(value) => Ok(Value::Double(-value)),
            other => Err(RuntimeErrorKind::InvalidOperand {
                op: "neg".to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Applies a binary operator. Both operands are already evaluated;
    /// `and`/`or` do not short-circuit.
    pub(super) fn binary(
        op: BinaryOperator,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeErrorKind> {
        match op {
            BinaryOperator::Equal => Ok(Value::Bool(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOperator::And | BinaryOperator::Or => match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOperator::And {
                    a && b
                } else {
                    a || b
                })),
                (left, right) => Err(mismatch(op, &left, &right)),
            },
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => arithmetic(op, left, right),
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                let result = match (&left, &right) {
                    (Value::Int(a), Value::Int(b)) => compare(op, a, b),
                    (Value::Double(a), Value::Double(b)) => compare(op, a, b),
                    (Value::Str(a), Value::Str(b)) => compare(op, a, b),
                    _ => return Err(mismatch(op, &left, &right)),
                };
                Ok(Value::Bool(result))
            }
        }
    }
}

fn arithmetic(op: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeErrorKind> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div if b == 0 => return Err(RuntimeErrorKind::DivisionByZero),
                BinaryOperator::Div => a.checked_div(b),
                BinaryOperator::Mod if b == 0 => return Err(RuntimeErrorKind::ModuloByZero),
                _ => a.checked_rem(b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| RuntimeErrorKind::IntegerOverflow {
                    op: op.symbol().to_string(),
                })
        }
        (Value::Double(a), Value::Double(b)) => {
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div if b == 0.0 => return Err(RuntimeErrorKind::DivisionByZero),
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod if b == 0.0 => return Err(RuntimeErrorKind::ModuloByZero),
                _ => a % b,
            };
            Ok(Value::Double(result))
        }
        (left, right) => Err(mismatch(op, &left, &right)),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOperator, a: &T, b: &T) -> bool {
    match op {
        BinaryOperator::Less => a < b,
        BinaryOperator::LessEqual => a <= b,
        BinaryOperator::Greater => a > b,
        _ => a >= b,
    }
}

fn mismatch(op: BinaryOperator, left: &Value, right: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::OperandMismatch {
        op: op.symbol().to_string(),
        left: left.kind_name(),
        right: right.kind_name(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Double(value) => f.write_str(&format_double(*value)),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Nil => f.write_str("nil"),
            Value::Object(id) => write!(f, "<object {}>", id.index()),
        }
    }
}

/// Whole numbers keep one decimal place (`2.0`); everything else uses the
/// shortest representation that reads back to the same double.
fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeErrorKind> {
        Value::binary(op, left, right)
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(
            apply(BinaryOperator::Div, Value::Int(7), Value::Int(2)),
            Ok(Value::Int(3))
        );
        assert_eq!(
            apply(BinaryOperator::Mod, Value::Int(-7), Value::Int(2)),
            Ok(Value::Int(-1))
        );
        assert!(matches!(
            apply(BinaryOperator::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(RuntimeErrorKind::IntegerOverflow { .. })
        ));
        assert!(matches!(
            Value::Int(i64::MIN).negate(),
            Err(RuntimeErrorKind::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn zero_divisors_are_errors_for_both_kinds() {
        assert_eq!(
            apply(BinaryOperator::Div, Value::Int(1), Value::Int(0)),
            Err(RuntimeErrorKind::DivisionByZero)
        );
        assert_eq!(
            apply(BinaryOperator::Mod, Value::Int(1), Value::Int(0)),
            Err(RuntimeErrorKind::ModuloByZero)
        );
        assert_eq!(
            apply(BinaryOperator::Div, Value::Double(1.0), Value::Double(0.0)),
            Err(RuntimeErrorKind::DivisionByZero)
        );
        assert_eq!(
            apply(BinaryOperator::Mod, Value::Double(1.0), Value::Double(-0.0)),
            Err(RuntimeErrorKind::ModuloByZero)
        );
    }

    #[test]
    fn equality_is_defined_for_all_kinds() {
        assert_eq!(
            apply(BinaryOperator::Equal, Value::Nil, Value::Nil),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply(BinaryOperator::Equal, Value::Int(1), Value::Nil),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            apply(BinaryOperator::NotEqual, Value::Int(1), Value::Double(1.0)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn relational_operators_compare_strings_lexicographically() {
        assert_eq!(
            apply(
                BinaryOperator::Less,
                Value::Str("apple".to_string()),
                Value::Str("banana".to_string())
            ),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            apply(BinaryOperator::Less, Value::Int(1), Value::Bool(true)),
            Err(RuntimeErrorKind::OperandMismatch { .. })
        ));
    }

    #[test]
    fn logical_operators_need_booleans() {
        assert_eq!(
            apply(BinaryOperator::Or, Value::Bool(false), Value::Bool(true)),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            apply(BinaryOperator::And, Value::Bool(true), Value::Nil),
            Err(RuntimeErrorKind::OperandMismatch { .. })
        ));
    }

    #[test]
    fn doubles_format_with_a_decimal_point() {
        assert_eq!(format_double(2.0), "2.0");
        assert_eq!(format_double(-0.5), "-0.5");
        assert_eq!(format_double(3.25), "3.25");
        assert_eq!(Value::Double(12.0).to_string(), "12.0");
        assert_eq!(Value::Int(-4).to_string(), "-4");
    }
}
