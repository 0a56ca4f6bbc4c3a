//! Ordering strategies for ordered comparisons.

use crate::access::{DataType, Value};
use crate::expression::{ExpressionError, ExpressionResult};
use std::cmp::Ordering;

/// Ordering over the values of one orderable data type.
///
/// Float64 follows IEEE comparison: NaN is unordered against everything and
/// `-0.0` equals `0.0`, matching what `=` reports for the same operands.
/// Derived once per comparison node from the operands' resolved type and
/// reused for every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeOrdering {
    data_type: DataType,
}

impl NativeOrdering {
    /// Derive the ordering for `data_type`
    pub fn for_type(data_type: DataType) -> ExpressionResult<Self> {
        if !data_type.is_orderable() {
            return Err(ExpressionError::UnsupportedType {
                data_type,
                operation: "ordered comparison".to_string(),
            });
        }
        Ok(Self { data_type })
    }

    /// Derive the ordering shared by two operand types.
    ///
    /// Both operands must resolve to the same type; `context` names the
    /// operator in the mismatch error.
    pub fn for_operands(left: DataType, right: DataType, context: &str) -> ExpressionResult<Self> {
        if left != right {
            return Err(ExpressionError::TypeMismatch {
                left,
                right,
                context: context.to_string(),
            });
        }
        Self::for_type(left)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Compare two non-NULL values of this ordering's type.
    ///
    /// `None` means the values are unordered (a NaN operand), in which case
    /// no ordered comparison holds.
    pub fn compare(&self, left: &Value, right: &Value) -> ExpressionResult<Option<Ordering>> {
        let ordering = match (self.data_type, left, right) {
            (DataType::Boolean, Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (DataType::Int32, Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (DataType::Int64, Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (DataType::Float64, Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (DataType::Varchar, Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => {
                return Err(ExpressionError::InvalidOperandTypes {
                    operator: format!("{:?} ordering", self.data_type),
                    left_type: left.data_type(),
                    right_type: right.data_type(),
                })
            }
        };
        Ok(ordering)
    }
}
