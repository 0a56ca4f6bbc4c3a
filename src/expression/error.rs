//! Error types for expression resolution and evaluation.
//!
//! NULL results are never errors: three-valued logic and CASE fallthrough
//! produce `Value::Null` as an ordinary result.

use crate::access::DataType;
use thiserror::Error;

/// Errors that can occur while resolving or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Type of a node was requested before its type checks were satisfied
    #[error("Unresolved {node}: {reason}")]
    Unresolved { node: String, reason: String },

    /// Ordered comparison between operands of different types
    #[error("Type mismatch in {context}: {left:?} vs {right:?}")]
    TypeMismatch {
        left: DataType,
        right: DataType,
        context: String,
    },

    /// Operation requested on a type that does not support it
    #[error("Type {data_type:?} does not support {operation}")]
    UnsupportedType {
        data_type: DataType,
        operation: String,
    },

    /// Runtime operand values of the wrong kind for an operator
    #[error("Invalid operand types for operator {operator}: left={left_type:?}, right={right_type:?}")]
    InvalidOperandTypes {
        operator: String,
        left_type: Option<DataType>,
        right_type: Option<DataType>,
    },

    /// Column index out of bounds
    #[error("Column index {index} out of bounds for row with {row_size} columns")]
    ColumnIndexOutOfBounds { index: usize, row_size: usize },

    /// Named attribute that was never bound to a row position
    #[error("Attribute {name}#{id} is not bound to an input position")]
    UnboundAttribute { name: String, id: u64 },

    /// Type checking against an input schema failed
    #[error("Type check failed for expression '{expression}': {reason}")]
    TypeCheckFailed { expression: String, reason: String },
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
