//! Operator definitions for expressions.

use crate::access::DataType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An untyped NULL literal is accepted wherever a boolean operand is expected
fn is_boolean_like(data_type: DataType) -> bool {
    matches!(data_type, DataType::Boolean | DataType::Null)
}

/// Three-valued logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Get the output type of this operator given input types
    pub fn output_type(&self, left: DataType, right: DataType) -> Option<DataType> {
        if is_boolean_like(left) && is_boolean_like(right) {
            Some(DataType::Boolean)
        } else {
            None
        }
    }

    /// The operand value that decides the result on its own
    /// (`false` for AND, `true` for OR)
    pub fn short_circuit_value(&self) -> bool {
        match self {
            LogicalOperator::And => false,
            LogicalOperator::Or => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// Equality and ordering comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    EqualTo,
    EqualNullSafe,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    /// Whether this operator needs an ordering over its operand type
    pub fn is_ordering(&self) -> bool {
        !matches!(
            self,
            ComparisonOperator::EqualTo | ComparisonOperator::EqualNullSafe
        )
    }

    /// Apply an ordering comparator result.
    ///
    /// Equality operators test for `Ordering::Equal`.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::EqualTo | ComparisonOperator::EqualNullSafe => {
                ordering == Ordering::Equal
            }
            ComparisonOperator::LessThan => ordering == Ordering::Less,
            ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
            ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::EqualTo => "=",
            ComparisonOperator::EqualNullSafe => "<=>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        }
    }
}

/// Unary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    // Logical
    Not,

    // NULL checks
    IsNull,
    IsNotNull,
}

impl UnaryOperator {
    /// Get the output type of this operator given input type
    pub fn output_type(&self, operand: DataType) -> Option<DataType> {
        match self {
            UnaryOperator::Not => is_boolean_like(operand).then_some(DataType::Boolean),

            // NULL checks always return boolean regardless of input type
            UnaryOperator::IsNull | UnaryOperator::IsNotNull => Some(DataType::Boolean),
        }
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::IsNull => "IS NULL",
            UnaryOperator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_operator_output_types() {
        assert_eq!(
            LogicalOperator::And.output_type(DataType::Boolean, DataType::Boolean),
            Some(DataType::Boolean)
        );
        assert_eq!(
            LogicalOperator::Or.output_type(DataType::Null, DataType::Boolean),
            Some(DataType::Boolean)
        );

        // Type mismatch for logical
        assert_eq!(
            LogicalOperator::And.output_type(DataType::Int32, DataType::Boolean),
            None
        );
        assert_eq!(
            LogicalOperator::Or.output_type(DataType::Boolean, DataType::Varchar),
            None
        );
    }

    #[test]
    fn test_comparison_accepts() {
        use ComparisonOperator::*;

        assert!(LessThan.accepts(Ordering::Less));
        assert!(!LessThan.accepts(Ordering::Equal));
        assert!(LessThanOrEqual.accepts(Ordering::Equal));
        assert!(!LessThanOrEqual.accepts(Ordering::Greater));
        assert!(GreaterThan.accepts(Ordering::Greater));
        assert!(GreaterThanOrEqual.accepts(Ordering::Equal));
        assert!(!GreaterThanOrEqual.accepts(Ordering::Less));
        assert!(EqualTo.accepts(Ordering::Equal));

        assert!(LessThan.is_ordering());
        assert!(!EqualTo.is_ordering());
        assert!(!EqualNullSafe.is_ordering());
    }

    #[test]
    fn test_unary_operator_output_types() {
        assert_eq!(
            UnaryOperator::Not.output_type(DataType::Boolean),
            Some(DataType::Boolean)
        );
        assert_eq!(UnaryOperator::Not.output_type(DataType::Int32), None);

        // NULL checks work on any type
        assert_eq!(
            UnaryOperator::IsNull.output_type(DataType::Binary),
            Some(DataType::Boolean)
        );
        assert_eq!(
            UnaryOperator::IsNotNull.output_type(DataType::Varchar),
            Some(DataType::Boolean)
        );
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(LogicalOperator::And.as_str(), "AND");
        assert_eq!(ComparisonOperator::EqualNullSafe.as_str(), "<=>");
        assert_eq!(ComparisonOperator::LessThanOrEqual.as_str(), "<=");
        assert_eq!(UnaryOperator::Not.as_str(), "NOT");
        assert_eq!(UnaryOperator::IsNotNull.as_str(), "IS NOT NULL");
    }
}
