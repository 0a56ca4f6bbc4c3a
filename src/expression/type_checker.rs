//! Type checking for bound expressions.
//!
//! The checker validates a tree against the schema of the rows it will be
//! evaluated over. A successful check also derives and caches the ordering of
//! every ordered comparison in the tree, so type errors surface here rather
//! than on the first row.

use crate::access::DataType;
use crate::expression::{Expression, ExpressionError, ExpressionResult};

/// Type checker for expressions
pub struct TypeChecker<'a> {
    /// Schema defining the types of input columns
    schema: &'a [DataType],
}

impl<'a> TypeChecker<'a> {
    /// Create a new type checker with the given schema
    pub fn new(schema: &'a [DataType]) -> Self {
        Self { schema }
    }

    /// Type check an expression and return its output type
    pub fn check(&self, expr: &Expression) -> ExpressionResult<DataType> {
        self.check_leaves(expr)?;
        expr.data_type()
    }

    /// Column references must point inside the schema and agree with it
    fn check_leaves(&self, expr: &Expression) -> ExpressionResult<()> {
        match expr {
            Expression::ColumnRef(col) => {
                let actual = self.schema.get(col.index).copied().ok_or(
                    ExpressionError::ColumnIndexOutOfBounds {
                        index: col.index,
                        row_size: self.schema.len(),
                    },
                )?;
                if actual != col.data_type {
                    return Err(ExpressionError::TypeCheckFailed {
                        expression: expr.to_string(),
                        reason: format!(
                            "declared {:?} but input column {} is {:?}",
                            col.data_type, col.index, actual
                        ),
                    });
                }
                Ok(())
            }

            Expression::Attribute(attr) => Err(ExpressionError::UnboundAttribute {
                name: attr.name.clone(),
                id: attr.id.0,
            }),

            _ => expr
                .children()
                .into_iter()
                .try_for_each(|child| self.check_leaves(child)),
        }
    }

    /// Check if an expression is valid for use as a filter predicate
    pub fn check_filter_predicate(&self, expr: &Expression) -> ExpressionResult<()> {
        match self.check(expr)? {
            DataType::Boolean | DataType::Null => Ok(()), // Boolean or NULL is OK for filters
            other_type => Err(ExpressionError::TypeCheckFailed {
                expression: expr.to_string(),
                reason: format!("filter predicate must be Boolean, got {:?}", other_type),
            }),
        }
    }
}

/// Helper function to type check an expression
pub fn type_check_expression(expr: &Expression, schema: &[DataType]) -> ExpressionResult<DataType> {
    TypeChecker::new(schema).check(expr)
}

/// Helper function to validate a filter predicate
pub fn validate_filter_predicate(expr: &Expression, schema: &[DataType]) -> ExpressionResult<()> {
    TypeChecker::new(schema).check_filter_predicate(expr)
}
