//! Predicate helpers for planners and filters.
//!
//! Decomposition (`split_conjuncts`, `split_disjuncts`), recombination, the
//! reference containment test a planner uses to decide where a predicate may
//! run, and binding of named attributes to row positions.

use crate::access::{DataType, Row, Value};
use crate::expression::{
    expression_to_predicate, validate_filter_predicate, AttributeRef, ColumnRef, ExprId,
    Expression, ExpressionError, ExpressionResult, LogicalOperator, Predicate,
};
use log::debug;
use std::collections::HashSet;

fn split<'a>(expr: &'a Expression, connective: LogicalOperator, out: &mut Vec<&'a Expression>) {
    match expr {
        Expression::Logical { op, left, right } if *op == connective => {
            split(left, connective, out);
            split(right, connective, out);
        }
        other => out.push(other),
    }
}

/// Flatten nested ANDs into their conjuncts, left to right.
///
/// A non-AND expression yields itself.
pub fn split_conjuncts(expr: &Expression) -> Vec<&Expression> {
    let mut conjuncts = Vec::new();
    split(expr, LogicalOperator::And, &mut conjuncts);
    conjuncts
}

/// Flatten nested ORs into their disjuncts, left to right
pub fn split_disjuncts(expr: &Expression) -> Vec<&Expression> {
    let mut disjuncts = Vec::new();
    split(expr, LogicalOperator::Or, &mut disjuncts);
    disjuncts
}

/// Rebuild a left-deep AND tree; `None` for an empty list
pub fn combine_conjuncts(conjuncts: Vec<Expression>) -> Option<Expression> {
    conjuncts.into_iter().reduce(Expression::and)
}

/// Rebuild a left-deep OR tree; `None` for an empty list
pub fn combine_disjuncts(disjuncts: Vec<Expression>) -> Option<Expression> {
    disjuncts.into_iter().reduce(Expression::or)
}

/// Whether every attribute referenced by `expr` is available in `output`
pub fn can_evaluate_with_output(expr: &Expression, output: &[AttributeRef]) -> bool {
    let available: HashSet<ExprId> = output.iter().map(|attr| attr.id).collect();
    expr.references().is_subset(&available)
}

/// Replace every attribute with a column reference at its position in `input`
pub fn bind_references(expr: Expression, input: &[AttributeRef]) -> ExpressionResult<Expression> {
    expr.transform_up(&mut |node| match node {
        Expression::Attribute(attr) => {
            let index = input
                .iter()
                .position(|candidate| candidate.id == attr.id)
                .ok_or_else(|| ExpressionError::UnboundAttribute {
                    name: attr.name.clone(),
                    id: attr.id.0,
                })?;
            debug!("bound {}#{} to input[{}]", attr.name, attr.id.0, index);
            Ok(Expression::ColumnRef(
                ColumnRef::new(index, attr.data_type)
                    .with_name(attr.name)
                    .with_nullable(attr.nullable),
            ))
        }
        other => Ok(other),
    })
}

/// A boolean expression bound to an input layout, ready to filter rows
#[derive(Debug, Clone)]
pub struct InterpretedPredicate {
    expr: Expression,
}

impl InterpretedPredicate {
    /// Bind `expr` against `input` and validate it as a filter
    pub fn create(expr: Expression, input: &[AttributeRef]) -> ExpressionResult<Self> {
        let bound = bind_references(expr, input)?;
        let schema: Vec<DataType> = input.iter().map(|attr| attr.data_type).collect();
        validate_filter_predicate(&bound, &schema)?;
        Ok(Self { expr: bound })
    }

    /// Wrap an expression whose leaves are already bound
    pub fn from_bound(expr: Expression, schema: &[DataType]) -> ExpressionResult<Self> {
        validate_filter_predicate(&expr, schema)?;
        Ok(Self { expr })
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Raw three-valued result; `None` is unknown
    pub fn evaluate_tri_state<R: Row + ?Sized>(&self, row: &R) -> ExpressionResult<Option<bool>> {
        match self.expr.evaluate(row)? {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(b)),
            other => Err(ExpressionError::InvalidOperandTypes {
                operator: "predicate".to_string(),
                left_type: other.data_type(),
                right_type: None,
            }),
        }
    }

    /// Strict filter semantics: unknown rejects the row
    pub fn accepts<R: Row + ?Sized>(&self, row: &R) -> ExpressionResult<bool> {
        Ok(self.evaluate_tri_state(row)? == Some(true))
    }

    /// Convert into a boxed closure; unknown and errors both reject the row
    pub fn into_predicate(self) -> Predicate {
        expression_to_predicate(self.expr)
    }
}
