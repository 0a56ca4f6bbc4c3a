//! Expression evaluation implementation.
//!
//! Evaluation follows SQL three-valued logic: `Value::Null` stands for
//! "unknown" and is an ordinary result, never an error.

use crate::access::{Row, Value};
use crate::expression::{
    BinaryComparison, CaseWhen, ColumnRef, ComparisonOperator, Expression, ExpressionError,
    ExpressionResult, LogicalOperator, UnaryOperator,
};
use log::trace;
use std::collections::HashSet;

/// Evaluator for expressions against a single row
pub struct ExpressionEvaluator<'a, R: Row + ?Sized> {
    /// The row values to evaluate against
    row: &'a R,
}

impl<'a, R: Row + ?Sized> ExpressionEvaluator<'a, R> {
    /// Create a new evaluator over a row
    pub fn new(row: &'a R) -> Self {
        Self { row }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, expr: &Expression) -> ExpressionResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(lit.value.clone()),

            Expression::ColumnRef(col) => self.evaluate_column_ref(col),

            Expression::Attribute(attr) => Err(ExpressionError::UnboundAttribute {
                name: attr.name.clone(),
                id: attr.id.0,
            }),

            Expression::UnaryOp { op, operand } => {
                let operand_val = self.evaluate(operand)?;
                self.evaluate_unary_op(*op, operand_val)
            }

            Expression::Logical { op, left, right } => self.evaluate_logical(*op, left, right),

            Expression::Comparison(cmp) => self.evaluate_comparison(cmp),

            Expression::In { value, list } => self.evaluate_in(value, list),

            Expression::InSet { value, set } => self.evaluate_in_set(value, set),

            Expression::If {
                predicate,
                true_value,
                false_value,
            } => {
                if self.evaluate_condition("if", predicate)? {
                    self.evaluate(true_value)
                } else {
                    self.evaluate(false_value)
                }
            }

            Expression::CaseWhen(case) => self.evaluate_case_when(case),
        }
    }

    /// Evaluate a column reference
    fn evaluate_column_ref(&self, col: &ColumnRef) -> ExpressionResult<Value> {
        self.row
            .get(col.index)
            .cloned()
            .ok_or(ExpressionError::ColumnIndexOutOfBounds {
                index: col.index,
                row_size: self.row.len(),
            })
    }

    /// Evaluate an expression expected to produce a boolean; NULL maps to `None`
    fn evaluate_boolean(&self, operator: &str, expr: &Expression) -> ExpressionResult<Option<bool>> {
        match self.evaluate(expr)? {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(b)),
            other => Err(ExpressionError::InvalidOperandTypes {
                operator: operator.to_string(),
                left_type: other.data_type(),
                right_type: None,
            }),
        }
    }

    /// Branch selection: only an exact `true` selects; false and NULL do not
    fn evaluate_condition(&self, operator: &str, expr: &Expression) -> ExpressionResult<bool> {
        Ok(self.evaluate_boolean(operator, expr)? == Some(true))
    }

    /// Evaluate a unary operation
    fn evaluate_unary_op(&self, op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
        match op {
            UnaryOperator::Not => match operand {
                Value::Null => Ok(Value::Null),
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                _ => Err(ExpressionError::InvalidOperandTypes {
                    operator: op.as_str().to_string(),
                    left_type: operand.data_type(),
                    right_type: None,
                }),
            },

            UnaryOperator::IsNull => Ok(Value::Boolean(operand.is_null())),

            UnaryOperator::IsNotNull => Ok(Value::Boolean(!operand.is_null())),
        }
    }

    /// AND / OR with short-circuiting.
    ///
    /// The decisive value (false for AND, true for OR) on either side wins
    /// even when the other side is NULL; the right operand is never evaluated
    /// once the left one is decisive.
    fn evaluate_logical(
        &self,
        op: LogicalOperator,
        left: &Expression,
        right: &Expression,
    ) -> ExpressionResult<Value> {
        let decisive = op.short_circuit_value();

        let left_val = self.evaluate_boolean(op.as_str(), left)?;
        if left_val == Some(decisive) {
            return Ok(Value::Boolean(decisive));
        }

        let right_val = self.evaluate_boolean(op.as_str(), right)?;
        if right_val == Some(decisive) {
            return Ok(Value::Boolean(decisive));
        }

        match (left_val, right_val) {
            (Some(_), Some(_)) => Ok(Value::Boolean(!decisive)),
            _ => Ok(Value::Null),
        }
    }

    /// Evaluate an equality or ordering comparison
    fn evaluate_comparison(&self, cmp: &BinaryComparison) -> ExpressionResult<Value> {
        // Derived before touching the operands so a type error surfaces on
        // every row, NULL operands included
        let ordering = if cmp.op().is_ordering() {
            Some(cmp.ordering()?)
        } else {
            None
        };

        let left = self.evaluate(cmp.left())?;
        let right = self.evaluate(cmp.right())?;

        if cmp.op() == ComparisonOperator::EqualNullSafe {
            let equal = match (&left, &right) {
                (Value::Null, Value::Null) => true,
                (Value::Null, _) | (_, Value::Null) => false,
                _ => left.sql_equals(&right),
            };
            return Ok(Value::Boolean(equal));
        }

        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        match ordering {
            Some(ordering) => {
                // Unordered operands (NaN) satisfy no ordered comparison
                let holds = ordering
                    .compare(&left, &right)?
                    .map_or(false, |result| cmp.op().accepts(result));
                Ok(Value::Boolean(holds))
            }
            None => Ok(Value::Boolean(left.sql_equals(&right))),
        }
    }

    /// Linear IN scan.
    ///
    /// NULL handling: a NULL value yields NULL; a match yields true; no match
    /// yields NULL if any candidate was NULL and false otherwise. Candidates
    /// after the first match are not evaluated.
    fn evaluate_in(&self, value: &Expression, list: &[Expression]) -> ExpressionResult<Value> {
        let needle = self.evaluate(value)?;
        if needle.is_null() {
            return Ok(Value::Null);
        }

        let mut saw_null = false;
        for candidate in list {
            let candidate = self.evaluate(candidate)?;
            if candidate == needle {
                return Ok(Value::Boolean(true));
            }
            saw_null |= candidate.is_null();
        }

        Ok(if saw_null {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }

    /// Set-based IN with the same NULL handling as [`Self::evaluate_in`]
    fn evaluate_in_set(&self, value: &Expression, set: &HashSet<Value>) -> ExpressionResult<Value> {
        let needle = self.evaluate(value)?;
        if needle.is_null() {
            return Ok(Value::Null);
        }

        if set.contains(&needle) {
            Ok(Value::Boolean(true))
        } else if set.contains(&Value::Null) {
            Ok(Value::Null)
        } else {
            Ok(Value::Boolean(false))
        }
    }

    /// First-match CASE: conditions are tried in order and evaluation stops
    /// at the first one that is exactly true. Without a match the ELSE value
    /// is returned, or NULL when there is none.
    fn evaluate_case_when(&self, case: &CaseWhen) -> ExpressionResult<Value> {
        for (branch, (condition, value)) in case.pairs().enumerate() {
            if self.evaluate_condition("CASE WHEN", condition)? {
                trace!("CASE matched branch {}", branch);
                return self.evaluate(value);
            }
        }

        match case.else_value() {
            Some(else_value) => self.evaluate(else_value),
            None => Ok(Value::Null),
        }
    }
}

impl Expression {
    /// Evaluate this expression against a row
    pub fn evaluate<R: Row + ?Sized>(&self, row: &R) -> ExpressionResult<Value> {
        ExpressionEvaluator::new(row).evaluate(self)
    }
}

/// Helper function to evaluate an expression against row values
pub fn evaluate_expression(expr: &Expression, row: &[Value]) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(row).evaluate(expr)
}

/// Type alias for predicate functions
pub type Predicate = Box<dyn Fn(&[Value]) -> bool + Send + Sync + 'static>;

/// Helper function to create a predicate function from an expression
pub fn expression_to_predicate(expr: Expression) -> Predicate {
    Box::new(move |values| {
        match evaluate_expression(&expr, values) {
            Ok(Value::Boolean(b)) => b,
            Ok(Value::Null) => false, // NULL is treated as false in WHERE clause
            _ => false,               // Type error or non-boolean result
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DataType;
    use crate::expression::AttributeRef;

    fn lit(value: Value) -> Expression {
        Expression::literal(value)
    }

    fn tri(value: Option<bool>) -> Expression {
        match value {
            Some(b) => lit(Value::Boolean(b)),
            None => Expression::null(DataType::Boolean),
        }
    }

    fn tri_value(value: Option<bool>) -> Value {
        value.map_or(Value::Null, Value::Boolean)
    }

    /// Expression that fails if it is ever evaluated
    fn poison(data_type: DataType) -> Expression {
        Expression::attribute(&AttributeRef::new("poison", data_type))
    }

    #[test]
    fn test_literal_evaluation() {
        let values: Vec<Value> = vec![];
        let evaluator = ExpressionEvaluator::new(&values);

        assert_eq!(
            evaluator.evaluate(&lit(Value::Int32(42))).unwrap(),
            Value::Int32(42)
        );
        assert_eq!(
            evaluator.evaluate(&Expression::null(DataType::Varchar)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_column_ref_evaluation() {
        let values = vec![
            Value::Int32(1),
            Value::String("test".to_string()),
            Value::Boolean(true),
        ];
        let evaluator = ExpressionEvaluator::new(&values);

        assert_eq!(
            evaluator
                .evaluate(&Expression::column(0, DataType::Int32))
                .unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            evaluator
                .evaluate(&Expression::column(1, DataType::Varchar))
                .unwrap(),
            Value::String("test".to_string())
        );

        // Out of bounds
        assert_eq!(
            evaluator
                .evaluate(&Expression::column(3, DataType::Int32))
                .unwrap_err(),
            ExpressionError::ColumnIndexOutOfBounds {
                index: 3,
                row_size: 3
            }
        );
    }

    #[test]
    fn test_unbound_attribute_fails() {
        let values = vec![Value::Int32(1)];
        assert!(matches!(
            poison(DataType::Int32).evaluate(&values),
            Err(ExpressionError::UnboundAttribute { .. })
        ));
    }

    #[test]
    fn test_and_or_truth_tables() {
        let inputs = [Some(true), Some(false), None];
        let values: Vec<Value> = vec![];

        for left in inputs {
            for right in inputs {
                let expected_and = match (left, right) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                };
                let expected_or = match (left, right) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                };

                let and = Expression::and(tri(left), tri(right));
                assert_eq!(
                    and.evaluate(&values).unwrap(),
                    tri_value(expected_and),
                    "{:?} AND {:?}",
                    left,
                    right
                );

                let or = Expression::or(tri(left), tri(right));
                assert_eq!(
                    or.evaluate(&values).unwrap(),
                    tri_value(expected_or),
                    "{:?} OR {:?}",
                    left,
                    right
                );
            }
        }
    }

    #[test]
    fn test_not() {
        let values: Vec<Value> = vec![];
        assert_eq!(
            Expression::not_expr(tri(Some(true))).evaluate(&values).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            Expression::not_expr(tri(None)).evaluate(&values).unwrap(),
            Value::Null
        );
        assert!(matches!(
            Expression::not_expr(lit(Value::Int32(1))).evaluate(&values),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));
    }

    #[test]
    fn test_short_circuit() {
        let values: Vec<Value> = vec![];

        let and = Expression::and(tri(Some(false)), poison(DataType::Boolean));
        assert_eq!(and.evaluate(&values).unwrap(), Value::Boolean(false));

        let or = Expression::or(tri(Some(true)), poison(DataType::Boolean));
        assert_eq!(or.evaluate(&values).unwrap(), Value::Boolean(true));

        // A NULL left operand does not short-circuit
        let and = Expression::and(tri(None), poison(DataType::Boolean));
        assert!(and.evaluate(&values).is_err());
    }

    #[test]
    fn test_null_checks() {
        let values = vec![Value::Null, Value::Int32(5)];
        let evaluator = ExpressionEvaluator::new(&values);

        let expr = Expression::is_null(Expression::column(0, DataType::Int32));
        assert_eq!(evaluator.evaluate(&expr).unwrap(), Value::Boolean(true));

        let expr = Expression::is_not_null(Expression::column(1, DataType::Int32));
        assert_eq!(evaluator.evaluate(&expr).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_equality_null_semantics() {
        let values: Vec<Value> = vec![];
        let non_null = [
            Value::Int32(1),
            Value::String("a".to_string()),
            Value::Boolean(false),
            Value::Binary(vec![0]),
        ];

        for x in non_null {
            let null = Expression::null(x.data_type().unwrap());
            assert_eq!(
                Expression::eq(lit(x.clone()), null.clone())
                    .evaluate(&values)
                    .unwrap(),
                Value::Null
            );
            assert_eq!(
                Expression::eq_null_safe(lit(x.clone()), null.clone())
                    .evaluate(&values)
                    .unwrap(),
                Value::Boolean(false)
            );
            assert_eq!(
                Expression::eq_null_safe(null, lit(x))
                    .evaluate(&values)
                    .unwrap(),
                Value::Boolean(false)
            );
        }

        let null = Expression::null(DataType::Int32);
        assert_eq!(
            Expression::eq(null.clone(), null.clone())
                .evaluate(&values)
                .unwrap(),
            Value::Null
        );
        assert_eq!(
            Expression::eq_null_safe(null.clone(), null)
                .evaluate(&values)
                .unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_equality_values() {
        let values: Vec<Value> = vec![];

        let expr = Expression::eq(
            lit(Value::Binary(vec![1, 2, 3])),
            lit(Value::Binary(vec![1, 2, 3])),
        );
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));

        let expr = Expression::eq(lit(Value::Binary(vec![1, 2])), lit(Value::Binary(vec![1, 3])));
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(false));

        let expr = Expression::eq_null_safe(
            lit(Value::String("abc".to_string())),
            lit(Value::String("abc".to_string())),
        );
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));

        let expr = Expression::eq(lit(Value::Int32(5)), lit(Value::Int64(5)));
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_ordered_comparisons() {
        let values = vec![Value::Int32(3), Value::Int32(5), Value::Null];
        let a = Expression::column(0, DataType::Int32);
        let b = Expression::column(1, DataType::Int32);
        let null = Expression::column(2, DataType::Int32);

        let cases = [
            (Expression::lt(a.clone(), b.clone()), true),
            (Expression::le(a.clone(), a.clone()), true),
            (Expression::gt(a.clone(), b.clone()), false),
            (Expression::ge(b.clone(), a.clone()), true),
            (Expression::ge(a.clone(), b.clone()), false),
        ];
        for (expr, expected) in cases {
            assert_eq!(
                expr.evaluate(&values).unwrap(),
                Value::Boolean(expected),
                "{}",
                expr
            );
        }

        assert_eq!(
            Expression::lt(a.clone(), null.clone())
                .evaluate(&values)
                .unwrap(),
            Value::Null
        );
        assert_eq!(
            Expression::gt(null, b).evaluate(&values).unwrap(),
            Value::Null
        );

        let expr = Expression::lt(
            lit(Value::String("abc".to_string())),
            lit(Value::String("abd".to_string())),
        );
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_ordering_type_mismatch_fails_even_with_null_operand() {
        let values = vec![Value::Null];
        let expr = Expression::lt(
            Expression::column(0, DataType::Int32),
            lit(Value::String("x".to_string())),
        );
        assert_eq!(
            expr.evaluate(&values).unwrap_err(),
            ExpressionError::TypeMismatch {
                left: DataType::Int32,
                right: DataType::Varchar,
                context: "<".to_string(),
            }
        );

        let expr = Expression::gt(lit(Value::Binary(vec![1])), lit(Value::Binary(vec![2])));
        assert!(matches!(
            expr.evaluate(&values),
            Err(ExpressionError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_in_list() {
        let values = vec![Value::Int32(2), Value::Null];
        let value = Expression::column(0, DataType::Int32);
        let null = Expression::column(1, DataType::Int32);

        let expr = Expression::in_list(
            value.clone(),
            vec![lit(Value::Int32(1)), lit(Value::Int32(2))],
        );
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));

        let expr = Expression::in_list(value.clone(), vec![lit(Value::Int32(1))]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(false));

        // No match with a NULL candidate is unknown
        let expr = Expression::in_list(value.clone(), vec![lit(Value::Int32(1)), null.clone()]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Null);

        // A match wins over NULL candidates
        let expr = Expression::in_list(value.clone(), vec![null.clone(), lit(Value::Int32(2))]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));

        // NULL value
        let expr = Expression::in_list(null, vec![lit(Value::Int32(2))]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Null);

        // Scan stops at the first match
        let expr = Expression::in_list(
            value,
            vec![lit(Value::Int32(2)), poison(DataType::Int32)],
        );
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_in_set_matches_in_list() {
        let candidates = vec![Value::Int32(1), Value::Int32(3)];
        let with_null = vec![Value::Int32(1), Value::Null];

        for needle in [Value::Int32(1), Value::Int32(2), Value::Null] {
            let row = vec![needle.clone()];
            let value = Expression::column(0, DataType::Int32);

            for list in [&candidates, &with_null] {
                let in_list = Expression::in_list(
                    value.clone(),
                    list.iter().cloned().map(Expression::literal).collect(),
                );
                let in_set = Expression::in_set(value.clone(), list.iter().cloned());
                assert_eq!(
                    in_list.evaluate(&row).unwrap(),
                    in_set.evaluate(&row).unwrap(),
                    "needle {:?} in {:?}",
                    needle,
                    list
                );
            }
        }
    }

    #[test]
    fn test_if() {
        let values: Vec<Value> = vec![];
        let t = lit(Value::String("T".to_string()));
        let f = lit(Value::String("F".to_string()));

        let expr = Expression::if_then_else(tri(Some(true)), t.clone(), f.clone());
        assert_eq!(expr.evaluate(&values).unwrap(), Value::String("T".to_string()));

        let expr = Expression::if_then_else(tri(Some(false)), t.clone(), f.clone());
        assert_eq!(expr.evaluate(&values).unwrap(), Value::String("F".to_string()));

        // NULL predicate takes the false branch
        let expr = Expression::if_then_else(tri(None), t.clone(), f);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::String("F".to_string()));

        // Only the selected branch is evaluated
        let expr = Expression::if_then_else(tri(Some(true)), t, poison(DataType::Varchar));
        assert_eq!(expr.evaluate(&values).unwrap(), Value::String("T".to_string()));
    }

    #[test]
    fn test_case_when_first_match() {
        let values: Vec<Value> = vec![];
        let expr = Expression::case_when(vec![
            tri(Some(false)),
            lit(Value::Int32(1)),
            tri(Some(true)),
            lit(Value::Int32(2)),
            poison(DataType::Boolean),
            poison(DataType::Int32),
            poison(DataType::Int32),
        ]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Int32(2));
    }

    #[test]
    fn test_case_when_fallthrough() {
        let values: Vec<Value> = vec![];

        // No ELSE: NULL
        let expr = Expression::case_when(vec![tri(Some(false)), lit(Value::Int32(1))]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Null);

        // NULL condition does not match
        let expr = Expression::case_when(vec![tri(None), lit(Value::Int32(1)), lit(Value::Int32(9))]);
        assert_eq!(expr.evaluate(&values).unwrap(), Value::Int32(9));
    }

    #[test]
    fn test_expression_to_predicate() {
        let pred = expression_to_predicate(Expression::gt(
            Expression::column(0, DataType::Int32),
            lit(Value::Int32(10)),
        ));

        assert!(pred(&[Value::Int32(11)]));
        assert!(!pred(&[Value::Int32(10)]));
        assert!(!pred(&[Value::Null])); // unknown rejects the row
        assert!(!pred(&[])); // evaluation error rejects the row
    }
}
