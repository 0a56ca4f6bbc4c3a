//! Expression evaluation framework for query execution.
//!
//! This module provides:
//! - Expression tree representation with typed, bound leaves
//! - Type checking and resolution of predicates, comparisons and conditionals
//! - Three-valued evaluation of expressions against rows
//! - Predicate decomposition and binding helpers for planners

pub mod error;
pub mod eval;
pub mod expr;
pub mod operator;
pub mod ordering;
pub mod predicate;
pub mod type_checker;

pub use error::{ExpressionError, ExpressionResult};
pub use eval::{evaluate_expression, expression_to_predicate, ExpressionEvaluator, Predicate};
pub use expr::{AttributeRef, BinaryComparison, CaseWhen, ColumnRef, ExprId, Expression, Literal};
pub use operator::{ComparisonOperator, LogicalOperator, UnaryOperator};
pub use ordering::NativeOrdering;
pub use predicate::{
    bind_references, can_evaluate_with_output, combine_conjuncts, combine_disjuncts,
    split_conjuncts, split_disjuncts, InterpretedPredicate,
};
pub use type_checker::{type_check_expression, validate_filter_predicate, TypeChecker};
