//! Access layer for row-oriented values.
//!
//! This module provides the runtime data model the expression evaluator works on:
//!
//! - **Value**: Type-safe representation of a single, possibly-NULL column value
//! - **DataType**: Supported data types and their ordering classification
//! - **Row**: Positional access to the values of one input row
//!
//! Rows are produced by whatever sits below the evaluator (scans, joins,
//! intermediate projections) and are never mutated here.

pub mod row;
pub mod value;

pub use row::Row;
pub use value::{DataType, Value};
