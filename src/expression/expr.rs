//! Expression tree definitions.

use crate::access::{DataType, Value};
use crate::expression::operator::{ComparisonOperator, LogicalOperator, UnaryOperator};
use crate::expression::ordering::NativeOrdering;
use crate::expression::{ExpressionError, ExpressionResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::OnceLock;

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a named attribute, independent of its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u64);

impl ExprId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Column reference already bound to a row position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Column index in the row (0-based)
    pub index: usize,
    pub data_type: DataType,
    pub nullable: bool,
    /// Optional column name for debugging/display
    pub name: Option<String>,
}

impl ColumnRef {
    pub fn new(index: usize, data_type: DataType) -> Self {
        Self {
            index,
            data_type,
            nullable: true,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Named attribute that has not been bound to a row position yet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    pub id: ExprId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl AttributeRef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: ExprId::next(),
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Literal value in an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
}

impl Literal {
    /// Literal typed after its value; NULL gets the untyped `DataType::Null`
    pub fn new(value: Value) -> Self {
        let data_type = value.data_type().unwrap_or(DataType::Null);
        Self { value, data_type }
    }

    /// NULL literal of a specific type
    pub fn null(data_type: DataType) -> Self {
        Self {
            value: Value::Null,
            data_type,
        }
    }

    pub fn bool(val: bool) -> Self {
        Self::new(Value::Boolean(val))
    }

    pub fn int32(val: i32) -> Self {
        Self::new(Value::Int32(val))
    }

    pub fn int64(val: i64) -> Self {
        Self::new(Value::Int64(val))
    }

    pub fn float64(val: f64) -> Self {
        Self::new(Value::Float64(val))
    }

    pub fn string(val: impl Into<String>) -> Self {
        Self::new(Value::String(val.into()))
    }

    pub fn binary(val: impl Into<Vec<u8>>) -> Self {
        Self::new(Value::Binary(val.into()))
    }
}

/// Two-operand comparison with its lazily derived ordering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryComparison {
    op: ComparisonOperator,
    left: Box<Expression>,
    right: Box<Expression>,
    #[serde(skip)]
    ordering: OnceLock<ExpressionResult<NativeOrdering>>,
}

impl BinaryComparison {
    pub fn new(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ordering: OnceLock::new(),
        }
    }

    pub fn op(&self) -> ComparisonOperator {
        self.op
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    /// Ordering shared by both operands, derived on first use and cached
    /// (failures included) for the lifetime of the node.
    pub fn ordering(&self) -> ExpressionResult<NativeOrdering> {
        self.ordering
            .get_or_init(|| {
                let left = self.left.data_type()?;
                let right = self.right.data_type()?;
                let ordering = NativeOrdering::for_operands(left, right, self.op.as_str())?;
                debug!(
                    "derived {:?} ordering for {}",
                    ordering.data_type(),
                    self.op.as_str()
                );
                Ok(ordering)
            })
            .clone()
    }
}

impl PartialEq for BinaryComparison {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.left == other.left && self.right == other.right
    }
}

/// CASE expression stored as a flat branch list.
///
/// Elements pair up as `(condition, value)` in declared order; when the list
/// has odd length the trailing unpaired element is the ELSE value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseWhen {
    branches: Vec<Expression>,
}

impl CaseWhen {
    pub fn new(branches: Vec<Expression>) -> Self {
        Self { branches }
    }

    pub fn branches(&self) -> &[Expression] {
        &self.branches
    }

    /// `(condition, value)` pairs in declared order
    pub fn pairs(&self) -> impl Iterator<Item = (&Expression, &Expression)> {
        self.branches
            .chunks_exact(2)
            .map(|pair| (&pair[0], &pair[1]))
    }

    pub fn else_value(&self) -> Option<&Expression> {
        if self.branches.len() % 2 == 1 {
            self.branches.last()
        } else {
            None
        }
    }

    fn result_type(&self) -> ExpressionResult<DataType> {
        if self.branches.len() < 2 {
            return Err(ExpressionError::Unresolved {
                node: "CASE".to_string(),
                reason: format!(
                    "expected at least one WHEN/THEN pair, got {} branch(es)",
                    self.branches.len()
                ),
            });
        }

        let mut value_types: Vec<DataType> = Vec::new();
        for (condition, value) in self.pairs() {
            let condition_type = condition.data_type()?;
            if !matches!(condition_type, DataType::Boolean | DataType::Null) {
                return Err(ExpressionError::Unresolved {
                    node: "CASE".to_string(),
                    reason: format!("WHEN condition must be Boolean, got {:?}", condition_type),
                });
            }
            let value_type = value.data_type()?;
            if !value_types.contains(&value_type) {
                value_types.push(value_type);
            }
        }
        if let Some(else_value) = self.else_value() {
            let else_type = else_value.data_type()?;
            if !value_types.contains(&else_type) {
                value_types.push(else_type);
            }
        }

        match value_types.as_slice() {
            [single] => Ok(*single),
            _ => Err(ExpressionError::Unresolved {
                node: "CASE".to_string(),
                reason: format!("branch values have differing types {:?}", value_types),
            }),
        }
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal constant value
    Literal(Literal),

    /// Column reference bound to a row position
    ColumnRef(ColumnRef),

    /// Named attribute awaiting binding
    Attribute(AttributeRef),

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// AND / OR
    Logical {
        op: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Equality or ordering comparison
    Comparison(BinaryComparison),

    /// Membership test against a list of expressions
    In {
        value: Box<Expression>,
        list: Vec<Expression>,
    },

    /// Membership test against a precomputed set of constants
    InSet {
        value: Box<Expression>,
        set: HashSet<Value>,
    },

    /// Two-way conditional
    If {
        predicate: Box<Expression>,
        true_value: Box<Expression>,
        false_value: Box<Expression>,
    },

    /// CASE WHEN ... THEN ... [ELSE ...] END
    CaseWhen(CaseWhen),
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: Value) -> Self {
        Expression::Literal(Literal::new(value))
    }

    /// Create a typed NULL literal
    pub fn null(data_type: DataType) -> Self {
        Expression::Literal(Literal::null(data_type))
    }

    /// Create a bound column reference expression
    pub fn column(index: usize, data_type: DataType) -> Self {
        Expression::ColumnRef(ColumnRef::new(index, data_type))
    }

    /// Create a bound column reference with name
    pub fn column_with_name(index: usize, data_type: DataType, name: impl Into<String>) -> Self {
        Expression::ColumnRef(ColumnRef::new(index, data_type).with_name(name))
    }

    /// Create an unbound attribute reference
    pub fn attribute(attr: &AttributeRef) -> Self {
        Expression::Attribute(attr.clone())
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a NOT expression
    pub fn not_expr(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Not, operand)
    }

    /// Create an IS NULL expression
    pub fn is_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNull, operand)
    }

    /// Create an IS NOT NULL expression
    pub fn is_not_null(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::IsNotNull, operand)
    }

    pub fn logical(op: LogicalOperator, left: Expression, right: Expression) -> Self {
        Expression::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create an AND expression
    pub fn and(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperator::And, left, right)
    }

    /// Create an OR expression
    pub fn or(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperator::Or, left, right)
    }

    pub fn comparison(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Expression::Comparison(BinaryComparison::new(op, left, right))
    }

    /// Create an equality expression
    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::EqualTo, left, right)
    }

    /// Create a NULL-safe equality expression
    pub fn eq_null_safe(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::EqualNullSafe, left, right)
    }

    /// Create a less-than expression
    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::LessThan, left, right)
    }

    /// Create a less-than-or-equal expression
    pub fn le(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::LessThanOrEqual, left, right)
    }

    /// Create a greater-than expression
    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::GreaterThan, left, right)
    }

    /// Create a greater-than-or-equal expression
    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::GreaterThanOrEqual, left, right)
    }

    /// Create an IN expression
    pub fn in_list(value: Expression, list: Vec<Expression>) -> Self {
        Expression::In {
            value: Box::new(value),
            list,
        }
    }

    /// Create an IN expression over a set of constants
    pub fn in_set(value: Expression, set: impl IntoIterator<Item = Value>) -> Self {
        Expression::InSet {
            value: Box::new(value),
            set: set.into_iter().collect(),
        }
    }

    /// Create an IF expression
    pub fn if_then_else(predicate: Expression, true_value: Expression, false_value: Expression) -> Self {
        Expression::If {
            predicate: Box::new(predicate),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        }
    }

    /// Create a CASE expression from its flat branch list
    pub fn case_when(branches: Vec<Expression>) -> Self {
        Expression::CaseWhen(CaseWhen::new(branches))
    }

    /// Create a CASE expression from WHEN/THEN pairs and an optional ELSE
    pub fn case(when_then: Vec<(Expression, Expression)>, else_value: Option<Expression>) -> Self {
        let mut branches: Vec<Expression> = when_then
            .into_iter()
            .flat_map(|(condition, value)| [condition, value])
            .collect();
        branches.extend(else_value);
        Self::case_when(branches)
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_) | Expression::ColumnRef(_) | Expression::Attribute(_) => {
                vec![]
            }
            Expression::UnaryOp { operand, .. } => vec![operand.as_ref()],
            Expression::Logical { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::Comparison(cmp) => vec![cmp.left(), cmp.right()],
            Expression::In { value, list } => {
                std::iter::once(value.as_ref()).chain(list.iter()).collect()
            }
            Expression::InSet { value, .. } => vec![value.as_ref()],
            Expression::If {
                predicate,
                true_value,
                false_value,
            } => vec![
                predicate.as_ref(),
                true_value.as_ref(),
                false_value.as_ref(),
            ],
            Expression::CaseWhen(case) => case.branches().iter().collect(),
        }
    }

    /// Declared result type.
    ///
    /// Fails when this node or any descendant does not satisfy its type rules.
    pub fn data_type(&self) -> ExpressionResult<DataType> {
        match self {
            Expression::Literal(lit) => Ok(lit.data_type),
            Expression::ColumnRef(col) => Ok(col.data_type),
            Expression::Attribute(attr) => Ok(attr.data_type),

            Expression::UnaryOp { op, operand } => {
                let operand_type = operand.data_type()?;
                op.output_type(operand_type)
                    .ok_or_else(|| ExpressionError::Unresolved {
                        node: op.as_str().to_string(),
                        reason: format!("operand must be Boolean, got {:?}", operand_type),
                    })
            }

            Expression::Logical { op, left, right } => {
                let left_type = left.data_type()?;
                let right_type = right.data_type()?;
                op.output_type(left_type, right_type)
                    .ok_or_else(|| ExpressionError::Unresolved {
                        node: op.as_str().to_string(),
                        reason: format!(
                            "operands must be Boolean, got {:?} and {:?}",
                            left_type, right_type
                        ),
                    })
            }

            Expression::Comparison(cmp) => {
                cmp.left().data_type()?;
                cmp.right().data_type()?;
                if cmp.op().is_ordering() {
                    cmp.ordering()?;
                }
                Ok(DataType::Boolean)
            }

            Expression::In { value, list } => {
                value.data_type()?;
                for candidate in list {
                    candidate.data_type()?;
                }
                Ok(DataType::Boolean)
            }

            Expression::InSet { value, .. } => {
                value.data_type()?;
                Ok(DataType::Boolean)
            }

            Expression::If {
                predicate,
                true_value,
                false_value,
            } => {
                let predicate_type = predicate.data_type()?;
                if !matches!(predicate_type, DataType::Boolean | DataType::Null) {
                    return Err(ExpressionError::Unresolved {
                        node: "if".to_string(),
                        reason: format!("predicate must be Boolean, got {:?}", predicate_type),
                    });
                }
                let true_type = true_value.data_type()?;
                let false_type = false_value.data_type()?;
                if true_type != false_type {
                    return Err(ExpressionError::Unresolved {
                        node: "if".to_string(),
                        reason: format!(
                            "branch types differ: {:?} vs {:?}",
                            true_type, false_type
                        ),
                    });
                }
                Ok(true_type)
            }

            Expression::CaseWhen(case) => case.result_type(),
        }
    }

    /// Whether this node and all of its descendants pass their type checks
    pub fn resolved(&self) -> bool {
        self.data_type().is_ok()
    }

    /// Whether evaluation may produce NULL
    pub fn nullable(&self) -> bool {
        match self {
            Expression::Literal(lit) => lit.value.is_null(),
            Expression::ColumnRef(col) => col.nullable,
            Expression::Attribute(attr) => attr.nullable,
            Expression::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => operand.nullable(),
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => false,
            },
            Expression::Logical { left, right, .. } => left.nullable() || right.nullable(),
            Expression::Comparison(cmp) => match cmp.op() {
                ComparisonOperator::EqualNullSafe => false,
                _ => cmp.left().nullable() || cmp.right().nullable(),
            },
            // Conservative: NULL interaction depends on runtime candidates
            Expression::In { .. } | Expression::InSet { .. } => true,
            Expression::If {
                true_value,
                false_value,
                ..
            } => true_value.nullable() || false_value.nullable(),
            Expression::CaseWhen(case) => {
                case.pairs().any(|(_, value)| value.nullable())
                    || case.else_value().map_or(true, |e| e.nullable())
            }
        }
    }

    /// Whether the value can be computed once without any input row
    pub fn foldable(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::ColumnRef(_) | Expression::Attribute(_) => false,
            _ => self.children().into_iter().all(|child| child.foldable()),
        }
    }

    /// Ids of every unbound attribute referenced anywhere in the tree
    pub fn references(&self) -> HashSet<ExprId> {
        let mut ids = HashSet::new();
        self.collect_references(&mut ids);
        ids
    }

    fn collect_references(&self, ids: &mut HashSet<ExprId>) {
        if let Expression::Attribute(attr) = self {
            ids.insert(attr.id);
        }
        for child in self.children() {
            child.collect_references(ids);
        }
    }

    /// Rebuild this node with each direct child replaced by `f(child)`
    pub fn map_children<F>(self, f: &mut F) -> ExpressionResult<Expression>
    where
        F: FnMut(Expression) -> ExpressionResult<Expression>,
    {
        let mapped = match self {
            leaf @ (Expression::Literal(_) | Expression::ColumnRef(_) | Expression::Attribute(_)) => {
                leaf
            }
            Expression::UnaryOp { op, operand } => Expression::unary_op(op, f(*operand)?),
            Expression::Logical { op, left, right } => {
                let left = f(*left)?;
                Expression::logical(op, left, f(*right)?)
            }
            // Rebuilt through the constructor so the ordering is derived afresh
            Expression::Comparison(cmp) => {
                let left = f(*cmp.left)?;
                Expression::comparison(cmp.op, left, f(*cmp.right)?)
            }
            Expression::In { value, list } => {
                let value = f(*value)?;
                let list = list
                    .into_iter()
                    .map(|candidate| f(candidate))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Expression::in_list(value, list)
            }
            Expression::InSet { value, set } => Expression::InSet {
                value: Box::new(f(*value)?),
                set,
            },
            Expression::If {
                predicate,
                true_value,
                false_value,
            } => {
                let predicate = f(*predicate)?;
                let true_value = f(*true_value)?;
                Expression::if_then_else(predicate, true_value, f(*false_value)?)
            }
            Expression::CaseWhen(case) => Expression::case_when(
                case.branches
                    .into_iter()
                    .map(|branch| f(branch))
                    .collect::<ExpressionResult<Vec<_>>>()?,
            ),
        };
        Ok(mapped)
    }

    /// Rewrite the tree bottom-up: children first, then `f` on the rebuilt node
    pub fn transform_up<F>(self, f: &mut F) -> ExpressionResult<Expression>
    where
        F: FnMut(Expression) -> ExpressionResult<Expression>,
    {
        let rebuilt = self.map_children(&mut |child: Expression| child.transform_up(&mut *f))?;
        f(rebuilt)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    write!(f, "({})", items.join(","))
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit.value),
            Expression::ColumnRef(col) => match &col.name {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "input[{}]", col.index),
            },
            Expression::Attribute(attr) => write!(f, "{}#{}", attr.name, attr.id.0),
            Expression::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => write!(f, "NOT {}", operand),
                _ => write!(f, "{} {}", operand, op.as_str()),
            },
            Expression::Logical { op, left, right } => {
                write!(f, "({} {} {})", left, op.as_str(), right)
            }
            Expression::Comparison(cmp) => {
                write!(f, "({} {} {})", cmp.left(), cmp.op().as_str(), cmp.right())
            }
            Expression::In { value, list } => {
                write!(f, "{} IN ", value)?;
                let items: Vec<String> = list.iter().map(|e| e.to_string()).collect();
                write_list(f, &items)
            }
            Expression::InSet { value, set } => {
                write!(f, "{} INSET ", value)?;
                let mut items: Vec<String> = set.iter().map(|v| v.to_string()).collect();
                items.sort();
                write_list(f, &items)
            }
            Expression::If {
                predicate,
                true_value,
                false_value,
            } => write!(f, "if ({}) {} else {}", predicate, true_value, false_value),
            Expression::CaseWhen(case) => {
                write!(f, "CASE")?;
                for (condition, value) in case.pairs() {
                    write!(f, " WHEN {} THEN {}", condition, value)?;
                }
                if let Some(else_value) = case.else_value() {
                    write!(f, " ELSE {}", else_value)?;
                }
                write!(f, " END")
            }
        }
    }
}
