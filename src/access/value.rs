use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Data types a value or expression can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of an untyped NULL literal
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    Varchar,
    Binary,
}

impl DataType {
    /// Whether values of this type have a total ordering usable by
    /// `<`, `<=`, `>` and `>=`.
    pub fn is_orderable(&self) -> bool {
        match self {
            DataType::Boolean
            | DataType::Int32
            | DataType::Int64
            | DataType::Float64
            | DataType::Varchar => true,
            DataType::Null | DataType::Binary => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Float64)
    }
}

/// Values that flow through expression evaluation
///
/// Equality on `Value` itself is the strict "native" equality: two values are
/// equal only when they are the same variant with the same payload. Floats
/// compare by bit pattern, with all NaNs equal to each other, so that values
/// can live in hash sets. SQL `=` semantics are provided by [`Value::sql_equals`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::String(_) => Some(DataType::Varchar),
            Value::Binary(_) => Some(DataType::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is compatible with the given data type
    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match (self, data_type) {
            (Value::Null, _) => true, // NULL is compatible with any type
            (Value::Boolean(_), DataType::Boolean) => true,
            (Value::Int32(_), DataType::Int32) => true,
            (Value::Int64(_), DataType::Int64) => true,
            (Value::Float64(_), DataType::Float64) => true,
            (Value::String(_), DataType::Varchar) => true,
            (Value::Binary(_), DataType::Binary) => true,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Value equality as used by SQL `=`.
    ///
    /// Binary payloads compare byte-wise. Numeric values compare by numeric
    /// value across Int32/Int64/Float64 without rounding: an integer only
    /// equals a float holding exactly that integer. Floats use IEEE semantics
    /// (NaN never equals anything, `0.0 == -0.0`). Every other kind
    /// only equals a value of the same kind. Callers handle NULL before
    /// reaching this point.
    pub fn sql_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Binary(a), Value::Binary(b)) => a.as_slice() == b.as_slice(),
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Float64(f), other) | (other, Value::Float64(f)) => other
                .as_i64()
                .map_or(false, |n| float_equals_int(*f, n)),
            (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
                self.as_i64() == other.as_i64()
            }
            _ => self == other,
        }
    }
}

/// Exact comparison of a float with an integer; no value is rounded
fn float_equals_int(f: f64, n: i64) -> bool {
    // 2^63, exactly representable
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) && f as i64 == n
}

fn canonical_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::Int64(n) => n.hash(state),
            Value::Float64(f) => canonical_bits(*f).hash(state),
            Value::String(s) => s.hash(state),
            Value::Binary(bytes) => bytes.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float64(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Binary(bytes) => {
                write!(f, "X'")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                write!(f, "'")
            }
        }
    }
}
