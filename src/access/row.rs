//! Positional row access.

use crate::access::Value;

/// An ordered, fixed-length sequence of values addressed by ordinal.
///
/// Implementations perform no type checking: a resolved expression tree is
/// trusted to read the types the producing schema declares.
pub trait Row {
    /// Number of columns in the row
    fn len(&self) -> usize;

    /// Value at `ordinal`, or `None` past the end of the row
    fn get(&self, ordinal: usize) -> Option<&Value>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Row for [Value] {
    fn len(&self) -> usize {
        <[Value]>::len(self)
    }

    fn get(&self, ordinal: usize) -> Option<&Value> {
        <[Value]>::get(self, ordinal)
    }
}

impl Row for Vec<Value> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, ordinal: usize) -> Option<&Value> {
        self.as_slice().get(ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_row_access() {
        let values = vec![Value::Int32(1), Value::Null, Value::String("x".to_string())];
        let row: &[Value] = &values;

        assert_eq!(Row::len(row), 3);
        assert_eq!(Row::get(row, 0), Some(&Value::Int32(1)));
        assert_eq!(Row::get(row, 1), Some(&Value::Null));
        assert_eq!(Row::get(row, 3), None);
    }

    #[test]
    fn test_vec_row_access() {
        let row: Vec<Value> = vec![];
        assert!(Row::is_empty(&row));
        assert_eq!(Row::get(&row, 0), None);
    }
}
