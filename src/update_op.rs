//! The closed set of structural operations that an upstream source can emit
//! against an ordered sequence.

use eyeball_im::VectorDiff;
use imbl::Vector;
use serde::{Deserialize, Serialize};

use crate::error::{IntegrityError, UpdateOpKind};


/// A single structural update to an ordered list.
///
/// Ops are always applied strictly in emission order, as each op's indices
/// are relative to the list produced by all of the ops before it.
///
/// This mirrors `eyeball_im::VectorDiff`, which is what `matrix-sdk-ui` emits,
/// and can be converted from it with `From`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
#[serde(bound(serialize = "T: Clone + Serialize", deserialize = "T: Clone + Deserialize<'de>"))]
pub enum UpdateOp<T: Clone> {
    /// Replaces the item at `index` with `value`.
    Set { index: usize, value: T },
    /// Appends all `values` to the end of the list.
    Append { values: Vector<T> },
    PushBack { value: T },
    PushFront { value: T },
    /// Inserts `value` at `index`, which may be equal to the current length.
    Insert { index: usize, value: T },
    Remove { index: usize },
    /// Replaces the entire list with `values`.
    Reset { values: Vector<T> },
    PopBack,
    PopFront,
    Clear,
    /// Drops every item at or after `length`.
    Truncate { length: usize },
}

impl<T: Clone> UpdateOp<T> {
    /// Returns the kind of this op, without its payload.
    pub fn kind(&self) -> UpdateOpKind {
        match self {
            UpdateOp::Set { .. } => UpdateOpKind::Set,
            UpdateOp::Append { .. } => UpdateOpKind::Append,
            UpdateOp::PushBack { .. } => UpdateOpKind::PushBack,
            UpdateOp::PushFront { .. } => UpdateOpKind::PushFront,
            UpdateOp::Insert { .. } => UpdateOpKind::Insert,
            UpdateOp::Remove { .. } => UpdateOpKind::Remove,
            UpdateOp::Reset { .. } => UpdateOpKind::Reset,
            UpdateOp::PopBack => UpdateOpKind::PopBack,
            UpdateOp::PopFront => UpdateOpKind::PopFront,
            UpdateOp::Clear => UpdateOpKind::Clear,
            UpdateOp::Truncate { .. } => UpdateOpKind::Truncate,
        }
    }

    /// Converts every value carried by this op, preserving the op's shape and indices.
    ///
    /// This is how raw upstream entries are turned into materialized entries
    /// without re-scanning the list: only the values in this op are touched.
    pub fn map<U: Clone>(self, mut f: impl FnMut(T) -> U) -> UpdateOp<U> {
        match self {
            UpdateOp::Set { index, value } => UpdateOp::Set { index, value: f(value) },
            UpdateOp::Append { values } => UpdateOp::Append { values: values.into_iter().map(f).collect() },
            UpdateOp::PushBack { value } => UpdateOp::PushBack { value: f(value) },
            UpdateOp::PushFront { value } => UpdateOp::PushFront { value: f(value) },
            UpdateOp::Insert { index, value } => UpdateOp::Insert { index, value: f(value) },
            UpdateOp::Remove { index } => UpdateOp::Remove { index },
            UpdateOp::Reset { values } => UpdateOp::Reset { values: values.into_iter().map(f).collect() },
            UpdateOp::PopBack => UpdateOp::PopBack,
            UpdateOp::PopFront => UpdateOp::PopFront,
            UpdateOp::Clear => UpdateOp::Clear,
            UpdateOp::Truncate { length } => UpdateOp::Truncate { length },
        }
    }

    /// Applies this op to the given `list`.
    ///
    /// Out-of-range indices are never clamped: they are reported as an [`IntegrityError`],
    /// in which case `list` is left unmodified.
    pub fn apply_to(self, list: &mut Vector<T>) -> Result<(), IntegrityError> {
        let len = list.len();
        let op = self.kind();
        match self {
            UpdateOp::Set { index, value } => {
                if index >= len {
                    return Err(IntegrityError::IndexOutOfBounds { op, index, len });
                }
                list.set(index, value);
            }
            UpdateOp::Append { values } => list.append(values),
            UpdateOp::PushBack { value } => list.push_back(value),
            UpdateOp::PushFront { value } => list.push_front(value),
            UpdateOp::Insert { index, value } => {
                if index > len {
                    return Err(IntegrityError::IndexOutOfBounds { op, index, len });
                }
                list.insert(index, value);
            }
            UpdateOp::Remove { index } => {
                if index >= len {
                    return Err(IntegrityError::IndexOutOfBounds { op, index, len });
                }
                list.remove(index);
            }
            UpdateOp::Reset { values } => *list = values,
            UpdateOp::PopBack => {
                if list.pop_back().is_none() {
                    return Err(IntegrityError::EmptyList { op });
                }
            }
            UpdateOp::PopFront => {
                if list.pop_front().is_none() {
                    return Err(IntegrityError::EmptyList { op });
                }
            }
            UpdateOp::Clear => list.clear(),
            UpdateOp::Truncate { length } => {
                if length > len {
                    return Err(IntegrityError::LengthOutOfBounds { op, length, len });
                }
                list.truncate(length);
            }
        }
        Ok(())
    }
}

impl<T: Clone> From<VectorDiff<T>> for UpdateOp<T> {
    fn from(diff: VectorDiff<T>) -> Self {
        match diff {
            VectorDiff::Append { values } => UpdateOp::Append { values },
            VectorDiff::Clear => UpdateOp::Clear,
            VectorDiff::PushFront { value } => UpdateOp::PushFront { value },
            VectorDiff::PushBack { value } => UpdateOp::PushBack { value },
            VectorDiff::PopFront => UpdateOp::PopFront,
            VectorDiff::PopBack => UpdateOp::PopBack,
            VectorDiff::Insert { index, value } => UpdateOp::Insert { index, value },
            VectorDiff::Set { index, value } => UpdateOp::Set { index, value },
            VectorDiff::Remove { index } => UpdateOp::Remove { index },
            VectorDiff::Truncate { length } => UpdateOp::Truncate { length },
            VectorDiff::Reset { values } => UpdateOp::Reset { values },
        }
    }
}

/// Applies an ordered batch of ops to a copy of `list`, returning the resulting list.
///
/// The input `list` is never modified, so a failed batch leaves no partial state behind.
pub fn apply_batch<T: Clone>(
    list: &Vector<T>,
    ops: impl IntoIterator<Item = UpdateOp<T>>,
) -> Result<Vector<T>, IntegrityError> {
    let mut working = list.clone();
    for op in ops {
        op.apply_to(&mut working)?;
    }
    Ok(working)
}


#[cfg(test)]
mod tests {
    use super::*;
    use imbl::vector;
    use proptest::prelude::*;

    fn applied(start: Vector<char>, ops: Vec<UpdateOp<char>>) -> Result<Vector<char>, IntegrityError> {
        apply_batch(&start, ops)
    }

    #[test]
    fn test_append_then_remove() {
        let list = applied(vector![], vec![
            UpdateOp::Append { values: vector!['a', 'b', 'c'] },
            UpdateOp::Remove { index: 1 },
        ]).unwrap();
        assert_eq!(list, vector!['a', 'c']);
    }

    #[test]
    fn test_reset_replaces_everything() {
        let list = applied(vector!['q', 'r', 's', 't'], vec![
            UpdateOp::Reset { values: vector!['x', 'y'] },
        ]).unwrap();
        assert_eq!(list, vector!['x', 'y']);
    }

    #[test]
    fn test_truncate() {
        let list = applied(vector!['a', 'b', 'c'], vec![UpdateOp::Truncate { length: 1 }]).unwrap();
        assert_eq!(list, vector!['a']);
    }

    #[test]
    fn test_positional_ops() {
        let list = applied(vector!['b'], vec![
            UpdateOp::PushFront { value: 'a' },
            UpdateOp::PushBack { value: 'd' },
            UpdateOp::Insert { index: 2, value: 'c' },
            UpdateOp::Insert { index: 4, value: 'e' },
            UpdateOp::Set { index: 0, value: 'A' },
            UpdateOp::PopBack,
            UpdateOp::PopFront,
        ]).unwrap();
        assert_eq!(list, vector!['b', 'c', 'd']);
    }

    #[test]
    fn test_out_of_bounds_is_not_clamped() {
        let start = vector!['a', 'b'];
        let err = applied(start.clone(), vec![UpdateOp::Set { index: 2, value: 'z' }]).unwrap_err();
        assert_eq!(err, IntegrityError::IndexOutOfBounds { op: UpdateOpKind::Set, index: 2, len: 2 });

        let err = applied(start.clone(), vec![UpdateOp::Insert { index: 3, value: 'z' }]).unwrap_err();
        assert_eq!(err, IntegrityError::IndexOutOfBounds { op: UpdateOpKind::Insert, index: 3, len: 2 });

        let err = applied(start.clone(), vec![UpdateOp::Remove { index: 5 }]).unwrap_err();
        assert_eq!(err, IntegrityError::IndexOutOfBounds { op: UpdateOpKind::Remove, index: 5, len: 2 });

        let err = applied(start, vec![UpdateOp::Truncate { length: 3 }]).unwrap_err();
        assert_eq!(err, IntegrityError::LengthOutOfBounds { op: UpdateOpKind::Truncate, length: 3, len: 2 });

        let err = applied(vector![], vec![UpdateOp::PopFront]).unwrap_err();
        assert_eq!(err, IntegrityError::EmptyList { op: UpdateOpKind::PopFront });
    }

    #[test]
    fn test_failed_batch_leaves_input_untouched() {
        let start = vector!['a', 'b'];
        let result = apply_batch(&start, vec![
            UpdateOp::Clear,
            UpdateOp::Remove { index: 0 },
        ]);
        assert!(result.is_err());
        assert_eq!(start, vector!['a', 'b']);
    }

    #[test]
    fn test_from_vector_diff() {
        let op: UpdateOp<u8> = VectorDiff::Insert { index: 3, value: 7 }.into();
        assert_eq!(op, UpdateOp::Insert { index: 3, value: 7 });
        let op: UpdateOp<u8> = VectorDiff::Truncate { length: 1 }.into();
        assert_eq!(op, UpdateOp::Truncate { length: 1 });
    }

    #[test]
    fn test_map_preserves_indices() {
        let op = UpdateOp::Set { index: 4, value: 2u32 }.map(|v| v * 10);
        assert_eq!(op, UpdateOp::Set { index: 4, value: 20u32 });
        let op = UpdateOp::Append { values: vector![1u32, 2] }.map(|v| v + 1);
        assert_eq!(op, UpdateOp::Append { values: vector![2u32, 3] });
    }

    #[test]
    fn test_serde_shape() {
        let op: UpdateOp<String> = serde_json::from_str(r#"{"op":"insert","index":0,"value":"x"}"#).unwrap();
        assert_eq!(op, UpdateOp::Insert { index: 0, value: "x".into() });
        let op: UpdateOp<String> = serde_json::from_str(r#"{"op":"pop_back"}"#).unwrap();
        assert_eq!(op, UpdateOp::PopBack);
    }

    /// Generates a sequence of ops that is always valid when applied in order to an empty list.
    fn valid_ops() -> impl Strategy<Value = Vec<UpdateOp<u16>>> {
        prop::collection::vec((0u8..11, any::<u16>(), any::<usize>(), prop::collection::vec(any::<u16>(), 0..4)), 0..40)
            .prop_map(|raw| {
                let mut len = 0usize;
                let mut ops = Vec::new();
                for (choice, value, pos, values) in raw {
                    let op = match choice {
                        0 if len > 0 => UpdateOp::Set { index: pos % len, value },
                        1 => UpdateOp::Append { values: values.into_iter().collect() },
                        2 => UpdateOp::PushBack { value },
                        3 => UpdateOp::PushFront { value },
                        4 => UpdateOp::Insert { index: pos % (len + 1), value },
                        5 if len > 0 => UpdateOp::Remove { index: pos % len },
                        6 => UpdateOp::Reset { values: values.into_iter().collect() },
                        7 if len > 0 => UpdateOp::PopBack,
                        8 if len > 0 => UpdateOp::PopFront,
                        9 => UpdateOp::Clear,
                        10 => UpdateOp::Truncate { length: pos % (len + 1) },
                        _ => UpdateOp::PushBack { value },
                    };
                    len = match &op {
                        UpdateOp::Set { .. } => len,
                        UpdateOp::Append { values } => len + values.len(),
                        UpdateOp::PushBack { .. } | UpdateOp::PushFront { .. } | UpdateOp::Insert { .. } => len + 1,
                        UpdateOp::Remove { .. } | UpdateOp::PopBack | UpdateOp::PopFront => len - 1,
                        UpdateOp::Reset { values } => values.len(),
                        UpdateOp::Clear => 0,
                        UpdateOp::Truncate { length } => *length,
                    };
                    ops.push(op);
                }
                ops
            })
    }

    proptest! {
        #[test]
        fn batching_does_not_change_the_result(ops in valid_ops()) {
            let batched = apply_batch(&Vector::new(), ops.clone()).unwrap();
            let mut one_at_a_time = Vector::new();
            for op in ops {
                one_at_a_time = apply_batch(&one_at_a_time, [op]).unwrap();
            }
            prop_assert_eq!(batched, one_at_a_time);
        }
    }
}
