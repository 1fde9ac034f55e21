//! A locally materialized mirror of a remote ordered collection.
//!
//! A [`MaterializedList`] is only ever mutated by applying ordered batches of
//! [`UpdateOp`]s (or by an in-place replacement of existing entries).
//! All writers are serialized by a single mutex, while readers only ever see the
//! last *published* snapshot, which is replaced atomically at the end of each batch.

use std::sync::{Mutex, MutexGuard, PoisonError};

use eyeball::{SharedObservable, Subscriber};
use imbl::Vector;
use tracing::error;

use crate::{error::IntegrityError, update_op::UpdateOp};


/// The state guarded by the writer lock.
struct WriterState<T: Clone> {
    /// The list as of the end of the last successfully-applied batch.
    /// This is always identical to the published snapshot.
    current: Vector<T>,
    /// Set once an integrity fault has been observed; the list then refuses further updates.
    fault: Option<IntegrityError>,
}

/// An owned, ordered, index-addressable list kept in sync via [`UpdateOp`] batches.
pub struct MaterializedList<T: Clone + Send + Sync + 'static> {
    writer: Mutex<WriterState<T>>,
    published: SharedObservable<Vector<T>>,
}

impl<T: Clone + Send + Sync + 'static> Default for MaterializedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> MaterializedList<T> {
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(WriterState {
                current: Vector::new(),
                fault: None,
            }),
            published: SharedObservable::new(Vector::new()),
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState<T>> {
        // The guarded state is only ever replaced wholesale, so it is always
        // consistent even if a previous holder panicked.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the last published snapshot.
    ///
    /// This never waits on a writer; it reflects either the state before or after
    /// any concurrently-running batch, never a partially-applied one.
    pub fn snapshot(&self) -> Vector<T> {
        self.published.get()
    }

    /// Subscribes to published snapshots (replay-latest: the subscriber starts
    /// with the current snapshot and may skip intermediate ones if it falls behind).
    pub fn subscribe(&self) -> Subscriber<Vector<T>> {
        self.published.subscribe()
    }

    /// Returns the integrity fault that stopped this list, if any.
    pub fn fault(&self) -> Option<IntegrityError> {
        self.lock_writer().fault.clone()
    }

    /// Marks this list as faulted by an integrity error found outside of a batch.
    ///
    /// The published snapshot is kept; every later write is rejected.
    /// An earlier fault is never overwritten.
    pub fn record_fault(&self, fault: IntegrityError) {
        let mut writer = self.lock_writer();
        if writer.fault.is_none() {
            writer.fault = Some(fault);
        }
    }

    /// Applies an ordered batch of ops and publishes the resulting snapshot.
    ///
    /// Only the end-of-batch state is published. If any op in the batch is invalid,
    /// nothing is published, the list becomes faulted, and the error is returned.
    /// A faulted list rejects every later batch with [`IntegrityError::Faulted`].
    pub fn apply(&self, ops: impl IntoIterator<Item = UpdateOp<T>>) -> Result<(), IntegrityError> {
        let mut writer = self.lock_writer();
        if writer.fault.is_some() {
            return Err(IntegrityError::Faulted);
        }
        // Cloning an `imbl::Vector` is O(1); only the touched nodes get copied.
        let mut working = writer.current.clone();
        for op in ops {
            if let Err(e) = op.apply_to(&mut working) {
                error!("Materialized list integrity fault, discarding batch: {e}");
                writer.fault = Some(e.clone());
                return Err(e);
            }
        }
        writer.current = working.clone();
        self.published.set(working);
        Ok(())
    }

    /// Replaces existing entries in place, preserving the list's order and length.
    ///
    /// For every item currently in the list, `replacement` is called and may return
    /// a new value for that item. The list is published once, and only if at least
    /// one item was replaced. Returns the number of replaced items.
    ///
    /// The writer lock is held for the duration of this call, so `replacement`
    /// must not perform any I/O.
    pub fn replace_in_place(&self, mut replacement: impl FnMut(&T) -> Option<T>) -> Result<usize, IntegrityError> {
        let mut writer = self.lock_writer();
        if writer.fault.is_some() {
            return Err(IntegrityError::Faulted);
        }
        let mut working = writer.current.clone();
        let mut replaced = 0;
        for index in 0..working.len() {
            let Some(new_value) = working.get(index).and_then(&mut replacement) else { continue };
            working.set(index, new_value);
            replaced += 1;
        }
        if replaced > 0 {
            writer.current = working.clone();
            self.published.set(working);
        }
        Ok(replaced)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use imbl::vector;

    #[test]
    fn test_only_end_of_batch_state_is_published() {
        let list = MaterializedList::<u32>::new();
        let mut subscriber = list.subscribe();
        list.apply([
            UpdateOp::PushBack { value: 1 },
            UpdateOp::PushBack { value: 2 },
            UpdateOp::Remove { index: 0 },
        ]).unwrap();
        assert_eq!(subscriber.next_now(), vector![2]);
        assert_eq!(list.snapshot(), vector![2]);
    }

    #[test]
    fn test_fault_keeps_last_good_snapshot() {
        let list = MaterializedList::<u32>::new();
        list.apply([UpdateOp::Append { values: vector![1, 2, 3] }]).unwrap();

        let err = list.apply([
            UpdateOp::Remove { index: 0 },
            UpdateOp::Set { index: 7, value: 9 },
        ]).unwrap_err();
        assert!(matches!(err, IntegrityError::IndexOutOfBounds { index: 7, len: 2, .. }));
        assert_eq!(list.snapshot(), vector![1, 2, 3]);
        assert_eq!(list.fault(), Some(err));

        // Further updates are refused, even valid ones.
        assert_eq!(list.apply([UpdateOp::Clear]), Err(IntegrityError::Faulted));
        assert_eq!(list.snapshot(), vector![1, 2, 3]);
    }

    #[test]
    fn test_replace_in_place_preserves_order_and_length() {
        let list = MaterializedList::<(u8, &'static str)>::new();
        list.apply([UpdateOp::Reset { values: vector![(1, "a"), (2, "b"), (3, "c")] }]).unwrap();
        let replaced = list.replace_in_place(|(id, _)| (*id != 2).then_some((*id, "fresh"))).unwrap();
        assert_eq!(replaced, 2);
        assert_eq!(list.snapshot(), vector![(1, "fresh"), (2, "b"), (3, "fresh")]);
    }

    #[test]
    fn test_replace_nothing_does_not_publish() {
        let list = MaterializedList::<u8>::new();
        list.apply([UpdateOp::PushBack { value: 4 }]).unwrap();
        let mut subscriber = list.subscribe();
        assert_eq!(list.replace_in_place(|_| None).unwrap(), 0);
        assert_eq!(subscriber.next_now(), vector![4]);
        assert!(subscriber.next().now_or_never().is_none());
    }
}
