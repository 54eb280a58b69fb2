//! Linear undo/redo history over whole snapshots.
//!
//! Every structural edit records a full copy of the element list. Recording
//! after an undo discards the undone future.

/// Snapshot history with a cursor.
///
/// Invariant: `step < snapshots.len()`, and there is always at least one
/// snapshot.
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: Vec<T>,
    step: usize,
}

impl<T: Clone> History<T> {
    /// Start a history whose only snapshot is `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            snapshots: vec![initial],
            step: 0,
        }
    }

    /// Record a new snapshot.
    ///
    /// With `overwrite`, the snapshot at the cursor is replaced in place and
    /// the history does not grow; used to coalesce in-progress gestures.
    pub fn record(&mut self, snapshot: T, overwrite: bool) {
        if overwrite {
            self.snapshots[self.step] = snapshot;
            return;
        }
        self.snapshots.truncate(self.step + 1);
        self.snapshots.push(snapshot);
        self.step = self.snapshots.len() - 1;
    }

    /// Step back. Returns whether the cursor moved.
    pub fn undo(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.step -= 1;
        true
    }

    /// Step forward. Returns whether the cursor moved.
    pub fn redo(&mut self) -> bool {
        if self.step + 1 >= self.snapshots.len() {
            return false;
        }
        self.step += 1;
        true
    }

    pub fn current(&self) -> &T {
        &self.snapshots[self.step]
    }

    pub fn can_undo(&self) -> bool {
        self.step > 0
    }

    pub fn can_redo(&self) -> bool {
        self.step + 1 < self.snapshots.len()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
