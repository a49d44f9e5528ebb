//! In-memory snapshots of the VM state for save, restore and undo
use std::collections::VecDeque;

use super::frame::Frame;

#[derive(Clone, Debug, Eq, PartialEq)]
/// Complete copy of the mutable VM state
pub struct Snapshot {
    /// Address of the instruction that took the snapshot
    pc: usize,
    /// Dynamic memory
    dynamic: Vec<u8>,
    /// Value stack
    stack: Vec<u16>,
    /// Call frames
    frames: Vec<Frame>,
}

impl Snapshot {
    pub fn new(pc: usize, dynamic: Vec<u8>, stack: &[u16], frames: &[Frame]) -> Snapshot {
        Snapshot {
            pc,
            dynamic,
            stack: stack.to_vec(),
            frames: frames.to_vec(),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn dynamic(&self) -> &[u8] {
        &self.dynamic
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

#[derive(Debug)]
/// Saved game slot plus a bounded history of undo states
pub struct SnapshotStore {
    saved: Option<Snapshot>,
    undo: VecDeque<Snapshot>,
    undo_limit: usize,
}

impl SnapshotStore {
    pub fn new(undo_limit: usize) -> SnapshotStore {
        SnapshotStore {
            saved: None,
            undo: VecDeque::new(),
            undo_limit,
        }
    }

    /// Replace the saved game slot
    pub fn save(&mut self, snapshot: Snapshot) {
        debug!(target: "app::state", "Save snapshot at ${:05x}", snapshot.pc());
        self.saved = Some(snapshot);
    }

    /// Get the saved game
    ///
    /// # Returns
    /// [Option] with a copy of the saved [Snapshot]
    pub fn restore(&self) -> Option<Snapshot> {
        self.saved.clone()
    }

    /// Record an undo state, discarding the oldest if the history is full
    ///
    /// # Returns
    /// `true` if the state was recorded, `false` if undo is disabled
    pub fn save_undo(&mut self, snapshot: Snapshot) -> bool {
        if self.undo_limit == 0 {
            return false;
        }

        if self.undo.len() == self.undo_limit {
            self.undo.pop_front();
        }
        debug!(target: "app::state", "Undo snapshot at ${:05x} [{}]", snapshot.pc(), self.undo.len() + 1);
        self.undo.push_back(snapshot);
        true
    }

    /// Take the most recent undo state
    pub fn restore_undo(&mut self) -> Option<Snapshot> {
        self.undo.pop_back()
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }
}
