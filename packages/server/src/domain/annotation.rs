//! Annotation store: the room's ordered log of drawing strokes.

use super::{
    entity::{Stroke, StrokeDraft},
    value_object::{SequenceNumber, UserId},
};

/// Sequence-numbered strokes of one room.
///
/// The counter never goes backwards: undo and clear remove strokes but the
/// next stroke still gets a fresh number.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    strokes: Vec<Stroke>,
    sequence_counter: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next sequence number and store the stroke.
    pub fn add(&mut self, author: UserId, draft: StrokeDraft) -> &Stroke {
        self.sequence_counter += 1;
        let stroke = Stroke::from_draft(draft, author, SequenceNumber::new(self.sequence_counter));
        self.strokes.push(stroke);
        &self.strokes[self.strokes.len() - 1]
    }

    /// The stroke with the highest sequence number.
    pub fn last(&self) -> Option<&Stroke> {
        self.strokes.last()
    }

    /// Remove the highest-sequence stroke. `None` when empty.
    pub fn undo_last(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    /// Remove every stroke and return how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.strokes.len();
        self.strokes.clear();
        count
    }

    pub fn sequence_counter(&self) -> u64 {
        self.sequence_counter
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}
