//! Editable text with identity-tracked range markers.
//!
//! The buffer is the substrate the engine binds chips into. Markers are
//! exclusive-exclusive ranges that move with edits, and a single watch
//! registration reports marker additions and removals so the engine stays
//! synchronized with the text no matter which code path mutated it.

use std::collections::VecDeque;

/// Identifier for a bound range marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(u64);

/// What a marker carries. A chip binds one marker of each kind over the same
/// range, pairing its rendered image with its click handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// The range is occupied by an inline composite image.
    Image,
    /// The range accepts clicks on behalf of a chip.
    Click,
}

/// A bound range within the buffer. Offsets are in chars.
///
/// Ranges are exclusive on both ends: text inserted exactly at either
/// boundary is not absorbed into the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Marker identity.
    pub id: MarkerId,
    /// What the marker carries.
    pub kind: MarkerKind,
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
}

/// Structural marker change reported through the watch registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerEvent {
    /// A marker was bound inside the watch scope.
    Added(Marker),
    /// A marker inside the watch scope was unbound or evicted by an edit.
    Removed(Marker),
}

/// Editable text with range markers and a single watch registration.
///
/// The watch registration is installed once and re-scoped to cover the whole
/// buffer after each structural replacement, rather than being removed and
/// reinstalled. Events are queued during mutation and drained synchronously
/// by the engine before the mutating call returns.
#[derive(Debug, Default)]
pub struct SpanBuffer {
    /// Buffer contents.
    text: String,
    /// Bound markers in binding order.
    markers: Vec<Marker>,
    /// Next marker id to hand out.
    next_id: u64,
    /// Watch scope as a char range. Markers outside it report no events.
    scope: (usize, usize),
    /// Events queued during mutation, drained by the engine.
    events: VecDeque<MarkerEvent>,
}

impl SpanBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer contents.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Buffer length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte index of the given char offset, clamped to the buffer end.
    fn byte_at(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    /// Replace the char range `start..end` with `insert`.
    ///
    /// Offsets are clamped to the buffer bounds. Markers after the edited
    /// range shift by the length delta, markers wholly inside a replaced
    /// range are evicted and reported, and markers straddling the edit are
    /// clamped to it.
    pub fn replace(&mut self, start: usize, end: usize, insert: &str) {
        let len = self.len();
        let start = start.min(end).min(len);
        let end = end.min(len);
        let (from, to) = (self.byte_at(start), self.byte_at(end));
        self.text.replace_range(from..to, insert);

        let inserted = insert.chars().count();
        let delta = inserted as isize - (end - start) as isize;
        let mut kept = Vec::with_capacity(self.markers.len());
        for mut m in self.markers.drain(..) {
            if m.end <= start {
                // Entirely before the edit.
            } else if m.start >= end {
                // Entirely after the edit.
                m.start = (m.start as isize + delta) as usize;
                m.end = (m.end as isize + delta) as usize;
            } else if m.start >= start && m.end <= end {
                // Swallowed by the edit.
                if in_scope(self.scope, m) {
                    self.events.push_back(MarkerEvent::Removed(m));
                }
                continue;
            } else {
                // Straddles the edit. Clamp to the surviving text.
                if m.start >= start {
                    m.start = start + inserted;
                }
                if m.end <= end {
                    m.end = start;
                } else {
                    m.end = (m.end as isize + delta) as usize;
                }
            }
            kept.push(m);
        }
        self.markers = kept;
    }

    /// Append text to the end of the buffer.
    pub fn append(&mut self, text: &str) {
        let len = self.len();
        self.replace(len, len, text);
    }

    /// Delete the char range `start..end`.
    pub fn delete(&mut self, start: usize, end: usize) {
        self.replace(start, end, "");
    }

    /// Bind a marker over `start..end` and report it when in scope.
    pub fn bind(&mut self, kind: MarkerKind, start: usize, end: usize) -> MarkerId {
        let len = self.len();
        let marker = Marker {
            id: MarkerId(self.next_id),
            kind,
            start: start.min(len),
            end: end.min(len),
        };
        self.next_id += 1;
        self.markers.push(marker);
        if in_scope(self.scope, marker) {
            self.events.push_back(MarkerEvent::Added(marker));
        }
        marker.id
    }

    /// Unbind a marker and report it when in scope. Unknown ids are a no-op.
    pub fn unbind(&mut self, id: MarkerId) {
        if let Some(pos) = self.markers.iter().position(|m| m.id == id) {
            let marker = self.markers.remove(pos);
            if in_scope(self.scope, marker) {
                self.events.push_back(MarkerEvent::Removed(marker));
            }
        }
    }

    /// The current range of a marker, if it is still bound.
    pub fn range(&self, id: MarkerId) -> Option<(usize, usize)> {
        self.markers
            .iter()
            .find(|m| m.id == id)
            .map(|m| (m.start, m.end))
    }

    /// The click marker covering the given char offset, if any.
    pub fn click_marker_at(&self, offset: usize) -> Option<Marker> {
        self.markers
            .iter()
            .find(|m| m.kind == MarkerKind::Click && m.start <= offset && offset < m.end)
            .copied()
    }

    /// Re-scope the watch registration to cover the whole buffer.
    pub fn rescope(&mut self) {
        self.scope = (0, self.len());
    }

    /// Pop the next queued marker event.
    pub(crate) fn pop_event(&mut self) -> Option<MarkerEvent> {
        self.events.pop_front()
    }
}

/// Whether a marker lies within the watch scope.
fn in_scope(scope: (usize, usize), marker: Marker) -> bool {
    scope.0 <= marker.start && marker.end <= scope.1
}
