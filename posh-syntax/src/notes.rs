//! Side-band parser state ("notes") threaded through the token stream.
//!
//! The grammar is context-sensitive: a here-document body is introduced by a
//! `<<TAG` operator several tokens before the newline that starts it, and its
//! content lives between that later newline and a line matching `TAG`. The
//! parser cannot carry this as an ordinary parameter because backtracking
//! must undo it along with everything else the failed branch tried.
//!
//! [`Notes`] solves this by indexing side-band state by byte position:
//! `notes_for(i)` returns the freshest annotation at or before `i`, and
//! `notes_update(i, ..)` truncates any annotation at or after `i` before
//! appending a new one. Because [`Notes`] is part of the [`Cursor`](crate::parser::Cursor)
//! that every combinator clones before attempting a branch, a reparse after
//! backtracking naturally starts from (and then overwrites) whatever notes
//! existed before the failed attempt touched that position.

use std::collections::VecDeque;

/// A here-document descriptor queued while parsing a command, waiting for
/// the `eol` parser to fill in its body once the terminating delimiter line
/// is found.
#[derive(Clone, Debug, PartialEq)]
pub struct HeredocDescriptor {
    /// The delimiter text that ends the here-document body.
    pub end: String,
    /// Whether the delimiter was quoted in `<<'TAG'` / `<<"TAG"`, which
    /// disables expansion of the body.
    pub quoted: bool,
    /// Index into [`crate::syntax::Command`]'s redirect list of the
    /// `RedirBody::Here` placeholder this descriptor will back-fill.
    pub slot: HeredocSlot,
}

/// A handle identifying which pending [`crate::syntax::HereDoc`] a
/// [`HeredocDescriptor`] will fill in, shared with the AST node via `Rc` so
/// the back-fill in `eol` is visible to the already-built tree.
pub type HeredocSlot = crate::syntax::HereDocHandle;

/// Annotation carried at a given position in the source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteData {
    /// Pending here-documents, oldest first. `eol` pops from the front.
    pub hds: VecDeque<HeredocDescriptor>,
}

/// The position-indexed, strictly-increasing, truncate-on-backtrack
/// annotation log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Notes {
    /// `(position, data)` pairs in strictly increasing position order.
    entries: Vec<(usize, NoteData)>,
}

impl Notes {
    pub fn new() -> Self {
        Notes { entries: Vec::new() }
    }

    /// The freshest annotation whose position is `<= i`.
    pub fn notes_for(&self, i: usize) -> NoteData {
        match self.entries.binary_search_by_key(&i, |&(pos, _)| pos) {
            Ok(idx) => self.entries[idx].1.clone(),
            Err(0) => NoteData::default(),
            Err(idx) => self.entries[idx - 1].1.clone(),
        }
    }

    /// Replaces any annotation with position `>= i` with `(i, data)`.
    pub fn notes_update(&mut self, i: usize, data: NoteData) {
        let cut = self.entries.partition_point(|&(pos, _)| pos < i);
        self.entries.truncate(cut);
        self.entries.push((i, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_before_any_entry() {
        let notes = Notes::new();
        assert_eq!(notes.notes_for(5), NoteData::default());
    }

    #[test]
    fn finds_freshest_entry_at_or_before_position() {
        let mut notes = Notes::new();
        let mut a = NoteData::default();
        a.hds.push_back(HeredocDescriptor {
            end: "EOF".into(),
            quoted: false,
            slot: crate::syntax::HereDocHandle::new(),
        });
        notes.notes_update(10, a.clone());
        assert_eq!(notes.notes_for(9), NoteData::default());
        assert_eq!(notes.notes_for(10), a);
        assert_eq!(notes.notes_for(100), a);
    }

    #[test]
    fn backtracking_overwrites_later_entries() {
        let mut notes = Notes::new();
        let mut a = NoteData::default();
        a.hds.push_back(HeredocDescriptor {
            end: "A".into(),
            quoted: false,
            slot: crate::syntax::HereDocHandle::new(),
        });
        notes.notes_update(5, a);
        notes.notes_update(20, NoteData::default());
        assert_eq!(notes.entries.len(), 2);
        // Reparsing from position 10 onward overwrites the entry at 20.
        notes.notes_update(10, NoteData::default());
        assert_eq!(notes.entries.len(), 2);
        assert_eq!(notes.entries[1].0, 10);
    }
}
