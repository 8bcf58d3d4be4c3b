//! Live list reconciliation.
//!
//! The displayed list is a pure function of an initial snapshot and the
//! ordered stream of change events that follows it. Inserts are prepended
//! without checking whether the id is already present, so a bookmark that is
//! both in the snapshot and replayed by the stream shows up twice. Deletes
//! remove every entry with the id and are a no-op when nothing matches.
//!
//! Events may arrive before the snapshot does. [`BookmarkView`] holds them
//! until [`BookmarkView::load`] is called and then replays them on top of the
//! snapshot, so neither arrival order drops an event.

use std::collections::VecDeque;

use crate::bookmark::{Bookmark, ChangeEvent};

/// Apply one change to a list in display order.
pub fn apply(entries: &mut VecDeque<Bookmark>, event: ChangeEvent) {
    match event {
        ChangeEvent::Insert(bookmark) => entries.push_front(bookmark),
        ChangeEvent::Delete { id } => entries.retain(|b| b.id != id),
    }
}

/// Fold a sequence of changes over a snapshot.
pub fn replay<I>(snapshot: Vec<Bookmark>, events: I) -> VecDeque<Bookmark>
where
    I: IntoIterator<Item = ChangeEvent>,
{
    let mut entries = VecDeque::from(snapshot);
    for event in events {
        apply(&mut entries, event);
    }
    entries
}

/// The ordered, in-memory view of one user's bookmarks.
#[derive(Debug, Default, Clone)]
pub struct BookmarkView {
    entries: VecDeque<Bookmark>,
    /// Changes received before the snapshot landed.
    pending: Vec<ChangeEvent>,
    loaded: bool,
}

impl BookmarkView {
    /// A view still waiting for its snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A view that starts from a known snapshot.
    pub fn from_snapshot(snapshot: Vec<Bookmark>) -> Self {
        Self {
            entries: VecDeque::from(snapshot),
            pending: Vec::new(),
            loaded: true,
        }
    }

    /// Install the snapshot and replay any changes that arrived first.
    ///
    /// A second call replaces the current entries with the new snapshot.
    pub fn load(&mut self, snapshot: Vec<Bookmark>) {
        let pending = std::mem::take(&mut self.pending);
        self.entries = replay(snapshot, pending);
        self.loaded = true;
    }

    /// Apply a change, or hold it until the snapshot is loaded.
    pub fn apply(&mut self, event: ChangeEvent) {
        if self.loaded {
            apply(&mut self.entries, event);
        } else {
            self.pending.push(event);
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of changes waiting for the snapshot.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.entries.iter()
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|b| b.id.as_str()).collect()
    }

    pub fn to_vec(&self) -> Vec<Bookmark> {
        self.entries.iter().cloned().collect()
    }
}
