//! Keeps one user's bookmark list in step with the store.
//!
//! The reconciler combines a one-time snapshot fetch with the live change
//! stream. Stream callbacks run on the feed's task and only enqueue; the
//! owner of the reconciler drains the queue with [`ListReconciler::pump`] or
//! [`ListReconciler::next_change`], so the view is only ever mutated from one
//! place. Either arrival order of snapshot and first event is handled by
//! [`BookmarkView`].

use std::sync::Arc;

use tokio::sync::mpsc;

use bookmarks_common::{Bookmark, BookmarkView, ChangeEvent};

use crate::error::{FetchError, SubscriptionError};
use crate::feed::{ChangeFeed, DeleteCallback, InsertCallback, SubscriptionHandle};
use crate::store::BookmarkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

pub struct ListReconciler {
    store: Arc<dyn BookmarkStore>,
    feed: Arc<dyn ChangeFeed>,
    view: BookmarkView,
    state: SubscriptionState,
    handle: Option<SubscriptionHandle>,
    /// Changes delivered by the stream and not yet applied.
    changes: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
}

impl ListReconciler {
    pub fn new(store: Arc<dyn BookmarkStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            store,
            feed,
            view: BookmarkView::new(),
            state: SubscriptionState::Unsubscribed,
            handle: None,
            changes: None,
        }
    }

    /// Fetch the user's bookmarks and install them as the snapshot.
    ///
    /// On failure the view is loaded empty, so changes that already arrived
    /// still show, and the error is returned for the caller to report.
    pub async fn initialize(&mut self, user_id: &str) -> Result<Vec<Bookmark>, FetchError> {
        match self.store.list(user_id).await {
            Ok(snapshot) => {
                tracing::debug!(%user_id, count = snapshot.len(), "snapshot loaded");
                self.view.load(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "failed to load bookmarks");
                self.view.load(Vec::new());
                Err(e)
            }
        }
    }

    /// Open the change stream for `user_id`. A no-op while one is already open.
    ///
    /// The callback form of the contract is [`ChangeFeed::subscribe`]; here the
    /// callbacks are built internally and feed the queue drained by `pump`.
    pub async fn subscribe(&mut self, user_id: &str) -> Result<(), SubscriptionError> {
        if self.handle.is_some() {
            return Ok(());
        }

        self.state = SubscriptionState::Subscribing;
        let (tx, rx) = mpsc::unbounded_channel();

        let insert_tx = tx.clone();
        let on_insert: InsertCallback = Box::new(move |bookmark| {
            let _ = insert_tx.send(ChangeEvent::Insert(bookmark));
        });
        let on_delete: DeleteCallback = Box::new(move |id| {
            let _ = tx.send(ChangeEvent::Delete { id });
        });

        match self.feed.subscribe(user_id, on_insert, on_delete).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.changes = Some(rx);
                self.state = SubscriptionState::Subscribed;
                tracing::debug!(%user_id, "subscribed to changes");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "failed to open change stream");
                self.state = SubscriptionState::Unsubscribed;
                Err(e)
            }
        }
    }

    /// Release the stream, drop anything still queued and forget the list.
    ///
    /// The view goes back to waiting for a snapshot, so a later
    /// `subscribe` + `initialize` in either order starts from a clean slate.
    /// Safe to call any number of times, including when `subscribe` never
    /// completed.
    pub fn unsubscribe(&mut self) {
        self.release();
        self.view = BookmarkView::new();
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.unsubscribe();
            tracing::debug!("unsubscribed from changes");
        }
        self.changes = None;
        self.state = SubscriptionState::Unsubscribed;
    }

    /// Apply every change that has already arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(rx) = self.changes.as_mut() else {
                return applied;
            };
            match rx.try_recv() {
                Ok(event) => {
                    self.view.apply(event);
                    applied += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => return applied,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.stream_ended();
                    return applied;
                }
            }
        }
    }

    /// Wait for the next change and apply it.
    ///
    /// Returns `None` when not subscribed or once the stream has ended.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        let rx = self.changes.as_mut()?;
        match rx.recv().await {
            Some(event) => {
                self.view.apply(event.clone());
                Some(event)
            }
            None => {
                self.stream_ended();
                None
            }
        }
    }

    /// The list stays as it was; only the stream goes away.
    fn stream_ended(&mut self) {
        tracing::warn!("change stream dropped, no further updates until resubscribed");
        self.release();
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn view(&self) -> &BookmarkView {
        &self.view
    }
}

impl Drop for ListReconciler {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use bookmarks_common::NewBookmark;

    use super::*;
    use crate::error::MutationError;

    pub(crate) fn bm(id: &str) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            user_id: "usr_1".to_string(),
            url: format!("https://example.com/{id}"),
            title: format!("Bookmark {id}"),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    /// In-memory store that records every call.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub rows: Mutex<Vec<Bookmark>>,
        pub inserts: Mutex<Vec<(String, NewBookmark)>>,
        pub deletes: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl FakeStore {
        pub fn with_rows(rows: Vec<Bookmark>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl BookmarkStore for FakeStore {
        async fn list(&self, _user_id: &str) -> Result<Vec<Bookmark>, FetchError> {
            if self.fail {
                return Err(FetchError::Status {
                    status: 503,
                    message: "store unavailable".into(),
                });
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn insert(
            &self,
            user_id: &str,
            bookmark: &NewBookmark,
        ) -> Result<Bookmark, MutationError> {
            self.inserts
                .lock()
                .unwrap()
                .push((user_id.to_string(), bookmark.clone()));
            if self.fail {
                return Err(MutationError::Rejected {
                    status: 500,
                    code: "INTERNAL_ERROR".into(),
                    message: "write failed".into(),
                });
            }
            let row = Bookmark {
                id: format!("bm_{}", self.inserts.lock().unwrap().len()),
                user_id: user_id.to_string(),
                url: bookmark.url.clone(),
                title: bookmark.title.clone(),
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(0, row.clone());
            Ok(row)
        }

        async fn delete(&self, id: &str) -> Result<(), MutationError> {
            self.deletes.lock().unwrap().push(id.to_string());
            if self.fail {
                return Err(MutationError::NotFound(id.to_string()));
            }
            self.rows.lock().unwrap().retain(|b| b.id != id);
            Ok(())
        }
    }

    /// Feed whose events are pushed by the test.
    #[derive(Default)]
    pub(crate) struct FakeFeed {
        subscribers: Arc<Mutex<Vec<(InsertCallback, DeleteCallback)>>>,
        pub subscribes: AtomicUsize,
        pub releases: Arc<AtomicUsize>,
        pub fail: bool,
    }

    impl FakeFeed {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn emit_insert(&self, bookmark: Bookmark) {
            for (on_insert, _) in self.subscribers.lock().unwrap().iter() {
                on_insert(bookmark.clone());
            }
        }

        pub fn emit_delete(&self, id: &str) {
            for (_, on_delete) in self.subscribers.lock().unwrap().iter() {
                on_delete(id.to_string());
            }
        }

        /// Simulate the server going away.
        pub fn drop_connection(&self) {
            self.subscribers.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl ChangeFeed for FakeFeed {
        async fn subscribe(
            &self,
            _user_id: &str,
            on_insert: InsertCallback,
            on_delete: DeleteCallback,
        ) -> Result<SubscriptionHandle, SubscriptionError> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SubscriptionError::Rejected {
                    code: 4004,
                    reason: "Invalid or expired ticket".into(),
                });
            }
            self.subscribers.lock().unwrap().push((on_insert, on_delete));

            let subscribers = self.subscribers.clone();
            let releases = self.releases.clone();
            Ok(SubscriptionHandle::new(move || {
                subscribers.lock().unwrap().clear();
                releases.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    fn reconciler(store: FakeStore, feed: Arc<FakeFeed>) -> ListReconciler {
        ListReconciler::new(Arc::new(store), feed)
    }

    #[tokio::test]
    async fn initialize_returns_snapshot_in_store_order() {
        let mut r = reconciler(
            FakeStore::with_rows(vec![bm("b2"), bm("b1")]),
            Arc::new(FakeFeed::default()),
        );
        let snapshot = r.initialize("usr_1").await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(r.view().ids(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn initialize_failure_presents_empty_list() {
        let mut r = reconciler(FakeStore::failing(), Arc::new(FakeFeed::default()));
        assert!(r.initialize("usr_1").await.is_err());
        assert!(r.view().is_loaded());
        assert!(r.view().is_empty());
    }

    #[tokio::test]
    async fn state_moves_through_subscription_lifecycle() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        assert_eq!(r.state(), SubscriptionState::Unsubscribed);

        r.subscribe("usr_1").await.unwrap();
        assert_eq!(r.state(), SubscriptionState::Subscribed);

        // Already open.
        r.subscribe("usr_1").await.unwrap();
        assert_eq!(feed.subscribes.load(Ordering::SeqCst), 1);

        r.unsubscribe();
        assert_eq!(r.state(), SubscriptionState::Unsubscribed);
    }

    #[tokio::test]
    async fn failed_subscribe_returns_to_unsubscribed() {
        let mut r = reconciler(FakeStore::default(), Arc::new(FakeFeed::failing()));
        let err = r.subscribe("usr_1").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Rejected { code: 4004, .. }));
        assert_eq!(r.state(), SubscriptionState::Unsubscribed);
        // Teardown after a subscribe that never completed.
        r.unsubscribe();
    }

    #[tokio::test]
    async fn live_inserts_are_shown_newest_first() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        feed.emit_insert(bm("b1"));
        feed.emit_insert(bm("b2"));
        assert_eq!(r.pump(), 2);
        assert_eq!(r.view().ids(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_leaves_view_unchanged() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::with_rows(vec![bm("b1")]), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        feed.emit_delete("nope");
        r.pump();
        assert_eq!(r.view().ids(), vec!["b1"]);
    }

    #[tokio::test]
    async fn replayed_insert_for_fetched_row_is_duplicated() {
        // Known gap: the stream is trusted and inserts are not de-duplicated.
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::with_rows(vec![bm("b1")]), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        feed.emit_insert(bm("b1"));
        r.pump();
        assert_eq!(r.view().ids(), vec!["b1", "b1"]);
    }

    #[tokio::test]
    async fn events_before_snapshot_are_kept() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::with_rows(vec![bm("b1")]), feed.clone());
        r.subscribe("usr_1").await.unwrap();

        feed.emit_insert(bm("b2"));
        r.pump();
        assert!(r.view().is_empty());

        r.initialize("usr_1").await.unwrap();
        assert_eq!(r.view().ids(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn next_change_applies_one_event() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        feed.emit_insert(bm("b1"));
        let event = r.next_change().await.unwrap();
        assert_eq!(event.bookmark_id(), "b1");
        assert_eq!(r.view().ids(), vec!["b1"]);
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_harmless_and_stops_delivery() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        r.unsubscribe();
        r.unsubscribe();
        assert_eq!(feed.releases.load(Ordering::SeqCst), 1);

        feed.emit_insert(bm("late"));
        assert_eq!(r.pump(), 0);
        assert!(r.next_change().await.is_none());
        assert!(r.view().is_empty());
    }

    #[tokio::test]
    async fn dropped_stream_returns_to_unsubscribed() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();

        feed.emit_insert(bm("b1"));
        feed.drop_connection();

        assert_eq!(r.pump(), 1);
        assert_eq!(r.state(), SubscriptionState::Unsubscribed);
        assert_eq!(r.view().ids(), vec!["b1"]);
    }

    #[tokio::test]
    async fn remount_keeps_events_that_beat_the_new_snapshot() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::with_rows(vec![bm("b1")]), feed.clone());
        r.initialize("usr_1").await.unwrap();
        r.subscribe("usr_1").await.unwrap();
        r.unsubscribe();
        assert!(!r.view().is_loaded());

        r.subscribe("usr_1").await.unwrap();
        feed.emit_insert(bm("b2"));
        r.pump();
        assert_eq!(r.view().pending_len(), 1);

        r.initialize("usr_1").await.unwrap();
        assert_eq!(r.view().ids(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn dropping_reconciler_releases_stream() {
        let feed = Arc::new(FakeFeed::default());
        let mut r = reconciler(FakeStore::default(), feed.clone());
        r.subscribe("usr_1").await.unwrap();
        drop(r);
        assert_eq!(feed.releases.load(Ordering::SeqCst), 1);
    }
}
