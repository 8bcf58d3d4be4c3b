//! View model for the signed-in page: the add form plus the live list.

use std::sync::Arc;

use bookmarks_common::{Bookmark, CurrentUser};

use crate::feed::{ChangeFeed, GatewayFeed};
use crate::reconciler::{ListReconciler, SubscriptionState};
use crate::session::Session;
use crate::store::{BookmarkStore, HttpStore};
use crate::submitter::{MutationSubmitter, Submission};

/// Contents of the "Add Bookmark" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub url: String,
    pub title: String,
}

impl FormState {
    pub fn clear(&mut self) {
        self.url.clear();
        self.title.clear();
    }
}

pub struct BookmarkManager {
    user: CurrentUser,
    reconciler: ListReconciler,
    submitter: MutationSubmitter,
    form: FormState,
    loading: bool,
    last_error: Option<String>,
}

impl BookmarkManager {
    pub fn new(
        user: CurrentUser,
        store: Arc<dyn BookmarkStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            user,
            reconciler: ListReconciler::new(store.clone(), feed),
            submitter: MutationSubmitter::new(store),
            form: FormState::default(),
            loading: false,
            last_error: None,
        }
    }

    /// Wire a manager to the API behind `session`.
    pub fn connect(session: &Session) -> Self {
        Self::new(
            session.user().clone(),
            Arc::new(HttpStore::new(session)),
            Arc::new(GatewayFeed::new(session)),
        )
    }

    /// Open the change stream, then load the snapshot.
    ///
    /// Neither failure is fatal: a failed fetch shows an empty list and a
    /// failed subscription leaves the list static.
    pub async fn mount(&mut self) {
        let user_id = self.user.id.clone();
        if self.reconciler.subscribe(&user_id).await.is_err() {
            self.last_error = Some("Live updates are unavailable".to_string());
        }
        if self.reconciler.initialize(&user_id).await.is_err() {
            self.last_error = Some("Could not load bookmarks".to_string());
        }
    }

    pub fn unmount(&mut self) {
        self.reconciler.unsubscribe();
    }

    /// Apply every queued change.
    pub fn pump(&mut self) -> usize {
        self.reconciler.pump()
    }

    /// Wait for and apply the next change. `false` once the stream is gone.
    pub async fn next_change(&mut self) -> bool {
        self.reconciler.next_change().await.is_some()
    }

    /// Submit the form. The form is cleared only when the store accepted it.
    pub async fn submit(&mut self) {
        self.loading = true;
        let result = self
            .submitter
            .create(&self.user.id, &self.form.url, &self.form.title)
            .await;
        self.loading = false;

        match result {
            Ok(Submission::Submitted(_)) => {
                self.form.clear();
                self.last_error = None;
            }
            Ok(Submission::Skipped) => {}
            Err(e) => self.last_error = Some(format!("Could not add bookmark: {e}")),
        }
    }

    pub async fn delete(&mut self, id: &str) {
        match self.submitter.delete(id).await {
            Ok(()) => self.last_error = None,
            Err(e) => self.last_error = Some(format!("Could not delete bookmark: {e}")),
        }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Bookmarks in display order.
    pub fn bookmarks(&self) -> impl Iterator<Item = &Bookmark> {
        self.reconciler.view().iter()
    }

    /// Heading shown above the list.
    pub fn heading(&self) -> String {
        format!("My Bookmarks ({})", self.reconciler.view().len())
    }

    pub fn is_live(&self) -> bool {
        self.reconciler.state() == SubscriptionState::Subscribed
    }
}
