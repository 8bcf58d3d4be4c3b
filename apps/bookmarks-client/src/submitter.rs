//! Create and delete requests against the store.
//!
//! Nothing here touches the local view: a successful write shows up through
//! the change stream like any other remote change.

use std::sync::Arc;

use bookmarks_common::{Bookmark, NewBookmark};

use crate::error::MutationError;
use crate::store::BookmarkStore;

/// Outcome of [`MutationSubmitter::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Url or title was blank; nothing was sent.
    Skipped,
    Submitted(Bookmark),
}

pub struct MutationSubmitter {
    store: Arc<dyn BookmarkStore>,
}

impl MutationSubmitter {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
    ) -> Result<Submission, MutationError> {
        let Some(bookmark) = NewBookmark::normalized(url, title) else {
            tracing::debug!(%user_id, "skipping create with blank url or title");
            return Ok(Submission::Skipped);
        };

        match self.store.insert(user_id, &bookmark).await {
            Ok(row) => {
                tracing::info!(%user_id, bookmark_id = %row.id, "bookmark created");
                Ok(Submission::Submitted(row))
            }
            Err(e) => {
                tracing::warn!(%user_id, url = %bookmark.url, error = %e, "create rejected");
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!(bookmark_id = %id, "bookmark deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(bookmark_id = %id, error = %e, "delete rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::tests::FakeStore;

    #[tokio::test]
    async fn create_trims_and_scopes_to_user() {
        let store = Arc::new(FakeStore::default());
        let submitter = MutationSubmitter::new(store.clone());

        let outcome = submitter
            .create("usr_1", " https://example.com ", "Example ")
            .await
            .unwrap();

        let Submission::Submitted(row) = outcome else {
            panic!("expected a submitted bookmark");
        };
        assert_eq!(row.user_id, "usr_1");
        assert_eq!(row.url, "https://example.com");

        let inserts = store.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].0, "usr_1");
        assert_eq!(inserts[0].1.title, "Example");
    }

    #[tokio::test]
    async fn blank_fields_are_a_no_op() {
        let store = Arc::new(FakeStore::default());
        let submitter = MutationSubmitter::new(store.clone());

        assert_eq!(
            submitter.create("usr_1", "", "Example").await.unwrap(),
            Submission::Skipped
        );
        assert_eq!(
            submitter.create("usr_1", "https://example.com", "  ").await.unwrap(),
            Submission::Skipped
        );
        assert!(store.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_writes_are_returned() {
        let store = Arc::new(FakeStore::failing());
        let submitter = MutationSubmitter::new(store.clone());

        let err = submitter
            .create("usr_1", "https://example.com", "Example")
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Rejected { status: 500, .. }));

        let err = submitter.delete("abc").await.unwrap_err();
        assert!(matches!(err, MutationError::NotFound(ref id) if id == "abc"));
    }

    #[tokio::test]
    async fn delete_issues_request_for_id() {
        let store = Arc::new(FakeStore::default());
        let submitter = MutationSubmitter::new(store.clone());
        submitter.delete("abc").await.unwrap();
        assert_eq!(*store.deletes.lock().unwrap(), vec!["abc".to_string()]);
    }
}
