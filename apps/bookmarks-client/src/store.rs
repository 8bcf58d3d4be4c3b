//! Access to the bookmark table, scoped to the session's user.

use async_trait::async_trait;
use reqwest::StatusCode;

use bookmarks_common::{Bookmark, NewBookmark};

use crate::error::{ErrorEnvelope, FetchError, MutationError};
use crate::session::Session;

/// The remote bookmark store.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// All of `user_id`'s bookmarks, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Bookmark>, FetchError>;

    /// Insert a bookmark owned by `user_id`. The store assigns id and timestamp.
    async fn insert(&self, user_id: &str, bookmark: &NewBookmark)
        -> Result<Bookmark, MutationError>;

    async fn delete(&self, id: &str) -> Result<(), MutationError>;
}

/// [`BookmarkStore`] over the REST API.
pub struct HttpStore {
    session: Session,
}

impl HttpStore {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    fn owns(&self, user_id: &str) -> bool {
        self.session.user().id == user_id
    }
}

#[async_trait]
impl BookmarkStore for HttpStore {
    async fn list(&self, user_id: &str) -> Result<Vec<Bookmark>, FetchError> {
        if !self.owns(user_id) {
            return Err(FetchError::Unauthorized);
        }

        let resp = self
            .session
            .http()
            .get(self.session.api_url("/bookmarks"))
            .bearer_auth(self.session.token())
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            status if status.is_success() => Ok(resp.json().await?),
            status => {
                let detail = ErrorEnvelope::read(resp).await;
                Err(FetchError::Status {
                    status: status.as_u16(),
                    message: detail.message,
                })
            }
        }
    }

    async fn insert(
        &self,
        user_id: &str,
        bookmark: &NewBookmark,
    ) -> Result<Bookmark, MutationError> {
        if !self.owns(user_id) {
            return Err(MutationError::WrongOwner(user_id.to_string()));
        }

        let resp = self
            .session
            .http()
            .post(self.session.api_url("/bookmarks"))
            .bearer_auth(self.session.token())
            .json(bookmark)
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(MutationError::Unauthorized),
            status if status.is_success() => Ok(resp.json().await?),
            status => Err(rejected(status, resp).await),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), MutationError> {
        let resp = self
            .session
            .http()
            .delete(self.session.api_url(&format!("/bookmarks/{id}")))
            .bearer_auth(self.session.token())
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(MutationError::Unauthorized),
            StatusCode::NOT_FOUND => Err(MutationError::NotFound(id.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(rejected(status, resp).await),
        }
    }
}

async fn rejected(status: StatusCode, resp: reqwest::Response) -> MutationError {
    let detail = ErrorEnvelope::read(resp).await;
    MutationError::Rejected {
        status: status.as_u16(),
        code: detail.code,
        message: detail.message,
    }
}
