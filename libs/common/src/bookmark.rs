//! Wire types shared by the API server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bookmark as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a bookmark. The owner comes from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
}

impl NewBookmark {
    /// Trim both fields. Returns `None` when either is empty afterwards.
    pub fn normalized(url: &str, title: &str) -> Option<Self> {
        let url = url.trim();
        let title = title.trim();
        if url.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            title: title.to_string(),
        })
    }
}

/// The authenticated user behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A row-level change pushed over the change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Bookmark),
    Delete { id: String },
}

impl ChangeEvent {
    /// The id of the bookmark this event concerns.
    pub fn bookmark_id(&self) -> &str {
        match self {
            ChangeEvent::Insert(b) => &b.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}
