//! Client side of the bookmark manager.
//!
//! A [`Session`] is established once and handed to every component. The
//! [`ListReconciler`] merges one snapshot fetch with the live change stream,
//! the [`MutationSubmitter`] writes to the store, and [`BookmarkManager`]
//! ties both together as the view model of the signed-in page.

pub mod error;
pub mod feed;
pub mod manager;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod submitter;

pub use error::{FetchError, MutationError, SubscriptionError};
pub use feed::{ChangeFeed, GatewayFeed, SubscriptionHandle};
pub use manager::{BookmarkManager, FormState};
pub use reconciler::{ListReconciler, SubscriptionState};
pub use session::Session;
pub use store::{BookmarkStore, HttpStore};
pub use submitter::{MutationSubmitter, Submission};
