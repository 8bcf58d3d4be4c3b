pub mod bookmark;
pub mod gateway;
pub mod id;
pub mod reconcile;

pub use bookmark::{Bookmark, ChangeEvent, CurrentUser, NewBookmark};
pub use id::PrefixedId;
pub use reconcile::BookmarkView;
