pub mod batch;
pub mod feedbin;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use feedbin::{FeedbinClient, FeedbinOptions};
pub use transport::{Credentials, HttpTransport, Transport};

use async_trait::async_trait;

use crate::app::{AuthError, Result};
use crate::domain::Item;

/// Feedbin rejects or truncates entry requests naming more ids than this.
pub const MAX_IDS_PER_FETCH: usize = 100;

/// A feed-reading service holding the user's unread items.
#[async_trait]
pub trait FeedClient {
    /// Check the credentials once; every later call gets the same outcome.
    async fn ensure_authenticated(&self) -> std::result::Result<(), AuthError>;

    /// Every currently unread item. Either all of them or an error, never a
    /// partial list.
    async fn get_unread_items(&self) -> Result<Vec<Item>>;

    /// Every failure, a failed credential check included, is a `MarkRead`
    /// error for this item.
    async fn mark_item_as_read(&self, item: &Item) -> Result<()>;
}
