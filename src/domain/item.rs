use serde::{Deserialize, Serialize};

use crate::app::{FeedSweepError, Result};

/// One unread feed entry as seen by the rules.
///
/// Fields are private so an `Item` can only come out of [`Item::new`] (or a
/// deserializer that goes through the same check) and never has an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord")]
pub struct Item {
    id: String,
    title: String,
    content: String,
    url: String,
    author: String,
}

#[derive(Deserialize)]
struct ItemRecord {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

impl TryFrom<ItemRecord> for Item {
    type Error = FeedSweepError;

    fn try_from(record: ItemRecord) -> Result<Self> {
        Ok(Item::new(record.id)?
            .with_title(record.title)
            .with_content(record.content)
            .with_url(record.url)
            .with_author(record.author))
    }
}

impl Item {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(FeedSweepError::InvalidItem("item must have an id".into()));
        }

        Ok(Self {
            id,
            title: String::new(),
            content: String::new(),
            url: String::new(),
            author: String::new(),
        })
    }

    pub fn with_title(mut self, title: impl Into<Option<String>>) -> Self {
        self.title = title.into().unwrap_or_default();
        self
    }

    pub fn with_content(mut self, content: impl Into<Option<String>>) -> Self {
        self.content = content.into().unwrap_or_default();
        self
    }

    pub fn with_url(mut self, url: impl Into<Option<String>>) -> Self {
        self.url = url.into().unwrap_or_default();
        self
    }

    pub fn with_author(mut self, author: impl Into<Option<String>>) -> Self {
        self.author = author.into().unwrap_or_default();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Title with runs of whitespace collapsed, for single-line log output
    pub fn display_title(&self) -> String {
        self.title.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
