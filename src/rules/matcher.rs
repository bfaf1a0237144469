use serde::{Deserialize, Serialize};

use crate::domain::Item;
use crate::rules::Rule;

/// A rule written in the config file: every condition that is set must hold.
///
/// ```toml
/// [[rules]]
/// kind = "match"
/// name = "boring"
/// title_equals = "Exclude this item"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRule {
    pub name: Option<String>,
    pub title_prefix: Option<String>,
    pub title_contains: Option<String>,
    pub title_equals: Option<String>,
    pub url_equals: Option<String>,
    pub url_contains: Option<String>,
    pub content_contains: Option<String>,
    pub content_equals: Option<String>,
    pub author_equals: Option<String>,
}

impl MatchRule {
    pub fn has_conditions(&self) -> bool {
        [
            &self.title_prefix,
            &self.title_contains,
            &self.title_equals,
            &self.url_equals,
            &self.url_contains,
            &self.content_contains,
            &self.content_equals,
            &self.author_equals,
        ]
        .iter()
        .any(|value| value.is_some())
    }
}

/// An unset condition holds for every item.
fn holds(condition: &Option<String>, check: impl FnOnce(&str) -> bool) -> bool {
    condition.as_deref().map_or(true, check)
}

impl Rule for MatchRule {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("match")
    }

    fn evaluate(&self, item: &Item) -> bool {
        self.has_conditions()
            && holds(&self.title_prefix, |v| item.title().starts_with(v))
            && holds(&self.title_contains, |v| item.title().contains(v))
            && holds(&self.title_equals, |v| item.title() == v)
            && holds(&self.url_equals, |v| item.url() == v)
            && holds(&self.url_contains, |v| item.url().contains(v))
            && holds(&self.content_contains, |v| item.content().contains(v))
            && holds(&self.content_equals, |v| item.content() == v)
            && holds(&self.author_equals, |v| item.author() == v)
    }
}
