//! Rules deciding which unread items get marked as read.
//!
//! A rule is anything implementing [`Rule`]. The active set is built once at
//! startup from the `[[rules]]` tables of the config file:
//!
//! ```toml
//! [[rules]]
//! kind = "sponsors"
//!
//! [[rules]]
//! kind = "match"
//! title_prefix = "Weekly digest"
//! ```
//!
//! With no `[[rules]]` configured the built-in podcast and sponsor rules are
//! used.

mod builtin;
mod matcher;

pub use builtin::{ExcludePodcastAnnouncements, ExcludeSponsors};
pub use matcher::MatchRule;

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ConfigError;
use crate::domain::Item;

/// A predicate over an item; `true` means "mark it as read".
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, item: &Item) -> bool;
}

/// Adapts a plain function or closure into a [`Rule`].
pub struct FnRule<F> {
    name: String,
    predicate: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Item) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Item) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, item: &Item) -> bool {
        (self.predicate)(item)
    }
}

/// One `[[rules]]` entry in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    Sponsors,
    PodcastAnnouncements,
    Match(MatchRule),
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RuleConfig::Match(rule) if !rule.has_conditions() => Err(ConfigError::InvalidRule(
                format!("match rule '{}' has no conditions", rule.name()),
            )),
            _ => Ok(()),
        }
    }

    fn build(&self) -> Box<dyn Rule> {
        match self {
            RuleConfig::Sponsors => Box::new(ExcludeSponsors),
            RuleConfig::PodcastAnnouncements => Box::new(ExcludePodcastAnnouncements),
            RuleConfig::Match(rule) => Box::new(rule.clone()),
        }
    }
}

/// Ordered rules combined with OR.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExcludePodcastAnnouncements),
            Box::new(ExcludeSponsors),
        ])
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Validate and build the configured rules, falling back to the
    /// built-in set when none are configured.
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Ok(Self::default());
        }

        for config in configs {
            config.validate()?;
        }

        Ok(Self::new(configs.iter().map(RuleConfig::build).collect()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// True if any rule matches, stopping at the first that does.
    ///
    /// A rule that panics counts as not matching that item.
    pub fn matches(&self, item: &Item) -> bool {
        self.rules.iter().any(|rule| {
            match catch_unwind(AssertUnwindSafe(|| rule.evaluate(item))) {
                Ok(matched) => matched,
                Err(_) => {
                    warn!(
                        "Rule '{}' panicked on item {}; treating as no match",
                        rule.name(),
                        item.id()
                    );
                    false
                }
            }
        })
    }
}
