//! One filtering pass: fetch unread items, run the rules, mark matches as
//! read.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::app::Result;
use crate::client::FeedClient;
use crate::domain::Item;
use crate::rules::RuleSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub dry_run: bool,
    pub verbose: bool,
}

/// What a single pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub matched: usize,
    pub marked: usize,
    pub failed: usize,
    pub dry_run: bool,
}

pub struct FilterEngine {
    client: Arc<dyn FeedClient + Send + Sync>,
    rules: RuleSet,
    options: EngineOptions,
}

impl FilterEngine {
    pub fn new(
        client: Arc<dyn FeedClient + Send + Sync>,
        rules: RuleSet,
        options: EngineOptions,
    ) -> Self {
        Self {
            client,
            rules,
            options,
        }
    }

    /// Run one pass.
    ///
    /// Failing to fetch (or to authenticate) ends the pass with an error;
    /// nothing is evaluated against a partial item list. Individual
    /// mark-as-read failures are logged and counted in the report.
    pub async fn execute(&self) -> Result<RunReport> {
        info!("Getting unread items");
        let items = match self.client.get_unread_items().await {
            Ok(items) => items,
            Err(e) => {
                error!("Could not get unread items: {}", e);
                return Err(e);
            }
        };
        info!("Got {} items", items.len());

        let matches: Vec<&Item> = items.iter().filter(|item| self.evaluate(item)).collect();

        let mut report = RunReport {
            fetched: items.len(),
            matched: matches.len(),
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if matches.is_empty() {
            info!("Nothing to mark as read");
            return Ok(report);
        }

        info!("Will mark {} items as read", matches.len());
        let verb = if self.options.dry_run {
            "Would mark"
        } else {
            "Marking"
        };
        for item in &matches {
            info!(
                "{} item as read: #{} '{}' <{}>",
                verb,
                item.id(),
                item.display_title(),
                item.url()
            );
        }

        if self.options.dry_run {
            info!("Dry run: not actually marking {} items as read", matches.len());
            return Ok(report);
        }

        let results = join_all(matches.iter().map(|item| self.client.mark_item_as_read(item))).await;
        for result in results {
            match result {
                Ok(()) => report.marked += 1,
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Finished marking items as read: {} marked, {} failed",
            report.marked, report.failed
        );
        Ok(report)
    }

    fn evaluate(&self, item: &Item) -> bool {
        if self.options.verbose {
            info!("#{} '{}' <{}>", item.id(), item.display_title(), item.url());
        }
        self.rules.matches(item)
    }
}
