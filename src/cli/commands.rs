use tracing::{info, warn};

use crate::app::{AppContext, Result};
use crate::cache::CacheHandle;
use crate::client::FeedClient;
use crate::config::Config;
use crate::engine::RunReport;

/// One filtering pass.
///
/// Returns an error only when nothing could be done for a reason the user
/// has to fix (bad credentials, bad config). A failed fetch is logged by the
/// engine and reported as an empty run.
pub async fn run(ctx: &AppContext) -> Result<Option<RunReport>> {
    match ctx.engine.execute().await {
        Ok(report) => {
            print_summary(&report);
            Ok(Some(report))
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok(None),
    }
}

pub async fn check(ctx: &AppContext) -> Result<()> {
    ctx.client.ensure_authenticated().await?;
    println!("Credentials OK for {}", ctx.config.client.username);
    Ok(())
}

/// Clear the cache without needing credentials or a client.
pub fn clear_cache(config: &Config) -> usize {
    if !config.cache.enabled {
        warn!("Item cache is disabled; nothing to clear");
        return 0;
    }

    let cache = CacheHandle::initialize(config.cache.resolved_dir());
    let removed = cache.clear();
    info!("Removed {} cached items", removed);
    println!("Removed {} cached items", removed);
    removed
}

fn print_summary(report: &RunReport) {
    if report.dry_run {
        println!(
            "Dry run: {} unread, {} would be marked as read",
            report.fetched, report.matched
        );
    } else if report.failed > 0 {
        println!(
            "{} unread, {} matched, {} marked as read, {} failed",
            report.fetched, report.matched, report.marked, report.failed
        );
    } else {
        println!(
            "{} unread, {} marked as read",
            report.fetched, report.marked
        );
    }
}
