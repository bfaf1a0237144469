use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{AuthError, FeedSweepError, Result};
use crate::cache::CacheHandle;
use crate::client::batch::BatchPlan;
use crate::client::transport::{ApiRequest, Transport};
use crate::client::{FeedClient, MAX_IDS_PER_FETCH};
use crate::config::ClientConfig;
use crate::domain::Item;

pub const DEFAULT_BASE_URL: &str = "https://api.feedbin.com/";
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 10;

const AUTHENTICATION_PATH: &str = "v2/authentication.json";
const UNREAD_ENTRIES_PATH: &str = "v2/unread_entries.json";
const ENTRIES_PATH: &str = "v2/entries.json";

#[derive(Debug, Clone)]
pub struct FeedbinOptions {
    pub base_url: Url,
    pub batch_size: usize,
    pub max_concurrent_requests: usize,
}

impl Default for FeedbinOptions {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            batch_size: MAX_IDS_PER_FETCH,
            max_concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
        }
    }
}

impl FeedbinOptions {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(&config.base_url)?,
            batch_size: config.batch_size,
            max_concurrent_requests: config.max_concurrent_requests,
        })
    }
}

/// Ensure the base URL ends in `/` so endpoint paths are joined onto it
/// instead of replacing its last segment.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Ids arrive as JSON numbers from Feedbin, but are treated as opaque.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntryId {
    Number(serde_json::Number),
    Text(String),
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        match id {
            EntryId::Number(n) => n.to_string(),
            EntryId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedbinEntry {
    id: EntryId,
    title: Option<String>,
    content: Option<String>,
    url: Option<String>,
    author: Option<String>,
}

impl TryFrom<FeedbinEntry> for Item {
    type Error = FeedSweepError;

    fn try_from(entry: FeedbinEntry) -> Result<Self> {
        Ok(Item::new(String::from(entry.id))?
            .with_title(entry.title)
            .with_content(entry.content)
            .with_url(entry.url)
            .with_author(entry.author))
    }
}

/// Client for the Feedbin v2 REST API.
pub struct FeedbinClient {
    transport: Arc<dyn Transport + Send + Sync>,
    options: FeedbinOptions,
    cache: CacheHandle,
    auth: OnceCell<std::result::Result<(), AuthError>>,
    semaphore: Semaphore,
}

impl FeedbinClient {
    pub fn new(
        transport: Arc<dyn Transport + Send + Sync>,
        options: FeedbinOptions,
        cache: CacheHandle,
    ) -> Self {
        let options = FeedbinOptions {
            batch_size: options.batch_size.clamp(1, MAX_IDS_PER_FETCH),
            max_concurrent_requests: options.max_concurrent_requests.max(1),
            ..options
        };
        let semaphore = Semaphore::new(options.max_concurrent_requests);

        Self {
            transport,
            options,
            cache,
            auth: OnceCell::new(),
            semaphore,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.options.base_url.join(path)?)
    }

    async fn check_credentials(&self) -> std::result::Result<(), AuthError> {
        let url = self
            .endpoint(AUTHENTICATION_PATH)
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let response = self
            .transport
            .send(&ApiRequest::get(url))
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        match response.status {
            200 => {
                info!("Feedbin credentials OK");
                Ok(())
            }
            401 => Err(AuthError::InvalidCredentials),
            status => Err(AuthError::UnexpectedStatus(status)),
        }
    }

    async fn fetch_unread_ids(&self) -> Result<Vec<String>> {
        let url = self.endpoint(UNREAD_ENTRIES_PATH)?;
        let response = self
            .transport
            .send(&ApiRequest::get(url))
            .await
            .map_err(|e| FeedSweepError::Fetch(format!("unread id list: {}", e)))?;

        if response.status != 200 {
            return Err(FeedSweepError::Fetch(format!(
                "unread id list: unexpected response code {}",
                response.status
            )));
        }

        let ids: Vec<EntryId> = serde_json::from_str(&response.body)
            .map_err(|e| FeedSweepError::Fetch(format!("unread id list: {}", e)))?;

        Ok(ids.into_iter().map(String::from).collect())
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Item>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FeedSweepError::Fetch(e.to_string()))?;

        let mut url = self.endpoint(ENTRIES_PATH)?;
        url.query_pairs_mut().append_pair("ids", &ids.join(","));

        let response = self
            .transport
            .send(&ApiRequest::get(url))
            .await
            .map_err(|e| FeedSweepError::Fetch(format!("entries batch: {}", e)))?;

        if response.status != 200 {
            return Err(FeedSweepError::Fetch(format!(
                "entries batch: unexpected response code {}",
                response.status
            )));
        }

        let entries: Vec<FeedbinEntry> = serde_json::from_str(&response.body)
            .map_err(|e| FeedSweepError::Fetch(format!("entries batch: {}", e)))?;

        if entries.len() != ids.len() {
            warn!(
                "Asked for {} entries but got {}; some may have been deleted upstream",
                ids.len(),
                entries.len()
            );
        }

        entries
            .into_iter()
            .map(|entry| {
                Item::try_from(entry)
                    .map_err(|e| FeedSweepError::Fetch(format!("entries batch: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl FeedClient for FeedbinClient {
    async fn ensure_authenticated(&self) -> std::result::Result<(), AuthError> {
        self.auth
            .get_or_init(|| self.check_credentials())
            .await
            .clone()
    }

    async fn get_unread_items(&self) -> Result<Vec<Item>> {
        self.ensure_authenticated().await?;

        info!("Getting list of unread items");
        let unread_ids = self.fetch_unread_ids().await?;
        info!("There are {} unread items", unread_ids.len());

        let plan = BatchPlan::build(&unread_ids, &self.cache, self.options.batch_size);
        if self.cache.is_enabled() {
            info!(
                "Got {} from cache; fetching {} from API",
                plan.cached.len(),
                plan.fetch_count()
            );
        }
        info!(
            "Fetching entries in chunks of {}, which means {} API calls",
            self.options.batch_size,
            plan.batches.len()
        );

        // Fail-fast: the first failing batch fails the whole call and the
        // remaining in-flight batches are dropped.
        let fetched: Vec<Vec<Item>> =
            try_join_all(plan.batches.iter().map(|batch| self.fetch_batch(batch))).await?;
        let fetched: Vec<Item> = fetched.into_iter().flatten().collect();

        if self.cache.is_enabled() {
            debug!("Writing {} items to cache", fetched.len());
            for item in &fetched {
                self.cache.put(item);
            }

            let live: HashSet<String> = unread_ids.into_iter().collect();
            let removed = self.cache.prune(&live);
            if removed > 0 {
                info!("Removed {} stale items from cache", removed);
            }
        }

        let mut items = plan.cached;
        items.extend(fetched);
        info!("All fetches complete; got {} items total", items.len());

        Ok(items)
    }

    async fn mark_item_as_read(&self, item: &Item) -> Result<()> {
        let mark_read_error = |reason: String| FeedSweepError::MarkRead {
            id: item.id().to_string(),
            reason,
        };

        self.ensure_authenticated()
            .await
            .map_err(|e| mark_read_error(e.to_string()))?;

        let mut url = self
            .endpoint(UNREAD_ENTRIES_PATH)
            .map_err(|e| mark_read_error(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("unread_entries", item.id());

        let response = self
            .transport
            .send(&ApiRequest::delete(url))
            .await
            .map_err(|e| mark_read_error(e.to_string()))?;

        if !response.is_success() {
            return Err(mark_read_error(format!(
                "unexpected response code {}",
                response.status
            )));
        }

        debug!("Marked item {} as read", item.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{requested_ids, MockTransport};
    use crate::client::transport::{ApiResponse, Method};
    use std::time::Duration;
    use tempfile::TempDir;

    fn options() -> FeedbinOptions {
        FeedbinOptions {
            base_url: Url::parse("https://feedbin.test/").unwrap(),
            ..FeedbinOptions::default()
        }
    }

    fn client(transport: Arc<MockTransport>, cache: CacheHandle) -> FeedbinClient {
        FeedbinClient::new(transport, options(), cache)
    }

    fn status_only(auth_status: u16) -> MockTransport {
        MockTransport::new(move |req| match req.url.path() {
            "/v2/authentication.json" => Ok(ApiResponse::new(auth_status, "")),
            _ => Ok(ApiResponse::new(200, "[]")),
        })
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.id().to_string()).collect()
    }

    #[test]
    fn test_normalize_base_url_adds_trailing_slash() {
        let url = normalize_base_url("https://example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/");
        assert_eq!(
            url.join(ENTRIES_PATH).unwrap().as_str(),
            "https://example.com/api/v2/entries.json"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_garbage() {
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_entry_ids_accept_numbers_and_strings() {
        let ids: Vec<EntryId> = serde_json::from_str(r#"[1, "abc", 3]"#).unwrap();
        let ids: Vec<String> = ids.into_iter().map(String::from).collect();
        assert_eq!(ids, vec!["1", "abc", "3"]);
    }

    #[test]
    fn test_entry_ids_beyond_i64_stay_intact() {
        let ids: Vec<EntryId> =
            serde_json::from_str(r#"[18446744073709551615, 9223372036854775808, -4]"#).unwrap();
        let ids: Vec<String> = ids.into_iter().map(String::from).collect();
        assert_eq!(
            ids,
            vec!["18446744073709551615", "9223372036854775808", "-4"]
        );
    }

    #[test]
    fn test_batch_size_is_capped() {
        let transport = Arc::new(status_only(200));
        let options = FeedbinOptions {
            batch_size: 500,
            ..options()
        };
        let client = FeedbinClient::new(transport, options, CacheHandle::Disabled);
        assert_eq!(client.options.batch_size, MAX_IDS_PER_FETCH);
    }

    #[tokio::test]
    async fn test_auth_success_is_memoized() {
        let transport = Arc::new(status_only(200));
        let client = client(transport.clone(), CacheHandle::Disabled);

        assert_eq!(client.ensure_authenticated().await, Ok(()));
        assert_eq!(client.ensure_authenticated().await, Ok(()));
        assert_eq!(transport.count(Method::Get, "/v2/authentication.json"), 1);
    }

    #[tokio::test]
    async fn test_auth_rejection_is_memoized() {
        let transport = Arc::new(status_only(401));
        let client = client(transport.clone(), CacheHandle::Disabled);

        assert_eq!(
            client.ensure_authenticated().await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            client.ensure_authenticated().await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_auth_unexpected_status() {
        let transport = Arc::new(status_only(503));
        let client = client(transport.clone(), CacheHandle::Disabled);

        assert_eq!(
            client.ensure_authenticated().await,
            Err(AuthError::UnexpectedStatus(503))
        );
        assert_eq!(
            client.ensure_authenticated().await,
            Err(AuthError::UnexpectedStatus(503))
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_auth_transport_failure_is_memoized() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(FeedSweepError::Fetch("connection refused".into()))
        }));
        let client = client(transport.clone(), CacheHandle::Disabled);

        assert!(matches!(
            client.ensure_authenticated().await,
            Err(AuthError::Transport(_))
        ));
        assert!(client.get_unread_items().await.is_err());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_auth_sends_one_request() {
        let transport = Arc::new(status_only(200).with_delay(Duration::from_millis(50)));
        let client = client(transport.clone(), CacheHandle::Disabled);

        let results = futures::future::join_all((0..8).map(|_| client.ensure_authenticated())).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.count(Method::Get, "/v2/authentication.json"), 1);
    }

    #[tokio::test]
    async fn test_invalid_credentials_stop_before_fetching() {
        let transport = Arc::new(status_only(401));
        let client = client(transport.clone(), CacheHandle::Disabled);

        let err = client.get_unread_items().await.unwrap_err();

        assert!(matches!(
            err,
            FeedSweepError::Auth(AuthError::InvalidCredentials)
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetches_150_items_in_two_batches() {
        let transport = Arc::new(MockTransport::feed_service((1..=150).collect(), vec![]));
        let client = client(transport.clone(), CacheHandle::Disabled);

        let items = client.get_unread_items().await.unwrap();

        let batches = transport.entry_batches();
        assert_eq!(batches.len(), 2);
        let expected_first: Vec<String> = (1..=100).map(|i: u32| i.to_string()).collect();
        let expected_second: Vec<String> = (101..=150).map(|i: u32| i.to_string()).collect();
        assert_eq!(batches[0], expected_first);
        assert_eq!(batches[1], expected_second);

        assert_eq!(items.len(), 150);
        let all: Vec<String> = (1..=150).map(|i: u32| i.to_string()).collect();
        assert_eq!(ids(&items), all);
        assert_eq!(items[0].title(), "Item 1");
        assert_eq!(items[0].url(), "https://example.com/1");
        assert_eq!(items[0].author(), "");
    }

    #[tokio::test]
    async fn test_empty_unread_list_makes_no_entry_requests() {
        let transport = Arc::new(MockTransport::feed_service(vec![], vec![]));
        let client = client(transport.clone(), CacheHandle::Disabled);

        let items = client.get_unread_items().await.unwrap();

        assert!(items.is_empty());
        assert!(transport.entry_batches().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_unread_ids_are_returned_once() {
        let transport = Arc::new(MockTransport::feed_service(vec![1, 2, 2, 3, 1], vec![]));
        let client = client(transport.clone(), CacheHandle::Disabled);

        let items = client.get_unread_items().await.unwrap();
        assert_eq!(ids(&items), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failing_batch_fails_whole_call() {
        let tmp = TempDir::new().unwrap();
        let cache = CacheHandle::initialize(tmp.path());
        let transport = Arc::new(MockTransport::feed_service((1..=250).collect(), vec![180]));
        let client = client(transport.clone(), cache.clone());

        let err = client.get_unread_items().await.unwrap_err();

        assert!(matches!(err, FeedSweepError::Fetch(_)));
        assert_eq!(cache.get("1"), None);
    }

    #[tokio::test]
    async fn test_unread_list_error_status() {
        let transport = Arc::new(MockTransport::new(|req| match req.url.path() {
            "/v2/authentication.json" => Ok(ApiResponse::new(200, "")),
            _ => Ok(ApiResponse::new(500, "")),
        }));
        let client = client(transport, CacheHandle::Disabled);

        assert!(matches!(
            client.get_unread_items().await,
            Err(FeedSweepError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_unread_list_bad_body() {
        let transport = Arc::new(MockTransport::new(|req| match req.url.path() {
            "/v2/authentication.json" => Ok(ApiResponse::new(200, "")),
            _ => Ok(ApiResponse::new(200, "<html>oops</html>")),
        }));
        let client = client(transport, CacheHandle::Disabled);

        assert!(matches!(
            client.get_unread_items().await,
            Err(FeedSweepError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_without_id_fails_fetch() {
        let transport = Arc::new(MockTransport::new(|req| match req.url.path() {
            "/v2/authentication.json" => Ok(ApiResponse::new(200, "")),
            "/v2/unread_entries.json" => Ok(ApiResponse::new(200, "[1]")),
            _ => Ok(ApiResponse::new(200, r#"[{"id":"","title":"x"}]"#)),
        }));
        let client = client(transport, CacheHandle::Disabled);

        assert!(matches!(
            client.get_unread_items().await,
            Err(FeedSweepError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_hits_skip_fetching_and_stale_entries_are_pruned() {
        let tmp = TempDir::new().unwrap();
        let cache = CacheHandle::initialize(tmp.path());
        let cached = Item::new("2").unwrap().with_title("Cached 2".to_string());
        cache.put(&cached);
        cache.put(&Item::new("999").unwrap());

        let transport = Arc::new(MockTransport::feed_service(vec![1, 2, 3], vec![]));
        let client = client(transport.clone(), cache.clone());

        let items = client.get_unread_items().await.unwrap();

        assert_eq!(transport.entry_batches(), vec![vec!["1".to_string(), "3".to_string()]]);
        assert_eq!(ids(&items), vec!["2", "1", "3"]);
        assert_eq!(items[0], cached);

        assert_eq!(cache.get("999"), None);
        assert_eq!(cache.get("1").map(|i| i.title().to_string()), Some("Item 1".to_string()));
        assert_eq!(cache.get("3").map(|i| i.title().to_string()), Some("Item 3".to_string()));
        assert_eq!(cache.get("2"), Some(cached));
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = CacheHandle::initialize(tmp.path());
        let transport = Arc::new(MockTransport::feed_service((1..=5).collect(), vec![]));

        let first = client(transport.clone(), cache.clone());
        let first_items = first.get_unread_items().await.unwrap();

        let second = client(transport.clone(), cache.clone());
        let second_items = second.get_unread_items().await.unwrap();

        assert_eq!(transport.entry_batches().len(), 1);
        assert_eq!(first_items, second_items);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let cache = CacheHandle::initialize(tmp.path());
        std::fs::write(
            tmp.path().join(crate::cache::FileCache::entry_file_name("1")),
            "garbage",
        )
        .unwrap();

        let transport = Arc::new(MockTransport::feed_service(vec![1], vec![]));
        let client = client(transport.clone(), cache.clone());
        let items = client.get_unread_items().await.unwrap();

        assert_eq!(transport.entry_batches(), vec![vec!["1".to_string()]]);
        assert_eq!(items.len(), 1);
        assert_eq!(cache.get("1"), Some(items[0].clone()));
    }

    #[tokio::test]
    async fn test_mark_item_as_read_sends_delete() {
        let transport = Arc::new(MockTransport::feed_service(vec![], vec![]));
        let client = client(transport.clone(), CacheHandle::Disabled);
        let item = Item::new("77").unwrap();

        client.mark_item_as_read(&item).await.unwrap();

        let deletes: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|req| req.method == Method::Delete)
            .collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].url.path(), "/v2/unread_entries.json");
        assert_eq!(
            deletes[0].url.query_pairs().find(|(k, _)| k == "unread_entries").map(|(_, v)| v.into_owned()),
            Some("77".to_string())
        );
        assert!(requested_ids(&deletes[0]).is_empty());
    }

    #[tokio::test]
    async fn test_mark_item_as_read_failure() {
        let transport = Arc::new(MockTransport::new(|req| match req.method {
            Method::Get => Ok(ApiResponse::new(200, "")),
            Method::Delete => Ok(ApiResponse::new(500, "")),
        }));
        let client = client(transport.clone(), CacheHandle::Disabled);
        let item = Item::new("5").unwrap();

        let err = client.mark_item_as_read(&item).await.unwrap_err();

        assert!(matches!(err, FeedSweepError::MarkRead { ref id, .. } if id == "5"));
        assert_eq!(transport.count(Method::Delete, "/v2/unread_entries.json"), 1);
    }

    #[tokio::test]
    async fn test_mark_item_as_read_with_rejected_credentials() {
        let transport = Arc::new(status_only(401));
        let client = client(transport.clone(), CacheHandle::Disabled);
        let item = Item::new("6").unwrap();

        let err = client.mark_item_as_read(&item).await.unwrap_err();

        assert!(matches!(err, FeedSweepError::MarkRead { ref id, .. } if id == "6"));
        assert_eq!(transport.count(Method::Delete, "/v2/unread_entries.json"), 0);
        assert_eq!(transport.requests().len(), 1);
    }
}
