//! In-memory stand-in for the feed service, recording every request.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::app::Result;
use crate::client::transport::{ApiRequest, ApiResponse, Method, Transport};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

pub struct MockTransport {
    handler: Handler,
    delay: Option<Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A well-behaved service with the given unread ids. Entries are titled
    /// `Item <id>`; ids in `failing_ids` make their batch answer 500.
    pub fn feed_service(unread: Vec<u64>, failing_ids: Vec<u64>) -> Self {
        let failing: HashSet<String> = failing_ids.iter().map(|id| id.to_string()).collect();
        Self::new(move |req| {
            let response = match (req.method, req.url.path()) {
                (Method::Get, "/v2/authentication.json") => ApiResponse::new(200, "{}"),
                (Method::Get, "/v2/unread_entries.json") => {
                    ApiResponse::new(200, json!(unread).to_string())
                }
                (Method::Get, "/v2/entries.json") => {
                    let ids = requested_ids(req);
                    if ids.iter().any(|id| failing.contains(id)) {
                        ApiResponse::new(500, "boom")
                    } else {
                        let entries: Vec<_> = ids
                            .iter()
                            .map(|id| {
                                json!({
                                    "id": id.parse::<u64>().unwrap(),
                                    "feed_id": 1,
                                    "title": format!("Item {}", id),
                                    "content": format!("Content {}", id),
                                    "url": format!("https://example.com/{}", id),
                                    "author": null,
                                })
                            })
                            .collect();
                        ApiResponse::new(200, json!(entries).to_string())
                    }
                }
                (Method::Delete, "/v2/unread_entries.json") => ApiResponse::new(200, "[]"),
                _ => ApiResponse::new(404, "not found"),
            };
            Ok(response)
        })
    }

    /// Delay every response, so concurrent callers really overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|req| req.method == method && req.url.path() == path)
            .count()
    }

    /// Id lists of every entries request, in the order they were sent.
    pub fn entry_batches(&self) -> Vec<Vec<String>> {
        self.requests()
            .iter()
            .filter(|req| req.url.path() == "/v2/entries.json")
            .map(requested_ids)
            .collect()
    }
}

pub fn requested_ids(req: &ApiRequest) -> Vec<String> {
    req.url
        .query_pairs()
        .find(|(key, _)| key == "ids")
        .map(|(_, value)| value.split(',').map(String::from).collect())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request)
    }
}
