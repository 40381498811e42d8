//! reqwest implementation of [`BomApi`].
//!
//! Endpoints (relative to `api.base_url`):
//!
//! | Operation | Request |
//! |---|---|
//! | fetch BOM | `GET items/{id}/bom` |
//! | resolve by number | `GET items?number={number}` |
//! | create item | `POST items` |
//! | delete BOM line | `DELETE items/{parent}/bom/{line}` |
//! | create BOM line | `POST items/{parent}/bom` |
//! | bulk export | `GET export` |
//!
//! Reads and deletes are retried with exponential backoff on throttled (429)
//! and 5xx responses. Creations are retried on 429 only: a 5xx can arrive
//! after the write was committed, and repeating it would duplicate the line
//! or item. Connection-level failures are reported as
//! [`ApiError::Transport`] without retrying so the resolver can switch
//! strategy quickly.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use super::{ApiError, ApiResult, BomApi, NewBomLine, NewItem, RemoteBomLine, normalize};
use crate::config::ApiConfig;
use crate::constants::{MAX_BACKOFF_DELAY_MS, MAX_HTTP_RETRIES, STARTING_BACKOFF_DELAY_MS};
use crate::models::ItemRef;

/// Which failed responses a request may be repeated after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Safe to repeat: throttling and server errors
    Idempotent,
    /// Creates: throttling only
    ThrottledOnly,
}

impl Retry {
    fn allows(self, err: &ApiError) -> bool {
        match self {
            Retry::Idempotent => err.is_retryable(),
            Retry::ThrottledOnly => err.is_throttled(),
        }
    }
}

/// HTTP client for the item master.
#[derive(Debug, Clone)]
pub struct HttpBomApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBomApi {
    /// Create a client for `base_url` with an optional bearer token.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bomsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, base_url, token))
    }

    fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build a client from the `[api]` config section.
    pub fn from_config(config: &ApiConfig, token: Option<String>) -> ApiResult<Self> {
        Self::new(config.base_url.clone(), token, Duration::from_secs(config.timeout_secs))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request built by `build`, retrying failures `retry` allows.
    ///
    /// `build` is invoked once per attempt because a `RequestBuilder` is
    /// consumed by sending it.
    async fn send<F>(&self, retry: Retry, build: F) -> ApiResult<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .factor(2)
            .take(MAX_HTTP_RETRIES);

        RetryIf::start(strategy, || self.send_once(build()), |e: &ApiError| {
            let again = retry.allows(e);
            if again {
                debug!("Retrying request after {e}");
            }
            again
        })
        .await
    }

    async fn send_once(&self, request: RequestBuilder) -> ApiResult<Value> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

impl BomApi for HttpBomApi {
    fn fetch_bom<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, ApiResult<Vec<RemoteBomLine>>> {
        async move {
            let url = self.url(&format!("items/{item_id}/bom"));
            let body = self.send(Retry::Idempotent, || self.client.get(&url)).await?;
            let records = normalize::results_list(&body).ok_or_else(|| {
                ApiError::Parse(format!("BOM response for {item_id} has no line list"))
            })?;

            let mut lines = Vec::with_capacity(records.len());
            for record in records {
                match normalize::bom_line(record) {
                    Some(line) => lines.push(line),
                    None => warn!("Skipping unreadable BOM line under {item_id}: {record}"),
                }
            }
            Ok(lines)
        }
        .boxed()
    }

    fn resolve_by_number<'a>(
        &'a self,
        number: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<ItemRef>>> {
        async move {
            let url = self.url("items");
            let request = || self.client.get(&url).query(&[("number", number)]);
            let body = match self.send(Retry::Idempotent, request).await {
                Ok(body) => body,
                Err(ApiError::Status { status: 404, .. }) => return Ok(None),
                Err(e) => return Err(e),
            };

            // Either a search envelope or a single record
            let candidates: Vec<ItemRef> = match normalize::results_list(&body) {
                Some(records) => records.iter().filter_map(normalize::item_ref).collect(),
                None => normalize::item_ref(&body).into_iter().collect(),
            };

            let exact = candidates.iter().position(|item| item.number == number);
            let loose = || {
                candidates.iter().position(|item| item.number.eq_ignore_ascii_case(number))
            };
            Ok(exact.or_else(loose).map(|index| candidates[index].clone()))
        }
        .boxed()
    }

    fn create_item<'a>(&'a self, item: &'a NewItem) -> BoxFuture<'a, ApiResult<ItemRef>> {
        async move {
            let url = self.url("items");
            let request = || self.client.post(&url).json(item);
            let body = self.send(Retry::ThrottledOnly, request).await?;
            normalize::item_ref(&body).ok_or_else(|| {
                ApiError::Parse(format!("create item response for {} has no id", item.number))
            })
        }
        .boxed()
    }

    fn delete_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        async move {
            let url = self.url(&format!("items/{parent_id}/bom/{line_id}"));
            self.send(Retry::Idempotent, || self.client.delete(&url)).await.map(|_| ())
        }
        .boxed()
    }

    fn create_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line: &'a NewBomLine,
    ) -> BoxFuture<'a, ApiResult<()>> {
        async move {
            let url = self.url(&format!("items/{parent_id}/bom"));
            self.send(Retry::ThrottledOnly, || self.client.post(&url).json(line))
                .await
                .map(|_| ())
        }
        .boxed()
    }

    fn bulk_export(&self) -> BoxFuture<'_, ApiResult<Value>> {
        async move {
            let url = self.url("export");
            self.send(Retry::Idempotent, || self.client.get(&url)).await
        }
        .boxed()
    }
}
