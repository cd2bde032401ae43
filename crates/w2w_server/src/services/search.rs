//! Movie search over the Watchmode HTTP API.

use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use w2w_client::messages::SearchQuery;
use w2w_client::Response;

use super::{MovieSearch, ServiceError};

/// Results returned per search.
pub const MAX_RESULTS: usize = 5;

/// Per-call HTTP timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct WatchmodeSearch {
    base_url: String,
    api_key: String,
    // Built on first use, which happens on a blocking-pool thread.
    http: OnceLock<HttpClient>,
}

impl WatchmodeSearch {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: OnceLock::new(),
        }
    }

    fn http(&self) -> Result<&HttpClient, ServiceError> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = HttpClient::builder().timeout(HTTP_TIMEOUT).build()?;
        // A racing thread may have won; either client is equivalent.
        Ok(self.http.get_or_init(|| client))
    }

    /// `Ok(None)` on 404, `Api(status)` on any other non-success status.
    fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Option<Value>, ServiceError> {
        let mut query = vec![("apiKey", self.api_key.as_str())];
        query.extend_from_slice(params);
        let resp = self
            .http()?
            .get(url)
            .query(&query)
            .send()
            .map_err(http_error)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ServiceError::Api(status.as_u16()));
        }
        resp.json().map(Some).map_err(http_error)
    }

    fn poster(&self, movie_id: &Value) -> Option<String> {
        match self.get_movie_by_id(movie_id) {
            Ok(Some(details)) => details
                .get("poster")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(movie_id = %movie_id, error = %e, "poster lookup failed");
                None
            }
        }
    }
}

fn http_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::SearchTimedOut
    } else {
        ServiceError::Http(e)
    }
}

/// First [`MAX_RESULTS`] entries of `title_results` that carry an id.
pub fn title_results(body: &Value) -> Vec<Value> {
    body.get("title_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .take(MAX_RESULTS)
                .filter(|r| r.get("id").is_some_and(|id| !id.is_null()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

impl MovieSearch for WatchmodeSearch {
    fn search_movie(&self, query: &SearchQuery) -> Result<Response, ServiceError> {
        let text = query.query.trim();
        if text.is_empty() {
            return Ok(Response::error("No query provided"));
        }

        let url = format!("{}/search/", self.base_url);
        // Unlike a details lookup, a 404 here means the upstream call failed.
        let body = self
            .get_json(&url, &[("search_field", "name"), ("search_value", text)])?
            .ok_or(ServiceError::Api(404))?;
        let mut results = title_results(&body);
        tracing::info!(query = %text, count = results.len(), "search results received");

        for result in &mut results {
            let Some(id) = result.get("id").cloned() else {
                continue;
            };
            if let Some(url) = self.poster(&id) {
                result["image_url"] = Value::String(url);
            }
        }
        Ok(Response::ok().with("results", results))
    }

    fn get_movie_by_id(&self, movie_id: &Value) -> Result<Option<Value>, ServiceError> {
        let url = format!(
            "{}/title/{}/details/",
            self.base_url,
            super::movie_key(movie_id)
        );
        self.get_json(&url, &[])
    }
}
