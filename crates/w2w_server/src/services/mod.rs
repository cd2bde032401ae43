//! Collaborators the router calls into: accounts, favorites, reviews, movie search.
//!
//! Every call is synchronous and may block on file or network I/O, so the
//! command server runs them on tokio's blocking pool.

pub mod accounts;
pub mod reviews;
pub mod search;
mod store;

use serde_json::Value;
use w2w_client::messages::{Credentials, FavoriteRequest, MovieRef, ReviewRequest, SearchQuery, UserRef};
use w2w_client::Response;

pub use accounts::FileAccounts;
pub use reviews::FileReviews;
pub use search::WatchmodeSearch;

/// Failure inside a collaborator. The router turns these into
/// `{"status": "error", "message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store {file}: {source}")]
    Corrupt {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Search request timed out")]
    SearchTimedOut,
    #[error("API Error: {0}")]
    Api(u16),
    #[error("Search error: {0}")]
    Http(#[from] reqwest::Error),
}

/// `register` / `login`.
pub trait Accounts: Send + Sync {
    fn create_account(&self, creds: &Credentials) -> Result<Response, ServiceError>;
    fn authenticate(&self, creds: &Credentials) -> Result<Response, ServiceError>;
}

/// `add_favorite` / `remove_favorite` / `get_favorites`.
pub trait Favorites: Send + Sync {
    fn add_to_favorites(&self, req: &FavoriteRequest) -> Result<Response, ServiceError>;
    fn remove_from_favorites(&self, req: &FavoriteRequest) -> Result<Response, ServiceError>;
    fn get_favorites(&self, user: &UserRef) -> Result<Response, ServiceError>;
}

/// `add_review` / `get_reviews`.
pub trait Reviews: Send + Sync {
    fn add_review(&self, req: &ReviewRequest) -> Result<Response, ServiceError>;
    fn get_reviews(&self, movie: &MovieRef) -> Result<Response, ServiceError>;
}

/// `search` / `get_movie_details`.
pub trait MovieSearch: Send + Sync {
    fn search_movie(&self, query: &SearchQuery) -> Result<Response, ServiceError>;
    fn get_movie_by_id(&self, movie_id: &Value) -> Result<Option<Value>, ServiceError>;
}

/// Movie ids key the comments file as strings: `42` and `"42"` share a thread.
pub fn movie_key(movie_id: &Value) -> String {
    match movie_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
