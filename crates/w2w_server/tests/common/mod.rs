//! Shared fixtures for the server integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use w2w_client::messages::{Credentials, FavoriteRequest, MovieRef, ReviewRequest, SearchQuery, UserRef};
use w2w_client::Response;
use w2w_server::services::{Accounts, Favorites, MovieSearch, Reviews, ServiceError};
use w2w_server::Router;

/// Canned search backend: knows a single movie, id 42.
#[derive(Debug, Default)]
pub struct StubSearch;

impl MovieSearch for StubSearch {
    fn search_movie(&self, query: &SearchQuery) -> Result<Response, ServiceError> {
        if query.query.trim().is_empty() {
            return Ok(Response::error("No query provided"));
        }
        Ok(Response::ok().with(
            "results",
            json!([{"id": 42, "name": "The Answer", "image_url": "http://img/42.jpg"}]),
        ))
    }

    fn get_movie_by_id(&self, movie_id: &Value) -> Result<Option<Value>, ServiceError> {
        Ok((*movie_id == json!(42)).then(|| json!({"id": 42, "title": "The Answer", "year": 1979})))
    }
}

/// Counts every collaborator call and answers success.
#[derive(Debug, Default)]
pub struct Spy {
    calls: AtomicUsize,
}

impl Spy {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> Result<Response, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::success("spy"))
    }
}

impl Accounts for Spy {
    fn create_account(&self, _: &Credentials) -> Result<Response, ServiceError> {
        self.hit()
    }
    fn authenticate(&self, _: &Credentials) -> Result<Response, ServiceError> {
        self.hit()
    }
}

impl Favorites for Spy {
    fn add_to_favorites(&self, _: &FavoriteRequest) -> Result<Response, ServiceError> {
        self.hit()
    }
    fn remove_from_favorites(&self, _: &FavoriteRequest) -> Result<Response, ServiceError> {
        self.hit()
    }
    fn get_favorites(&self, _: &UserRef) -> Result<Response, ServiceError> {
        self.hit()
    }
}

impl Reviews for Spy {
    fn add_review(&self, _: &ReviewRequest) -> Result<Response, ServiceError> {
        self.hit()
    }
    fn get_reviews(&self, _: &MovieRef) -> Result<Response, ServiceError> {
        self.hit()
    }
}

impl MovieSearch for Spy {
    fn search_movie(&self, _: &SearchQuery) -> Result<Response, ServiceError> {
        self.hit()
    }
    fn get_movie_by_id(&self, _: &Value) -> Result<Option<Value>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

pub fn spy_router() -> (Router, Arc<Spy>) {
    let spy = Arc::new(Spy::default());
    let router = Router::new(spy.clone(), spy.clone(), spy.clone(), spy.clone());
    (router, spy)
}

/// Flat-file collaborators in a fresh temp dir, stub search.
pub fn file_router() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let router = Router::with_files(dir.path(), Arc::new(StubSearch)).unwrap();
    (router, dir)
}
