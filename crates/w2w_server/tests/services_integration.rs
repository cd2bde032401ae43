//! Flat-file collaborators in temp dirs, and Watchmode search against a
//! minimal in-process HTTP server.

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use w2w_client::messages::{Credentials, FavoriteRequest, MovieRef, ReviewRequest, SearchQuery, UserRef};
use w2w_client::Status;
use w2w_server::services::accounts::USERS_FILE;
use w2w_server::services::reviews::COMMENTS_FILE;
use w2w_server::services::search::title_results;
use w2w_server::services::{Accounts, Favorites, FileAccounts, FileReviews, MovieSearch, Reviews, WatchmodeSearch};

fn creds(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.into(),
        password: password.into(),
    }
}

fn query(text: &str) -> SearchQuery {
    SearchQuery { query: text.into() }
}

/// Serve `count` HTTP/1.1 requests, answering each with `reply(path)`.
fn serve_http(count: usize, reply: fn(&str) -> (u16, String)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        for stream in listener.incoming().take(count) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("").to_string();
            let (status, body) = reply(&path);
            write!(
                stream,
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
        }
    });
    base
}

#[test]
fn account_ids_are_unique_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = FileAccounts::open(dir.path()).unwrap();
    let a = accounts.create_account(&creds("alice", "pw")).unwrap();
    let b = accounts.create_account(&creds("bob", "pw")).unwrap();
    assert_ne!(a.get("user_id"), b.get("user_id"));

    let reopened = FileAccounts::open(dir.path()).unwrap();
    let alice = reopened.user("alice").unwrap().unwrap();
    assert_eq!(Some(&json!(alice.id)), a.get("user_id"));
    assert!(alice.favorites.is_empty());
}

#[test]
fn user_records_without_favorites_still_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(USERS_FILE),
        r#"{"carol": {"password": "x", "id": "c-1"}}"#,
    )
    .unwrap();
    let accounts = FileAccounts::open(dir.path()).unwrap();
    let resp = accounts
        .get_favorites(&UserRef {
            username: "carol".into(),
        })
        .unwrap();
    assert_eq!(resp.get("favorites"), Some(&json!([])));
}

#[test]
fn favorites_compare_movie_ids_as_given() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = FileAccounts::open(dir.path()).unwrap();
    accounts.create_account(&creds("alice", "pw")).unwrap();

    for movie_id in [json!(42), json!("42")] {
        let resp = accounts
            .add_to_favorites(&FavoriteRequest {
                username: "alice".into(),
                movie_id,
            })
            .unwrap();
        assert!(resp.is_success());
    }
    let resp = accounts.get_favorites(&UserRef { username: "alice".into() }).unwrap();
    assert_eq!(resp.get("favorites"), Some(&json!([42, "42"])));
}

#[test]
fn mixed_review_entries_survive_a_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(COMMENTS_FILE),
        r#"{"42": ["old style", {"user": "bob", "comment": "ok"}]}"#,
    )
    .unwrap();
    let reviews = FileReviews::open(dir.path()).unwrap();
    reviews
        .add_review(&ReviewRequest {
            username: "alice".into(),
            movie_id: json!(42),
            comment: "great".into(),
        })
        .unwrap();

    let resp = reviews.get_reviews(&MovieRef { movie_id: json!("42") }).unwrap();
    assert_eq!(
        resp.get("reviews"),
        Some(&json!([
            "old style",
            {"user": "bob", "comment": "ok"},
            {"user": "alice", "comment": "great"}
        ]))
    );
}

#[test]
fn unknown_movie_has_no_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = FileReviews::open(dir.path()).unwrap();
    let resp = reviews.get_reviews(&MovieRef { movie_id: json!(7) }).unwrap();
    assert!(resp.is_success());
    assert_eq!(resp.get("reviews"), Some(&json!([])));
}

#[test]
fn title_results_caps_and_drops_idless_entries() {
    let body = json!({"title_results": [
        {"id": 1, "name": "a"},
        {"name": "no id"},
        {"id": 3, "name": "c"},
        {"id": 4, "name": "d"},
        {"id": 5, "name": "e"},
        {"id": 6, "name": "f"}
    ]});
    let ids: Vec<_> = title_results(&body).iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(3), json!(4), json!(5)]);
    assert!(title_results(&json!({})).is_empty());
}

#[test]
fn empty_query_is_an_error_without_a_request() {
    let search = WatchmodeSearch::new("http://127.0.0.1:9", "key");
    let resp = search.search_movie(&query("  ")).unwrap();
    assert_eq!(resp.status, Status::Error);
    assert_eq!(resp.message(), "No query provided");
}

#[test]
fn search_enriches_results_with_posters() {
    let base = serve_http(3, |path| {
        if path.starts_with("/search/") {
            assert!(path.contains("search_value=heat"));
            assert!(path.contains("apiKey=k"));
            (
                200,
                json!({"title_results": [{"id": 10, "name": "Heat"}, {"id": 11, "name": "Heat 2"}]})
                    .to_string(),
            )
        } else if path.starts_with("/title/10/details/") {
            (200, json!({"id": 10, "poster": "http://img/10.jpg"}).to_string())
        } else {
            (404, "{}".to_string())
        }
    });

    let search = WatchmodeSearch::new(base, "k");
    let resp = search.search_movie(&query("heat")).unwrap();
    assert!(resp.is_success());
    let results = resp.get("results").unwrap().as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["image_url"], "http://img/10.jpg");
    assert!(results[1].get("image_url").is_none());
}

#[test]
fn upstream_failure_maps_to_api_error() {
    let base = serve_http(1, |_| (500, "{}".to_string()));
    let search = WatchmodeSearch::new(base, "k");
    let err = search.search_movie(&query("x")).unwrap_err();
    assert_eq!(err.to_string(), "API Error: 500");
}

#[test]
fn search_endpoint_404_is_an_api_error_not_an_empty_result() {
    let base = serve_http(1, |_| (404, "{}".to_string()));
    let search = WatchmodeSearch::new(base, "k");
    let err = search.search_movie(&query("heat")).unwrap_err();
    assert_eq!(err.to_string(), "API Error: 404");
}

#[test]
fn details_404_is_not_found() {
    let base = serve_http(1, |_| (404, "{}".to_string()));
    let search = WatchmodeSearch::new(base, "k");
    assert_eq!(search.get_movie_by_id(&json!(7)).unwrap(), None);
}
