//! Envelope encoding, action names and chat line conventions.

use serde_json::{json, Map, Value};
use w2w_client::messages::{chat_line, join_notice, leave_notice, Credentials, ReviewRequest};
use w2w_client::{Action, Request, Response};

#[test]
fn action_names_are_case_sensitive() {
    assert_eq!(Action::parse("add_favorite"), Some(Action::AddFavorite));
    assert_eq!(Action::parse("Add_Favorite"), None);
    assert_eq!(Action::parse("LOGIN"), None);
    assert_eq!(Action::parse(""), None);
    for action in Action::ALL {
        assert_eq!(Action::parse(action.as_str()), Some(action));
    }
}

#[test]
fn response_envelope_round_trips() {
    let original = Response::success("Login successful").with("user_id", "abc-123");
    let text = serde_json::to_string(&original).unwrap();
    let back: Response = serde_json::from_str(&text).unwrap();
    assert_eq!(back, original);

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["user_id"], "abc-123");
}

#[test]
fn response_without_message_omits_the_field() {
    let resp = Response::ok().with("results", json!([{"id": 1, "name": "Heat"}]));
    let value = serde_json::to_value(&resp).unwrap();
    assert!(value.get("message").is_none());
    assert_eq!(value["results"][0]["name"], "Heat");
}

#[test]
fn request_envelope_round_trips_and_defaults_data() {
    let req = Request::with_payload(
        Action::AddReview,
        &ReviewRequest {
            username: "alice".into(),
            movie_id: json!(42),
            comment: "great".into(),
        },
    )
    .unwrap();
    let text = serde_json::to_string(&req).unwrap();
    assert_eq!(serde_json::from_str::<Request>(&text).unwrap(), req);

    let bare: Request = serde_json::from_str(r#"{"action":"search"}"#).unwrap();
    assert!(bare.data.is_empty());
    let missing: Request = serde_json::from_str("{}").unwrap();
    assert_eq!(missing.action, "");
}

#[test]
fn payload_reports_missing_fields() {
    let req = Request::new("login", Map::new());
    let err = req.payload::<Credentials>().unwrap_err();
    assert!(err.to_string().contains("username"));
}

#[test]
fn with_payload_rejects_non_objects() {
    assert!(Request::with_payload(Action::Search, &"just a string").is_err());
}

#[test]
fn chat_conventions() {
    assert_eq!(chat_line("alice", "hi"), "alice: hi");
    assert!(join_notice("bob").contains("bob joined"));
    assert!(leave_notice("bob").contains("bob left"));
}
