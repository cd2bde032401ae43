//! Request/response envelopes for the command protocol and the chat line conventions.
//! Client ↔ server JSON, one envelope per line.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Actions understood by the command server. Names are matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Register,
    Login,
    Search,
    AddFavorite,
    RemoveFavorite,
    AddReview,
    GetMovieDetails,
    GetFavorites,
    GetReviews,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Register,
        Action::Login,
        Action::Search,
        Action::AddFavorite,
        Action::RemoveFavorite,
        Action::AddReview,
        Action::GetMovieDetails,
        Action::GetFavorites,
        Action::GetReviews,
    ];

    /// Case-sensitive lookup; `None` for anything unknown.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Login => "login",
            Action::Search => "search",
            Action::AddFavorite => "add_favorite",
            Action::RemoveFavorite => "remove_favorite",
            Action::AddReview => "add_review",
            Action::GetMovieDetails => "get_movie_details",
            Action::GetFavorites => "get_favorites",
            Action::GetReviews => "get_reviews",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client → server: `{"action": ..., "data": {...}}`.
///
/// A missing `action` decodes as the empty string so it falls through to the
/// router's invalid-action reply instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Request {
    pub fn new(action: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            data,
        }
    }

    /// Build a request from a typed payload. The payload must serialize to a JSON object.
    pub fn with_payload<P: Serialize>(action: Action, payload: &P) -> Result<Self, serde_json::Error> {
        let data = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "payload must be a JSON object, got {}",
                    other
                )))
            }
        };
        Ok(Self::new(action.as_str(), data))
    }

    /// Decode `data` into a typed payload.
    pub fn payload<P: DeserializeOwned>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }
}

/// The three outcomes every response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Fail,
    Error,
}

/// Server → client: `status` is always present, everything else is action-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    fn with_status(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            fields: Map::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(Status::Success, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::with_status(Status::Fail, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(Status::Error, message)
    }

    /// Success with no message, for data-only replies.
    pub fn ok() -> Self {
        Self {
            status: Status::Success,
            message: None,
            fields: Map::new(),
        }
    }

    /// Attach an action-specific field. `status` and `message` keep their typed slots.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        match key {
            "status" => {}
            "message" => self.message = value.as_str().map(str::to_string),
            _ => {
                self.fields.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// `register` / `login` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `search` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// `add_favorite` / `remove_favorite` payload. Movie ids are kept as raw JSON
/// values because the search API hands out numbers while older clients send strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRequest {
    pub username: String,
    pub movie_id: Value,
}

/// `add_review` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub username: String,
    pub movie_id: Value,
    pub comment: String,
}

/// `get_movie_details` / `get_reviews` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRef {
    pub movie_id: Value,
}

/// `get_favorites` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
}

/// Chat line posted by a user.
pub fn chat_line(username: &str, text: &str) -> String {
    format!("{}: {}", username, text)
}

pub fn join_notice(username: &str) -> String {
    format!("🔔 {} joined the chat.", username)
}

pub fn leave_notice(username: &str) -> String {
    format!("🚪 {} left the chat.", username)
}
