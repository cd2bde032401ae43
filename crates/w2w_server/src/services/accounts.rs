//! Accounts and favorites over `users.json`, keyed by username.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use w2w_client::messages::{Credentials, FavoriteRequest, UserRef};
use w2w_client::Response;

use super::store::JsonFile;
use super::{Accounts, Favorites, ServiceError};

pub const USERS_FILE: &str = "users.json";

/// One entry of `users.json`. Passwords are stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub password: String,
    pub id: String,
    #[serde(default)]
    pub favorites: Vec<Value>,
}

type Users = BTreeMap<String, UserRecord>;

#[derive(Debug)]
pub struct FileAccounts {
    users: JsonFile<Users>,
}

impl FileAccounts {
    /// Open (or create) `users.json` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, ServiceError> {
        let users = JsonFile::open(data_dir.join(USERS_FILE))?;
        tracing::debug!(path = %users.path().display(), "user store ready");
        Ok(Self { users })
    }

    pub fn user(&self, username: &str) -> Result<Option<UserRecord>, ServiceError> {
        Ok(self.users.read()?.remove(username))
    }
}

impl Accounts for FileAccounts {
    fn create_account(&self, creds: &Credentials) -> Result<Response, ServiceError> {
        self.users.update(|users| {
            if users.contains_key(&creds.username) {
                return (Response::fail("Username already exists"), false);
            }
            let id = uuid::Uuid::new_v4().to_string();
            users.insert(
                creds.username.clone(),
                UserRecord {
                    password: creds.password.clone(),
                    id: id.clone(),
                    favorites: Vec::new(),
                },
            );
            tracing::info!(username = %creds.username, "account created");
            (Response::success("Account created").with("user_id", id), true)
        })
    }

    fn authenticate(&self, creds: &Credentials) -> Result<Response, ServiceError> {
        match self.user(&creds.username)? {
            Some(user) if user.password == creds.password => {
                Ok(Response::success("Login successful").with("user_id", user.id))
            }
            _ => Ok(Response::fail("Invalid credentials")),
        }
    }
}

impl Favorites for FileAccounts {
    fn add_to_favorites(&self, req: &FavoriteRequest) -> Result<Response, ServiceError> {
        self.users.update(|users| {
            let Some(user) = users.get_mut(&req.username) else {
                return (Response::fail("User not found"), false);
            };
            if user.favorites.contains(&req.movie_id) {
                return (Response::fail("Movie already in favorites"), false);
            }
            user.favorites.push(req.movie_id.clone());
            (Response::success("Added to favorites"), true)
        })
    }

    fn remove_from_favorites(&self, req: &FavoriteRequest) -> Result<Response, ServiceError> {
        self.users.update(|users| {
            let Some(user) = users.get_mut(&req.username) else {
                return (Response::fail("User not found"), false);
            };
            let Some(pos) = user.favorites.iter().position(|id| *id == req.movie_id) else {
                return (Response::fail("Movie not in favorites"), false);
            };
            user.favorites.remove(pos);
            (Response::success("Removed from favorites"), true)
        })
    }

    fn get_favorites(&self, req: &UserRef) -> Result<Response, ServiceError> {
        Ok(match self.user(&req.username)? {
            Some(user) => Response::ok().with("favorites", user.favorites),
            None => Response::fail("User not found"),
        })
    }
}
