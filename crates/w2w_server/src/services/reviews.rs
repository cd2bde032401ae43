//! Reviews over `comments.json`, keyed by movie id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use w2w_client::messages::{MovieRef, ReviewRequest};
use w2w_client::Response;

use super::store::JsonFile;
use super::{movie_key, Reviews, ServiceError};

pub const COMMENTS_FILE: &str = "comments.json";

/// Entries are `{user, comment}`; bare strings written by older clients are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewEntry {
    Attributed { user: String, comment: String },
    Plain(String),
}

type Comments = BTreeMap<String, Vec<ReviewEntry>>;

#[derive(Debug)]
pub struct FileReviews {
    comments: JsonFile<Comments>,
}

impl FileReviews {
    /// Open (or create) `comments.json` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, ServiceError> {
        Ok(Self {
            comments: JsonFile::open(data_dir.join(COMMENTS_FILE))?,
        })
    }
}

impl Reviews for FileReviews {
    fn add_review(&self, req: &ReviewRequest) -> Result<Response, ServiceError> {
        let key = movie_key(&req.movie_id);
        self.comments.update(|comments| {
            comments.entry(key).or_default().push(ReviewEntry::Attributed {
                user: req.username.clone(),
                comment: req.comment.clone(),
            });
            (Response::success("Review added"), true)
        })
    }

    fn get_reviews(&self, movie: &MovieRef) -> Result<Response, ServiceError> {
        let reviews = self
            .comments
            .read()?
            .remove(&movie_key(&movie.movie_id))
            .unwrap_or_default();
        let reviews = serde_json::to_value(reviews).map_err(ServiceError::Payload)?;
        Ok(Response::ok().with("reviews", reviews))
    }
}
