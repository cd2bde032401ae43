//! Maps an action name to a collaborator call and normalizes the outcome to a
//! response envelope. Routing never fails: every path ends in a `Response`.

use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use w2w_client::messages::{Credentials, FavoriteRequest, MovieRef, ReviewRequest, SearchQuery, UserRef};
use w2w_client::{Action, Config, Request, Response};

use crate::services::{
    Accounts, Favorites, FileAccounts, FileReviews, MovieSearch, Reviews, ServiceError, WatchmodeSearch,
};

pub const INVALID_ACTION: &str = "Invalid action";

#[derive(Clone)]
pub struct Router {
    accounts: Arc<dyn Accounts>,
    favorites: Arc<dyn Favorites>,
    reviews: Arc<dyn Reviews>,
    search: Arc<dyn MovieSearch>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(
        accounts: Arc<dyn Accounts>,
        favorites: Arc<dyn Favorites>,
        reviews: Arc<dyn Reviews>,
        search: Arc<dyn MovieSearch>,
    ) -> Self {
        Self {
            accounts,
            favorites,
            reviews,
            search,
        }
    }

    /// Flat files under `data_dir` plus the given search backend.
    pub fn with_files(data_dir: &Path, search: Arc<dyn MovieSearch>) -> Result<Self, ServiceError> {
        let accounts = Arc::new(FileAccounts::open(data_dir)?);
        let reviews = Arc::new(FileReviews::open(data_dir)?);
        Ok(Self::new(accounts.clone(), accounts, reviews, search))
    }

    /// The production wiring: flat files in `server.data_dir`, Watchmode search.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let api_key = config.api_key().unwrap_or_else(|| {
            tracing::warn!("no API key configured; searches will be rejected upstream");
            String::new()
        });
        let search = Arc::new(WatchmodeSearch::new(config.api_base_url(), api_key));
        Self::with_files(&config.data_dir(), search)
    }

    pub fn route(&self, request: &Request) -> Response {
        let Some(action) = Action::parse(&request.action) else {
            tracing::debug!(action = %request.action, "unknown action");
            return Response::error(INVALID_ACTION);
        };

        match self.dispatch(action, request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "request failed");
                Response::error(e.to_string())
            }
        }
    }

    fn dispatch(&self, action: Action, request: &Request) -> Result<Response, ServiceError> {
        match action {
            Action::Register => self.accounts.create_account(&payload::<Credentials>(request)?),
            Action::Login => self.accounts.authenticate(&payload::<Credentials>(request)?),
            Action::Search => self.search.search_movie(&payload::<SearchQuery>(request)?),
            Action::AddFavorite => self
                .favorites
                .add_to_favorites(&payload::<FavoriteRequest>(request)?),
            Action::RemoveFavorite => self
                .favorites
                .remove_from_favorites(&payload::<FavoriteRequest>(request)?),
            Action::GetFavorites => self.favorites.get_favorites(&payload::<UserRef>(request)?),
            Action::AddReview => self.reviews.add_review(&payload::<ReviewRequest>(request)?),
            Action::GetReviews => self.reviews.get_reviews(&payload::<MovieRef>(request)?),
            Action::GetMovieDetails => {
                let movie = payload::<MovieRef>(request)?;
                Ok(match self.search.get_movie_by_id(&movie.movie_id)? {
                    Some(details) => Response::ok().with("data", details),
                    None => Response::fail("Movie not found"),
                })
            }
        }
    }
}

fn payload<P: DeserializeOwned>(request: &Request) -> Result<P, ServiceError> {
    request.payload().map_err(ServiceError::Payload)
}
