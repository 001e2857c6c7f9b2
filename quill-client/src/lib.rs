mod auth;
pub use auth::{AuthStatus, AuthStore};

mod client;
pub use client::Client;

pub mod comment;

mod comments;
pub use comments::{CommentsState, CommentsStore};

mod config;
pub use config::{Config, DEFAULT_API_URL, DEFAULT_REFRESH_TIMEOUT};

mod error;
pub use error::Error;

mod middleware;
pub use middleware::AuthMiddleware;

mod nav;
pub use nav::{Navigator, Redirect, ACCESS_DENIED};

mod refresh;
pub use refresh::{RefreshCoordinator, RefreshError};

mod session;
pub use session::{Session, SessionState};

pub mod storage;
pub use storage::{FileStorage, MemoryStorage, TokenStorage};

mod store;
pub use store::{
    ArticlesStore, CategoriesStore, ResourceStore, StoreState, TagsStore, UsersStore,
};

#[cfg(test)]
mod tests;

pub mod api {
    pub use quill_api::*;
}
