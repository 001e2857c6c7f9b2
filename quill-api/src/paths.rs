//! Endpoint paths, relative to the API root

use crate::{ArticleId, Resource};

pub const LOGIN: &str = "auth/login";
pub const REGISTER: &str = "auth/register";
pub const REFRESH: &str = "auth/refresh";
pub const LOGOUT: &str = "auth/logout";
pub const ME: &str = "auth/me";

pub fn collection<R: Resource>() -> String {
    String::from(R::PATH)
}

pub fn item<R: Resource>(id: R::Id) -> String {
    format!("{}/{}", R::PATH, id)
}

pub fn comments_of(article: ArticleId) -> String {
    format!("comments/article/{article}")
}

pub fn article_like(article: ArticleId) -> String {
    format!("articles/{article}/like")
}

/// Endpoints whose 401 means "bad credentials" rather than "expired token"
pub fn is_auth_endpoint(url_path: &str) -> bool {
    [LOGIN, REGISTER, REFRESH].iter().any(|p| {
        url_path
            .trim_end_matches('/')
            .strip_suffix(p)
            .map(|prefix| prefix.is_empty() || prefix.ends_with('/'))
            .unwrap_or(false)
    })
}
