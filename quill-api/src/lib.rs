use std::fmt::{self, Debug, Display};

use serde::{de::DeserializeOwned, Serialize};

mod article;
pub use article::{Article, ArticleId, ArticleUpdate, NewArticle};

mod auth;
pub use auth::{AuthTokens, LoginRequest, RefreshRequest, RegisterRequest, UserProfile};

mod comment;
pub use comment::{Author, Comment, CommentId, CommentUpdate, NewComment};

mod error;
pub use error::Error;

pub mod paths;

mod tag;
pub use tag::{Category, CategoryId, CategoryUpdate, NewCategory, NewTag, Tag, TagId, TagUpdate};

pub mod time;
pub use time::Time;

mod user;
pub use user::{NewUser, Role, User, UserId, UserUpdate};

/// Wrapper the server puts around every payload
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Envelope<T> {
        Envelope {
            success: true,
            message: String::from("OK"),
            data,
        }
    }

    pub fn into_result(self) -> Result<T, Error> {
        match self.success {
            true => Ok(self.data),
            false => Err(Error::Rejected(self.message)),
        }
    }
}

impl Envelope<Option<serde_json::Value>> {
    pub fn failure(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// A server-side collection with the usual CRUD endpoints under `PATH`
pub trait Resource: Clone + Debug + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Debug + Display + Eq + Send + Sync + 'static;
    type New: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;

    const PATH: &'static str;

    fn id(&self) -> Self::Id;
}

macro_rules! display_id {
    ($($id:ident),*) => {
        $(
            impl Display for $id {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    Display::fmt(&self.0, f)
                }
            }
        )*
    };
}

display_id!(ArticleId, CategoryId, CommentId, TagId, UserId);

pub(crate) fn validate_length(field: &str, s: &str, min: usize, max: usize) -> Result<(), Error> {
    let len = s.trim().chars().count();
    if len < min {
        return Err(Error::Invalid(format!(
            "{field} must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(Error::Invalid(format!(
            "{field} must be at most {max} characters long"
        )));
    }
    Ok(())
}
