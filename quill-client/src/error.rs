use crate::{api, RefreshError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request middleware failed: {0:#}")]
    Middleware(anyhow::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] api::Error),

    #[error("session expired: {0}")]
    Refresh(#[from] RefreshError),

    #[error("failed parsing server answer: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api(api::Error::Unauthorized) | Error::Refresh(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Api(api::Error::PermissionDenied))
    }

    /// Text shown to the user in a store's `error` slot
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(api::Error::Rejected(msg)) => msg.clone(),
            Error::Api(api::Error::NotFound(msg)) | Error::Api(api::Error::Invalid(msg)) => {
                msg.clone()
            }
            e => e.to_string(),
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Error::Http(e),
            reqwest_middleware::Error::Middleware(e) => match e.downcast::<RefreshError>() {
                Ok(refresh) => Error::Refresh(refresh),
                Err(e) => Error::Middleware(e),
            },
        }
    }
}
