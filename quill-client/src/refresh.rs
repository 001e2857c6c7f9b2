//! Single-flight renewal of the access token
//!
//! The first request to hit a 401 while no refresh is running spawns one and
//! parks its completion in a shared future. Every other request failing while
//! it runs awaits that same future instead of calling the refresh endpoint
//! again. The refresh itself lives in its own task, so it completes even if
//! all the requests waiting for it are dropped.

use std::{sync::Arc, time::Duration};

use futures::{
    channel::oneshot,
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use url::Url;

use crate::{
    api::{self, AuthTokens, Envelope, RefreshRequest},
    nav::{Navigator, Redirect},
    Config, Error, Session,
};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("no answer to refresh request within {0:?}")]
    TimedOut(Duration),

    #[error("refresh was abandoned before completing")]
    Abandoned,
}

type Outcome = Result<String, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, Outcome>>;

enum State {
    Idle,
    Refreshing(PendingRefresh),
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    http: reqwest::Client,
    refresh_url: Url,
    timeout: Duration,
    session: Session,
    navigator: Navigator,
}

impl RefreshCoordinator {
    /// `http` must not go through the auth middleware, or a 401 on the
    /// refresh call would recurse into the coordinator
    pub fn new(
        config: &Config,
        http: reqwest::Client,
        session: Session,
        navigator: Navigator,
    ) -> Result<RefreshCoordinator, Error> {
        Ok(RefreshCoordinator {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Idle),
                http,
                refresh_url: config.endpoint(api::paths::REFRESH)?,
                timeout: config.refresh_timeout,
                session,
                navigator,
            }),
        })
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.state.lock(), State::Refreshing(_))
    }

    /// Resolves to a fresh access token, starting a refresh with
    /// `refresh_token` unless one is already in flight
    ///
    /// On failure the session has been cleared and a login redirect emitted
    /// by the time this returns.
    pub async fn fresh_access_token(&self, refresh_token: String) -> Result<String, RefreshError> {
        let pending = {
            let mut state = self.inner.state.lock();
            match &*state {
                State::Refreshing(pending) => {
                    tracing::debug!("joining the token refresh already in flight");
                    pending.clone()
                }
                State::Idle => {
                    let pending = self.spawn_refresh(refresh_token);
                    *state = State::Refreshing(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    // called with the state lock held
    fn spawn_refresh(&self, refresh_token: String) -> PendingRefresh {
        let (done, outcome) = oneshot::channel();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let res = match inner.call_refresh(&refresh_token).await {
                Ok(tokens) => {
                    inner
                        .session
                        .update_tokens(tokens.access_token.clone(), tokens.refresh_token);
                    *inner.state.lock() = State::Idle;
                    tracing::info!("access token refreshed");
                    Ok(tokens.access_token)
                }
                Err(err) => {
                    tracing::warn!(%err, "token refresh failed, ending session");
                    inner.session.clear();
                    *inner.state.lock() = State::Idle;
                    inner.navigator.redirect(Redirect::Login { expired: true });
                    Err(err)
                }
            };
            // every waiter may be gone already
            let _ = done.send(res);
        });
        tracing::info!("started token refresh");
        outcome
            .map(|res| res.unwrap_or(Err(RefreshError::Abandoned)))
            .boxed()
            .shared()
    }
}

impl Inner {
    async fn call_refresh(&self, refresh_token: &str) -> Result<AuthTokens, RefreshError> {
        tokio::time::timeout(self.timeout, self.exchange(refresh_token))
            .await
            .map_err(|_| RefreshError::TimedOut(self.timeout))?
    }

    async fn exchange(&self, refresh_token: &str) -> Result<AuthTokens, RefreshError> {
        let resp = self
            .http
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: api::Error::from_response(status, &body).to_string(),
            });
        }
        serde_json::from_slice::<Envelope<Option<AuthTokens>>>(&body)
            .map_err(|e| RefreshError::Transport(format!("unreadable refresh answer: {e}")))?
            .into_result()
            .map_err(|e| RefreshError::Rejected {
                status: status.as_u16(),
                message: e.to_string(),
            })?
            .ok_or_else(|| RefreshError::Transport(String::from("refresh answer carries no tokens")))
    }
}
