use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Request, Response, StatusCode,
};
use reqwest_middleware::{Middleware, Next};
use task_local_extensions::Extensions;

use crate::{
    api::paths,
    nav::{Navigator, Redirect},
    RefreshCoordinator, Session,
};

/// Bearer authentication with transparent recovery from expired tokens
pub struct AuthMiddleware {
    session: Session,
    navigator: Navigator,
    coordinator: RefreshCoordinator,
}

impl AuthMiddleware {
    pub fn new(
        session: Session,
        navigator: Navigator,
        coordinator: RefreshCoordinator,
    ) -> AuthMiddleware {
        AuthMiddleware {
            session,
            navigator,
            coordinator,
        }
    }

    fn end_session(&self) {
        self.session.clear();
        self.navigator.redirect(Redirect::Login { expired: false });
    }

    fn deny(&self, resp: &Response) {
        tracing::warn!(url = %resp.url(), "permission denied");
        self.navigator.redirect(Redirect::access_denied());
    }
}

fn set_bearer(req: &mut Request, token: &str) -> reqwest_middleware::Result<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
    value.set_sensitive(true);
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if let Some(token) = self.session.access_token() {
            set_bearer(&mut req, &token)?;
        }
        let auth_endpoint = paths::is_auth_endpoint(req.url().path());
        // streaming bodies cannot be replayed, their 401 is final
        let retry = req.try_clone();

        let resp = next.clone().run(req, extensions).await?;
        match resp.status() {
            StatusCode::FORBIDDEN => {
                self.deny(&resp);
                Ok(resp)
            }
            StatusCode::UNAUTHORIZED => {
                if auth_endpoint {
                    tracing::info!(url = %resp.url(), "authentication endpoint refused the credentials");
                    self.end_session();
                    return Ok(resp);
                }
                let Some(refresh_token) = self.session.refresh_token() else {
                    tracing::info!(url = %resp.url(), "unauthorized without a refresh token");
                    self.end_session();
                    return Ok(resp);
                };
                let Some(mut retry) = retry else {
                    tracing::warn!(url = %resp.url(), "unauthorized on a request that cannot be replayed");
                    return Ok(resp);
                };
                let token = self
                    .coordinator
                    .fresh_access_token(refresh_token)
                    .await
                    .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
                set_bearer(&mut retry, &token)?;
                tracing::debug!(url = %retry.url(), "retrying with the refreshed token");
                // a second 401 is final
                let resp = next.run(retry, extensions).await?;
                if resp.status() == StatusCode::FORBIDDEN {
                    self.deny(&resp);
                }
                Ok(resp)
            }
            _ => Ok(resp),
        }
    }
}
