use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    api::{
        self, paths, ArticleId, AuthTokens, Comment, Envelope, LoginRequest, RegisterRequest,
        Resource, UserProfile,
    },
    middleware::AuthMiddleware,
    storage::TokenStorage,
    Config, Error, Navigator, RefreshCoordinator, Session,
};

/// Handle to the blog API
///
/// Cloning is cheap and every clone shares the same session, so a refresh
/// triggered through one clone is joined by requests going through another.
#[derive(Clone)]
pub struct Client {
    config: Config,
    http: ClientWithMiddleware,
    session: Session,
    navigator: Navigator,
    coordinator: RefreshCoordinator,
}

impl Client {
    pub fn new(config: Config, storage: Arc<dyn TokenStorage>) -> Result<Client, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let raw = builder.build()?;

        let session = Session::restore(storage);
        let navigator = Navigator::new();
        let coordinator =
            RefreshCoordinator::new(&config, raw.clone(), session.clone(), navigator.clone())?;
        let http = ClientBuilder::new(raw)
            .with(AuthMiddleware::new(
                session.clone(),
                navigator.clone(),
                coordinator.clone(),
            ))
            .build();

        Ok(Client {
            config,
            http,
            session,
            navigator,
            coordinator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Error> {
        let url = self.config.endpoint(path)?;
        let mut req = self.http.request(method.clone(), url);
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%method, path, err = %e, "request did not complete");
            Error::from(e)
        })?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let err = api::Error::from_response(status, &bytes);
            tracing::warn!(%method, path, %err, "request failed");
            return Err(err.into());
        }
        Ok(bytes.to_vec())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        let bytes = self.send(method, path, body).await?;
        // failed envelopes usually carry a null `data`
        match serde_json::from_slice::<Envelope<Option<T>>>(&bytes)?.into_result()? {
            Some(data) => Ok(data),
            None => Err(api::Error::Unknown(format!("no data in answer to {path}")).into()),
        }
    }

    /// For endpoints whose answer carries no data, possibly not even an envelope
    async fn call_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), Error> {
        let bytes = self.send(method, path, body).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        serde_json::from_slice::<Envelope<Option<serde_json::Value>>>(&bytes)?.into_result()?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, Error> {
        let body = json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let tokens: AuthTokens = self.call(Method::POST, paths::LOGIN, Some(body)).await?;
        self.session.establish(tokens.clone());
        Ok(tokens)
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthTokens, Error> {
        let tokens: AuthTokens = self
            .call(Method::POST, paths::REGISTER, Some(json(req)?))
            .await?;
        self.session.establish(tokens.clone());
        Ok(tokens)
    }

    /// Tells the server, then forgets the session even if the server refused
    pub async fn logout(&self) -> Result<(), Error> {
        let res = self.call_unit(Method::POST, paths::LOGOUT, None).await;
        if let Err(err) = &res {
            tracing::warn!(%err, "server-side logout failed");
        }
        self.session.clear();
        res
    }

    pub async fn me(&self) -> Result<UserProfile, Error> {
        let user: UserProfile = self.call(Method::GET, paths::ME, None).await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, Error> {
        self.call(Method::GET, &paths::collection::<R>(), None).await
    }

    pub async fn fetch<R: Resource>(&self, id: R::Id) -> Result<R, Error> {
        self.call(Method::GET, &paths::item::<R>(id), None).await
    }

    pub async fn create<R: Resource>(&self, new: &R::New) -> Result<R, Error> {
        self.call(Method::POST, &paths::collection::<R>(), Some(json(new)?))
            .await
    }

    pub async fn update<R: Resource>(&self, id: R::Id, update: &R::Update) -> Result<R, Error> {
        self.call(Method::PUT, &paths::item::<R>(id), Some(json(update)?))
            .await
    }

    pub async fn delete<R: Resource>(&self, id: R::Id) -> Result<(), Error> {
        self.call_unit(Method::DELETE, &paths::item::<R>(id), None)
            .await
    }

    /// Flat list, in the order the server returned it
    pub async fn comments_for_article(&self, article: ArticleId) -> Result<Vec<Comment>, Error> {
        self.call(Method::GET, &paths::comments_of(article), None)
            .await
    }

    pub async fn like_article(&self, article: ArticleId) -> Result<(), Error> {
        self.call_unit(Method::POST, &paths::article_like(article), None)
            .await
    }

    pub async fn unlike_article(&self, article: ArticleId) -> Result<(), Error> {
        self.call_unit(Method::DELETE, &paths::article_like(article), None)
            .await
    }
}

fn json<B: Serialize>(body: &B) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(body)?)
}
