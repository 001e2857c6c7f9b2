use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    api::{RegisterRequest, UserProfile},
    Client, Error,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Login, registration and profile of the current user
///
/// Tokens and profile live in the client's `Session`; this only adds the
/// loading and error tracking around the calls that change them.
#[derive(Clone)]
pub struct AuthStore {
    client: Client,
    status: Arc<watch::Sender<AuthStatus>>,
}

impl AuthStore {
    pub fn new(client: Client) -> AuthStore {
        let (status, _) = watch::channel(AuthStatus::default());
        AuthStore {
            client,
            status: Arc::new(status),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.client.session().is_admin()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.client.session().user()
    }

    pub fn username(&self) -> Option<String> {
        self.user().and_then(|u| u.username)
    }

    /// Authenticates, then fetches the profile if the server did not send it along
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, Error> {
        self.begin();
        let res = async {
            let tokens = self.client.login(email, password).await?;
            match tokens.user {
                Some(user) => Ok(user),
                None => self.client.me().await,
            }
        }
        .await;
        self.finish(res)
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<UserProfile, Error> {
        self.begin();
        let res = async {
            let tokens = self.client.register(req).await?;
            match tokens.user {
                Some(user) => Ok(user),
                None => self.client.me().await,
            }
        }
        .await;
        self.finish(res)
    }

    /// The session is gone afterwards, whatever the server answered
    pub async fn logout(&self) -> Result<(), Error> {
        self.begin();
        let res = self.client.logout().await;
        self.finish(res)
    }

    /// Refreshes the profile of the current session, dropping the session if
    /// the server does not recognize it anymore
    pub async fn load_profile(&self) -> Result<UserProfile, Error> {
        self.begin();
        let res = self.client.me().await;
        if res.is_err() {
            self.client.session().clear();
        }
        self.finish(res)
    }

    /// Picks up a session restored from storage
    pub async fn initialize(&self) -> Result<Option<UserProfile>, Error> {
        if !self.is_authenticated() {
            tracing::debug!("no stored session to resume");
            return Ok(None);
        }
        self.load_profile().await.map(Some)
    }

    fn begin(&self) {
        self.status.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish<T>(&self, res: Result<T, Error>) -> Result<T, Error> {
        let error = res.as_ref().err().map(|e| {
            tracing::warn!(err = %e, "authentication operation failed");
            e.user_message()
        });
        self.status.send_modify(|s| {
            s.is_loading = false;
            s.error = error;
        });
        res
    }
}
