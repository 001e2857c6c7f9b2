use std::{fmt, sync::Arc};

use tokio::sync::watch;

use crate::{
    api::{AuthTokens, UserProfile},
    storage::{TokenStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
};

#[derive(Clone, Default, Eq, PartialEq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.is_admin()).unwrap_or(false)
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// Authentication state of the client
///
/// The in-memory state is what every request looks at. The storage is only
/// a write-through mirror, read once by `restore`, so that a session survives
/// restarts.
#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
    storage: Arc<dyn TokenStorage>,
}

impl Session {
    pub fn restore(storage: Arc<dyn TokenStorage>) -> Session {
        let read = |key: &str| match storage.get(key) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(?err, key, "failed reading session storage");
                None
            }
        };
        let mut state = SessionState::default();
        if let Some(access) = read(ACCESS_TOKEN_KEY) {
            state.access_token = Some(access);
            state.refresh_token = read(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty());
            tracing::info!("restored session from storage");
        }
        let (state, _) = watch::channel(state);
        Session {
            state: Arc::new(state),
            storage,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Installs the result of a login or registration
    pub fn establish(&self, tokens: AuthTokens) {
        self.persist(ACCESS_TOKEN_KEY, Some(&tokens.access_token));
        self.persist(REFRESH_TOKEN_KEY, tokens.refresh_token.as_deref());
        self.state.send_modify(|s| {
            s.access_token = Some(tokens.access_token);
            s.refresh_token = tokens.refresh_token;
            if tokens.user.is_some() {
                s.user = tokens.user;
            }
        });
        tracing::info!("session established");
    }

    /// Installs refreshed tokens, keeping the current refresh token unless a
    /// rotated one is given
    pub fn update_tokens(&self, access_token: String, refresh_token: Option<String>) {
        self.persist(ACCESS_TOKEN_KEY, Some(&access_token));
        if let Some(refresh) = &refresh_token {
            self.persist(REFRESH_TOKEN_KEY, Some(refresh));
        }
        self.state.send_modify(|s| {
            s.access_token = Some(access_token);
            if refresh_token.is_some() {
                s.refresh_token = refresh_token;
            }
        });
        tracing::debug!("session tokens updated");
    }

    pub fn set_user(&self, user: UserProfile) {
        self.state.send_modify(|s| s.user = Some(user));
    }

    pub fn clear(&self) {
        self.persist(ACCESS_TOKEN_KEY, None);
        self.persist(REFRESH_TOKEN_KEY, None);
        self.state.send_modify(|s| *s = SessionState::default());
        tracing::info!("session cleared");
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let res = match value {
            Some(v) => self.storage.set(key, v),
            None => self.storage.delete(key),
        };
        if let Err(err) = res {
            tracing::error!(?err, key, "failed writing session storage");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&*self.state.borrow()).finish()
    }
}
