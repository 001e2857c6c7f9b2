use tokio::sync::broadcast;

/// Query flag set when sending the user home after a 403
pub const ACCESS_DENIED: &str = "access-denied";

/// Navigation requested by the HTTP layer; the front-end decides how to honor it
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Redirect {
    /// The session is gone and the user has to authenticate again
    Login { expired: bool },

    /// The user is authenticated but lacks the permissions for what they tried
    Home { error: &'static str },
}

impl Redirect {
    pub fn access_denied() -> Redirect {
        Redirect::Home {
            error: ACCESS_DENIED,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Navigator {
    sender: broadcast::Sender<Redirect>,
}

impl Navigator {
    pub fn new() -> Navigator {
        let (sender, _) = broadcast::channel(16);
        Navigator { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Redirect> {
        self.sender.subscribe()
    }

    pub fn redirect(&self, to: Redirect) {
        tracing::info!(?to, "requesting redirect");
        // nobody listening is fine, eg. in a one-shot cli invocation
        let _ = self.sender.send(to);
    }
}

impl Default for Navigator {
    fn default() -> Navigator {
        Navigator::new()
    }
}
