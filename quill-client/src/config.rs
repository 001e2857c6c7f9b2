use std::time::Duration;

use url::Url;

use crate::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1/";

/// Upper bound of the `Refreshing` state when the network hangs
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Root of the REST API, always with a trailing slash
    pub api_url: Url,
    pub refresh_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn new(api_url: &str) -> Result<Config, Error> {
        let mut api_url = Url::parse(api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Config {
            api_url,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            request_timeout: None,
        })
    }

    /// Reads `QUILL_API_URL`, `QUILL_REFRESH_TIMEOUT_SECS` and `QUILL_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Result<Config, Error> {
        let url = std::env::var("QUILL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Config::new(&url)?;
        if let Some(secs) = env_secs("QUILL_REFRESH_TIMEOUT_SECS")? {
            config.refresh_timeout = secs;
        }
        config.request_timeout = env_secs("QUILL_REQUEST_TIMEOUT_SECS")?;
        Ok(config)
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Config {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Config {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.api_url.join(path.trim_start_matches('/'))?)
    }
}

fn env_secs(var: &str) -> Result<Option<Duration>, Error> {
    match std::env::var(var) {
        Err(_) => Ok(None),
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|e| Error::Config(format!("{var} is not a number of seconds: {e}"))),
    }
}
