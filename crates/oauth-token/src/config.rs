//! Static per-client OAuth configuration

use common::Secret;
use serde::Deserialize;
use std::path::PathBuf;

/// Client registration details the credential manager needs from its
/// surroundings.
pub trait ClientConfig: Send + Sync {
    fn client_id(&self) -> &str;

    /// Confidential clients authenticate at the token endpoint with this
    /// secret. Public clients return `None`.
    fn client_secret(&self) -> Option<&str> {
        None
    }

    fn redirect_uri(&self) -> Option<&str>;

    fn authorize_endpoint(&self) -> &str;

    fn token_endpoint(&self) -> &str;
}

/// A `ClientConfig` read from a configuration file.
///
/// The client secret is never deserialized from the file itself; callers
/// resolve it from the environment or from `client_secret_file`.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticClientConfig {
    pub client_id: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
}

impl StaticClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        authorize_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            redirect_uri: None,
            client_secret: None,
            client_secret_file: None,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(Secret::new(secret.into()));
        self
    }

    /// Check the values a token endpoint or authorize redirect would choke on.
    pub fn validate(&self) -> common::Result<()> {
        if self.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        for (name, url) in [
            ("authorize_endpoint", &self.authorize_endpoint),
            ("token_endpoint", &self.token_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }
        if self.redirect_uri.as_deref() == Some("") {
            return Err(common::Error::Config(
                "redirect_uri must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}

impl ClientConfig for StaticClientConfig {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|s| s.expose().as_str())
    }

    fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    fn authorize_endpoint(&self) -> &str {
        &self.authorize_endpoint
    }

    fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}
