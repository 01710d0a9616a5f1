//! Where the statistics service lives.

use serde::Deserialize;

/// Endpoint the widget has always posted to.
pub const DEFAULT_DATA_URL: &str = "http://data.greeniot.it.uu.se/4dialog/";

/// Connection settings for the statistics service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// URL that data requests are POSTed to.
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// URL answering `GET` with the service description. Falls back to
    /// `data_url`.
    #[serde(default)]
    pub info_url: Option<String>,
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_data_url() -> String {
    DEFAULT_DATA_URL.to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            info_url: None,
            user_agent: default_user_agent(),
        }
    }
}

impl ServiceConfig {
    /// Settings pointing at `data_url` with everything else defaulted.
    #[must_use]
    pub fn with_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn info_url(&self) -> &str {
        self.info_url.as_deref().unwrap_or(&self.data_url)
    }
}
