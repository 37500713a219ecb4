//! Client configuration.

use std::time::Duration;

/// Default address of the generation service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path prefix of every presentation endpoint.
pub const API_PREFIX: &str = "/api/v1/presentation";

/// Settings for [`crate::PresentationClient`].
///
/// Only connecting is bounded in time. A generation stream may stay open
/// for as long as the producer needs; callers that want a deadline cancel
/// the run themselves.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `http://localhost:8000`.
    pub base_url: String,

    /// Limit for establishing a connection.
    pub connect_timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("deck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with default settings otherwise.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Absolute URL of an endpoint below [`API_PREFIX`].
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }

    /// Absolute URL of a route mounted at the service root.
    ///
    /// The service shadows `{API_PREFIX}/presentations` with its by-id
    /// route, so listing goes through the unprefixed alias.
    pub fn root_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
