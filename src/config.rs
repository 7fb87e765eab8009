//! Service endpoints, read from the environment

use tracing::info;

/// Socket base URL; a dataset session opens `<base><key>`
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:5000/dataset/";
/// Dataset discovery endpoint
pub const DEFAULT_HTTP_URL: &str = "http://127.0.0.1:5000/datasets";

pub const WS_ENV: &str = "PERIODICITY_WS";
pub const HTTP_ENV: &str = "PERIODICITY_HTTP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ws_base: String,
    pub discovery: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ws_base: DEFAULT_WS_URL.to_string(),
            discovery: DEFAULT_HTTP_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults overridden by `PERIODICITY_WS` / `PERIODICITY_HTTP`
    pub fn from_env() -> Self {
        let endpoints = Self::from_lookup(|name| std::env::var(name).ok());
        info!(
            ws = %endpoints.ws_base,
            http = %endpoints.discovery,
            ws_env_set = std::env::var(WS_ENV).is_ok(),
            "Service endpoints resolved"
        );
        endpoints
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            ws_base: lookup(WS_ENV).unwrap_or(defaults.ws_base),
            discovery: lookup(HTTP_ENV).unwrap_or(defaults.discovery),
        }
    }

    /// Socket URL of a named dataset
    pub fn dataset_url(&self, key: &str) -> String {
        format!("{}{}", self.ws_base, key)
    }

    /// Socket URL used for uploads
    pub fn upload_url(&self) -> String {
        self.ws_base.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let e = Endpoints::from_lookup(|_| None);
        assert_eq!(e, Endpoints::default());
        assert_eq!(e.dataset_url("taxi"), "ws://127.0.0.1:5000/dataset/taxi");

        let e = Endpoints::from_lookup(|name| (name == WS_ENV).then(|| "ws://host/ds/".to_string()));
        assert_eq!(e.dataset_url("x"), "ws://host/ds/x");
        assert_eq!(e.upload_url(), "ws://host/ds/");
        assert_eq!(e.discovery, DEFAULT_HTTP_URL);
    }
}
