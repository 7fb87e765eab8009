//! Dataset discovery over HTTP

use serde::Deserialize;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One dataset offered by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetChoice {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service answered {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Fetch the list of datasets from `url`
pub async fn list_datasets(url: &str) -> Result<Vec<DatasetChoice>, DiscoveryError> {
    debug!(url, "Fetching dataset list");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DiscoveryError::Status(response.status()));
    }
    let choices: Vec<DatasetChoice> = response.json().await?;
    info!(url, count = choices.len(), "Dataset list received");
    Ok(choices)
}

/// Run [`list_datasets`] on a background thread; the result arrives on the
/// returned channel
pub fn list_datasets_in_background(url: &str) -> Receiver<Result<Vec<DatasetChoice>, DiscoveryError>> {
    let (tx, rx) = mpsc::channel();
    let url = url.to_string();
    std::thread::spawn(move || {
        let result = tokio::runtime::Runtime::new()
            .map_err(DiscoveryError::from)
            .and_then(|rt| rt.block_on(list_datasets(&url)));
        if let Err(e) = &result {
            error!(url = %url, error = %e, "Dataset discovery failed");
        }
        let _ = tx.send(result);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_deserialize() {
        let json = r#"[
            {"key": "taxi", "title": "Taxi trips", "description": "NYC pickups"},
            {"key": "quakes", "title": "Earthquakes"}
        ]"#;
        let choices: Vec<DatasetChoice> = serde_json::from_str(json).unwrap();
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].key, "taxi");
        assert_eq!(choices[1].description, "");
    }
}
