//! Shared GET-with-backoff helper for the HTTP data sources.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// GET `url` with `query`, decode JSON and pass it through `check`.
///
/// Network failures, 429s, 5xx responses and a [`DataSourceError::RateLimited`]
/// from `check` are retried with exponential backoff for up to 30 seconds;
/// everything else fails immediately.
pub(crate) async fn get_json<Q, F>(
    client: &Client,
    url: &str,
    query: &Q,
    check: F,
) -> Result<serde_json::Value, DataSourceError>
where
    Q: Serialize + ?Sized,
    F: Fn(serde_json::Value) -> Result<serde_json::Value, DataSourceError>,
{
    let check = &check;
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    retry(backoff, || async {
        let response = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(DataSourceError::NetworkError(e.to_string())))?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))?;

        check(body).map_err(|e| match e {
            DataSourceError::RateLimited => backoff::Error::transient(e),
            other => backoff::Error::permanent(other),
        })
    })
    .await
}
