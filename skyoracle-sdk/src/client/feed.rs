//! Flight feed client (watcher → flight status API).

use reqwest::{Client, StatusCode};
use url::Url;

use super::ClientError;
use crate::objects::{FlightKey, FlightRecord};

/// Typed HTTP client for the flight status feed.
///
/// Only the read side of the feed is exposed; creating and editing records
/// is the feed operator's business.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    base_url: Url,
}

impl FeedClient {
    /// Create a new `FeedClient`.
    ///
    /// * `base_url` – root URL of the feed (e.g. `http://127.0.0.1:8000` or
    ///   `https://flights.example.org/api`). Endpoints are resolved below its
    ///   path.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /flights/{flightNumber}/{arrivalTimestamp}` – current record of a
    /// flight.
    ///
    /// Returns `Ok(None)` when the feed answers 404.
    pub async fn get_flight(&self, key: &FlightKey) -> Result<Option<FlightRecord>, ClientError> {
        let resp = self.http.get(self.flight_url(key)?).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_response(resp).await.map(Some)
    }

    fn flight_url(&self, key: &FlightKey) -> Result<Url, ClientError> {
        let path = format!(
            "flights/{}/{}",
            urlencoding::encode(&key.flight_number),
            key.arrival_timestamp
        );
        Ok(self.base_url.join(&path)?)
    }

    /// `GET /health` – liveness probe of the feed.
    pub async fn health(&self) -> Result<(), ClientError> {
        let url = self.base_url.join("health")?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> FeedClient {
        FeedClient::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_flight_url_at_root() {
        let url = client("http://127.0.0.1:8000")
            .flight_url(&FlightKey::new("AF123", 1_769_018_400))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/flights/AF123/1769018400");
    }

    #[test]
    fn test_flight_url_keeps_base_path() {
        let key = FlightKey::new("AF123", 1);
        for base in ["https://flights.example.org/api", "https://flights.example.org/api/"] {
            let client = client(base);
            assert_eq!(client.base_url().path(), "/api/");
            assert_eq!(
                client.flight_url(&key).unwrap().as_str(),
                "https://flights.example.org/api/flights/AF123/1"
            );
        }
    }

    #[test]
    fn test_flight_number_is_a_single_segment() {
        let url = client("http://feed/v1/")
            .flight_url(&FlightKey::new("AF 12/3", 7))
            .unwrap();
        assert_eq!(url.path(), "/v1/flights/AF%2012%2F3/7");
    }
}
