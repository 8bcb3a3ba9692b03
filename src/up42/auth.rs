use super::models::AccessToken;
use crate::error::Up42Error;
use reqwest::RequestBuilder;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

pub trait TokenSource {
    async fn fetch_token(&self) -> Result<String, Up42Error>;
}

/// OAuth2 client-credentials exchange against the UP42 token endpoint,
/// using the project id and API key as client id and secret.
pub struct ClientCredentials {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(http: reqwest::Client, token_url: Url, client_id: &str, client_secret: &str) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

impl TokenSource for ClientCredentials {
    async fn fetch_token(&self) -> Result<String, Up42Error> {
        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Up42Error::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Up42Error::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| Up42Error::Auth(e.to_string()))?;
        Ok(token.access_token)
    }
}

struct Token {
    value: String,
    fetched_at: Instant,
}

/// Attaches a bearer token to outgoing requests, fetching a new one first
/// whenever the current token is older than `timeout`.
pub struct BearerAuth<S> {
    source: S,
    timeout: Duration,
    current: Mutex<Option<Token>>,
}

impl<S: TokenSource> BearerAuth<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            current: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, Up42Error> {
        let mut current = self.current.lock().await;
        if let Some(token) = current
            .as_ref()
            .filter(|t| t.fetched_at.elapsed() <= self.timeout)
        {
            return Ok(token.value.clone());
        }

        debug!("Refreshing access token");
        let value = self.source.fetch_token().await?;
        *current = Some(Token {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Up42Error> {
        let token = self.token().await?;
        Ok(request.bearer_auth(token))
    }
}
