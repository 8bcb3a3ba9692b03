use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Bad coordinate pair: {0}")]
    Coordinates(String),
    #[error("Bad timeframe: {0}")]
    Timeframe(String),
    #[error("Bad date: {0}")]
    Date(String),
}

#[derive(Error, Debug)]
pub enum Up42Error {
    #[error("Unable to obtain access token: {0}")]
    Auth(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {path} returned {status}: {body}")]
    Api {
        method: reqwest::Method,
        path: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Unable to decode response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid endpoint {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("Block '{0}' not found in catalog")]
    MissingBlock(String),
    #[error("Unexpected job output: {0}")]
    Output(String),
}

impl Up42Error {
    /// Errors that must stop the whole run rather than a single job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
