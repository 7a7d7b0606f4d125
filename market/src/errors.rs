use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("lookup timed out after {0} ms")]
    Timeout(u64),

    #[error("http error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {0} from pricing source")]
    Status(u16),

    #[error("invalid response from pricing source: {0}")]
    InvalidResponse(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
