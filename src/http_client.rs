//! Single-shot, size-bounded downloads for remote datasets.

use std::io::{self, Read};
use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Server answered HTTP {0}")]
    Status(u16),
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("Response too large: {length} bytes (limit {limit})")]
    TooLarge { length: u64, limit: usize },
    #[error("Failed to read response body: {0}")]
    Body(#[from] io::Error),
    #[error("Response body is not UTF-8")]
    Encoding,
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build()
    })
}

/// GET `url` once and return its body as UTF-8 text of at most `max_bytes`.
pub fn fetch_text(url: &Url, max_bytes: usize) -> Result<String, FetchError> {
    debug!(%url, "Fetching remote dataset");
    let response = agent().get(url.as_str()).call()?;
    if let Some(length) = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&length| length > max_bytes as u64)
    {
        return Err(FetchError::TooLarge {
            length,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(FetchError::TooLarge {
            length: bytes.len() as u64,
            limit: max_bytes,
        });
    }
    String::from_utf8(bytes).map_err(|_| FetchError::Encoding)
}
