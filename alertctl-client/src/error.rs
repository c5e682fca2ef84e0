use reqwest::StatusCode;
use serde::Deserialize;

/// Errors that can happen within the alertctl-client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// The connection config or a resource link did not form a valid URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// Error when URL manipulation fails.
    #[error("{message}")]
    InvalidUrl {
        /// The URL error message.
        message: String,
    },
    /// The server rejected the credentials.
    #[error("login rejected: {message}")]
    LoginRejected {
        /// Messages returned by the server.
        message: String,
    },
    /// The server accepted the login but did not hand out a session key.
    #[error("login response did not contain a session key")]
    MissingSessionKey,
    /// The server answered with a non-success status.
    #[error("server responded with {status}: {message}")]
    Api {
        /// The HTTP status of the response.
        status: StatusCode,
        /// Messages returned by the server, or the canonical reason.
        message: String,
    },
    /// Invalid header value.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

impl Error {
    /// Returns the HTTP status the server responded with, if this error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::LoginRejected { .. } => Some(StatusCode::UNAUTHORIZED),
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    /// Returns `true` if the server reported that the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    messages: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Passes successful responses through and turns all others into [`Error::Api`].
///
/// The management API reports failures as `{"messages": [{"type": "ERROR", "text": "..."}]}`.
/// Those texts become the error message; the canonical reason is used if the body has none.
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();

    let message = body
        .messages
        .iter()
        .filter(|m| !m.text.is_empty())
        .map(|m| {
            if m.kind.is_empty() {
                m.text.clone()
            } else {
                format!("{}: {}", m.kind, m.text)
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_owned()
    } else {
        message
    };

    Err(Error::Api { status, message })
}
