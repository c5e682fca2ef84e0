use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::client::OUTPUT_MODE;
use crate::error::error_for_status;
use crate::{Authenticated, Error, Namespace, Session};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionKey", default)]
    session_key: Option<String>,
}

impl Session {
    /// Performs the login handshake and returns an [`Authenticated`] handle.
    ///
    /// The session is consumed. On failure it is gone for good and the error is returned; there
    /// is no way to retry the login on the same session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the endpoint cannot be reached
    /// - the server rejects the credentials ([`Error::LoginRejected`])
    /// - the server accepts the request but returns no session key ([`Error::MissingSessionKey`])
    pub async fn login(self) -> crate::Result<Authenticated> {
        let inner = self.inner;
        let config = inner.config();

        let url = inner.endpoint(&Namespace::global(), ["auth/login"])?;
        let request = inner.post(url).form(&[
            ("username", config.username.as_str()),
            ("password", config.password.expose_secret().as_str()),
            OUTPUT_MODE,
        ]);

        let response = inner.execute(request).await?;
        let response = error_for_status(response)
            .await
            .map_err(|err| match err {
                Error::Api {
                    status: StatusCode::UNAUTHORIZED,
                    message,
                } => Error::LoginRejected { message },
                err => err,
            })?;

        let LoginResponse { session_key } = response.json().await?;
        let session_key = session_key
            .filter(|key| !key.is_empty())
            .ok_or(Error::MissingSessionKey)?;

        tracing::debug!(
            username = %config.username,
            version = %config.version,
            "logged in"
        );

        Ok(Authenticated::new(inner, session_key))
    }
}
