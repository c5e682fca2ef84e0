use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::{ApiVersion, ConnectionConfig};

const USER_AGENT: &str = concat!("alertctl-client/", env!("CARGO_PKG_VERSION"));

/// Query parameter asking the management API for JSON instead of Atom XML.
pub(crate) const OUTPUT_MODE: (&str, &str) = ("output_mode", "json");

#[derive(Debug)]
struct SessionBuilderInner {
    config: ConnectionConfig,
    base_url: Url,
    propagate_traces: bool,
    reqwest_builder: reqwest::ClientBuilder,
}

/// Builder to create a [`Session`].
#[must_use]
#[derive(Debug)]
pub struct SessionBuilder(crate::Result<SessionBuilderInner>);

impl SessionBuilder {
    /// Creates a new [`SessionBuilder`] for the endpoint described by `config`.
    ///
    /// No I/O happens here. The config is only checked for whether it forms a valid base URL, and
    /// that error is deferred to [`build`](Self::build).
    pub fn new(config: ConnectionConfig) -> Self {
        let base_url = match config.base_url() {
            Ok(url) => url,
            Err(err) => return Self(Err(err)),
        };

        let reqwest_builder = reqwest::Client::builder()
            // Management calls are few and sequential, but listing a large collection can take a
            // while on a busy server. This can be overridden by the caller.
            .connect_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT);

        Self(Ok(SessionBuilderInner {
            config,
            base_url,
            propagate_traces: false,
            reqwest_builder,
        }))
    }

    /// Changes whether the `sentry-trace` header will be sent along with every request.
    pub fn propagate_traces(mut self, propagate_traces: bool) -> Self {
        if let Ok(ref mut inner) = self.0 {
            inner.propagate_traces = propagate_traces;
        }
        self
    }

    /// Sets both the connect and the read timeout for the [`reqwest::Client`].
    /// For more fine-grained configuration, use [`Self::configure_reqwest`].
    pub fn timeout(self, timeout: Duration) -> Self {
        self.configure_reqwest(|builder| builder.connect_timeout(timeout).read_timeout(timeout))
    }

    /// Accepts TLS certificates that do not chain to a trusted root.
    ///
    /// Management ports ship with a self-signed certificate by default.
    pub fn accept_invalid_certs(self, accept: bool) -> Self {
        self.configure_reqwest(|builder| builder.danger_accept_invalid_certs(accept))
    }

    /// Calls the closure with the underlying [`reqwest::ClientBuilder`].
    pub fn configure_reqwest<F>(self, closure: F) -> Self
    where
        F: FnOnce(reqwest::ClientBuilder) -> reqwest::ClientBuilder,
    {
        let Ok(inner) = self.0 else { return self };
        Self(Ok(SessionBuilderInner {
            reqwest_builder: closure(inner.reqwest_builder),
            ..inner
        }))
    }

    /// Returns an unauthenticated [`Session`] that uses this configuration.
    ///
    /// # Errors
    ///
    /// This method fails if:
    /// - the connection config does not form a valid URL
    /// - the [`reqwest::Client`] fails to build. Refer to [`reqwest::ClientBuilder::build`] for
    ///   more information on when this can happen.
    pub fn build(self) -> crate::Result<Session> {
        let inner = self.0?;
        Ok(Session {
            inner: Arc::new(SessionInner {
                reqwest: inner.reqwest_builder.build()?,
                base_url: inner.base_url,
                config: inner.config,
                propagate_traces: inner.propagate_traces,
            }),
        })
    }
}

/// The namespace a collection is addressed in.
///
/// Without owner and app, requests go to the global `/services/` tree. As soon as either is set,
/// requests go to `/servicesNS/<owner>/<app>/`, where a missing part is the wildcard `-`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    owner: Option<String>,
    app: Option<String>,
}

impl Namespace {
    /// The wildcard segment matching any owner or app.
    pub const WILDCARD: &'static str = "-";

    /// Creates a namespace for the given owner and app.
    pub fn new(owner: Option<&str>, app: Option<&str>) -> Self {
        let clean = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_owned);
        Self {
            owner: clean(owner),
            app: clean(app),
        }
    }

    /// The global namespace, `/services/`.
    pub fn global() -> Self {
        Self::default()
    }

    /// Returns the owner, if set.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the app, if set.
    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    /// Returns `true` if this is the global namespace.
    pub fn is_global(&self) -> bool {
        self.owner.is_none() && self.app.is_none()
    }
}

#[derive(Debug)]
pub(crate) struct SessionInner {
    reqwest: reqwest::Client,
    base_url: Url,
    config: ConnectionConfig,
    propagate_traces: bool,
}

impl SessionInner {
    #[inline]
    pub(crate) fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Builds the URL of `path` within `namespace`.
    ///
    /// `path` is split at `/` and every segment is percent-encoded on its own.
    pub(crate) fn endpoint<'a, I>(&self, namespace: &Namespace, segments: I) -> crate::Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| crate::Error::InvalidUrl {
                    message: format!("{} cannot be a base URL", self.base_url),
                })?;
            path.clear();

            if namespace.is_global() {
                path.push("services");
            } else {
                path.push("servicesNS")
                    .push(namespace.owner().unwrap_or(Namespace::WILDCARD))
                    .push(namespace.app().unwrap_or(Namespace::WILDCARD));
            }

            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }

        Ok(url)
    }

    /// Resolves a server-provided link, such as `/servicesNS/nobody/search/saved/searches/foo`.
    pub(crate) fn resolve(&self, link: &str) -> crate::Result<Url> {
        Ok(self.base_url.join(link)?)
    }

    /// Sends a request and logs the exchange.
    pub(crate) async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> crate::Result<reqwest::Response> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.reqwest.execute(request).await?;
        let status = response.status();
        tracing::debug!(
            "{method} {url} => {} ({})",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown")
        );

        Ok(response)
    }

    pub(crate) fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.with_trace_headers(self.reqwest.post(url))
    }

    fn with_trace_headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.propagate_traces {
            let trace_headers =
                sentry_core::configure_scope(|scope| Some(scope.iter_trace_propagation_headers()));
            for (header_name, value) in trace_headers.into_iter().flatten() {
                builder = builder.header(header_name, value);
            }
        }
        builder
    }
}

/// An unauthenticated session with a management endpoint.
///
/// Create one with [`Session::create`] or [`Session::builder`], then call
/// [`login`](Session::login) to obtain an [`Authenticated`] handle. A failed login consumes the
/// session; there is no retry.
#[derive(Debug)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// Convenience function to create a [`SessionBuilder`].
    pub fn builder(config: ConnectionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Creates a session with default transport settings. Performs no I/O.
    pub fn create(config: ConnectionConfig) -> crate::Result<Self> {
        SessionBuilder::new(config).build()
    }

    /// Returns the connection config this session was created with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Returns the root URL of the management endpoint.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }
}

/// A session that completed the login handshake.
///
/// Only this type can fetch collections and delete resources.
pub struct Authenticated {
    pub(crate) inner: Arc<SessionInner>,
    session_key: SecretString,
}

impl std::fmt::Debug for Authenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticated")
            .field("base_url", &self.inner.base_url.as_str())
            .field("username", &self.inner.config.username)
            .field("session_key", &"[redacted]")
            .finish()
    }
}

impl Authenticated {
    pub(crate) fn new(inner: Arc<SessionInner>, session_key: String) -> Self {
        Self {
            inner,
            session_key: SecretString::from(session_key),
        }
    }

    /// Returns the username this session is logged in as.
    pub fn username(&self) -> &str {
        &self.inner.config.username
    }

    /// Returns the API version this session targets.
    pub fn version(&self) -> &ApiVersion {
        &self.inner.config.version
    }

    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> crate::Result<reqwest::RequestBuilder> {
        let mut authorization =
            HeaderValue::from_str(&format!("Splunk {}", self.session_key.expose_secret()))?;
        authorization.set_sensitive(true);

        let builder = self
            .inner
            .reqwest
            .request(method, url)
            .header(AUTHORIZATION, authorization)
            .query(&[OUTPUT_MODE]);

        Ok(self.inner.with_trace_headers(builder))
    }
}
