//! Exposes an in-process fake management server for use in integration tests.
//!
//! ```
//! use alertctl_test::server::{Config, TestServer};
//!
//! #[tokio::main]
//! async fn main() {
//!    let config = Config::default().with_collection("saved/searches", ["Alpha", "Beta"]);
//!    let server = TestServer::with_config(config).await;
//!    let url = server.url("/services/auth/login");
//!    // use the URL in tests...
//! }
//! ```
//!
//! The server speaks just enough of the management REST API to log in, list a collection, and
//! delete an entity, in both the global (`/services/`) and the namespaced (`/servicesNS/`) tree.
//! It counts every call so tests can assert which steps ran.

use std::collections::{BTreeMap, HashSet};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json, Router, routing};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// The username accepted by default.
pub const USERNAME: &str = "admin";
/// The password accepted by default.
pub const PASSWORD: &str = "changed!";

/// Configuration of a [`TestServer`].
#[derive(Clone, Debug)]
pub struct Config {
    /// The only username that can log in.
    pub username: String,
    /// The password for [`username`](Self::username).
    pub password: String,
    /// Initial members of each collection, keyed by collection path such as `saved/searches`.
    pub collections: BTreeMap<String, Vec<String>>,
    /// Answer every listing with `500 Internal Server Error`.
    pub fail_list: bool,
    /// Answer every delete with `500 Internal Server Error`.
    pub fail_delete: bool,
    /// Leave the `remove` link out of listed entries.
    pub omit_remove_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: USERNAME.to_owned(),
            password: PASSWORD.to_owned(),
            collections: BTreeMap::new(),
            fail_list: false,
            fail_delete: false,
            omit_remove_links: false,
        }
    }
}

impl Config {
    /// Adds a collection with the given member names.
    pub fn with_collection<I, S>(mut self, path: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.insert(
            path.trim_matches('/').to_owned(),
            names.into_iter().map(Into::into).collect(),
        );
        self
    }
}

/// Number of calls the server received, per operation.
///
/// Calls are counted when they arrive, before credentials or session keys are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Login attempts.
    pub logins: usize,
    /// Collection listings.
    pub lists: usize,
    /// Delete requests.
    pub deletes: usize,
}

/// A request as it arrived at the server, with the path still percent-encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// The HTTP method.
    pub method: Method,
    /// The raw request path.
    pub path: String,
}

#[derive(Debug)]
struct Backend {
    config: Config,
    collections: BTreeMap<String, Vec<String>>,
    sessions: HashSet<String>,
    counts: CallCounts,
    requests: Vec<RecordedRequest>,
}

impl Backend {
    fn record(&mut self, method: Method, uri: &Uri) {
        self.requests.push(RecordedRequest {
            method,
            path: uri.path().to_owned(),
        });
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let key = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Splunk "));

        match key {
            Some(key) if self.sessions.contains(key) => Ok(()),
            _ => Err(messages(
                StatusCode::UNAUTHORIZED,
                "WARN",
                "call not properly authenticated",
            )),
        }
    }

    fn entry(&self, prefix: &[&str], collection: &str, name: &str) -> Value {
        let mut url = Url::parse("http://localhost/").unwrap();
        url.path_segments_mut()
            .unwrap()
            .clear()
            .extend(prefix)
            .extend(collection.split('/'))
            .push(name);
        let link = url.path();

        let mut links = json!({ "alternate": link, "list": link, "edit": link });
        if !self.config.omit_remove_links {
            links["remove"] = json!(link);
        }

        json!({
            "name": name,
            "id": format!("https://localhost:8089{link}"),
            "links": links,
            "content": { "disabled": false },
        })
    }
}

type Shared = Arc<Mutex<Backend>>;

fn messages(status: StatusCode, kind: &str, text: &str) -> Response {
    let body = json!({ "messages": [{ "type": kind, "text": text }] });
    (status, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, uri: Uri, Form(form): Form<LoginForm>) -> Response {
    let mut backend = state.lock().unwrap();
    backend.record(Method::POST, &uri);
    backend.counts.logins += 1;

    if form.username != backend.config.username || form.password != backend.config.password {
        return messages(StatusCode::UNAUTHORIZED, "WARN", "Login failed");
    }

    let session_key = uuid::Uuid::new_v4().simple().to_string();
    backend.sessions.insert(session_key.clone());
    Json(json!({ "sessionKey": session_key })).into_response()
}

fn list(state: &Shared, headers: &HeaderMap, uri: &Uri, prefix: &[&str], path: &str) -> Response {
    let mut backend = state.lock().unwrap();
    backend.record(Method::GET, uri);
    backend.counts.lists += 1;

    if let Err(response) = backend.authorize(headers) {
        return response;
    }
    if backend.config.fail_list {
        return messages(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERROR",
            "Internal server error",
        );
    }

    let collection = path.trim_matches('/');
    let Some(names) = backend.collections.get(collection) else {
        return messages(StatusCode::NOT_FOUND, "ERROR", "Not Found");
    };

    let entries = names
        .iter()
        .map(|name| backend.entry(prefix, collection, name))
        .collect::<Vec<_>>();

    Json(json!({ "entry": entries })).into_response()
}

/// Removes the entity addressed by the raw request path.
///
/// The path is split before decoding, so an encoded `/` stays part of the entity name. `prefix`
/// is the number of leading segments naming the namespace.
fn remove(state: &Shared, headers: &HeaderMap, uri: &Uri, prefix: usize) -> Response {
    let mut backend = state.lock().unwrap();
    backend.record(Method::DELETE, uri);
    backend.counts.deletes += 1;

    if let Err(response) = backend.authorize(headers) {
        return response;
    }
    if backend.config.fail_delete {
        return messages(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERROR",
            "Internal server error",
        );
    }

    let segments = uri
        .path()
        .trim_matches('/')
        .split('/')
        .skip(prefix)
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect::<Vec<_>>();

    let not_found = || {
        messages(
            StatusCode::NOT_FOUND,
            "ERROR",
            &format!("Could not find object id={}", uri.path()),
        )
    };

    let Some((name, collection)) = segments.split_last() else {
        return not_found();
    };
    let Some(names) = backend.collections.get_mut(&collection.join("/")) else {
        return not_found();
    };
    let Some(position) = names.iter().position(|n| n == name) else {
        return not_found();
    };

    names.remove(position);
    Json(json!({ "entry": [] })).into_response()
}

async fn global_list(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Path(path): Path<String>,
) -> Response {
    list(&state, &headers, &uri, &["services"], &path)
}

async fn global_remove(State(state): State<Shared>, headers: HeaderMap, uri: Uri) -> Response {
    remove(&state, &headers, &uri, 1)
}

async fn namespaced_list(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Path((owner, app, path)): Path<(String, String, String)>,
) -> Response {
    list(
        &state,
        &headers,
        &uri,
        &["servicesNS", owner.as_str(), app.as_str()],
        &path,
    )
}

async fn namespaced_remove(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    remove(&state, &headers, &uri, 3)
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/services/auth/login", routing::post(login))
        .route(
            "/services/{*path}",
            routing::get(global_list).delete(global_remove),
        )
        .route(
            "/servicesNS/{owner}/{app}/{*path}",
            routing::get(namespaced_list).delete(namespaced_remove),
        )
        .with_state(state)
}

/// An in-process fake management server for use in integration tests.
///
/// All state lives in memory and is dropped together with the server. It listens on a random
/// available port on localhost.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    state: Shared,
}

impl TestServer {
    /// Starts a server with the default credentials and no collections.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Starts a server with the given configuration.
    pub async fn with_config(config: Config) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(Backend {
            collections: config.collections.clone(),
            config,
            sessions: HashSet::new(),
            counts: CallCounts::default(),
            requests: Vec::new(),
        }));
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            state,
        }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }

    /// Returns the IP address the server listens on.
    pub fn host(&self) -> String {
        self.socket.ip().to_string()
    }

    /// Returns the port the server listens on.
    pub fn port(&self) -> u16 {
        self.socket.port()
    }

    /// Returns how often each operation was called so far.
    pub fn counts(&self) -> CallCounts {
        self.state.lock().unwrap().counts
    }

    /// Returns the current member names of a collection.
    pub fn names(&self, collection: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection.trim_matches('/'))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns all requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
