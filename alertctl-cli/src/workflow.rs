//! The delete-by-name workflow.
//!
//! A run logs in, fetches the configured collection, looks up the resource by its exact name and
//! deletes it if present. Every step awaits the previous one, and the first failure ends the run.
//! The run finishes with exactly one [`Result`], either returned from [`run`] or delivered on the
//! channel returned by [`spawn`].

use std::fmt;

use alertctl_client::{CollectionKind, Error, Namespace, ResourceCollection, Session};
use tokio::sync::oneshot;

use crate::config::Config;

/// Successful end of a workflow run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The resource existed and the server confirmed its removal.
    Deleted {
        /// Name of the deleted resource.
        name: String,
    },
    /// No resource with the name exists in the collection. Nothing was deleted.
    NotFound {
        /// The name that was looked up.
        name: String,
    },
}

impl Outcome {
    /// The name the workflow operated on.
    pub fn name(&self) -> &str {
        match self {
            Outcome::Deleted { name } | Outcome::NotFound { name } => name,
        }
    }
}

/// Formats the human-readable status line.
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Deleted { name } => write!(f, "Deleted alert: {name}"),
            Outcome::NotFound { name } => {
                write!(f, "Can't delete '{name}' because it doesn't exist!")
            }
        }
    }
}

/// Failed end of a workflow run, tagged with the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The session could not be constructed from the configuration.
    #[error("invalid connection settings")]
    Setup(#[source] Error),
    /// The login handshake failed. Nothing else was attempted.
    #[error("login failed")]
    Login(#[source] Error),
    /// The collection could not be fetched. No lookup was attempted.
    #[error("failed to fetch collection")]
    Fetch(#[source] Error),
    /// The server did not confirm the delete.
    #[error("failed to delete '{name}'")]
    Delete {
        /// Name of the resource that could not be deleted.
        name: String,
        /// The underlying client error.
        #[source]
        source: Error,
    },
}

impl WorkflowError {
    /// Returns the client error that caused the failure.
    pub fn client_error(&self) -> &Error {
        match self {
            WorkflowError::Setup(error)
            | WorkflowError::Login(error)
            | WorkflowError::Fetch(error)
            | WorkflowError::Delete { source: error, .. } => error,
        }
    }
}

/// What to delete, and where to look for it.
#[derive(Clone, Debug, Default)]
pub struct DeleteRequest {
    /// The collection holding the resource.
    pub kind: CollectionKind,
    /// The namespace of the collection.
    pub namespace: Namespace,
    /// Exact, case-sensitive name of the resource.
    pub name: String,
}

impl DeleteRequest {
    /// Creates a request for a resource in the global saved searches collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates the request described by the configured target.
    pub fn from_config(config: &Config) -> Self {
        Self {
            kind: config.target.collection.clone(),
            namespace: config.target.namespace(),
            name: config.target.name.clone(),
        }
    }
}

/// Builds an unauthenticated session with the configured transport settings.
pub fn session(config: &Config) -> Result<Session, WorkflowError> {
    Session::builder(config.connection.clone())
        .timeout(config.http.timeout)
        .accept_invalid_certs(config.http.accept_invalid_certs)
        .propagate_traces(config.sentry.propagate_traces)
        .build()
        .map_err(WorkflowError::Setup)
}

/// Runs the workflow once and returns its outcome.
///
/// The session is consumed by the login. A missing resource is a successful
/// [`Outcome::NotFound`].
pub async fn run(session: Session, request: &DeleteRequest) -> Result<Outcome, WorkflowError> {
    let result = execute(session, request).await;

    match &result {
        Ok(outcome) => tracing::info!(name = outcome.name(), "{outcome}"),
        Err(error) => tracing::error!(
            error = error as &dyn std::error::Error,
            name = %request.name,
            "workflow failed"
        ),
    }

    result
}

async fn execute(session: Session, request: &DeleteRequest) -> Result<Outcome, WorkflowError> {
    let session = session.login().await.map_err(WorkflowError::Login)?;

    let collection = session
        .collection(request.kind.clone())
        .namespace(request.namespace.clone())
        .fetch()
        .await
        .map_err(WorkflowError::Fetch)?;

    let Some(resource) = collection.lookup(&request.name) else {
        return Ok(Outcome::NotFound {
            name: request.name.clone(),
        });
    };

    session
        .delete(resource)
        .send()
        .await
        .map_err(|source| WorkflowError::Delete {
            name: request.name.clone(),
            source,
        })?;

    Ok(Outcome::Deleted {
        name: request.name.clone(),
    })
}

/// Runs the workflow on the current runtime and reports the result on a oneshot channel.
///
/// The channel receives exactly one message. If the receiver is dropped before the run
/// finishes, the result is discarded.
pub fn spawn(
    session: Session,
    request: DeleteRequest,
) -> oneshot::Receiver<Result<Outcome, WorkflowError>> {
    let (sender, receiver) = oneshot::channel();

    tokio::spawn(async move {
        let result = run(session, &request).await;
        if sender.send(result).is_err() {
            tracing::debug!("completion receiver dropped");
        }
    });

    receiver
}

/// Logs in and fetches the collection of the request, without deleting anything.
pub async fn list(
    session: Session,
    kind: CollectionKind,
    namespace: Namespace,
) -> Result<ResourceCollection, WorkflowError> {
    let session = session.login().await.map_err(WorkflowError::Login)?;

    session
        .collection(kind)
        .namespace(namespace)
        .fetch()
        .await
        .map_err(WorkflowError::Fetch)
}
