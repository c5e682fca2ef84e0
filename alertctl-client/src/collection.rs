use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::error_for_status;
use crate::{Authenticated, Namespace};

/// The kind of server-side collection to operate on.
///
/// Known kinds map to their REST path; anything else is addressed verbatim through
/// [`CollectionKind::Custom`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum CollectionKind {
    /// Saved searches and alerts, `saved/searches`.
    #[default]
    SavedSearches,
    /// Triggered alert groups, `alerts/fired_alerts`.
    FiredAlerts,
    /// Installed apps, `apps/local`.
    Apps,
    /// Any other collection path relative to the namespace root.
    Custom(String),
}

impl CollectionKind {
    /// Returns the REST path of this collection, relative to the namespace root.
    pub fn path(&self) -> &str {
        match self {
            CollectionKind::SavedSearches => "saved/searches",
            CollectionKind::FiredAlerts => "alerts/fired_alerts",
            CollectionKind::Apps => "apps/local",
            CollectionKind::Custom(path) => path,
        }
    }
}

impl From<&str> for CollectionKind {
    fn from(path: &str) -> Self {
        match path.trim_matches('/') {
            "saved/searches" => CollectionKind::SavedSearches,
            "alerts/fired_alerts" => CollectionKind::FiredAlerts,
            "apps/local" => CollectionKind::Apps,
            path => CollectionKind::Custom(path.to_owned()),
        }
    }
}

impl From<String> for CollectionKind {
    fn from(path: String) -> Self {
        CollectionKind::from(path.as_str())
    }
}

impl From<CollectionKind> for String {
    fn from(kind: CollectionKind) -> Self {
        kind.path().to_owned()
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    links: Links,
    #[serde(default)]
    content: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    remove: Option<String>,
}

/// A server-side entity, identified by its name within the collection it was fetched from.
///
/// Instances only come out of [`ResourceCollection`]s, so a resource handed to
/// [`delete`](Authenticated::delete) always stems from an actual fetch.
#[derive(Debug)]
pub struct NamedResource {
    name: String,
    id: Option<String>,
    content: serde_json::Value,
    remove_url: Url,
}

impl NamedResource {
    /// Returns the display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the server-assigned id, usually the canonical URL of the entity.
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the entity's attributes as reported by the server.
    #[inline]
    pub fn content(&self) -> &serde_json::Value {
        &self.content
    }

    /// The URL a `DELETE` request for this resource goes to.
    #[inline]
    pub(crate) fn remove_url(&self) -> &Url {
        &self.remove_url
    }
}

/// A snapshot of a collection, taken with a single request.
///
/// The snapshot never refreshes. Fetch again to observe changes on the server.
#[derive(Debug)]
pub struct ResourceCollection {
    kind: CollectionKind,
    namespace: Namespace,
    entries: Vec<NamedResource>,
}

impl ResourceCollection {
    /// Looks up a resource by exact, case-sensitive name.
    ///
    /// Returns `None` if no resource with that name was part of the snapshot.
    pub fn lookup(&self, name: &str) -> Option<&NamedResource> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Returns the kind of collection this snapshot was taken from.
    pub fn kind(&self) -> &CollectionKind {
        &self.kind
    }

    /// Returns the namespace this snapshot was taken in.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Iterates over all resources in server order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedResource> {
        self.entries.iter()
    }

    /// Iterates over the names of all resources in server order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(NamedResource::name)
    }

    /// Returns the number of resources in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot contains no resources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Authenticated {
    /// Addresses the collection of the given kind, in the global namespace by default.
    pub fn collection(&self, kind: CollectionKind) -> CollectionBuilder<'_> {
        CollectionBuilder {
            session: self,
            kind,
            namespace: Namespace::global(),
        }
    }

    /// Addresses the saved searches collection, which also holds alerts.
    pub fn saved_searches(&self) -> CollectionBuilder<'_> {
        self.collection(CollectionKind::SavedSearches)
    }
}

/// A [`collection`](Authenticated::collection) request builder.
#[derive(Debug)]
pub struct CollectionBuilder<'a> {
    session: &'a Authenticated,
    kind: CollectionKind,
    namespace: Namespace,
}

impl CollectionBuilder<'_> {
    /// Scopes the request to the given namespace.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Fetches the current members of the collection.
    ///
    /// All members are requested at once; there is no pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server responds with an error status, or the
    /// response body is not a valid listing.
    pub async fn fetch(self) -> crate::Result<ResourceCollection> {
        let inner = &self.session.inner;
        let url = inner.endpoint(&self.namespace, [self.kind.path()])?;

        let request = self
            .session
            .request(reqwest::Method::GET, url.clone())?
            .query(&[("count", "0")]);
        let response = error_for_status(inner.execute(request).await?).await?;
        let feed: Feed = response.json().await?;

        let entries = feed
            .entry
            .into_iter()
            .map(|entry| {
                let remove_url = match entry.links.remove {
                    Some(ref link) => inner.resolve(link)?,
                    None => entry_url(&url, &entry.name)?,
                };

                Ok::<_, crate::Error>(NamedResource {
                    name: entry.name,
                    id: entry.id,
                    content: entry.content,
                    remove_url,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        tracing::debug!(
            collection = %self.kind,
            count = entries.len(),
            "fetched collection"
        );

        Ok(ResourceCollection {
            kind: self.kind,
            namespace: self.namespace,
            entries,
        })
    }
}

/// Appends `name` as a single percent-encoded segment to a collection URL.
pub(crate) fn entry_url(collection: &Url, name: &str) -> crate::Result<Url> {
    let mut url = collection.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|()| crate::Error::InvalidUrl {
            message: format!("{collection} cannot be a base URL"),
        })?
        .pop_if_empty()
        .push(name);
    Ok(url)
}
