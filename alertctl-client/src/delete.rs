use crate::error::error_for_status;
use crate::{Authenticated, NamedResource};

/// The result from a successful [`delete()`](Authenticated::delete) call.
pub type DeleteResponse = ();

impl Authenticated {
    /// Deletes the given resource from the server.
    pub fn delete<'a>(&'a self, resource: &'a NamedResource) -> DeleteBuilder<'a> {
        DeleteBuilder {
            session: self,
            resource,
        }
    }
}

/// A DELETE request builder.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    session: &'a Authenticated,
    resource: &'a NamedResource,
}

impl DeleteBuilder<'_> {
    /// Sends the `DELETE` request.
    ///
    /// Deleting is not idempotent: if the resource disappeared since it was fetched, the server
    /// answers `404` and this returns an error for which [`Error::is_not_found`] holds.
    ///
    /// [`Error::is_not_found`]: crate::Error::is_not_found
    pub async fn send(self) -> crate::Result<DeleteResponse> {
        let request = self
            .session
            .request(reqwest::Method::DELETE, self.resource.remove_url().clone())?;
        let response = self.session.inner.execute(request).await?;
        error_for_status(response).await?;

        tracing::debug!(name = self.resource.name(), "deleted resource");
        Ok(())
    }
}
