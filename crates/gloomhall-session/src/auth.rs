//! The authentication seam.

use std::future::Future;

use crate::SessionError;

/// Validates handshake credentials before a session is created.
///
/// Implementations can call out to an external identity service; the
/// built-in [`OpenDoorAuth`] accepts everyone. The returned future must
/// be `Send` because connection handlers run on spawned tasks.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Accepts every connection. Suitable for private tables and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenDoorAuth;

impl Authenticator for OpenDoorAuth {
    async fn authenticate(&self, _token: Option<&str>) -> Result<(), SessionError> {
        Ok(())
    }
}
