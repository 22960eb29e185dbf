//! Shared gateway state.

use std::sync::Arc;

use gatekeep_auth::credential::CredentialVerifier;
use gatekeep_auth::identity::IdentityProvider;
use gatekeep_auth::session::SessionAuthority;

/// Dependencies shared by the middleware and every handler.
#[derive(Clone)]
pub struct GatewayState {
    /// The session authority.
    pub authority: Arc<SessionAuthority>,
    /// Credential verification for the login flow.
    pub verifier: Arc<CredentialVerifier>,
    /// Identity lookup for the login flow.
    pub identities: Arc<dyn IdentityProvider>,
}

impl GatewayState {
    /// Bundles the gateway dependencies.
    pub fn new(
        authority: Arc<SessionAuthority>,
        verifier: Arc<CredentialVerifier>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            authority,
            verifier,
            identities,
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState").finish()
    }
}
