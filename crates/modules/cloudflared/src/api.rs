use crate::error::ApiError;
use mora_domain::SecretString;
use mora_wingman::async_trait;
use std::fmt::{self, Debug};

/// Account credentials, drawn from the module's resolved `api_key` and `email` points.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub api_key: SecretString,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunnel {
    pub id: String,
    pub name: String,
}

/// The slice of the Cloudflare tunnel API this module needs.
///
/// Timeouts and retries belong to the implementation; whatever it returns is final.
#[async_trait]
pub trait TunnelApi: Debug + Send + Sync {
    /// # Errors
    /// Any API or transport failure.
    async fn list_tunnels(
        &self,
        account_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Tunnel>, ApiError>;

    /// Creates a tunnel authenticated by `tunnel_secret`.
    ///
    /// # Errors
    /// Any API or transport failure.
    async fn create_tunnel(
        &self,
        account_id: &str,
        credentials: &Credentials,
        name: &str,
        tunnel_secret: &SecretString,
    ) -> Result<Tunnel, ApiError>;

    /// # Errors
    /// Any API or transport failure.
    async fn tunnel_token(
        &self,
        account_id: &str,
        credentials: &Credentials,
        tunnel_id: &str,
    ) -> Result<SecretString, ApiError>;
}
