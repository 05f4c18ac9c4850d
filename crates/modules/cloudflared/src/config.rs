use mora_wingman::WingmanError;
use serde::Deserialize;

/// Registration-time settings of the `cloudflared_token` function.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CloudflaredConfig {
    pub account_id: String,
    /// Tunnel used when the expression passes no name.
    pub tunnel_name: String,
    /// Name of the deployed secret holding the tunnel token.
    pub secret_name: String,
}

impl Default for CloudflaredConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            tunnel_name: "mora".to_owned(),
            secret_name: "cloudflared-token".to_owned(),
        }
    }
}

impl CloudflaredConfig {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self { account_id: account_id.into(), ..Self::default() }
    }

    #[must_use]
    pub fn tunnel_name(mut self, name: impl Into<String>) -> Self {
        self.tunnel_name = name.into();
        self
    }

    #[must_use]
    pub fn secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = name.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WingmanError> {
        for (field, value) in [
            ("account_id", &self.account_id),
            ("tunnel_name", &self.tunnel_name),
            ("secret_name", &self.secret_name),
        ] {
            if value.trim().is_empty() {
                return Err(WingmanError::Registration {
                    message: format!("cloudflared `{field}` cannot be empty").into(),
                    context: None,
                });
            }
        }
        Ok(())
    }
}
