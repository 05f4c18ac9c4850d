use crate::api::{Credentials, TunnelApi};
use crate::config::CloudflaredConfig;
use crate::{API_KEY_POINT, EMAIL_POINT, TOKEN_ENTRY, named_token_entry};
use base64::{Engine as _, engine::general_purpose};
use mora_domain::{SecretString, StateConfigEntry, Value};
use mora_wingman::{
    Arity, Deployer, Evaluation, ExpressionFunction, RequestContext, SecretRef,
    WingmanError, async_trait, materialize_secret,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

const TUNNEL_SECRET_LEN: usize = 32;

/// `cloudflared_token([tunnel_name])`: finds or creates the tunnel, fetches its token, deploys
/// it as a secret, and records it in state.
///
/// Without an argument the configured tunnel is used and the token lands in
/// `cloudflared_token`, deployed as the configured secret. A named tunnel gets its own entry,
/// `cloudflared_token.<name>`, and secret, `<secret_name>-<name>`.
#[derive(Debug)]
pub struct CloudflaredToken {
    config: CloudflaredConfig,
    api: Arc<dyn TunnelApi>,
    deployer: Arc<dyn Deployer>,
}

impl CloudflaredToken {
    pub fn new(
        config: CloudflaredConfig,
        api: Arc<dyn TunnelApi>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Self { config, api, deployer }
    }

    /// Tunnel, state entry, and deployed secret for the given arguments.
    fn target<'a>(&'a self, args: &'a [Value]) -> Result<Target<'a>, WingmanError> {
        let Some(name) = args.first().map(Value::expose) else {
            return Ok(Target {
                tunnel_name: &self.config.tunnel_name,
                entry: Cow::Borrowed(TOKEN_ENTRY),
                secret_name: Cow::Borrowed(&self.config.secret_name),
            });
        };
        if name.trim().is_empty() {
            return Err(WingmanError::invalid_state("tunnel name argument cannot be empty"));
        }
        Ok(Target {
            tunnel_name: name,
            entry: Cow::Owned(named_token_entry(name)),
            secret_name: Cow::Owned(format!("{}-{name}", self.config.secret_name)),
        })
    }

    async fn provision(
        &self,
        ctx: &RequestContext,
        credentials: &Credentials,
        target: &Target<'_>,
    ) -> Result<Value, WingmanError> {
        let tunnel_name = target.tunnel_name;
        let account = self.config.account_id.as_str();

        let tunnels = self
            .api
            .list_tunnels(account, credentials)
            .await
            .map_err(|e| WingmanError::external("list_tunnels", e))?;

        let tunnel = match tunnels.into_iter().find(|t| t.name == tunnel_name) {
            Some(tunnel) => {
                debug!(tunnel = %tunnel.id, "Reusing existing tunnel");
                tunnel
            },
            None => {
                let secret = tunnel_secret()?;
                let tunnel = self
                    .api
                    .create_tunnel(account, credentials, tunnel_name, &secret)
                    .await
                    .map_err(|e| WingmanError::external("create_tunnel", e))?;
                info!(tunnel = %tunnel.id, name = tunnel_name, "Tunnel created");
                tunnel
            },
        };

        let token = self
            .api
            .tunnel_token(account, credentials, &tunnel.id)
            .await
            .map_err(|e| WingmanError::external("tunnel_token", e))?;

        let secret = SecretRef::new(target.secret_name.as_ref(), token.expose_secret());
        materialize_secret(ctx, self.deployer.as_ref(), secret, &target.entry).await
    }
}

#[derive(Debug)]
struct Target<'a> {
    tunnel_name: &'a str,
    entry: Cow<'a, str>,
    secret_name: Cow<'a, str>,
}

#[async_trait]
impl ExpressionFunction for CloudflaredToken {
    fn name(&self) -> &str {
        TOKEN_ENTRY
    }

    fn arity(&self) -> Arity {
        Arity::new(0, 1)
    }

    async fn evaluate(
        &self,
        ctx: &RequestContext,
        args: &[Value],
    ) -> Result<Evaluation, WingmanError> {
        let target = self.target(args)?;
        if let Some(entry) = ctx.find_config(&target.entry) {
            debug!(entry = %target.entry, "Tunnel token already resolved");
            return decode(&entry).map(Evaluation::Value);
        }

        let api_key = ctx.find_config(API_KEY_POINT);
        let email = ctx.find_config(EMAIL_POINT);
        let (Some(api_key), Some(email)) = (&api_key, &email) else {
            let mut missing = Vec::new();
            if api_key.is_none() {
                missing.push(crate::api_key_point());
            }
            if email.is_none() {
                missing.push(crate::email_point());
            }
            return Ok(Evaluation::deferred(missing));
        };

        let credentials = Credentials {
            email: decode(email)?.expose().to_owned(),
            api_key: SecretString::new(decode(api_key)?.expose()),
        };

        self.provision(ctx, &credentials, &target).await.map(Evaluation::Value)
    }
}

fn decode(entry: &StateConfigEntry) -> Result<Value, WingmanError> {
    entry.to_value().map_err(|e| WingmanError::InvalidState {
        message: format!("entry `{}` is not valid UTF-8: {e}", entry.name).into(),
        context: Some(format!("module {}", entry.module_name).into()),
    })
}

/// Base64 of 32 random bytes, the shared secret a new tunnel is created with.
fn tunnel_secret() -> Result<SecretString, WingmanError> {
    let mut bytes = Zeroizing::new([0u8; TUNNEL_SECRET_LEN]);
    getrandom::fill(&mut *bytes).map_err(|e| WingmanError::Internal {
        message: e.to_string().into(),
        context: Some("Failed to generate tunnel secret".into()),
    })?;
    Ok(SecretString::new(general_purpose::STANDARD.encode(bytes.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mora_domain::ValueKind;

    #[test]
    fn tunnel_secrets_are_random_base64() {
        let a = tunnel_secret().unwrap();
        let b = tunnel_secret().unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
        let raw = general_purpose::STANDARD.decode(a.expose_secret()).unwrap();
        assert_eq!(raw.len(), TUNNEL_SECRET_LEN);
    }

    #[test]
    fn undecodable_entries_are_invalid_state() {
        let entry = StateConfigEntry::new("cloudflared", "email", ValueKind::String, vec![0xff]);
        let err = decode(&entry).unwrap_err();
        assert!(matches!(err, WingmanError::InvalidState { .. }));
    }
}
