use std::borrow::Cow;

/// Failures reported by a [`crate::TunnelApi`] implementation.
#[mora_derive::mora_error]
pub enum ApiError {
    /// The API rejected the credentials.
    #[error("Cloudflare API rejected the credentials{}", format_context(.context))]
    Unauthorized { context: Option<Cow<'static, str>> },

    #[error("Cloudflare resource not found{}: {resource}", format_context(.context))]
    NotFound { resource: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The request did not complete (timeout, connection reset, bad status).
    #[error("Cloudflare API transport failure{}: {message}", format_context(.context))]
    Transport { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal cloudflared error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
