use std::borrow::Cow;

/// Boxed error returned by external collaborators (cloud APIs, deployers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of [`WingmanError`] for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required prior entry is missing or unusable.
    InvalidState,
    ArityMismatch,
    /// A collaborator call failed; its effect is unknown.
    ExternalCallFailed,
    NegotiationStalled,
    /// The secret was confirmed not applied.
    DeployFailed,
    UnknownFunction,
    Registration,
    Cancelled,
    /// The state store failed to read or persist.
    State,
    Config,
    Internal,
}

/// A specialized [`WingmanError`] enum of this crate.
#[mora_derive::mora_error]
pub enum WingmanError {
    /// A required prior entry is missing or unusable.
    #[error("Invalid state{}: {message}", format_context(.context))]
    InvalidState { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error(
        "Function `{function}` takes {min}..={max} arguments but was given {given}{}",
        format_context(.context)
    )]
    ArityMismatch {
        function: Cow<'static, str>,
        min: usize,
        max: usize,
        given: usize,
        context: Option<Cow<'static, str>>,
    },

    #[error("External call `{call}` failed{}: {source}", format_context(.context))]
    ExternalCallFailed {
        call: Cow<'static, str>,
        source: BoxError,
        context: Option<Cow<'static, str>>,
    },

    #[error(
        "Negotiation stalled after {passes} passes{}; outstanding: {}",
        format_context(.context),
        .outstanding.join(", ")
    )]
    NegotiationStalled { passes: u32, outstanding: Vec<String>, context: Option<Cow<'static, str>> },

    #[error("Deploying secret `{secret}` failed{}: {source}", format_context(.context))]
    DeployFailed { secret: String, source: BoxError, context: Option<Cow<'static, str>> },

    #[error("Unknown function `{module}::{function}`{}", format_context(.context))]
    UnknownFunction { module: String, function: String, context: Option<Cow<'static, str>> },

    #[error("Registration failed{}: {message}", format_context(.context))]
    Registration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Operation cancelled{}", format_context(.context))]
    Cancelled { context: Option<Cow<'static, str>> },

    #[error("State store error{}: {source}", format_context(.context))]
    State { source: mora_state::StateError, context: Option<Cow<'static, str>> },

    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal wingman error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl WingmanError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::ExternalCallFailed { .. } => ErrorKind::ExternalCallFailed,
            Self::NegotiationStalled { .. } => ErrorKind::NegotiationStalled,
            Self::DeployFailed { .. } => ErrorKind::DeployFailed,
            Self::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            Self::Registration { .. } => ErrorKind::Registration,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::State { .. } => ErrorKind::State,
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Wraps a collaborator failure, naming the call that failed.
    pub fn external(call: impl Into<Cow<'static, str>>, source: impl Into<BoxError>) -> Self {
        Self::ExternalCallFailed { call: call.into(), source: source.into(), context: None }
    }

    pub fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState { message: message.into(), context: None }
    }

    pub(crate) const fn cancelled() -> Self {
        Self::Cancelled { context: None }
    }
}
