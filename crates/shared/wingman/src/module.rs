use crate::context::RequestContext;
use crate::error::WingmanError;
use async_trait::async_trait;
use mora_domain::{ConfigPoint, ModuleCapabilities, Value};
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

/// A pluggable unit driven by the host.
///
/// Modules are queried on every negotiation pass and must be cheap to ask repeatedly: look
/// at state through the context and only return points that are still unresolved.
#[async_trait]
pub trait Module: Debug + Send + Sync {
    /// Unique module name; also the namespace of its state entries.
    fn name(&self) -> &str;

    /// Capabilities advertised by this module. Read once, at registration.
    fn capabilities(&self) -> ModuleCapabilities {
        if self.as_function_provider().is_some() {
            ModuleCapabilities::ALL
        } else {
            ModuleCapabilities::CONFIG_POINTS
        }
    }

    /// Config points this module still needs.
    ///
    /// # Errors
    /// Any error aborts the current negotiation.
    async fn config_points(&self, _ctx: &RequestContext) -> Result<Vec<ConfigPoint>, WingmanError> {
        Ok(Vec::new())
    }

    fn as_function_provider(&self) -> Option<&dyn FunctionProvider> {
        None
    }
}

/// Modules with the `FUNCTIONS` capability hand out their expression functions through this.
#[async_trait]
pub trait FunctionProvider: Send + Sync {
    /// # Errors
    /// Any error fails engine construction.
    async fn functions(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Arc<dyn ExpressionFunction>>, WingmanError>;
}

/// A named, side-effecting function callable from expressions.
#[async_trait]
pub trait ExpressionFunction: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Evaluates the function. `args.len()` is already within [`ExpressionFunction::arity`].
    ///
    /// Implementations must consult state first and return the cached result when present.
    ///
    /// # Errors
    /// Errors are hard failures: they propagate to the host and are never retried.
    async fn evaluate(
        &self,
        ctx: &RequestContext,
        args: &[Value],
    ) -> Result<Evaluation, WingmanError>;
}

/// Inclusive bounds on the number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    #[must_use]
    pub const fn accepts(self, given: usize) -> bool {
        self.min <= given && given <= self.max
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Result of one evaluation attempt.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Value(Value),
    /// More input is needed before the function can finish. Never empty.
    Deferred(Vec<ConfigPoint>),
}

impl Evaluation {
    #[must_use]
    pub fn deferred(points: impl IntoIterator<Item = ConfigPoint>) -> Self {
        Self::Deferred(points.into_iter().collect())
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl From<Value> for Evaluation {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain;

    #[async_trait]
    impl Module for Plain {
        fn name(&self) -> &str {
            "plain"
        }
    }

    #[test]
    fn default_capabilities_follow_function_provider() {
        assert_eq!(Plain.capabilities(), ModuleCapabilities::CONFIG_POINTS);
        assert!(Plain.as_function_provider().is_none());
    }

    #[test]
    fn arity_bounds_are_inclusive() {
        let arity = Arity::new(0, 1);
        assert!(arity.accepts(0));
        assert!(arity.accepts(1));
        assert!(!arity.accepts(2));
        assert_eq!(arity.to_string(), "0..=1");
        assert!(!Arity::exactly(2).accepts(1));
    }
}
