use crate::error::WingmanError;
use crate::negotiation::PendingPoint;
use async_trait::async_trait;
use mora_domain::StateConfigEntry;
use mora_domain::config::PresetValues;
use std::fmt::Debug;
use tracing::debug;

/// Answers outstanding config points, typically by asking an operator.
///
/// Returning fewer entries than points is fine; the rest are surfaced again next pass.
#[async_trait]
pub trait ValueSupplier: Debug + Send + Sync {
    /// # Errors
    /// Any error aborts the negotiation.
    async fn supply(&self, points: &[PendingPoint]) -> Result<Vec<StateConfigEntry>, WingmanError>;
}

/// Resolves points from a fixed `module -> identifier -> value` table.
#[derive(Debug, Default, Clone)]
pub struct PresetSupplier {
    values: PresetValues,
}

impl PresetSupplier {
    #[must_use]
    pub const fn new(values: PresetValues) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn with(mut self, module: &str, identifier: &str, value: &str) -> Self {
        self.values.insert(module, identifier, value);
        self
    }
}

#[async_trait]
impl ValueSupplier for PresetSupplier {
    async fn supply(&self, points: &[PendingPoint]) -> Result<Vec<StateConfigEntry>, WingmanError> {
        let entries: Vec<_> = points
            .iter()
            .filter_map(|pending| {
                let identifier = &pending.point.identifier;
                let value = self.values.get(&pending.module, identifier)?;
                Some(StateConfigEntry::new(
                    pending.module.as_ref(),
                    identifier.as_str(),
                    pending.point.kind,
                    value,
                ))
            })
            .collect();

        debug!(requested = points.len(), supplied = entries.len(), "Preset values supplied");
        Ok(entries)
    }
}
