//! Custom image module: needs one secret, `test`, before it can build its image.
use mora_wingman::{ConfigPoint, Module, ModuleCapabilities, RequestContext, WingmanError, async_trait};
use std::sync::Arc;

pub const MODULE_NAME: &str = "custom_image";
pub const TEST_POINT: &str = "test";

#[derive(Debug, Default, Clone, Copy)]
pub struct CustomImage;

#[async_trait]
impl Module for CustomImage {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::CONFIG_POINTS
    }

    async fn config_points(&self, ctx: &RequestContext) -> Result<Vec<ConfigPoint>, WingmanError> {
        if ctx.find_config(TEST_POINT).is_some() {
            return Ok(Vec::new());
        }
        Ok(vec![ConfigPoint::secret(TEST_POINT, "Testing")])
    }
}

/// Initialize the custom image module.
pub fn init() -> Arc<dyn Module> {
    tracing::info!(module = MODULE_NAME, "Custom image module initialized");
    Arc::new(CustomImage)
}
