use bitflags::bitflags;

bitflags! {
    /// Capabilities a module opts into. Queried once, when the module is registered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModuleCapabilities: u8 {
        /// The module declares config points.
        const CONFIG_POINTS = 1 << 0;
        /// The module exposes expression functions.
        const FUNCTIONS = 1 << 1;

        const ALL = Self::CONFIG_POINTS.bits() | Self::FUNCTIONS.bits();
    }
}

impl Default for ModuleCapabilities {
    fn default() -> Self {
        Self::CONFIG_POINTS
    }
}
