//! Host capability flags.
//!
//! Computed once at startup from what the embedding dev server actually
//! supports, then passed into registration functions. Each optional
//! handler group checks its flag and no-ops when the capability is
//! absent, which keeps registration declarative and testable without a
//! real host environment.

/// What the embedding dev server can introspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    /// The host exposes a route table
    pub routes: bool,
    /// The host exposes a component registry
    pub components: bool,
    /// The host exposes an auto-import registry
    pub auto_imports: bool,
}

impl HostCapabilities {
    /// No optional capabilities.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional capability.
    pub fn all() -> Self {
        Self {
            routes: true,
            components: true,
            auto_imports: true,
        }
    }

    /// Enable route introspection.
    #[must_use]
    pub fn with_routes(mut self) -> Self {
        self.routes = true;
        self
    }

    /// Enable component introspection.
    #[must_use]
    pub fn with_components(mut self) -> Self {
        self.components = true;
        self
    }

    /// Enable auto-import introspection.
    #[must_use]
    pub fn with_auto_imports(mut self) -> Self {
        self.auto_imports = true;
        self
    }
}
