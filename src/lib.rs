pub mod constants;
pub mod core;
pub mod error;
pub mod middleware;
pub mod prelude;
pub mod security;

// Re-export commonly used types for convenience
pub use crate::core::{
    Browser, BrowserFamily, Compat, CspField, CspOptions, GenerateNonces, HeaderVariant,
    PolicyOptions, PolicyTransform, SandboxValue, StringList, ValidationRules,
};
pub use crate::error::CspError;
pub use crate::middleware::{
    csp_middleware, csp_middleware_with_callback, CspConfig, CspConfigBuilder, CspExtensions,
    CspMiddleware, CspOverride, CspRouteConfig,
};
pub use crate::security::{NonceGenerator, NonceRole, RequestNonces};
