pub use crate::core::{Browser, BrowserFamily, CspOptions, GenerateNonces, SandboxValue};
pub use crate::error::CspError;
pub use crate::middleware::{
    csp_middleware, csp_middleware_with_callback, CspConfig, CspConfigBuilder, CspExtensions,
    CspMiddleware, CspOverride,
};
pub use crate::security::{NonceGenerator, NonceRole, RequestNonces};
