pub mod csp;
pub mod extensions;
pub mod route;

pub use csp::{CspConfig, CspConfigBuilder, CspMiddleware, CspMiddlewareService};
pub use extensions::CspExtensions;
pub use route::{CspOverride, CspOverrideService, CspRouteConfig};

pub use csp::{csp_middleware, csp_middleware_with_callback};
