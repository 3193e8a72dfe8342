use crate::core::options::CspOptions;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};

/// Per-route escape hatch, read from the request extensions by the outer
/// CSP middleware at response time.
#[derive(Debug, Clone)]
pub enum CspRouteConfig {
    Disabled,
    Override(CspOptions),
}

/// Marker middleware for a single route or scope: wrap it inside the
/// application-level [`CspMiddleware`](crate::middleware::CspMiddleware)
/// to disable the header there or swap in different options.
#[derive(Debug, Clone)]
pub struct CspOverride {
    config: CspRouteConfig,
}

impl CspOverride {
    /// Suppress the CSP header for every response on this route.
    pub fn disable() -> Self {
        Self {
            config: CspRouteConfig::Disabled,
        }
    }

    /// Replace the registered configuration for this route. The options are
    /// validated per request; invalid ones log and leave the response
    /// without a header.
    pub fn options(options: CspOptions) -> Self {
        Self {
            config: CspRouteConfig::Override(options),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CspOverride
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = CspOverrideService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CspOverrideService {
            service,
            config: self.config.clone(),
        }))
    }
}

pub struct CspOverrideService<S> {
    service: S,
    config: CspRouteConfig,
}

impl<S, B> Service<ServiceRequest> for CspOverrideService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        req.extensions_mut().insert(self.config.clone());
        self.service.call(req)
    }
}
