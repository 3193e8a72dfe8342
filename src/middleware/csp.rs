use crate::core::browser::{self, Browser};
use crate::core::options::{CspOptions, PolicyOptions, ValidationRules};
use crate::core::serializer::serialize_policy;
use crate::error::CspError;
use crate::middleware::route::CspRouteConfig;
use crate::security::nonce::{NonceGenerator, NonceRole, RequestNonces};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{CONTENT_TYPE, USER_AGENT},
    http::Method,
    Error, HttpMessage, HttpRequest, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::{rc::Rc, sync::Arc};

type ConfigCallback = dyn Fn(&HttpRequest) -> CspOptions + Send + Sync;

enum ConfigSource {
    Static(PolicyOptions),
    Callback(Box<ConfigCallback>),
}

/// Registration-time configuration: a static options record validated once
/// (fatal on failure), or a callback computing options per request.
pub struct CspConfig {
    source: ConfigSource,
    rules: ValidationRules,
    generator: NonceGenerator,
}

impl CspConfig {
    /// Validate `options` and build a static configuration. An invalid
    /// record is a startup error, not a per-request one.
    pub fn new(options: CspOptions) -> Result<Self, CspError> {
        CspConfigBuilder::new().options(options).build()
    }

    /// Compute options per request. The callback must be pure; its output
    /// is validated on every response.
    pub fn from_callback<F>(callback: F) -> Self
    where
        F: Fn(&HttpRequest) -> CspOptions + Send + Sync + 'static,
    {
        CspConfig {
            source: ConfigSource::Callback(Box::new(callback)),
            rules: ValidationRules::default(),
            generator: NonceGenerator::new(),
        }
    }

    #[inline]
    pub fn builder() -> CspConfigBuilder {
        CspConfigBuilder::new()
    }

    /// Effective options for one request: route override, then callback,
    /// then the registered record. Invalid per-request configuration logs
    /// and yields `None`; the response then goes out without a header.
    fn resolve(
        &self,
        req: &HttpRequest,
        route_override: Option<&CspOptions>,
    ) -> Option<PolicyOptions> {
        if let Some(options) = route_override {
            return match options.normalize_with(self.rules) {
                Ok(normalized) => Some(normalized),
                Err(err) => {
                    log::error!("invalid CSP configuration on route {}: {}", req.path(), err);
                    None
                }
            };
        }

        match &self.source {
            ConfigSource::Static(options) => Some(options.clone()),
            ConfigSource::Callback(callback) => match callback(req).normalize_with(self.rules) {
                Ok(normalized) => Some(normalized),
                Err(err) => {
                    log::error!("invalid CSP configuration from callback: {}", err);
                    None
                }
            },
        }
    }
}

#[derive(Default)]
pub struct CspConfigBuilder {
    options: Option<CspOptions>,
    callback: Option<Box<ConfigCallback>>,
    rules: ValidationRules,
}

impl CspConfigBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn options(mut self, options: CspOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HttpRequest) -> CspOptions + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Reject `strict-dynamic` on script-src/style-src unless nonce
    /// generation covers that role. Off by default.
    #[inline]
    pub fn strict_dynamic_requires_nonce(mut self, enabled: bool) -> Self {
        self.rules.strict_dynamic_requires_nonce = enabled;
        self
    }

    pub fn build(self) -> Result<CspConfig, CspError> {
        let source = if let Some(callback) = self.callback {
            ConfigSource::Callback(callback)
        } else {
            let options = self.options.unwrap_or_default();
            ConfigSource::Static(options.normalize_with(self.rules)?)
        };

        Ok(CspConfig {
            source,
            rules: self.rules,
            generator: NonceGenerator::new(),
        })
    }
}

/// The middleware proper. Wrap it on the `App`; per-route adjustments go
/// through [`CspOverride`](crate::middleware::route::CspOverride).
#[derive(Clone)]
pub struct CspMiddleware {
    config: Arc<CspConfig>,
}

impl CspMiddleware {
    #[inline]
    pub fn new(config: CspConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[inline]
    pub fn config(&self) -> Arc<CspConfig> {
        self.config.clone()
    }
}

impl<S, B> Transform<S, ServiceRequest> for CspMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CspMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CspMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct CspMiddlewareService<S> {
    service: Rc<S>,
    config: Arc<CspConfig>,
}

impl<S, B> Service<ServiceRequest> for CspMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let http_req = req.request().clone();
            let skip = req.method() == Method::OPTIONS;

            if !skip {
                attach_nonces(&config, &http_req);
            }

            let (mut res, was_error) = match service.call(req).await {
                Ok(res) => (res.map_into_left_body(), false),
                Err(err) => {
                    let response = HttpResponse::from_error(err);
                    (
                        ServiceResponse::new(http_req.clone(), response).map_into_right_body(),
                        true,
                    )
                }
            };

            if skip {
                return Ok(res);
            }

            let route_config = http_req.extensions().get::<CspRouteConfig>().cloned();
            if matches!(route_config, Some(CspRouteConfig::Disabled)) {
                return Ok(res);
            }

            // Only text/html success responses carry the header; error
            // responses always do, their content type being synthetic.
            if !was_error {
                let html = match res.headers().get(CONTENT_TYPE) {
                    Some(value) => value
                        .to_str()
                        .map(|v| v.starts_with("text/html"))
                        .unwrap_or(false),
                    None => true,
                };
                if !html {
                    return Ok(res);
                }
            }

            let route_override = match &route_config {
                Some(CspRouteConfig::Override(options)) => Some(options),
                _ => None,
            };

            let Some(options) = config.resolve(&http_req, route_override) else {
                return Ok(res);
            };

            let browser = client_browser(&http_req);
            let compat = browser::resolve(&browser, &options);

            let mut nonces = http_req
                .extensions_mut()
                .remove::<RequestNonces>()
                .unwrap_or_default();
            let header_value =
                serialize_policy(&options, compat.transform, &mut nonces, &config.generator);
            http_req.extensions_mut().insert(nonces);

            match header_value {
                Ok(value) => {
                    let name = compat.header.header_name(options.report_only);
                    res.headers_mut().insert(name, value);
                }
                Err(err) => {
                    log::error!("failed to serialize content security policy: {}", err);
                }
            }

            Ok(res)
        })
    }
}

/// Pre-handling phase: stash a nonce per enabled role so handlers and
/// templates observe the same value the header will carry.
fn attach_nonces(config: &CspConfig, req: &HttpRequest) {
    let Some(options) = config.resolve(req, None) else {
        return;
    };

    let mut nonces = req
        .extensions_mut()
        .remove::<RequestNonces>()
        .unwrap_or_default();
    for role in [NonceRole::Script, NonceRole::Style] {
        if options.nonce_enabled(role) {
            nonces.ensure(role, &config.generator);
        }
    }
    req.extensions_mut().insert(nonces);
}

fn client_browser(req: &HttpRequest) -> Browser {
    if let Some(browser) = req.extensions().get::<Browser>() {
        return browser.clone();
    }

    req.headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(Browser::from_user_agent)
        .unwrap_or_else(Browser::unknown)
}

/// Build the middleware from static options, failing on invalid
/// configuration.
pub fn csp_middleware(options: CspOptions) -> Result<CspMiddleware, CspError> {
    Ok(CspMiddleware::new(CspConfig::new(options)?))
}

/// Build the middleware around a per-request configuration callback.
pub fn csp_middleware_with_callback<F>(callback: F) -> CspMiddleware
where
    F: Fn(&HttpRequest) -> CspOptions + Send + Sync + 'static,
{
    CspMiddleware::new(CspConfig::from_callback(callback))
}
