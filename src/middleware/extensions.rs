use crate::security::nonce::{NonceRole, RequestNonces};
use actix_web::HttpMessage;
use serde_json::{Map, Value};

/// Request-side access to the per-request nonce store.
pub trait CspExtensions {
    /// The full store, if the middleware ran for this request.
    fn nonces(&self) -> Option<RequestNonces>;

    fn script_nonce(&self) -> Option<String>;

    fn style_nonce(&self) -> Option<String>;

    /// Copy the nonces into a template-rendering context under the
    /// `script-nonce` / `style-nonce` keys. Other keys already present in
    /// the context are left untouched.
    fn apply_nonce_context(&self, context: &mut Map<String, Value>);
}

impl<T> CspExtensions for T
where
    T: HttpMessage,
{
    fn nonces(&self) -> Option<RequestNonces> {
        self.extensions().get::<RequestNonces>().cloned()
    }

    fn script_nonce(&self) -> Option<String> {
        self.extensions()
            .get::<RequestNonces>()
            .and_then(|nonces| nonces.get(NonceRole::Script).map(str::to_owned))
    }

    fn style_nonce(&self) -> Option<String> {
        self.extensions()
            .get::<RequestNonces>()
            .and_then(|nonces| nonces.get(NonceRole::Style).map(str::to_owned))
    }

    fn apply_nonce_context(&self, context: &mut Map<String, Value>) {
        let Some(nonces) = self.nonces() else {
            return;
        };

        for role in [NonceRole::Script, NonceRole::Style] {
            if let Some(nonce) = nonces.get(role) {
                context.insert(role.context_key().to_owned(), Value::String(nonce.to_owned()));
            }
        }
    }
}
