use crate::constants::{
    ALLOW_DIRECTIVE, DEFAULT_BUFFER_CAPACITY, EVAL_SCRIPT, INLINE_SCRIPT, NONCE_PREFIX, SEMICOLON,
    SUFFIX_QUOTE, UNSAFE_EVAL, UNSAFE_INLINE,
};
use crate::core::browser::PolicyTransform;
use crate::core::catalog::CspField;
use crate::core::options::{DirectiveValue, PolicyOptions};
use crate::error::CspError;
use crate::security::nonce::{NonceGenerator, RequestNonces};
use actix_web::http::header::HeaderValue;
use bytes::BytesMut;

/// Serialize the canonical options record into the final header value,
/// applying the browser-specific transform and injecting nonces for roles
/// that have them enabled. A role with no stashed nonce gets one generated
/// on the spot, so serialization cannot fail on a missing store.
pub fn serialize_policy(
    options: &PolicyOptions,
    transform: PolicyTransform,
    nonces: &mut RequestNonces,
    generator: &NonceGenerator,
) -> Result<HeaderValue, CspError> {
    let prepared = apply_transform(options, transform);
    let mut buffer = BytesMut::with_capacity(estimated_size(&prepared).max(DEFAULT_BUFFER_CAPACITY));
    let mut first = true;

    for field in CspField::SERIALIZATION_ORDER {
        let Some(value) = prepared.get(field) else {
            continue;
        };

        let token = wire_token(field, transform);

        match value {
            DirectiveValue::Flag => {
                separator(&mut buffer, &mut first);
                buffer.extend_from_slice(token.as_bytes());
            }
            DirectiveValue::Single(single) => {
                separator(&mut buffer, &mut first);
                buffer.extend_from_slice(token.as_bytes());
                buffer.extend_from_slice(b" ");
                buffer.extend_from_slice(single.as_bytes());
            }
            DirectiveValue::List(sources) => {
                if sources.is_empty() {
                    continue;
                }
                separator(&mut buffer, &mut first);
                buffer.extend_from_slice(token.as_bytes());
                for source in sources {
                    buffer.extend_from_slice(b" ");
                    buffer.extend_from_slice(source.as_bytes());
                }
                if let Some(role) = field.nonce_role() {
                    if prepared.nonce_enabled(role) {
                        let nonce = nonces.ensure(role, generator);
                        buffer.extend_from_slice(b" ");
                        buffer.extend_from_slice(NONCE_PREFIX.as_bytes());
                        buffer.extend_from_slice(nonce.as_bytes());
                        buffer.extend_from_slice(SUFFIX_QUOTE.as_bytes());
                    }
                }
            }
        }
    }

    HeaderValue::from_maybe_shared(buffer.freeze()).map_err(|_| CspError::InvalidHeaderValue)
}

#[inline]
fn separator(buffer: &mut BytesMut, first: &mut bool) {
    if !*first {
        buffer.extend_from_slice(SEMICOLON);
    }
    *first = false;
}

fn wire_token(field: CspField, transform: PolicyTransform) -> &'static str {
    // Firefox 4 understood "allow" where default-src later standardized.
    if transform == PolicyTransform::Firefox4Legacy && field == CspField::DefaultSrc {
        ALLOW_DIRECTIVE
    } else {
        field.wire_token()
    }
}

/// Produce the working copy the serializer walks. The input record is
/// never mutated.
fn apply_transform(options: &PolicyOptions, transform: PolicyTransform) -> PolicyOptions {
    match transform {
        PolicyTransform::Standard => options.clone(),
        PolicyTransform::FirefoxLegacy | PolicyTransform::Firefox4Legacy => {
            firefox_legacy(options.clone())
        }
        PolicyTransform::IeSandboxOnly => {
            let mut prepared = options.clone();
            prepared.retain_only(CspField::Sandbox);
            prepared
        }
    }
}

fn firefox_legacy(mut options: PolicyOptions) -> PolicyOptions {
    // connect-src shipped as xhr-src
    if let Some(connect) = options.remove(CspField::ConnectSrc) {
        options.insert(CspField::XhrSrc, connect);
    }

    // no sandbox support
    options.remove(CspField::Sandbox);

    // unsafe-inline / unsafe-eval had earlier spellings on script-src
    if let Some(DirectiveValue::List(sources)) = options.get_mut(CspField::ScriptSrc) {
        for source in sources.iter_mut() {
            if *source == UNSAFE_INLINE {
                *source = INLINE_SCRIPT.to_owned();
            } else if *source == UNSAFE_EVAL {
                *source = EVAL_SCRIPT.to_owned();
            }
        }
    }

    // and were not recognized at all anywhere else
    let mut emptied = Vec::new();
    for (field, value) in options.directives.iter_mut() {
        let DirectiveValue::List(sources) = value else {
            continue;
        };
        sources.retain(|source| {
            source.as_str() != UNSAFE_INLINE && source.as_str() != UNSAFE_EVAL
        });
        if sources.is_empty() {
            emptied.push(*field);
        }
    }
    for field in emptied {
        options.remove(field);
    }

    options
}

fn estimated_size(options: &PolicyOptions) -> usize {
    let mut size = 0;
    for (field, value) in &options.directives {
        size += field.wire_token().len() + 1;
        match value {
            DirectiveValue::Flag => {}
            DirectiveValue::Single(single) => size += single.len() + 1,
            DirectiveValue::List(sources) => {
                size += sources.iter().map(|s| s.len() + 1).sum::<usize>();
                // room for a nonce token on script-src/style-src
                if field.nonce_role().is_some() {
                    size += NONCE_PREFIX.len() + 33;
                }
            }
        }
    }
    size
}
