use crate::constants::NONCE_BYTES;
use getrandom::getrandom;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The two inline allowances a nonce can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceRole {
    Script,
    Style,
}

impl NonceRole {
    /// Key under which this role's nonce is exposed to template contexts.
    pub const fn context_key(self) -> &'static str {
        match self {
            NonceRole::Script => "script-nonce",
            NonceRole::Style => "style-nonce",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NonceRole::Script => "script",
            NonceRole::Style => "style",
        }
    }
}

/// Produces 16 random bytes, hex encoded.
///
/// The system entropy source is authoritative; if it reports a transient
/// failure the generator degrades to a seeded xorshift stream instead of
/// failing the request.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    fallback_state: Mutex<Option<u64>>,
}

impl NonceGenerator {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        let mut bytes = [0u8; NONCE_BYTES];
        if getrandom(&mut bytes).is_err() {
            log::warn!("system entropy source unavailable, falling back to pseudo-random nonce");
            self.fill_fallback(&mut bytes);
        }
        hex::encode(bytes)
    }

    fn fill_fallback(&self, buf: &mut [u8]) {
        let mut state = self.fallback_state.lock();
        let mut s = state.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            nanos ^ (self as *const Self as u64) ^ 0x9e37_79b9_7f4a_7c15
        });

        for chunk in buf.chunks_mut(8) {
            s ^= s << 13;
            s ^= s >> 7;
            s ^= s << 17;
            chunk.copy_from_slice(&s.to_le_bytes()[..chunk.len()]);
        }

        *state = Some(s);
    }
}

/// Per-request nonce store, kept in the request extensions.
///
/// Each role is generated at most once per request; the serializer fills a
/// missing slot on demand so late access never fails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestNonces {
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<String>,
}

impl RequestNonces {
    #[inline]
    pub fn get(&self, role: NonceRole) -> Option<&str> {
        match role {
            NonceRole::Script => self.script.as_deref(),
            NonceRole::Style => self.style.as_deref(),
        }
    }

    #[inline]
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    #[inline]
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub(crate) fn ensure(&mut self, role: NonceRole, generator: &NonceGenerator) -> String {
        let slot = match role {
            NonceRole::Script => &mut self.script,
            NonceRole::Style => &mut self.style,
        };

        if let Some(value) = slot {
            return value.clone();
        }

        let value = generator.generate();
        *slot = Some(value.clone());
        value
    }
}
