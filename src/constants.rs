pub(crate) const HEADER_CSP: &str = "content-security-policy";
pub(crate) const HEADER_CSP_REPORT_ONLY: &str = "content-security-policy-report-only";
pub(crate) const HEADER_XCSP: &str = "x-content-security-policy";
pub(crate) const HEADER_XCSP_REPORT_ONLY: &str = "x-content-security-policy-report-only";
pub(crate) const HEADER_WEBKIT: &str = "x-webkit-csp";
pub(crate) const HEADER_WEBKIT_REPORT_ONLY: &str = "x-webkit-csp-report-only";

pub(crate) const BASE_URI: &str = "base-uri";
pub(crate) const CHILD_SRC: &str = "child-src";
pub(crate) const CONNECT_SRC: &str = "connect-src";
pub(crate) const DEFAULT_SRC: &str = "default-src";
pub(crate) const FONT_SRC: &str = "font-src";
pub(crate) const FORM_ACTION: &str = "form-action";
pub(crate) const FRAME_ANCESTORS: &str = "frame-ancestors";
pub(crate) const FRAME_SRC: &str = "frame-src";
pub(crate) const IMG_SRC: &str = "img-src";
pub(crate) const MANIFEST_SRC: &str = "manifest-src";
pub(crate) const MEDIA_SRC: &str = "media-src";
pub(crate) const OBJECT_SRC: &str = "object-src";
pub(crate) const PLUGIN_TYPES: &str = "plugin-types";
pub(crate) const REQUIRE_SRI_FOR: &str = "require-sri-for";
pub(crate) const SANDBOX: &str = "sandbox";
pub(crate) const SCRIPT_SRC: &str = "script-src";
pub(crate) const STYLE_SRC: &str = "style-src";
pub(crate) const XHR_SRC: &str = "xhr-src";
pub(crate) const REFLECTED_XSS: &str = "reflected-xss";
pub(crate) const REPORT_URI: &str = "report-uri";

// Firefox 4 shipped "allow" before default-src was standardized.
pub(crate) const ALLOW_DIRECTIVE: &str = "allow";

pub(crate) const UNSAFE_INLINE: &str = "'unsafe-inline'";
pub(crate) const UNSAFE_EVAL: &str = "'unsafe-eval'";
pub(crate) const INLINE_SCRIPT: &str = "'inline-script'";
pub(crate) const EVAL_SCRIPT: &str = "'eval-script'";
pub(crate) const NONCE_PREFIX: &str = "'nonce-";
pub(crate) const SUFFIX_QUOTE: &str = "'";

/// Bare keywords that must be wrapped in single quotes on the wire.
pub(crate) const QUOTED_KEYWORDS: &[&str] = &[
    "self",
    "none",
    "unsafe-inline",
    "unsafe-eval",
    "inline-script",
    "eval-script",
    "strict-dynamic",
];

pub(crate) const SANDBOX_TOKENS: &[&str] = &[
    "allow-forms",
    "allow-modals",
    "allow-orientation-lock",
    "allow-pointer-lock",
    "allow-popups",
    "allow-popups-to-escape-sandbox",
    "allow-presentation",
    "allow-same-origin",
    "allow-scripts",
    "allow-top-navigation",
];

pub(crate) const REFLECTED_XSS_VALUES: &[&str] = &["allow", "block", "filter"];

pub(crate) const NONCE_BYTES: usize = 16;
pub(crate) const SEMICOLON: &[u8] = b";";

pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 256;
