use crate::constants;
use crate::security::nonce::NonceRole;

/// Canonical configuration fields understood by the policy engine.
///
/// Each field knows its wire-format directive token and how its value is
/// shaped. The set is fixed at compile time and never grows at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CspField {
    DefaultSrc,
    ScriptSrc,
    StyleSrc,
    ImgSrc,
    ConnectSrc,
    XhrSrc,
    BaseUri,
    ChildSrc,
    FontSrc,
    FormAction,
    FrameAncestors,
    FrameSrc,
    ManifestSrc,
    MediaSrc,
    ObjectSrc,
    PluginTypes,
    RequireSriFor,
    Sandbox,
    ReportUri,
    ReflectedXss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A list of source expressions, space-joined on the wire.
    List,
    /// A single bare string value.
    Single,
    /// `sandbox` when set to `true`: the token is emitted with no values.
    BooleanFlag,
}

impl CspField {
    /// Fixed walk order for serialization. The first five slots carry the
    /// built-in default policy; `xhr-src` sits next to `connect-src` since
    /// it only ever appears as its legacy replacement.
    pub const SERIALIZATION_ORDER: [CspField; 20] = [
        CspField::DefaultSrc,
        CspField::ScriptSrc,
        CspField::StyleSrc,
        CspField::ImgSrc,
        CspField::ConnectSrc,
        CspField::XhrSrc,
        CspField::BaseUri,
        CspField::ChildSrc,
        CspField::FontSrc,
        CspField::FormAction,
        CspField::FrameAncestors,
        CspField::FrameSrc,
        CspField::ManifestSrc,
        CspField::MediaSrc,
        CspField::ObjectSrc,
        CspField::PluginTypes,
        CspField::RequireSriFor,
        CspField::Sandbox,
        CspField::ReportUri,
        CspField::ReflectedXss,
    ];

    /// Canonical (configuration-side) field name.
    pub const fn name(self) -> &'static str {
        match self {
            CspField::DefaultSrc => "defaultSrc",
            CspField::ScriptSrc => "scriptSrc",
            CspField::StyleSrc => "styleSrc",
            CspField::ImgSrc => "imgSrc",
            CspField::ConnectSrc => "connectSrc",
            CspField::XhrSrc => "xhrSrc",
            CspField::BaseUri => "baseUri",
            CspField::ChildSrc => "childSrc",
            CspField::FontSrc => "fontSrc",
            CspField::FormAction => "formAction",
            CspField::FrameAncestors => "frameAncestors",
            CspField::FrameSrc => "frameSrc",
            CspField::ManifestSrc => "manifestSrc",
            CspField::MediaSrc => "mediaSrc",
            CspField::ObjectSrc => "objectSrc",
            CspField::PluginTypes => "pluginTypes",
            CspField::RequireSriFor => "requireSriFor",
            CspField::Sandbox => "sandbox",
            CspField::ReportUri => "reportUri",
            CspField::ReflectedXss => "reflectedXss",
        }
    }

    /// Wire-format directive token. Fields without a hyphenated mapping
    /// (`sandbox`) use their own name.
    pub const fn wire_token(self) -> &'static str {
        match self {
            CspField::DefaultSrc => constants::DEFAULT_SRC,
            CspField::ScriptSrc => constants::SCRIPT_SRC,
            CspField::StyleSrc => constants::STYLE_SRC,
            CspField::ImgSrc => constants::IMG_SRC,
            CspField::ConnectSrc => constants::CONNECT_SRC,
            CspField::XhrSrc => constants::XHR_SRC,
            CspField::BaseUri => constants::BASE_URI,
            CspField::ChildSrc => constants::CHILD_SRC,
            CspField::FontSrc => constants::FONT_SRC,
            CspField::FormAction => constants::FORM_ACTION,
            CspField::FrameAncestors => constants::FRAME_ANCESTORS,
            CspField::FrameSrc => constants::FRAME_SRC,
            CspField::ManifestSrc => constants::MANIFEST_SRC,
            CspField::MediaSrc => constants::MEDIA_SRC,
            CspField::ObjectSrc => constants::OBJECT_SRC,
            CspField::PluginTypes => constants::PLUGIN_TYPES,
            CspField::RequireSriFor => constants::REQUIRE_SRI_FOR,
            CspField::Sandbox => constants::SANDBOX,
            CspField::ReportUri => constants::REPORT_URI,
            CspField::ReflectedXss => constants::REFLECTED_XSS,
        }
    }

    pub const fn kind(self) -> ValueKind {
        match self {
            CspField::ReportUri | CspField::ReflectedXss => ValueKind::Single,
            CspField::Sandbox => ValueKind::BooleanFlag,
            _ => ValueKind::List,
        }
    }

    /// The nonce role fed into this directive, if any.
    pub const fn nonce_role(self) -> Option<NonceRole> {
        match self {
            CspField::ScriptSrc => Some(NonceRole::Script),
            CspField::StyleSrc => Some(NonceRole::Style),
            _ => None,
        }
    }

    pub const fn is_list(self) -> bool {
        !matches!(self, CspField::ReportUri | CspField::ReflectedXss)
    }
}
