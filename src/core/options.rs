use crate::constants;
use crate::core::catalog::{CspField, ValueKind};
use crate::error::CspError;
use crate::security::nonce::NonceRole;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use smallvec::SmallVec;
use std::sync::OnceLock;

pub(crate) type SourceList = SmallVec<[String; 4]>;

/// A list-valued field, accepting either a bare string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            StringList::One(value) => std::slice::from_ref(value),
            StringList::Many(values) => values.as_slice(),
        }
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        StringList::One(value.to_owned())
    }
}

impl From<String> for StringList {
    fn from(value: String) -> Self {
        StringList::One(value)
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        StringList::Many(values)
    }
}

/// Nonce generation selector: everything, a single role, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GenerateNonces {
    Toggle(bool),
    Only(NonceRole),
}

impl GenerateNonces {
    pub fn covers(self, role: NonceRole) -> bool {
        match self {
            GenerateNonces::Toggle(enabled) => enabled,
            GenerateNonces::Only(only) => only == role,
        }
    }
}

impl Default for GenerateNonces {
    fn default() -> Self {
        GenerateNonces::Toggle(true)
    }
}

impl From<bool> for GenerateNonces {
    fn from(enabled: bool) -> Self {
        GenerateNonces::Toggle(enabled)
    }
}

impl From<NonceRole> for GenerateNonces {
    fn from(role: NonceRole) -> Self {
        GenerateNonces::Only(role)
    }
}

/// `sandbox` accepts `true` (bare directive), or a restricted token list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SandboxValue {
    Flag(bool),
    Tokens(StringList),
}

/// Raw, declarative configuration as supplied by the host application,
/// either built programmatically or deserialized from a config file.
/// Unknown keys are rejected at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CspOptions {
    pub base_uri: Option<StringList>,
    pub child_src: Option<StringList>,
    pub connect_src: Option<StringList>,
    pub default_src: Option<StringList>,
    pub font_src: Option<StringList>,
    pub form_action: Option<StringList>,
    pub frame_ancestors: Option<StringList>,
    pub frame_src: Option<StringList>,
    pub img_src: Option<StringList>,
    pub manifest_src: Option<StringList>,
    pub media_src: Option<StringList>,
    pub object_src: Option<StringList>,
    pub plugin_types: Option<StringList>,
    pub require_sri_for: Option<StringList>,
    pub sandbox: Option<SandboxValue>,
    pub script_src: Option<StringList>,
    pub style_src: Option<StringList>,
    pub xhr_src: Option<StringList>,
    pub reflected_xss: Option<String>,
    pub report_uri: Option<String>,
    pub report_only: Option<bool>,
    pub old_safari: Option<bool>,
    pub generate_nonces: Option<GenerateNonces>,
}

macro_rules! list_setters {
    ($($setter:ident => $field:ident),+ $(,)?) => {
        $(
            pub fn $setter<I, S>(mut self, sources: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.$field = Some(StringList::Many(
                    sources.into_iter().map(Into::into).collect(),
                ));
                self
            }
        )+
    };
}

impl CspOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    list_setters! {
        base_uri => base_uri,
        child_src => child_src,
        connect_src => connect_src,
        default_src => default_src,
        font_src => font_src,
        form_action => form_action,
        frame_ancestors => frame_ancestors,
        frame_src => frame_src,
        img_src => img_src,
        manifest_src => manifest_src,
        media_src => media_src,
        object_src => object_src,
        plugin_types => plugin_types,
        require_sri_for => require_sri_for,
        script_src => script_src,
        style_src => style_src,
        xhr_src => xhr_src,
    }

    pub fn sandbox<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sandbox = Some(SandboxValue::Tokens(StringList::Many(
            tokens.into_iter().map(Into::into).collect(),
        )));
        self
    }

    /// Emit the `sandbox` directive with no values.
    pub fn sandbox_flag(mut self) -> Self {
        self.sandbox = Some(SandboxValue::Flag(true));
        self
    }

    pub fn reflected_xss(mut self, mode: impl Into<String>) -> Self {
        self.reflected_xss = Some(mode.into());
        self
    }

    pub fn report_uri(mut self, uri: impl Into<String>) -> Self {
        self.report_uri = Some(uri.into());
        self
    }

    pub fn report_only(mut self, enabled: bool) -> Self {
        self.report_only = Some(enabled);
        self
    }

    pub fn old_safari(mut self, enabled: bool) -> Self {
        self.old_safari = Some(enabled);
        self
    }

    pub fn generate_nonces(mut self, setting: impl Into<GenerateNonces>) -> Self {
        self.generate_nonces = Some(setting.into());
        self
    }

    /// Validate and normalize into the canonical record with the default
    /// ruleset.
    pub fn normalize(&self) -> Result<PolicyOptions, CspError> {
        self.normalize_with(ValidationRules::default())
    }

    pub fn normalize_with(&self, rules: ValidationRules) -> Result<PolicyOptions, CspError> {
        // reportOnly, even when explicitly false, requires a report target.
        if self.report_only.is_some() && self.report_uri.is_none() {
            return Err(CspError::MissingReportUri);
        }

        let generate_nonces = self.generate_nonces.unwrap_or_default();
        let mut directives = IndexMap::new();

        if self.has_directive_field() {
            for field in CspField::SERIALIZATION_ORDER {
                self.normalize_field(field, &mut directives)?;
            }
        } else {
            for (field, source) in DEFAULT_POLICY {
                directives.insert(*field, DirectiveValue::List(SmallVec::from_iter([source.to_string()])));
            }
        }

        if rules.strict_dynamic_requires_nonce {
            for (field, role) in [
                (CspField::ScriptSrc, NonceRole::Script),
                (CspField::StyleSrc, NonceRole::Style),
            ] {
                if generate_nonces.covers(role) {
                    continue;
                }
                if let Some(DirectiveValue::List(sources)) = directives.get(&field) {
                    if sources.iter().any(|s| s == "'strict-dynamic'") {
                        return Err(CspError::invalid(
                            field.name(),
                            "strict-dynamic requires nonce generation for this directive",
                        ));
                    }
                }
            }
        }

        Ok(PolicyOptions {
            directives,
            report_only: self.report_only.unwrap_or(false),
            old_safari: self.old_safari.unwrap_or(false),
            generate_nonces,
        })
    }

    fn normalize_field(
        &self,
        field: CspField,
        directives: &mut IndexMap<CspField, DirectiveValue>,
    ) -> Result<(), CspError> {
        match field.kind() {
            ValueKind::List => {
                if let Some(list) = self.list_field(field) {
                    let sources: SourceList =
                        list.as_slice().iter().map(|s| quote_keyword(s)).collect();
                    if !sources.is_empty() {
                        directives.insert(field, DirectiveValue::List(sources));
                    }
                }
            }
            ValueKind::BooleanFlag => match &self.sandbox {
                Some(SandboxValue::Flag(true)) => {
                    directives.insert(field, DirectiveValue::Flag);
                }
                Some(SandboxValue::Flag(false)) | None => {}
                Some(SandboxValue::Tokens(list)) => {
                    let tokens = list.as_slice();
                    for token in tokens {
                        if !sandbox_token_set().contains(token.as_str()) {
                            return Err(CspError::invalid(
                                field.name(),
                                format!("{token} is not a valid sandbox token"),
                            ));
                        }
                    }
                    if !tokens.is_empty() {
                        directives.insert(
                            field,
                            DirectiveValue::List(tokens.iter().cloned().collect()),
                        );
                    }
                }
            },
            ValueKind::Single => {
                let value = match field {
                    CspField::ReportUri => self.report_uri.as_ref(),
                    CspField::ReflectedXss => {
                        if let Some(mode) = &self.reflected_xss {
                            if !constants::REFLECTED_XSS_VALUES.contains(&mode.as_str()) {
                                return Err(CspError::invalid(
                                    field.name(),
                                    format!("{mode} is not one of allow, block, filter"),
                                ));
                            }
                        }
                        self.reflected_xss.as_ref()
                    }
                    _ => None,
                };
                if let Some(value) = value {
                    directives.insert(field, DirectiveValue::Single(value.clone()));
                }
            }
        }
        Ok(())
    }

    fn list_field(&self, field: CspField) -> Option<&StringList> {
        match field {
            CspField::BaseUri => self.base_uri.as_ref(),
            CspField::ChildSrc => self.child_src.as_ref(),
            CspField::ConnectSrc => self.connect_src.as_ref(),
            CspField::DefaultSrc => self.default_src.as_ref(),
            CspField::FontSrc => self.font_src.as_ref(),
            CspField::FormAction => self.form_action.as_ref(),
            CspField::FrameAncestors => self.frame_ancestors.as_ref(),
            CspField::FrameSrc => self.frame_src.as_ref(),
            CspField::ImgSrc => self.img_src.as_ref(),
            CspField::ManifestSrc => self.manifest_src.as_ref(),
            CspField::MediaSrc => self.media_src.as_ref(),
            CspField::ObjectSrc => self.object_src.as_ref(),
            CspField::PluginTypes => self.plugin_types.as_ref(),
            CspField::RequireSriFor => self.require_sri_for.as_ref(),
            CspField::ScriptSrc => self.script_src.as_ref(),
            CspField::StyleSrc => self.style_src.as_ref(),
            CspField::XhrSrc => self.xhr_src.as_ref(),
            _ => None,
        }
    }

    /// Whether any directive-valued field was supplied. Scalar settings do
    /// not count; a config carrying only those still receives the built-in
    /// default policy.
    fn has_directive_field(&self) -> bool {
        self.base_uri.is_some()
            || self.child_src.is_some()
            || self.connect_src.is_some()
            || self.default_src.is_some()
            || self.font_src.is_some()
            || self.form_action.is_some()
            || self.frame_ancestors.is_some()
            || self.frame_src.is_some()
            || self.img_src.is_some()
            || self.manifest_src.is_some()
            || self.media_src.is_some()
            || self.object_src.is_some()
            || self.plugin_types.is_some()
            || self.require_sri_for.is_some()
            || self.sandbox.is_some()
            || self.script_src.is_some()
            || self.style_src.is_some()
            || self.xhr_src.is_some()
            || self.reflected_xss.is_some()
            || self.report_uri.is_some()
    }
}

/// Registration policy applied when normalizing built-in directives.
const DEFAULT_POLICY: &[(CspField, &str)] = &[
    (CspField::DefaultSrc, "'none'"),
    (CspField::ScriptSrc, "'self'"),
    (CspField::StyleSrc, "'self'"),
    (CspField::ImgSrc, "'self'"),
    (CspField::ConnectSrc, "'self'"),
];

/// Tunable validation rules that are policy decisions rather than
/// universal invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationRules {
    /// Reject `strict-dynamic` on script-src/style-src when nonce
    /// generation is disabled for that role.
    pub strict_dynamic_requires_nonce: bool,
}

/// Canonical value attached to a directive field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    List(SourceList),
    Single(String),
    Flag,
}

/// Canonical options record: the validated, quoted form the serializer
/// consumes. Constructed once per registration or per request; never
/// mutated afterwards (transforms operate on copies).
#[derive(Debug, Clone)]
pub struct PolicyOptions {
    pub(crate) directives: IndexMap<CspField, DirectiveValue>,
    pub report_only: bool,
    pub old_safari: bool,
    pub generate_nonces: GenerateNonces,
}

impl PolicyOptions {
    #[inline]
    pub fn get(&self, field: CspField) -> Option<&DirectiveValue> {
        self.directives.get(&field)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, field: CspField) -> Option<&mut DirectiveValue> {
        self.directives.get_mut(&field)
    }

    #[inline]
    pub(crate) fn insert(&mut self, field: CspField, value: DirectiveValue) {
        self.directives.insert(field, value);
    }

    #[inline]
    pub(crate) fn remove(&mut self, field: CspField) -> Option<DirectiveValue> {
        self.directives.shift_remove(&field)
    }

    pub(crate) fn retain_only(&mut self, keep: CspField) {
        self.directives.retain(|field, _| *field == keep);
    }

    #[inline]
    pub fn nonce_enabled(&self, role: NonceRole) -> bool {
        self.generate_nonces.covers(role)
    }
}

pub(crate) fn quote_keyword(source: &str) -> String {
    if keyword_set().contains(source) {
        format!("'{source}'")
    } else {
        source.to_owned()
    }
}

fn keyword_set() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| constants::QUOTED_KEYWORDS.iter().copied().collect())
}

fn sandbox_token_set() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| constants::SANDBOX_TOKENS.iter().copied().collect())
}
