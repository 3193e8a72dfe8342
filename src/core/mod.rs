pub mod browser;
pub mod catalog;
pub mod options;
pub mod serializer;

pub use browser::{Browser, BrowserFamily, Compat, HeaderVariant, PolicyTransform};
pub use catalog::{CspField, ValueKind};
pub use options::{
    CspOptions, DirectiveValue, GenerateNonces, PolicyOptions, SandboxValue, StringList,
    ValidationRules,
};
pub use serializer::serialize_policy;
