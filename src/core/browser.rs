use crate::constants;
use crate::core::options::PolicyOptions;
use actix_web::http::header::HeaderName;

/// Browser families with CSP header quirks. Anything else is `Other` and
/// receives the standard header untransformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Ie,
    Safari,
    Other,
}

/// Parsed client user agent: family plus major version, either of which
/// may be unknown. Hosts with their own user-agent pipeline can insert a
/// `Browser` into the request extensions to bypass the built-in sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Browser {
    pub family: BrowserFamily,
    pub major: Option<u32>,
}

impl Browser {
    #[inline]
    pub fn new(family: BrowserFamily, major: Option<u32>) -> Self {
        Self { family, major }
    }

    #[inline]
    pub fn unknown() -> Self {
        Self {
            family: BrowserFamily::Other,
            major: None,
        }
    }

    /// Best-effort family/version sniffing, covering only the families the
    /// compatibility table cares about. Chromium derivatives that ship their
    /// own token (Edge, Opera) are deliberately `Other`.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("MSIE ") || user_agent.contains("Trident/") {
            let major = version_after(user_agent, "MSIE ")
                .or_else(|| version_after(user_agent, "rv:"));
            return Self::new(BrowserFamily::Ie, major);
        }

        if user_agent.contains("Edge/")
            || user_agent.contains("Edg/")
            || user_agent.contains("OPR/")
            || user_agent.contains("Opera")
        {
            return Self::unknown();
        }

        if let Some(major) = version_after(user_agent, "Firefox/") {
            return Self::new(BrowserFamily::Firefox, Some(major));
        }

        if user_agent.contains("Chrome/") || user_agent.contains("CriOS/") {
            let major = version_after(user_agent, "Chrome/")
                .or_else(|| version_after(user_agent, "CriOS/"));
            return Self::new(BrowserFamily::Chrome, major);
        }

        if user_agent.contains("Safari/") {
            return Self::new(BrowserFamily::Safari, version_after(user_agent, "Version/"));
        }

        Self::unknown()
    }
}

fn version_after(user_agent: &str, marker: &str) -> Option<u32> {
    let rest = &user_agent[user_agent.find(marker)? + marker.len()..];
    let digits: &str = rest
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("");
    digits.parse().ok()
}

/// The three header names CSP has shipped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    Standard,
    XContentSecurityPolicy,
    XWebkitCsp,
}

impl HeaderVariant {
    /// Concrete header name, with the report-only suffix applied to
    /// whichever variant was chosen.
    pub fn header_name(self, report_only: bool) -> HeaderName {
        HeaderName::from_static(match (self, report_only) {
            (HeaderVariant::Standard, false) => constants::HEADER_CSP,
            (HeaderVariant::Standard, true) => constants::HEADER_CSP_REPORT_ONLY,
            (HeaderVariant::XContentSecurityPolicy, false) => constants::HEADER_XCSP,
            (HeaderVariant::XContentSecurityPolicy, true) => constants::HEADER_XCSP_REPORT_ONLY,
            (HeaderVariant::XWebkitCsp, false) => constants::HEADER_WEBKIT,
            (HeaderVariant::XWebkitCsp, true) => constants::HEADER_WEBKIT_REPORT_ONLY,
        })
    }
}

/// Serializer preprocessing variant selected per browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTransform {
    Standard,
    FirefoxLegacy,
    Firefox4Legacy,
    IeSandboxOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compat {
    pub header: HeaderVariant,
    pub transform: PolicyTransform,
}

struct CompatRule {
    family: BrowserFamily,
    /// Inclusive version range. `None` matches any version, including an
    /// unparseable one.
    versions: Option<(u32, u32)>,
    needs_old_safari: bool,
    header: HeaderVariant,
    transform: PolicyTransform,
}

/// The compatibility matrix. First matching rule wins; no match means the
/// standard header and transform.
const COMPAT_RULES: &[CompatRule] = &[
    CompatRule {
        family: BrowserFamily::Chrome,
        versions: Some((14, 25)),
        needs_old_safari: false,
        header: HeaderVariant::XWebkitCsp,
        transform: PolicyTransform::Standard,
    },
    CompatRule {
        family: BrowserFamily::Firefox,
        versions: Some((4, 4)),
        needs_old_safari: false,
        header: HeaderVariant::XContentSecurityPolicy,
        transform: PolicyTransform::Firefox4Legacy,
    },
    CompatRule {
        family: BrowserFamily::Firefox,
        versions: Some((5, 23)),
        needs_old_safari: false,
        header: HeaderVariant::XContentSecurityPolicy,
        transform: PolicyTransform::FirefoxLegacy,
    },
    CompatRule {
        family: BrowserFamily::Ie,
        versions: None,
        needs_old_safari: false,
        header: HeaderVariant::XContentSecurityPolicy,
        transform: PolicyTransform::IeSandboxOnly,
    },
    CompatRule {
        family: BrowserFamily::Safari,
        versions: Some((6, 6)),
        needs_old_safari: false,
        header: HeaderVariant::XWebkitCsp,
        transform: PolicyTransform::Standard,
    },
    CompatRule {
        family: BrowserFamily::Safari,
        versions: Some((5, 5)),
        needs_old_safari: true,
        header: HeaderVariant::XWebkitCsp,
        transform: PolicyTransform::Standard,
    },
];

/// Pick the header variant and serializer transform for a client.
pub fn resolve(browser: &Browser, options: &PolicyOptions) -> Compat {
    for rule in COMPAT_RULES {
        if rule.family != browser.family {
            continue;
        }

        if let Some((low, high)) = rule.versions {
            match browser.major {
                Some(major) if major >= low && major <= high => {}
                _ => continue,
            }
        }

        if rule.needs_old_safari && !options.old_safari {
            continue;
        }

        return Compat {
            header: rule.header,
            transform: rule.transform,
        };
    }

    Compat {
        header: HeaderVariant::Standard,
        transform: PolicyTransform::Standard,
    }
}
