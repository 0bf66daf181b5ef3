//! Content-Security-Policy builder.
//!
//! # Responsibilities
//! - Hold the fixed base allow-lists
//! - Merge per-resource-type external domains from configuration
//! - Render the header value, optionally with a per-request nonce
//!
//! # Design Decisions
//! - Built once at startup and shared read-only behind an `Arc`
//! - Source lists keep insertion order and drop duplicates
//! - An empty source list renders as `'none'`

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::CspConfig;

/// Directives the gateway emits, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directive {
    DefaultSrc,
    BaseUri,
    ConnectSrc,
    FontSrc,
    FormAction,
    FrameAncestors,
    ImgSrc,
    ObjectSrc,
    ScriptSrc,
    ScriptSrcAttr,
    StyleSrc,
    WorkerSrc,
    UpgradeInsecureRequests,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::DefaultSrc => "default-src",
            Directive::BaseUri => "base-uri",
            Directive::ConnectSrc => "connect-src",
            Directive::FontSrc => "font-src",
            Directive::FormAction => "form-action",
            Directive::FrameAncestors => "frame-ancestors",
            Directive::ImgSrc => "img-src",
            Directive::ObjectSrc => "object-src",
            Directive::ScriptSrc => "script-src",
            Directive::ScriptSrcAttr => "script-src-attr",
            Directive::StyleSrc => "style-src",
            Directive::WorkerSrc => "worker-src",
            Directive::UpgradeInsecureRequests => "upgrade-insecure-requests",
        }
    }

    /// Directives that take no source list.
    fn is_flag(&self) -> bool {
        matches!(self, Directive::UpgradeInsecureRequests)
    }
}

pub const SELF: &str = "'self'";
pub const NONE: &str = "'none'";
pub const UNSAFE_INLINE: &str = "'unsafe-inline'";

/// Immutable directive table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: BTreeMap<Directive, Vec<String>>,
}

impl ContentSecurityPolicy {
    pub fn builder() -> CspBuilder {
        CspBuilder::default()
    }

    /// Fixed base merged with the configured external domains.
    pub fn from_config(config: &CspConfig) -> Self {
        let mut builder = Self::builder()
            .sources(Directive::DefaultSrc, [SELF])
            .sources(Directive::BaseUri, [SELF])
            .sources(Directive::FormAction, [SELF])
            .sources(Directive::FrameAncestors, [SELF])
            .sources(Directive::ConnectSrc, [SELF])
            .sources(Directive::ConnectSrc, &config.connect_src)
            .sources(Directive::FontSrc, [SELF])
            .sources(Directive::FontSrc, &config.font_src)
            .sources(Directive::ImgSrc, [SELF, "blob:", "data:"])
            .sources(Directive::ImgSrc, &config.img_src)
            .empty(Directive::ObjectSrc)
            .sources(Directive::ScriptSrc, [SELF, UNSAFE_INLINE])
            .sources(Directive::ScriptSrc, &config.script_src)
            .empty(Directive::ScriptSrcAttr)
            .sources(Directive::StyleSrc, [SELF, UNSAFE_INLINE])
            .sources(Directive::StyleSrc, &config.style_src)
            .sources(Directive::WorkerSrc, [SELF, "blob:"])
            .sources(Directive::WorkerSrc, &config.worker_src);

        if config.upgrade_insecure_requests {
            builder = builder.flag(Directive::UpgradeInsecureRequests);
        }
        builder.build()
    }

    pub fn sources(&self, directive: Directive) -> Option<&[String]> {
        self.directives.get(&directive).map(Vec::as_slice)
    }

    /// Render the header value. A nonce, when given, is appended to `script-src`.
    pub fn render(&self, nonce: Option<&str>) -> String {
        let mut out = String::new();
        for (directive, sources) in &self.directives {
            if !out.is_empty() {
                out.push(';');
            }
            out.push_str(directive.as_str());

            if directive.is_flag() {
                continue;
            }

            let nonce = nonce.filter(|_| *directive == Directive::ScriptSrc);
            if sources.is_empty() && nonce.is_none() {
                out.push(' ');
                out.push_str(NONE);
                continue;
            }
            for source in sources {
                out.push(' ');
                out.push_str(source);
            }
            if let Some(nonce) = nonce {
                let _ = write!(out, " 'nonce-{nonce}'");
            }
        }
        out
    }
}

/// Accumulates directives for a [`ContentSecurityPolicy`].
#[derive(Debug, Default)]
pub struct CspBuilder {
    directives: BTreeMap<Directive, Vec<String>>,
}

impl CspBuilder {
    /// Append sources to a directive, skipping ones already present.
    pub fn sources<I, S>(mut self, directive: Directive, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.directives.entry(directive).or_default();
        for source in sources {
            let source = source.as_ref().trim();
            if !source.is_empty() && !list.iter().any(|s| s == source) {
                list.push(source.to_string());
            }
        }
        self
    }

    /// Declare a directive with no allowed sources.
    pub fn empty(mut self, directive: Directive) -> Self {
        self.directives.entry(directive).or_default();
        self
    }

    pub fn flag(self, directive: Directive) -> Self {
        self.empty(directive)
    }

    pub fn build(self) -> ContentSecurityPolicy {
        ContentSecurityPolicy {
            directives: self.directives,
        }
    }
}
