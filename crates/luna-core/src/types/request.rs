//! Typed view of one inbound request, built once at the framework boundary.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::types::user::UserId;

const PLACEHOLDER_BASE: &str = "http://placeholder.invalid/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Percent-decoded request path, always starting with `/`.
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub current_user: Option<UserId>,
    /// Slug of the page the host resolved this request to, if any.
    pub page_slug: Option<String>,
    /// Request targets the host's administration area.
    pub is_admin: bool,
    pub has_auth_cookie: bool,
}

impl RequestContext {
    /// Parse a request target such as `/ai-constellation-dashboard/?license=...`.
    /// Absolute URLs are accepted too. Unparseable input yields the root path.
    pub fn from_uri(uri: &str) -> Self {
        let mut ctx = Self {
            path: "/".to_string(),
            ..Self::default()
        };
        let Ok(base) = Url::parse(PLACEHOLDER_BASE) else {
            return ctx;
        };
        let Ok(parsed) = base.join(uri) else {
            return ctx;
        };
        ctx.path = percent_decode(parsed.path());
        for (name, value) in parsed.query_pairs() {
            ctx.query.insert(name.into_owned(), value.into_owned());
        }
        ctx
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.current_user = Some(user);
        self.has_auth_cookie = true;
        self
    }

    pub fn with_page_slug(mut self, slug: impl Into<String>) -> Self {
        self.page_slug = Some(slug.into());
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.query.insert(name.to_string(), value.into());
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    /// Path plus re-encoded query, suitable as a redirect target.
    pub fn request_uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

/// Percent-decode a URL path. `&`, `=` and `+` are ordinary path characters.
pub(crate) fn percent_decode(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
