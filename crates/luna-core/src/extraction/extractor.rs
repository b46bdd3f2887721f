use regex::Regex;
use url::Url;

use crate::config::RoutingConfig;
use crate::constants::{PARAM_LIC, PARAM_LICENSE};
use crate::errors::ConfigError;
use crate::licensing::sanitize::sanitize_text_field;
use crate::types::request::percent_decode;
use crate::types::{ExtractionSource, LicenseExtraction, RequestContext};

const PLACEHOLDER_BASE: &str = "http://placeholder.invalid/";

/// Pulls license candidates out of requests and URLs. Built once from the
/// routing config; pure afterwards.
#[derive(Debug, Clone)]
pub struct LicenseExtractor {
    request_path: Regex,
    any_path: Regex,
    console_needles: Vec<String>,
    console_slugs: Vec<String>,
}

impl LicenseExtractor {
    pub fn new(routing: &RoutingConfig) -> Result<Self, ConfigError> {
        let families: Vec<String> = routing
            .console_base_paths
            .iter()
            .chain(std::iter::once(&routing.supercluster_path))
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .collect();
        let request_path = Regex::new(&format!(
            r"(?i)/(?:{})/(?:[^/?#]+/)?(?:license|lic)=([^/?#&]+)",
            families.join("|")
        ))
        .map_err(|e| invalid_pattern(e.to_string()))?;
        let any_path = Regex::new(r"(?i)/(?:license|lic)=([^/?#&]+)")
            .map_err(|e| invalid_pattern(e.to_string()))?;

        Ok(Self {
            request_path,
            any_path,
            console_needles: routing
                .console_base_paths
                .iter()
                .map(|p| p.trim_matches('/').to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            console_slugs: routing.console_page_slugs.clone(),
        })
    }

    /// License carried by the live request.
    pub fn extract(&self, ctx: &RequestContext) -> LicenseExtraction {
        for (param, source) in [
            (PARAM_LICENSE, ExtractionSource::ExplicitParam),
            (PARAM_LIC, ExtractionSource::LegacyParam),
        ] {
            if let Some(value) = ctx.param(param).map(sanitize_text_field) {
                if !value.is_empty() {
                    return LicenseExtraction::new(value, source);
                }
            }
        }

        if let Some(token) = self.capture(&self.request_path, &ctx.path) {
            return LicenseExtraction::new(token, ExtractionSource::PathSegment);
        }

        LicenseExtraction::none()
    }

    /// License carried by an arbitrary URL (a redirect target, say). Same
    /// precedence, but a path segment may sit under any path. Empty when absent.
    pub fn extract_from_url(&self, url: &str) -> String {
        let url = url.trim();
        if url.is_empty() {
            return String::new();
        }
        let Some(parsed) = parse_lenient(url) else {
            return String::new();
        };

        for param in [PARAM_LICENSE, PARAM_LIC] {
            let value = parsed
                .query_pairs()
                .find(|(name, _)| name == param)
                .map(|(_, v)| sanitize_text_field(&v))
                .unwrap_or_default();
            if !value.is_empty() {
                return value;
            }
        }

        let path = percent_decode(parsed.path());
        self.capture(&self.any_path, &path).unwrap_or_default()
    }

    /// Substring match of a console family on the slash-trimmed,
    /// case-folded path of `url`.
    pub fn targets_console(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            return false;
        }
        let path = parse_lenient(url)
            .map(|u| percent_decode(u.path()))
            .unwrap_or_else(|| url.to_string());
        let haystack = path.trim_matches('/').to_lowercase();
        self.console_needles
            .iter()
            .any(|needle| haystack.contains(needle.as_str()))
    }

    /// The request carries a license parameter or points at a console path.
    pub fn is_console_request(&self, ctx: &RequestContext) -> bool {
        let has_param = [PARAM_LICENSE, PARAM_LIC]
            .iter()
            .any(|p| ctx.param(p).is_some_and(|v| !v.is_empty()));
        has_param || self.targets_console(&ctx.path)
    }

    /// The host resolved the request to a console page, or its path targets one.
    pub fn is_console_page(&self, ctx: &RequestContext) -> bool {
        ctx.page_slug
            .as_deref()
            .is_some_and(|slug| self.console_slugs.iter().any(|s| s == slug))
            || self.targets_console(&ctx.path)
    }

    fn capture(&self, pattern: &Regex, haystack: &str) -> Option<String> {
        pattern
            .captures(haystack)
            .and_then(|c| c.get(1))
            .map(|m| sanitize_text_field(m.as_str()))
            .filter(|v| !v.is_empty())
    }
}

fn parse_lenient(url: &str) -> Option<Url> {
    Url::parse(PLACEHOLDER_BASE).ok()?.join(url).ok()
}

fn invalid_pattern(reason: String) -> ConfigError {
    ConfigError::Invalid {
        field: "routing.console_base_paths".to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::key_codec;
    use proptest::prelude::*;

    fn extractor() -> LicenseExtractor {
        LicenseExtractor::new(&RoutingConfig::default()).unwrap()
    }

    #[test]
    fn explicit_param_wins_over_path() {
        let ctx = RequestContext::from_uri("/ai-constellation-dashboard/lic=BBBB/?license=AAAA");
        let got = extractor().extract(&ctx);
        assert_eq!(got, LicenseExtraction::new("AAAA", ExtractionSource::ExplicitParam));
    }

    #[test]
    fn short_param_is_second() {
        let ctx = RequestContext::from_uri("/anything/?lic=VL-AWJJ-8J6S-GD6R");
        let got = extractor().extract(&ctx);
        assert_eq!(got.source, ExtractionSource::LegacyParam);
        assert!(got.needs_normalization());
    }

    #[test]
    fn blank_param_falls_through() {
        let ctx = RequestContext::from_uri("/ai-constellation-console/lic=VL-AWJJ-8J6S-GD6R/?license=%20");
        let got = extractor().extract(&ctx);
        assert_eq!(got, LicenseExtraction::new("VL-AWJJ-8J6S-GD6R", ExtractionSource::PathSegment));
    }

    #[test]
    fn path_segment_under_every_family() {
        let ex = extractor();
        for uri in [
            "/ai-constellation-dashboard/lic=VL-AWJJ-8J6S-GD6R",
            "/ai-constellation-console/acme/license=VL-AWJJ-8J6S-GD6R/",
            "/supercluster-constellation/license=VL-AWJJ-8J6S-GD6R?x=1",
            "/Supercluster-Constellation/home/lic=VL-AWJJ-8J6S-GD6R#top",
        ] {
            let got = ex.extract(&RequestContext::from_uri(uri));
            assert_eq!(got.license, "VL-AWJJ-8J6S-GD6R", "{uri}");
            assert_eq!(got.source, ExtractionSource::PathSegment);
        }
    }

    #[test]
    fn path_segment_elsewhere_is_ignored_for_requests() {
        let got = extractor().extract(&RequestContext::from_uri("/blog/lic=VL-AWJJ-8J6S-GD6R"));
        assert_eq!(got, LicenseExtraction::none());
    }

    #[test]
    fn url_extraction_precedence() {
        let ex = extractor();
        assert_eq!(ex.extract_from_url("https://x.test/?license=A&lic=B"), "A");
        assert_eq!(ex.extract_from_url("https://x.test/?lic=B"), "B");
        assert_eq!(ex.extract_from_url("/any/where/lic=C/"), "C");
        assert_eq!(ex.extract_from_url("https://x.test/"), "");
        assert_eq!(ex.extract_from_url(""), "");
    }

    #[test]
    fn console_targeting() {
        let ex = extractor();
        assert!(ex.targets_console("/AI-Constellation-Dashboard/"));
        assert!(ex.targets_console("https://x.test/ai-constellation-console?license=1"));
        assert!(!ex.targets_console("/supercluster-login/"));
        assert!(!ex.targets_console(""));
        assert!(ex.targets_console("/x&y/ai-constellation-dashboard/"));
        assert!(ex.targets_console("https://x.test/a%26b=c/ai-constellation-console/"));
    }

    #[test]
    fn reserved_characters_do_not_truncate_url_paths() {
        let ex = extractor();
        assert_eq!(ex.extract_from_url("/a&b/lic=VL-AWJJ-8J6S-GD6R/"), "VL-AWJJ-8J6S-GD6R");
        assert_eq!(ex.extract_from_url("https://x.test/k=v/license=C"), "C");
        let ctx = RequestContext::from_uri("/p&q/ai-constellation-dashboard/lic=D/");
        assert_eq!(ex.extract(&ctx), LicenseExtraction::new("D", ExtractionSource::PathSegment));
    }

    #[test]
    fn console_request_and_page() {
        let ex = extractor();
        assert!(ex.is_console_request(&RequestContext::from_uri("/?lic=x")));
        assert!(!ex.is_console_request(&RequestContext::from_uri("/about/")));
        assert!(ex.is_console_page(&RequestContext::from_uri("/p").with_page_slug("ai-constellation-console")));
        assert!(!ex.is_console_page(&RequestContext::from_uri("/?license=x")));
    }

    proptest! {
        #[test]
        fn dashboard_url_round_trips(seed in any::<[u8; 32]>()) {
            use rand::SeedableRng;
            let mut rng = rand::rngs::StdRng::from_seed(seed);
            let key = key_codec::generate_with(&mut rng);
            let routing = RoutingConfig::default();
            let url = key_codec::dashboard_url(&routing.dashboard_base_url, &key);
            prop_assert_eq!(extractor().extract_from_url(&url), key);
        }

        #[test]
        fn explicit_param_always_wins(a in "[A-Z0-9-]{1,20}", b in "[A-Z0-9-]{1,20}") {
            let uri = format!("/ai-constellation-dashboard/lic={b}/?license={a}");
            let got = extractor().extract(&RequestContext::from_uri(&uri));
            prop_assert_eq!(got.license, a);
            prop_assert_eq!(got.source, ExtractionSource::ExplicitParam);
        }
    }
}
