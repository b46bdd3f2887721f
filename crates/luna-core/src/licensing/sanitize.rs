//! Input cleaning compatible with what the host stores.
//!
//! Every function returns an empty string for input it cannot salvage.

use url::Url;

const EMAIL_LOCAL_EXTRA: &str = "!#$%&'*+/=?^_`{|}~.-";

/// Strip tags and control characters, collapse whitespace, trim.
pub fn sanitize_text_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_whitespace() => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate an email address the way the host does: one `@`, a local part of
/// permitted characters, and a dotted domain of alphanumerics and hyphens.
pub fn is_email(raw: &str) -> bool {
    if raw.len() < 6 {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_EXTRA.contains(c))
    {
        return false;
    }
    if domain.contains("..") || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Drop disallowed characters, then validate. Empty when invalid.
pub fn sanitize_email(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some((local, domain)) = trimmed.rsplit_once('@') else {
        return String::new();
    };
    let local: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_EXTRA.contains(*c))
        .collect();
    let domain: String = domain
        .split('.')
        .map(|label| {
            label
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
                .trim_matches('-')
                .to_string()
        })
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    let candidate = format!("{local}@{domain}");
    if is_email(&candidate) {
        candidate
    } else {
        String::new()
    }
}

/// Username cleaning. `strict` keeps only ASCII alphanumerics and ` _.-@`.
pub fn sanitize_user(raw: &str, strict: bool) -> String {
    let text = sanitize_text_field(raw);
    let kept: String = text
        .chars()
        .filter(|c| {
            if strict {
                c.is_ascii_alphanumeric() || " _.-@".contains(*c)
            } else {
                !c.is_control()
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep http(s) URLs only. A bare domain gets `http://` prepended.
pub fn esc_url_raw(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            candidate
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_strips_tags_and_whitespace() {
        assert_eq!(sanitize_text_field("  <b>Acme</b>\n Corp\t "), "Acme Corp");
        assert_eq!(sanitize_text_field(" VL-AWJJ-8J6S-GD6R "), "VL-AWJJ-8J6S-GD6R");
    }

    #[test]
    fn email_validation() {
        assert!(is_email("client@example.com"));
        assert!(!is_email("client@example"));
        assert!(!is_email("client.example.com"));
        assert!(!is_email("a@b@c.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn email_sanitize_returns_empty_when_invalid() {
        assert_eq!(sanitize_email(" Client@Example.com "), "Client@Example.com");
        assert_eq!(sanitize_email("cli ent@exa mple.com"), "client@example.com");
        assert_eq!(sanitize_email("not-an-email"), "");
    }

    #[test]
    fn strict_username() {
        assert_eq!(sanitize_user("siteassembly", true), "siteassembly");
        assert_eq!(sanitize_user("acmé!", true), "acm");
        assert_eq!(sanitize_user("<i>x</i>", true), "x");
    }

    #[test]
    fn url_cleaning() {
        assert_eq!(esc_url_raw("https://visiblelight.ai"), "https://visiblelight.ai");
        assert_eq!(esc_url_raw("siteassembly.com"), "http://siteassembly.com");
        assert_eq!(esc_url_raw("javascript:alert(1)"), "");
        assert_eq!(esc_url_raw(""), "");
    }
}
