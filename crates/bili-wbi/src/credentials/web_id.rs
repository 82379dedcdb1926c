//! Extracts the per-actor web id from a profile page.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CredentialKind, WbiError};

static RENDER_DATA_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]*\bid="__RENDER_DATA__"[^>]*>([^<]*)</script>"#).unwrap()
});

#[derive(Debug, Deserialize)]
struct RenderData {
    access_id: String,
}

/// Extracts the web id (`access_id`) from a profile page.
///
/// The page embeds a percent-encoded JSON blob in the `__RENDER_DATA__`
/// script element.
pub fn extract_web_id(html: &str) -> Result<String, WbiError> {
    let raw = RENDER_DATA_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| {
            WbiError::credential(CredentialKind::WebId, "missing __RENDER_DATA__ block")
        })?;

    let decoded = urlencoding::decode(raw)
        .map_err(|e| WbiError::credential(CredentialKind::WebId, e))?;
    let data: RenderData = serde_json::from_str(&decoded)
        .map_err(|e| WbiError::credential(CredentialKind::WebId, e))?;

    if data.access_id.is_empty() {
        return Err(WbiError::credential(CredentialKind::WebId, "empty access_id"));
    }
    Ok(data.access_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_web_id() {
        let html = r#"
        <html><head>
        <script id="__RENDER_DATA__" type="application/json">%7B%22access_id%22%3A%22abc.def-123%22%2C%22other%22%3A1%7D</script>
        </head><body></body></html>
        "#;
        assert_eq!(extract_web_id(html).unwrap(), "abc.def-123");
    }

    #[test]
    fn test_extract_web_id_attribute_order() {
        let html = r#"<script type="application/json" id="__RENDER_DATA__">
            %7B%22access_id%22%3A%22xyz%22%7D
        </script>"#;
        assert_eq!(extract_web_id(html).unwrap(), "xyz");
    }

    #[test]
    fn test_missing_block() {
        let err = extract_web_id("<html><body>nothing here</body></html>").unwrap_err();
        assert!(matches!(
            err,
            WbiError::CredentialFetch {
                kind: CredentialKind::WebId,
                ..
            }
        ));
    }

    #[test]
    fn test_unparsable_block() {
        let html = r#"<script id="__RENDER_DATA__">not-json</script>"#;
        assert!(extract_web_id(html).is_err());

        let html = r#"<script id="__RENDER_DATA__">%7B%22other%22%3A1%7D</script>"#;
        assert!(extract_web_id(html).is_err());
    }
}
