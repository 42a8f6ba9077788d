//! External trigger plumbing: token extraction, token comparison and the
//! cron command shown to operators using an external scheduler.

use crate::schedule::CHECK_HOOK;

/// Query parameter carrying the security key.
pub const TOKEN_PARAM: &str = "key";

/// Parameter name accepted from older trigger URLs.
pub const LEGACY_TOKEN_PARAM: &str = "puw_key";

/// Extract the security key from a trigger URL.
///
/// Accepts an absolute URL, a path with query (`/?key=...`) or a bare query
/// string (`key=...`).
pub fn token_from_url(input: &str) -> Option<String> {
    let input = input.trim();
    let parsed = url::Url::parse(input).or_else(|_| {
        let base = url::Url::parse("http://localhost/")?;
        if input.contains('?') || input.starts_with('/') {
            base.join(input)
        } else {
            base.join(&format!("?{input}"))
        }
    });
    let parsed = match parsed {
        Ok(url) => url,
        Err(e) => {
            log::debug!("Unparseable trigger URL: {}", e);
            return None;
        }
    };

    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    [TOKEN_PARAM, LEGACY_TOKEN_PARAM].iter().find_map(|name| {
        pairs
            .iter()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.clone())
    })
}

/// Compare two tokens in time independent of where they first differ.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Shell command an external scheduler should run to trigger a check.
pub fn external_trigger_command(base_url: &str, security_key: &str) -> String {
    format!(
        "wget -q \"{}?action={}&{}={}\" -O /dev/null",
        base_url.trim_end_matches('?'),
        CHECK_HOOK,
        TOKEN_PARAM,
        security_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_full_url() {
        assert_eq!(
            token_from_url("https://example.com/?action=update_watcher_check&key=abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_token_from_query_and_legacy_name() {
        assert_eq!(token_from_url("puw_key=old").as_deref(), Some("old"));
        assert_eq!(token_from_url("/?key=new&puw_key=old").as_deref(), Some("new"));
        assert_eq!(token_from_url("https://example.com/?key="), None);
        assert_eq!(token_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "ab"));
        assert!(!tokens_match("abc", ""));
    }

    #[test]
    fn test_external_command() {
        assert_eq!(
            external_trigger_command("https://example.com/", "k1"),
            "wget -q \"https://example.com/?action=update_watcher_check&key=k1\" -O /dev/null"
        );
    }
}
