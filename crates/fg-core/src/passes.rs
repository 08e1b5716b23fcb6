//! Whitelist and pass bookkeeping
//!
//! Key policy:
//! - permanent whitelist entries are domains (`www.` stripped, lowercased)
//! - temporary passes and one-shot passes are keyed by the full URL
//!
//! Expired temporary passes are never swept automatically; they simply stop
//! matching once `now >= expiry`.

use crate::types::{PassDuration, Settings};
use crate::url::domain_of;

/// Temporary pass lifetime for [`PassDuration::Hour`].
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Why a URL was let through by stored pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMatch {
    Whitelisted,
    TemporaryPass { expires_at: i64 },
}

/// Key used for the permanent whitelist: the URL's domain, or the trimmed
/// input itself when it has no recognizable host (e.g. a bare domain).
pub fn permanent_key(url: &str) -> String {
    domain_of(url).unwrap_or_else(|| {
        let bare = url.trim().to_ascii_lowercase();
        bare.strip_prefix("www.").map(str::to_string).unwrap_or(bare)
    })
}

/// Look up whitelist/temporary pass state for `url` at `now`.
pub fn check_pass(settings: &Settings, url: &str, now: i64) -> Option<PassMatch> {
    if let Some(domain) = domain_of(url) {
        if settings.permanent_whitelist.contains(&domain) {
            return Some(PassMatch::Whitelisted);
        }
    }

    match settings.temporary_passes.get(url) {
        Some(&expires_at) if now < expires_at => Some(PassMatch::TemporaryPass { expires_at }),
        _ => None,
    }
}

/// Apply a durable grant (`hour`, `today`, `permanent`) to `settings`.
///
/// Returns false for [`PassDuration::Once`], which lives in the session store
/// instead.
pub fn apply_grant(settings: &mut Settings, url: &str, duration: PassDuration, now: i64, end_of_day: i64) -> bool {
    match duration {
        PassDuration::Once => false,
        PassDuration::Hour => {
            settings.temporary_passes.insert(url.to_string(), now + HOUR_MS);
            true
        }
        PassDuration::Today => {
            settings.temporary_passes.insert(url.to_string(), end_of_day);
            true
        }
        PassDuration::Permanent => {
            settings.permanent_whitelist.insert(permanent_key(url));
            true
        }
    }
}

/// Drop temporary passes that are no longer valid at `now`.
/// Returns the number removed.
pub fn purge_expired(settings: &mut Settings, now: i64) -> usize {
    let before = settings.temporary_passes.len();
    settings.temporary_passes.retain(|_, &mut expires_at| now < expires_at);
    before - settings.temporary_passes.len()
}

/// Remove every permanent whitelist entry. Returns the number removed.
pub fn clear_whitelist(settings: &mut Settings) -> usize {
    let removed = settings.permanent_whitelist.len();
    settings.permanent_whitelist.clear();
    removed
}

/// Remove every temporary pass. Returns the number removed.
pub fn clear_temporary_passes(settings: &mut Settings) -> usize {
    let removed = settings.temporary_passes.len();
    settings.temporary_passes.clear();
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_permanent_key() {
        assert_eq!(permanent_key("https://www.YouTube.com/watch?v=1"), "youtube.com");
        assert_eq!(permanent_key("www.example.com"), "example.com");
    }

    #[test]
    fn test_whitelist_matches_by_domain() {
        let mut settings = Settings::default();
        settings.permanent_whitelist.insert("docs.rs".to_string());
        assert_eq!(
            check_pass(&settings, "https://docs.rs/tokio/latest", NOW),
            Some(PassMatch::Whitelisted)
        );
        assert_eq!(check_pass(&settings, "https://www.docs.rs/", NOW), Some(PassMatch::Whitelisted));
        assert_eq!(check_pass(&settings, "https://crates.io/", NOW), None);
    }

    #[test]
    fn test_temporary_pass_by_full_url_and_expiry() {
        let mut settings = Settings::default();
        let url = "https://news.example.com/today";
        settings.temporary_passes.insert(url.to_string(), NOW + 10);

        assert_eq!(
            check_pass(&settings, url, NOW),
            Some(PassMatch::TemporaryPass { expires_at: NOW + 10 })
        );
        assert_eq!(check_pass(&settings, url, NOW + 10), None);
        assert_eq!(check_pass(&settings, "https://news.example.com/other", NOW), None);
    }

    #[test]
    fn test_apply_grant() {
        let mut settings = Settings::default();
        let url = "https://www.example.com/page";

        assert!(!apply_grant(&mut settings, url, PassDuration::Once, NOW, NOW));
        assert!(settings.temporary_passes.is_empty());

        assert!(apply_grant(&mut settings, url, PassDuration::Hour, NOW, NOW + 5));
        assert_eq!(settings.temporary_passes[url], NOW + HOUR_MS);

        assert!(apply_grant(&mut settings, url, PassDuration::Today, NOW, NOW + 5));
        assert_eq!(settings.temporary_passes[url], NOW + 5);

        assert!(apply_grant(&mut settings, url, PassDuration::Permanent, NOW, NOW));
        assert!(apply_grant(&mut settings, url, PassDuration::Permanent, NOW, NOW));
        assert_eq!(settings.permanent_whitelist.len(), 1);
        assert!(settings.permanent_whitelist.contains("example.com"));
    }

    #[test]
    fn test_purge_and_clear() {
        let mut settings = Settings::default();
        settings.temporary_passes.insert("https://a.com/".to_string(), NOW - 1);
        settings.temporary_passes.insert("https://b.com/".to_string(), NOW + 1);
        settings.permanent_whitelist.insert("c.com".to_string());

        assert_eq!(purge_expired(&mut settings, NOW), 1);
        assert!(settings.temporary_passes.contains_key("https://b.com/"));
        assert_eq!(clear_temporary_passes(&mut settings), 1);
        assert_eq!(clear_whitelist(&mut settings), 1);
        assert!(settings.permanent_whitelist.is_empty());
    }
}
