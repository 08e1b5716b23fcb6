//! Interception view URLs
//!
//! Blocked tabs are sent to
//! `<view>?url=<enc original>&reason=<hardcore|ai&intent=..&title=..>&tabId=<id>`.
//! The view reads the same parameters back to render the block reason and
//! to address its pass-grant message.

use crate::types::{BlockReason, TabId};
use crate::url::{encode_component, query_pairs};

/// Title shown when the blocked page had none.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Build the redirect target for a blocked navigation.
pub fn interception_url(view_base: &str, original_url: &str, reason: &BlockReason, tab_id: TabId) -> String {
    let mut target = String::with_capacity(view_base.len() + original_url.len() * 2 + 64);
    target.push_str(view_base);
    target.push_str("?url=");
    target.push_str(&encode_component(original_url));
    target.push_str("&reason=");
    target.push_str(reason.code());
    if let BlockReason::Ai { intent, title } = reason {
        target.push_str("&intent=");
        target.push_str(&encode_component(intent));
        target.push_str("&title=");
        target.push_str(&encode_component(title));
    }
    target.push_str("&tabId=");
    target.push_str(&tab_id.to_string());
    target
}

/// Whether `url` points at the interception view itself.
#[inline]
pub fn is_interception_url(view_base: &str, url: &str) -> bool {
    !view_base.is_empty() && url.starts_with(view_base)
}

/// Parameters carried by an interception view URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptionRequest {
    pub original_url: String,
    pub reason: BlockReason,
    pub tab_id: Option<TabId>,
}

/// Read the interception parameters back out of a view URL.
pub fn parse_interception_url(url: &str) -> Option<InterceptionRequest> {
    let mut original_url = None;
    let mut reason = None;
    let mut intent = None;
    let mut title = None;
    let mut tab_id = None;

    for (key, value) in query_pairs(url) {
        match key.as_str() {
            "url" => original_url = Some(value),
            "reason" => reason = Some(value),
            "intent" => intent = Some(value),
            "title" => title = Some(value),
            "tabId" => tab_id = value.parse().ok(),
            _ => {}
        }
    }

    let reason = match reason?.as_str() {
        "hardcore" => BlockReason::Hardcore,
        code if code.starts_with("ai") => BlockReason::Ai {
            intent: intent.unwrap_or_default(),
            title: title.unwrap_or_default(),
        },
        _ => return None,
    };

    Some(InterceptionRequest {
        original_url: original_url.filter(|u| !u.is_empty())?,
        reason,
        tab_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: &str = "chrome-extension://focusgate/interception.html";

    #[test]
    fn test_hardcore_url() {
        let target = interception_url(VIEW, "https://example.com/games/chess", &BlockReason::Hardcore, 7);
        assert_eq!(
            target,
            "chrome-extension://focusgate/interception.html?url=https%3A%2F%2Fexample.com%2Fgames%2Fchess&reason=hardcore&tabId=7"
        );
        assert!(is_interception_url(VIEW, &target));
        assert!(!is_interception_url(VIEW, "https://example.com/"));
        assert!(!is_interception_url("", "https://example.com/"));
    }

    #[test]
    fn test_ai_url_roundtrip() {
        let reason = BlockReason::Ai {
            intent: "learn React hooks".to_string(),
            title: "Funny Cat Video - YouTube".to_string(),
        };
        let target = interception_url(VIEW, "https://youtube.com/watch?v=1&t=2", &reason, 3);
        assert!(target.contains("&reason=ai&intent=learn%20React%20hooks&title=Funny%20Cat%20Video%20-%20YouTube&tabId=3"));

        let parsed = parse_interception_url(&target).unwrap();
        assert_eq!(parsed.original_url, "https://youtube.com/watch?v=1&t=2");
        assert_eq!(parsed.reason, reason);
        assert_eq!(parsed.tab_id, Some(3));
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert_eq!(parse_interception_url(&format!("{VIEW}?reason=hardcore")), None);
        assert_eq!(parse_interception_url(&format!("{VIEW}?url=x&reason=other")), None);
        let parsed = parse_interception_url(&format!("{VIEW}?url=https%3A%2F%2Fa.com&reason=hardcore")).unwrap();
        assert_eq!(parsed.tab_id, None);
    }
}
