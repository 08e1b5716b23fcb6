//! Path-fragment rule matching
//!
//! A URL is blocked iff it contains any rule's path fragment as a substring.
//! Groups only organize rules for display.

use crate::types::{is_unclassified, Mode, Rule, RuleGroup, UNCLASSIFIED_GROUP};

/// Error type for rule book edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Rule label must not be empty")]
    EmptyLabel,
    #[error("Rule path must not be empty")]
    EmptyPath,
    #[error("Rule path must not contain whitespace: {0:?}")]
    Whitespace(String),
    #[error("Rule path does not look like a site path: {0:?}")]
    NotASitePath(String),
    #[error("Rule path already exists: {0}")]
    Duplicate(String),
    #[error("No unclassified rule with path: {0}")]
    NotFound(String),
    #[error("Rules cannot be moved into the unclassified group")]
    InvalidTarget,
}

// =============================================================================
// Matching
// =============================================================================

/// Whether any rule in any group matches `url`.
#[inline]
pub fn is_blocked(url: &str, groups: &[RuleGroup]) -> bool {
    matching_rule(url, groups).is_some()
}

/// Rule check as applied in `mode`. AI mode never consults rules.
pub fn is_blocked_in(mode: Mode, url: &str, groups: &[RuleGroup]) -> bool {
    mode != Mode::Ai && is_blocked(url, groups)
}

/// First rule whose path fragment is contained in `url`.
pub fn matching_rule<'a>(url: &str, groups: &'a [RuleGroup]) -> Option<&'a Rule> {
    groups
        .iter()
        .flat_map(|group| group.rules.iter())
        .find(|rule| !rule.path_fragment.is_empty() && url.contains(rule.path_fragment.as_str()))
}

// =============================================================================
// Rule Book
// =============================================================================

/// Normalize user input into a rule path fragment.
///
/// Strips `http(s)://`, a leading `www.` and one trailing `/`.
pub fn normalize_rule_path(input: &str) -> Result<String, RuleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RuleError::EmptyPath);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(RuleError::Whitespace(trimmed.to_string()));
    }
    if !trimmed.contains('.') {
        return Err(RuleError::NotASitePath(trimmed.to_string()));
    }

    let mut path = trimmed;
    for scheme in ["https://", "http://"] {
        if path.get(..scheme.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme)) {
            path = &path[scheme.len()..];
            break;
        }
    }
    if let Some(rest) = path.strip_prefix("www.") {
        path = rest;
    }
    if let Some(rest) = path.strip_suffix('/') {
        path = rest;
    }

    if path.is_empty() {
        return Err(RuleError::EmptyPath);
    }
    Ok(path.to_string())
}

/// Add a rule to `group_name` (or the unclassified group), creating the
/// group if needed. Returns the stored path fragment.
pub fn add_rule(
    groups: &mut Vec<RuleGroup>,
    group_name: Option<&str>,
    label: &str,
    raw_path: &str,
) -> Result<String, RuleError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(RuleError::EmptyLabel);
    }
    let path = normalize_rule_path(raw_path)?;

    if groups.iter().any(|g| g.rules.iter().any(|r| r.path_fragment == path)) {
        return Err(RuleError::Duplicate(path));
    }

    let group_name = group_name.map(str::trim).filter(|name| !name.is_empty());

    let rule = Rule {
        label: label.to_string(),
        path_fragment: path.clone(),
    };
    let existing = groups.iter_mut().find(|g| match group_name {
        Some(name) => g.name == name,
        None => is_unclassified(&g.name),
    });
    let stored_in = match existing {
        Some(group) => {
            group.rules.push(rule);
            group.name.clone()
        }
        None => {
            let name = group_name.unwrap_or(UNCLASSIFIED_GROUP).to_string();
            groups.push(RuleGroup {
                name: name.clone(),
                rules: vec![rule],
            });
            name
        }
    };

    log::info!("Added rule {:?} -> {} (group {})", label, path, stored_in);
    Ok(path)
}

/// Move an unclassified rule into `new_group` (matched case-insensitively,
/// created if missing). The unclassified group is dropped once empty.
pub fn reclassify(groups: &mut Vec<RuleGroup>, path: &str, new_group: &str) -> Result<(), RuleError> {
    let target = new_group.trim();
    if target.is_empty() || is_unclassified(target) {
        return Err(RuleError::InvalidTarget);
    }

    let (group_index, rule_index) = groups
        .iter()
        .enumerate()
        .filter(|(_, g)| is_unclassified(&g.name))
        .find_map(|(gi, g)| g.rules.iter().position(|r| r.path_fragment == path).map(|ri| (gi, ri)))
        .ok_or_else(|| RuleError::NotFound(path.to_string()))?;
    let rule = groups[group_index].rules.remove(rule_index);

    if groups[group_index].rules.is_empty() {
        groups.remove(group_index);
    }

    match groups.iter_mut().find(|g| g.name.eq_ignore_ascii_case(target)) {
        Some(group) => group.rules.push(rule),
        None => groups.push(RuleGroup {
            name: target.to_string(),
            rules: vec![rule],
        }),
    }
    Ok(())
}

/// Groups and their rules ordered by name, for display.
pub fn sorted_view(groups: &[RuleGroup]) -> Vec<RuleGroup> {
    let mut view = groups.to_vec();
    view.sort_by(|a, b| a.name.cmp(&b.name));
    for group in &mut view {
        group.rules.sort_by(|a, b| a.label.cmp(&b.label));
    }
    view
}

/// Total number of rules across all groups.
pub fn rule_count(groups: &[RuleGroup]) -> usize {
    groups.iter().map(|g| g.rules.len()).sum()
}
