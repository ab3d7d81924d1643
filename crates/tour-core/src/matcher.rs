//! Targeting predicates.
//!
//! Each predicate answers one question about the current page evaluation.
//! They never fail: a bad URL pattern counts as "no match" and a bad selector
//! counts as "match", both logged.

use crate::context::MatchContext;
use crate::error::{Result, TourError};
use crate::state::TourStateStore;
use crate::storage::HostPage;
use crate::targeting::{TourFrequency, TourTargeting, UrlPattern, UserTargeting};
use crate::types::{PatternType, UrlMode};
use regex::Regex;

// ---------------------------------------------------------------------------
// URL patterns
// ---------------------------------------------------------------------------

/// Translate a wildcard pattern into an anchored regex: `*` is any run of
/// characters, `?` exactly one, everything else literal.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

fn compile(pattern: &str, source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| TourError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Strict form of [`match_url_pattern`] that surfaces pattern errors.
pub fn try_match_url_pattern(url: &str, pattern: &UrlPattern) -> Result<bool> {
    let value = pattern.value.as_str();
    Ok(match pattern.pattern_type {
        PatternType::Exact => url == value,
        PatternType::Contains => url.contains(value),
        PatternType::StartsWith => url.starts_with(value),
        PatternType::EndsWith => url.ends_with(value),
        PatternType::Wildcard => compile(value, &wildcard_to_regex(value))?.is_match(url),
        PatternType::Regex => compile(value, value)?.is_match(url),
    })
}

pub fn match_url_pattern(url: &str, pattern: &UrlPattern) -> bool {
    try_match_url_pattern(url, pattern).unwrap_or_else(|e| {
        tracing::warn!(error = %e, kind = %pattern.pattern_type, "url pattern failed, treating as no match");
        false
    })
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub fn matches_url_targeting(targeting: Option<&TourTargeting>, url: &str) -> bool {
    let Some(url_targeting) = targeting.and_then(|t| t.url_targeting.as_ref()) else {
        return true;
    };
    if url_targeting.mode == UrlMode::All || url_targeting.patterns.is_empty() {
        return true;
    }
    // Evaluate every pattern so each bad one gets logged.
    let any = url_targeting
        .patterns
        .iter()
        .fold(false, |acc, p| match_url_pattern(url, p) || acc);
    match url_targeting.mode {
        UrlMode::Whitelist => any,
        UrlMode::Blacklist => !any,
        UrlMode::All => true,
    }
}

pub fn matches_user_targeting(
    targeting: Option<&TourTargeting>,
    context: &MatchContext,
    store: &TourStateStore,
    default_new_user_days: f64,
) -> bool {
    let Some(user) = targeting.and_then(|t| t.user_targeting.as_ref()) else {
        return true;
    };
    match user {
        UserTargeting::All => true,
        UserTargeting::NewUsers { new_user_days } => {
            context.days_since_first_visit <= new_user_days.unwrap_or(default_new_user_days)
        }
        UserTargeting::Returning => context.user_visit_count > 1,
        // The reference tour is always checked with `once` semantics, whatever
        // frequency it is configured with.
        UserTargeting::NotCompleted { reference_tour_id } => match reference_tour_id {
            Some(id) if !id.is_empty() => !store.has_seen_tour(id, &TourFrequency::Once),
            _ => true,
        },
    }
}

pub fn matches_device_targeting(targeting: Option<&TourTargeting>, context: &MatchContext) -> bool {
    match targeting {
        Some(t) if !t.devices.is_empty() => t.devices.contains(&context.device),
        _ => true,
    }
}

pub fn matches_element_targeting(targeting: Option<&TourTargeting>, page: &dyn HostPage) -> bool {
    let Some(selector) = targeting
        .and_then(|t| t.element_targeting.as_ref())
        .map(|e| e.selector.as_str())
        .filter(|s| !s.is_empty())
    else {
        return true;
    };
    match page.query_selector(selector) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "element targeting selector failed, allowing tour");
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
