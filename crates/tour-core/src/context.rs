use crate::config::ViewportConfig;
use crate::error::Result;
use crate::paths::StorageKeys;
use crate::state::MS_PER_DAY;
use crate::storage::{HostPage, Storage};
use crate::types::Device;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MatchContext
// ---------------------------------------------------------------------------

/// Runtime signals for one page evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchContext {
    pub url: String,
    pub user_visit_count: u64,
    pub days_since_first_visit: f64,
    pub device: Device,
}

impl MatchContext {
    pub fn new(url: impl Into<String>, device: Device) -> Self {
        Self {
            url: url.into(),
            user_visit_count: 1,
            days_since_first_visit: 0.0,
            device,
        }
    }
}

// ---------------------------------------------------------------------------
// Visit tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisitStats {
    pub visit_count: u64,
    pub days_since_first_visit: f64,
}

impl Default for VisitStats {
    fn default() -> Self {
        Self {
            visit_count: 1,
            days_since_first_visit: 0.0,
        }
    }
}

/// Bump the persisted visit counter and read the first-visit age, writing the
/// first-visit timestamp if this is the first call ever.
///
/// Every call counts, so this counts page evaluations, not sessions.
pub fn track_visit(local: &dyn Storage, keys: &StorageKeys, now_ms: i64) -> Result<VisitStats> {
    let first_key = keys.first_visit();
    let first_visit = match local.get(&first_key)? {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(ts) => ts,
            Err(_) => {
                tracing::warn!(value = %raw, "first visit timestamp unreadable, resetting");
                local.set(&first_key, &now_ms.to_string())?;
                now_ms
            }
        },
        None => {
            local.set(&first_key, &now_ms.to_string())?;
            now_ms
        }
    };

    let count_key = keys.visit_count();
    let previous = local
        .get(&count_key)?
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let visit_count = previous.saturating_add(1);
    local.set(&count_key, &visit_count.to_string())?;

    let days_since_first_visit =
        (now_ms.saturating_sub(first_visit) as f64 / MS_PER_DAY as f64).max(0.0);
    Ok(VisitStats {
        visit_count,
        days_since_first_visit,
    })
}

/// Compute the context for the current page. Storage failures fall back to a
/// first-visit context rather than failing.
pub fn compute_context(
    page: &dyn HostPage,
    local: &dyn Storage,
    keys: &StorageKeys,
    viewport: &ViewportConfig,
    now_ms: i64,
) -> MatchContext {
    let stats = track_visit(local, keys, now_ms).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "visit tracking unavailable, assuming first visit");
        VisitStats::default()
    });
    let context = MatchContext {
        url: page.url(),
        user_visit_count: stats.visit_count,
        days_since_first_visit: stats.days_since_first_visit,
        device: viewport.device_for_width(page.viewport_width()),
    };
    tracing::debug!(
        url = %context.url,
        visits = context.user_visit_count,
        days = context.days_since_first_visit,
        device = %context.device,
        "computed match context"
    );
    context
}
