use crate::paths::StorageKeys;
use crate::storage::{Clock, Storage};
use crate::targeting::TourFrequency;
use crate::types::TourStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const MS_PER_DAY: i64 = 86_400_000;

const SEEN_FLAG: &str = "true";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepHistoryEntry {
    pub step_id: String,
    pub viewed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

// ---------------------------------------------------------------------------
// TourUserState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourUserState {
    #[serde(default)]
    pub status: TourStatus,
    #[serde(default)]
    pub current_step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<i64>,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<i64>,
    #[serde(default)]
    pub step_history: Vec<StepHistoryEntry>,
}

impl TourUserState {
    pub fn has_viewed_step(&self, step_id: &str) -> bool {
        self.step_history.iter().any(|s| s.step_id == step_id)
    }

    /// Share of `total_steps` that appear in the step history, in `[0, 1]`.
    pub fn progress(&self, total_steps: usize) -> f64 {
        if total_steps == 0 {
            return 0.0;
        }
        (self.step_history.len() as f64 / total_steps as f64).min(1.0)
    }

    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn apply(&mut self, patch: TourStatePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(step) = patch.current_step {
            self.current_step = step;
        }
        if let Some(ts) = patch.started_at {
            self.started_at = Some(ts);
        }
        if let Some(ts) = patch.completed_at {
            self.completed_at = Some(ts);
        }
        if let Some(ts) = patch.dismissed_at {
            self.dismissed_at = Some(ts);
        }
        if let Some(count) = patch.view_count {
            self.view_count = count;
        }
        if let Some(ts) = patch.last_viewed_at {
            self.last_viewed_at = Some(ts);
        }
        if let Some(history) = patch.step_history {
            self.step_history = history;
        }
    }
}

/// A partial update for [`TourStateStore::set_tour_state`]. Unset fields keep
/// their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourStatePatch {
    pub status: Option<TourStatus>,
    pub current_step: Option<usize>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub dismissed_at: Option<i64>,
    pub view_count: Option<u32>,
    pub last_viewed_at: Option<i64>,
    pub step_history: Option<Vec<StepHistoryEntry>>,
}

// ---------------------------------------------------------------------------
// AllTourStates
// ---------------------------------------------------------------------------

/// Every tour's state for one visitor, stored as a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllTourStates {
    pub tours: BTreeMap<String, TourUserState>,
}

impl AllTourStates {
    pub fn get(&self, tour_id: &str) -> Option<&TourUserState> {
        self.tours.get(tour_id)
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tours
            .values()
            .filter(|s| s.status == TourStatus::Completed)
            .count()
    }
}

// ---------------------------------------------------------------------------
// TourStateStore
// ---------------------------------------------------------------------------

/// Per-visitor tour progress over a durable store and a session store.
///
/// Nothing here returns an error: unreadable or corrupt storage reads as "no
/// history" and failed writes are logged and dropped, so a storage problem
/// never breaks the host page.
#[derive(Clone)]
pub struct TourStateStore {
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    keys: StorageKeys,
}

impl TourStateStore {
    pub fn new(
        local: Arc<dyn Storage>,
        session: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        keys: StorageKeys,
    ) -> Self {
        Self {
            local,
            session,
            clock,
            keys,
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub(crate) fn local(&self) -> &dyn Storage {
        self.local.as_ref()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_all_tour_states(&self) -> AllTourStates {
        let key = self.keys.states();
        let raw = match self.local.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return AllTourStates::default(),
            Err(e) => {
                tracing::warn!(error = %e, "tour state unreadable, treating as empty");
                return AllTourStates::default();
            }
        };
        let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "tour state corrupt, treating as empty");
                return AllTourStates::default();
            }
        };
        // A malformed entry is dropped on its own; its siblings survive.
        let tours = entries
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(state) => Some((id, state)),
                Err(e) => {
                    tracing::warn!(error = %e, tour = %id, "skipping malformed tour state");
                    None
                }
            })
            .collect();
        AllTourStates { tours }
    }

    pub fn get_tour_state(&self, tour_id: &str) -> Option<TourUserState> {
        self.get_all_tour_states().tours.remove(tour_id)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub fn set_tour_state(&self, tour_id: &str, patch: TourStatePatch) {
        self.update(tour_id, |state| state.apply(patch));
    }

    /// Read the whole map, change one entry (created with defaults if absent),
    /// write the whole map back.
    fn update(&self, tour_id: &str, f: impl FnOnce(&mut TourUserState)) {
        let mut all = self.get_all_tour_states();
        f(all.tours.entry(tour_id.to_string()).or_default());
        self.persist(&all);
    }

    fn persist(&self, all: &AllTourStates) {
        let data = match serde_json::to_string(all) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize tour state");
                return;
            }
        };
        if let Err(e) = self.local.set(&self.keys.states(), &data) {
            tracing::warn!(error = %e, "failed to save tour state");
        }
    }

    /// Starting always rewinds to the first step.
    pub fn mark_tour_started(&self, tour_id: &str) {
        let now = self.now_ms();
        self.update(tour_id, |state| {
            state.status = TourStatus::InProgress;
            state.started_at = Some(now);
            state.current_step = 0;
            state.view_count = state.view_count.saturating_add(1);
            state.last_viewed_at = Some(now);
        });
    }

    pub fn mark_tour_completed(&self, tour_id: &str) {
        let now = self.now_ms();
        self.set_tour_state(
            tour_id,
            TourStatePatch {
                status: Some(TourStatus::Completed),
                completed_at: Some(now),
                ..Default::default()
            },
        );
    }

    pub fn mark_tour_dismissed(&self, tour_id: &str, at_step: usize) {
        let now = self.now_ms();
        self.set_tour_state(
            tour_id,
            TourStatePatch {
                status: Some(TourStatus::Dismissed),
                dismissed_at: Some(now),
                current_step: Some(at_step),
                ..Default::default()
            },
        );
    }

    /// Record that a step was shown. The first view of a step is kept; the
    /// current step always moves to `step_index`.
    pub fn record_step_view(&self, tour_id: &str, step_id: &str, step_index: usize) {
        let now = self.now_ms();
        self.update(tour_id, |state| {
            if !state.has_viewed_step(step_id) {
                state.step_history.push(StepHistoryEntry {
                    step_id: step_id.to_string(),
                    viewed_at: now,
                    completed_at: None,
                });
            }
            state.current_step = step_index;
        });
    }

    /// Stamp a step as completed. An existing completion time is kept.
    pub fn record_step_completed(&self, tour_id: &str, step_id: &str) {
        let now = self.now_ms();
        self.update(tour_id, |state| {
            match state.step_history.iter_mut().find(|s| s.step_id == step_id) {
                Some(entry) => {
                    entry.completed_at.get_or_insert(now);
                }
                None => state.step_history.push(StepHistoryEntry {
                    step_id: step_id.to_string(),
                    viewed_at: now,
                    completed_at: Some(now),
                }),
            }
        });
    }

    pub fn clear_all_tour_state(&self) {
        if let Err(e) = self.local.remove(&self.keys.states()) {
            tracing::warn!(error = %e, "failed to clear tour state");
        }
    }

    // -----------------------------------------------------------------------
    // Frequency gate
    // -----------------------------------------------------------------------

    pub fn has_seen_tour(&self, tour_id: &str, frequency: &TourFrequency) -> bool {
        match *frequency {
            TourFrequency::Once => self
                .get_tour_state(tour_id)
                .map(|s| s.status.is_terminal())
                .unwrap_or(false),
            TourFrequency::OncePerSession => self.is_seen_this_session(tour_id),
            TourFrequency::Interval { days } => {
                let Some(last) = self
                    .get_tour_state(tour_id)
                    .and_then(|s| s.last_viewed_at)
                else {
                    return false;
                };
                let elapsed = self.now_ms().saturating_sub(last) as f64;
                elapsed < days * MS_PER_DAY as f64
            }
            TourFrequency::EveryTime => false,
        }
    }

    pub fn mark_seen_this_session(&self, tour_id: &str) {
        if let Err(e) = self.session.set(&self.keys.seen(tour_id), SEEN_FLAG) {
            tracing::warn!(error = %e, tour = %tour_id, "failed to set session flag");
        }
    }

    fn is_seen_this_session(&self, tour_id: &str) -> bool {
        match self.session.get(&self.keys.seen(tour_id)) {
            Ok(value) => value.as_deref() == Some(SEEN_FLAG),
            Err(e) => {
                tracing::warn!(error = %e, tour = %tour_id, "session flag unreadable");
                false
            }
        }
    }

    /// True while the visitor has not completed any tour yet.
    pub fn is_first_completed_tour(&self) -> bool {
        self.get_all_tour_states().completed_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
