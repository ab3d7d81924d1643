use crate::config::EngineConfig;
use crate::context::{compute_context, MatchContext};
use crate::matcher::{
    matches_device_targeting, matches_element_targeting, matches_url_targeting,
    matches_user_targeting,
};
use crate::state::TourStateStore;
use crate::storage::{Clock, HostPage, MemoryStorage, Storage, SystemClock};
use crate::targeting::{TourFrequency, TourTargeting};
use crate::tour::TourDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The gate that turned a tour down, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadySeen,
    UrlMismatch,
    UserMismatch,
    DeviceMismatch,
    ElementMissing,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::AlreadySeen => "already_seen",
            RejectReason::UrlMismatch => "url_mismatch",
            RejectReason::UserMismatch => "user_mismatch",
            RejectReason::DeviceMismatch => "device_mismatch",
            RejectReason::ElementMissing => "element_missing",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Show,
    Hide(RejectReason),
}

impl Decision {
    pub fn is_shown(self) -> bool {
        matches!(self, Decision::Show)
    }

    pub fn reason(self) -> Option<RejectReason> {
        match self {
            Decision::Show => None,
            Decision::Hide(r) => Some(r),
        }
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Everything the engine needs from its host.
#[derive(Clone)]
pub struct Ports {
    pub local: Arc<dyn Storage>,
    pub session: Arc<dyn Storage>,
    pub page: Arc<dyn HostPage>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Fresh in-memory stores and the system clock around `page`.
    pub fn in_memory(page: Arc<dyn HostPage>) -> Self {
        Self {
            local: Arc::new(MemoryStorage::new()),
            session: Arc::new(MemoryStorage::new()),
            page,
            clock: Arc::new(SystemClock),
        }
    }
}

// ---------------------------------------------------------------------------
// TourEngine
// ---------------------------------------------------------------------------

/// Decides whether onboarding items show on the current page, and records
/// their progress.
#[derive(Clone)]
pub struct TourEngine {
    store: TourStateStore,
    page: Arc<dyn HostPage>,
    config: EngineConfig,
}

impl TourEngine {
    pub fn new(ports: Ports, config: EngineConfig) -> Self {
        let store = TourStateStore::new(
            ports.local,
            ports.session,
            ports.clock,
            config.storage_keys(),
        );
        Self {
            store,
            page: ports.page,
            config,
        }
    }

    pub fn store(&self) -> &TourStateStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the context for this page evaluation. Counts a visit.
    pub fn get_user_context(&self) -> MatchContext {
        compute_context(
            self.page.as_ref(),
            self.store.local(),
            self.store.keys(),
            &self.config.viewport,
            self.store.now_ms(),
        )
    }

    /// Run the frequency gate, then URL, user, device and element targeting,
    /// stopping at the first that rejects.
    pub fn evaluate_tour(
        &self,
        tour_id: &str,
        targeting: Option<&TourTargeting>,
        frequency: &TourFrequency,
        context: &MatchContext,
    ) -> Decision {
        let decision = if self.store.has_seen_tour(tour_id, frequency) {
            Decision::Hide(RejectReason::AlreadySeen)
        } else if !matches_url_targeting(targeting, &context.url) {
            Decision::Hide(RejectReason::UrlMismatch)
        } else if !matches_user_targeting(
            targeting,
            context,
            &self.store,
            self.config.targeting.new_user_days,
        ) {
            Decision::Hide(RejectReason::UserMismatch)
        } else if !matches_device_targeting(targeting, context) {
            Decision::Hide(RejectReason::DeviceMismatch)
        } else if !matches_element_targeting(targeting, self.page.as_ref()) {
            Decision::Hide(RejectReason::ElementMissing)
        } else {
            Decision::Show
        };
        if let Decision::Hide(reason) = decision {
            tracing::debug!(tour = %tour_id, %reason, frequency = frequency.as_str(), "tour hidden");
        }
        decision
    }

    pub fn should_show_tour(
        &self,
        tour_id: &str,
        targeting: Option<&TourTargeting>,
        frequency: &TourFrequency,
        context: &MatchContext,
    ) -> bool {
        self.evaluate_tour(tour_id, targeting, frequency, context)
            .is_shown()
    }

    pub fn evaluate_definition(&self, def: &TourDefinition, context: &MatchContext) -> Decision {
        self.evaluate_tour(&def.id, def.targeting.as_ref(), &def.frequency, context)
    }

    /// Eligible definitions, highest priority first. Equal priorities keep
    /// their input order.
    pub fn select_tours<'a>(
        &self,
        defs: &'a [TourDefinition],
        context: &MatchContext,
    ) -> Vec<&'a TourDefinition> {
        let mut eligible: Vec<&TourDefinition> = defs
            .iter()
            .filter(|d| self.evaluate_definition(d, context).is_shown())
            .collect();
        eligible.sort_by(|a, b| b.priority.cmp(&a.priority));
        eligible
    }

    // -----------------------------------------------------------------------
    // State pass-through for the renderer
    // -----------------------------------------------------------------------

    pub fn mark_tour_started(&self, tour_id: &str) {
        self.store.mark_tour_started(tour_id);
    }

    pub fn record_step_view(&self, tour_id: &str, step_id: &str, step_index: usize) {
        self.store.record_step_view(tour_id, step_id, step_index);
    }

    pub fn mark_tour_completed(&self, tour_id: &str) {
        self.store.mark_tour_completed(tour_id);
    }

    pub fn mark_tour_dismissed(&self, tour_id: &str, at_step: usize) {
        self.store.mark_tour_dismissed(tour_id, at_step);
    }

    pub fn mark_seen_this_session(&self, tour_id: &str) {
        self.store.mark_seen_this_session(tour_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TourStatePatch, MS_PER_DAY};
    use crate::storage::{FixedClock, StaticPage};
    use crate::targeting::{ElementTargeting, UrlPattern, UrlTargeting, UserTargeting};
    use crate::types::{Device, PatternType, TourStatus, UrlMode};

    const T0: i64 = 1_700_000_000_000;

    struct Fixture {
        local: Arc<MemoryStorage>,
        clock: Arc<FixedClock>,
        engine: TourEngine,
    }

    fn fixture(page: StaticPage) -> Fixture {
        let local = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::new(T0));
        let engine = TourEngine::new(
            Ports {
                local: local.clone(),
                session: Arc::new(MemoryStorage::new()),
                page: Arc::new(page),
                clock: clock.clone(),
            },
            EngineConfig::default(),
        );
        Fixture {
            local,
            clock,
            engine,
        }
    }

    fn desktop_dashboard() -> StaticPage {
        StaticPage::new("/dashboard", 1280)
    }

    #[test]
    fn fresh_visitor_sees_new_tour() {
        let engine = TourEngine::new(
            Ports::in_memory(Arc::new(desktop_dashboard())),
            EngineConfig::default(),
        );
        let ctx = engine.get_user_context();
        assert_eq!(ctx.device, Device::Desktop);
        assert_eq!(ctx.url, "/dashboard");
        assert!(engine.should_show_tour("welcome", None, &TourFrequency::Once, &ctx));
    }

    #[test]
    fn dismissed_tour_with_once_is_hidden() {
        let f = fixture(desktop_dashboard());
        f.engine.store().set_tour_state(
            "welcome",
            TourStatePatch {
                status: Some(TourStatus::Dismissed),
                dismissed_at: Some(T0 - 1_000),
                ..Default::default()
            },
        );
        let ctx = f.engine.get_user_context();
        assert_eq!(
            f.engine
                .evaluate_tour("welcome", None, &TourFrequency::Once, &ctx),
            Decision::Hide(RejectReason::AlreadySeen)
        );
    }

    #[test]
    fn device_mismatch_hides_regardless_of_other_gates() {
        let f = fixture(desktop_dashboard());
        let targeting = TourTargeting {
            url_targeting: Some(UrlTargeting {
                mode: UrlMode::Whitelist,
                patterns: vec![UrlPattern::new(PatternType::Exact, "/dashboard")],
            }),
            user_targeting: Some(UserTargeting::All),
            devices: vec![Device::Mobile],
            element_targeting: None,
        };
        let ctx = f.engine.get_user_context();
        assert_eq!(
            f.engine
                .evaluate_tour("welcome", Some(&targeting), &TourFrequency::EveryTime, &ctx),
            Decision::Hide(RejectReason::DeviceMismatch)
        );
    }

    #[test]
    fn corrupted_storage_behaves_as_never_seen() {
        let f = fixture(desktop_dashboard());
        f.local
            .set(&f.engine.store().keys().states(), "{not json")
            .unwrap();
        assert!(f.engine.store().get_all_tour_states().is_empty());
        let ctx = f.engine.get_user_context();
        assert!(f
            .engine
            .should_show_tour("welcome", None, &TourFrequency::Once, &ctx));
    }

    #[test]
    fn frequency_checked_before_targeting() {
        let f = fixture(desktop_dashboard());
        f.engine.mark_tour_completed("welcome");
        let targeting = TourTargeting {
            devices: vec![Device::Mobile],
            ..Default::default()
        };
        let ctx = f.engine.get_user_context();
        assert_eq!(
            f.engine
                .evaluate_tour("welcome", Some(&targeting), &TourFrequency::Once, &ctx)
                .reason(),
            Some(RejectReason::AlreadySeen)
        );
    }

    #[test]
    fn element_gate_is_last() {
        let f = fixture(desktop_dashboard());
        let targeting = TourTargeting {
            element_targeting: Some(ElementTargeting {
                selector: "#conversations".to_string(),
            }),
            ..Default::default()
        };
        let ctx = f.engine.get_user_context();
        assert_eq!(
            f.engine
                .evaluate_tour("inbox", Some(&targeting), &TourFrequency::Once, &ctx),
            Decision::Hide(RejectReason::ElementMissing)
        );
    }

    #[test]
    fn returning_visitor_after_second_context() {
        let f = fixture(desktop_dashboard());
        let targeting = TourTargeting {
            user_targeting: Some(UserTargeting::Returning),
            ..Default::default()
        };
        let first = f.engine.get_user_context();
        assert!(!f
            .engine
            .should_show_tour("tips", Some(&targeting), &TourFrequency::EveryTime, &first));
        let second = f.engine.get_user_context();
        assert_eq!(second.user_visit_count, 2);
        assert!(f
            .engine
            .should_show_tour("tips", Some(&targeting), &TourFrequency::EveryTime, &second));
    }

    #[test]
    fn interval_tour_reshows_after_window() {
        let f = fixture(desktop_dashboard());
        let freq = TourFrequency::Interval { days: 1.0 };
        f.engine.mark_tour_started("promo");
        let ctx = f.engine.get_user_context();
        assert!(!f.engine.should_show_tour("promo", None, &freq, &ctx));
        f.clock.advance(MS_PER_DAY);
        assert!(f.engine.should_show_tour("promo", None, &freq, &ctx));
    }

    #[test]
    fn once_per_session_hides_after_flag() {
        let f = fixture(desktop_dashboard());
        let ctx = f.engine.get_user_context();
        let freq = TourFrequency::OncePerSession;
        assert!(f.engine.should_show_tour("banner", None, &freq, &ctx));
        f.engine.mark_seen_this_session("banner");
        assert!(!f.engine.should_show_tour("banner", None, &freq, &ctx));
    }

    #[test]
    fn custom_new_user_days_from_config() {
        let mut config = EngineConfig::default();
        config.targeting.new_user_days = 1.0;
        let clock = Arc::new(FixedClock::new(T0));
        let engine = TourEngine::new(
            Ports {
                local: Arc::new(MemoryStorage::new()),
                session: Arc::new(MemoryStorage::new()),
                page: Arc::new(desktop_dashboard()),
                clock: clock.clone(),
            },
            config,
        );
        let targeting = TourTargeting {
            user_targeting: Some(UserTargeting::NewUsers {
                new_user_days: None,
            }),
            ..Default::default()
        };
        engine.get_user_context();
        clock.advance(2 * MS_PER_DAY);
        let ctx = engine.get_user_context();
        assert!(!engine.should_show_tour("hello", Some(&targeting), &TourFrequency::Once, &ctx));
    }

    #[test]
    fn select_tours_orders_by_priority() {
        let f = fixture(desktop_dashboard());
        let mut low = TourDefinition::new("low");
        low.priority = 1;
        let mut high = TourDefinition::new("high");
        high.priority = 5;
        let mut done = TourDefinition::new("done");
        done.priority = 9;
        let mut also_low = TourDefinition::new("also-low");
        also_low.priority = 1;
        f.engine.mark_tour_completed("done");

        let defs = vec![low, done, high, also_low];
        let ctx = f.engine.get_user_context();
        let ids: Vec<_> = f
            .engine
            .select_tours(&defs, &ctx)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["high", "low", "also-low"]);
    }

    #[test]
    fn full_lifecycle_through_engine() {
        let f = fixture(desktop_dashboard());
        let ctx = f.engine.get_user_context();
        assert!(f
            .engine
            .should_show_tour("welcome", None, &TourFrequency::Once, &ctx));
        f.engine.mark_tour_started("welcome");
        f.engine.record_step_view("welcome", "intro", 0);
        f.engine.record_step_view("welcome", "menu", 1);
        assert!(f
            .engine
            .should_show_tour("welcome", None, &TourFrequency::Once, &ctx));
        assert!(f.engine.store().is_first_completed_tour());
        f.engine.mark_tour_completed("welcome");
        assert!(!f
            .engine
            .should_show_tour("welcome", None, &TourFrequency::Once, &ctx));
        assert!(!f.engine.store().is_first_completed_tour());
    }

    #[test]
    fn decision_json_shape() {
        let json = serde_json::to_string(&Decision::Hide(RejectReason::UrlMismatch)).unwrap();
        assert_eq!(json, r#"{"verdict":"hide","reason":"url_mismatch"}"#);
        let json = serde_json::to_string(&Decision::Show).unwrap();
        assert_eq!(json, r#"{"verdict":"show"}"#);
    }
}
