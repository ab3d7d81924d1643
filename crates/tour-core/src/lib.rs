//! `tour-core`: targeting, frequency and progress engine for onboarding
//! tours, checklists, tips and banners embedded in a host product.
//!
//! ```text
//! HostPage + Storage + Clock   ← ports (browser globals in production)
//!     │
//!     ▼
//! TourEngine::get_user_context()   → MatchContext (counts a visit)
//!     │
//!     ▼
//! TourEngine::should_show_tour()   → frequency gate (TourStateStore)
//!                                    → url / user / device / element
//!     │
//!     ▼
//! renderer calls mark_tour_started / record_step_view / mark_tour_completed
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod io;
pub mod matcher;
pub mod paths;
pub mod state;
pub mod storage;
pub mod targeting;
pub mod theme;
pub mod tour;
pub mod types;

pub use engine::{Decision, Ports, RejectReason, TourEngine};
pub use error::{Result, TourError};
pub use theme::{get_default_theme, get_theme_preset};
