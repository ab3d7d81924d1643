use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TourStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Dismissed,
}

impl TourStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TourStatus::NotStarted => "not_started",
            TourStatus::InProgress => "in_progress",
            TourStatus::Completed => "completed",
            TourStatus::Dismissed => "dismissed",
        }
    }

    /// Completed and dismissed tours never leave their status on their own.
    pub fn is_terminal(self) -> bool {
        matches!(self, TourStatus::Completed | TourStatus::Dismissed)
    }
}

impl fmt::Display for TourStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Desktop,
    Tablet,
    Mobile,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Tablet => "tablet",
            Device::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UrlMode / PatternType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMode {
    #[default]
    All,
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Wildcard,
    Regex,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::Exact => "exact",
            PatternType::Contains => "contains",
            PatternType::StartsWith => "starts_with",
            PatternType::EndsWith => "ends_with",
            PatternType::Wildcard => "wildcard",
            PatternType::Regex => "regex",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TourKind
// ---------------------------------------------------------------------------

/// The onboarding surfaces that share targeting and state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourKind {
    #[default]
    Tour,
    Checklist,
    Tip,
    Banner,
}

impl TourKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TourKind::Tour => "tour",
            TourKind::Checklist => "checklist",
            TourKind::Tip => "tip",
            TourKind::Banner => "banner",
        }
    }
}

impl fmt::Display for TourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
