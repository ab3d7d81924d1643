//! Targeting and frequency rules as produced by the tour builder.
//!
//! The JSON shape is shared with the dashboard, so field names are camelCase
//! and enum tags are snake_case.

use crate::types::{Device, PatternType, UrlMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourTargeting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_targeting: Option<UrlTargeting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_targeting: Option<UserTargeting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_targeting: Option<ElementTargeting>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlTargeting {
    #[serde(default)]
    pub mode: UrlMode,
    #[serde(default)]
    pub patterns: Vec<UrlPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub value: String,
}

impl UrlPattern {
    pub fn new(pattern_type: PatternType, value: impl Into<String>) -> Self {
        Self {
            pattern_type,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserTargeting {
    All,
    #[serde(rename_all = "camelCase")]
    NewUsers {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_user_days: Option<f64>,
    },
    Returning,
    #[serde(rename_all = "camelCase")]
    NotCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_tour_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementTargeting {
    #[serde(default)]
    pub selector: String,
}

/// How often a tour that was already shown may show again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TourFrequency {
    #[default]
    Once,
    OncePerSession,
    Interval {
        #[serde(default)]
        days: f64,
    },
    EveryTime,
}

impl TourFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourFrequency::Once => "once",
            TourFrequency::OncePerSession => "once_per_session",
            TourFrequency::Interval { .. } => "interval",
            TourFrequency::EveryTime => "every_time",
        }
    }
}
