use crate::error::{Result, TourError};
use crate::targeting::{TourFrequency, TourTargeting};
use crate::theme::{get_default_theme, get_theme_preset, ThemePreset};
use crate::types::TourKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourStep {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A published onboarding item as stored by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: TourKind,
    #[serde(default)]
    pub steps: Vec<TourStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting: Option<TourTargeting>,
    #[serde(default)]
    pub frequency: TourFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    /// Higher shows first when several items are eligible.
    #[serde(default)]
    pub priority: i32,
}

impl TourDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: TourKind::Tour,
            steps: Vec::new(),
            targeting: None,
            frequency: TourFrequency::Once,
            theme_id: None,
            priority: 0,
        }
    }

    /// The configured preset, or the default theme when unset or unknown.
    pub fn theme(&self) -> &'static ThemePreset {
        match self.theme_id.as_deref() {
            Some(id) => get_theme_preset(id).unwrap_or_else(|| {
                tracing::debug!(tour = %self.id, theme = %id, "unknown theme, using default");
                get_default_theme()
            }),
            None => get_default_theme(),
        }
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }
}

/// Load tour definitions from a YAML or JSON file holding a list.
pub fn load_definitions(path: &Path) -> Result<Vec<TourDefinition>> {
    let data = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let defs: Vec<TourDefinition> = if is_json {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data)?
    };
    Ok(defs)
}

pub fn find_definition<'a>(defs: &'a [TourDefinition], id: &str) -> Result<&'a TourDefinition> {
    defs.iter()
        .find(|d| d.id == id)
        .ok_or_else(|| TourError::TourNotFound(id.to_string()))
}
