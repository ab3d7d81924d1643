use serde::Serialize;

pub const DEFAULT_THEME_ID: &str = "blue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColors {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub overlay: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub colors: ThemeColors,
}

static THEME_PRESETS: [ThemePreset; 4] = [
    ThemePreset {
        id: "blue",
        name: "Blue",
        colors: ThemeColors {
            primary: "#3B82F6",
            secondary: "#DBEAFE",
            background: "#FFFFFF",
            text: "#1F2937",
            text_secondary: "#6B7280",
            border: "#E5E7EB",
            overlay: "rgba(0, 0, 0, 0.5)",
        },
    },
    ThemePreset {
        id: "green",
        name: "Green",
        colors: ThemeColors {
            primary: "#10B981",
            secondary: "#D1FAE5",
            background: "#FFFFFF",
            text: "#1F2937",
            text_secondary: "#6B7280",
            border: "#E5E7EB",
            overlay: "rgba(0, 0, 0, 0.5)",
        },
    },
    ThemePreset {
        id: "orange",
        name: "Orange",
        colors: ThemeColors {
            primary: "#F97316",
            secondary: "#FFEDD5",
            background: "#FFFFFF",
            text: "#1F2937",
            text_secondary: "#6B7280",
            border: "#E5E7EB",
            overlay: "rgba(0, 0, 0, 0.5)",
        },
    },
    ThemePreset {
        id: "navy",
        name: "Navy",
        colors: ThemeColors {
            primary: "#1E3A8A",
            secondary: "#DBEAFE",
            background: "#F8FAFC",
            text: "#0F172A",
            text_secondary: "#475569",
            border: "#CBD5E1",
            overlay: "rgba(15, 23, 42, 0.6)",
        },
    },
];

/// Every preset, default first.
pub fn theme_presets() -> &'static [ThemePreset] {
    &THEME_PRESETS
}

/// Look up a preset by id. Unknown ids return `None`; choosing a fallback is
/// the caller's call.
pub fn get_theme_preset(id: &str) -> Option<&'static ThemePreset> {
    THEME_PRESETS.iter().find(|t| t.id == id)
}

pub fn get_default_theme() -> &'static ThemePreset {
    &THEME_PRESETS[0]
}
