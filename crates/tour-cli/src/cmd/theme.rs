use crate::output::{print_json, print_table};
use clap::Subcommand;
use tour_core::theme::{get_default_theme, get_theme_preset, theme_presets};
use tour_core::TourError;

#[derive(Subcommand)]
pub enum ThemeSubcommand {
    /// List the built-in theme presets
    List,

    /// Show one preset's colors
    Show { id: String },
}

pub fn run(subcmd: ThemeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ThemeSubcommand::List => {
            if json {
                return print_json(&theme_presets());
            }
            let default_id = get_default_theme().id;
            let rows = theme_presets()
                .iter()
                .map(|t| {
                    vec![
                        t.id.to_string(),
                        t.name.to_string(),
                        t.colors.primary.to_string(),
                        if t.id == default_id { "default" } else { "" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "PRIMARY", ""], rows);
            Ok(())
        }
        ThemeSubcommand::Show { id } => {
            let theme = get_theme_preset(&id).ok_or(TourError::UnknownTheme(id))?;
            if json {
                return print_json(theme);
            }
            let c = &theme.colors;
            println!("Theme: {} ({})", theme.name, theme.id);
            println!("  primary:        {}", c.primary);
            println!("  secondary:      {}", c.secondary);
            println!("  background:     {}", c.background);
            println!("  text:           {}", c.text);
            println!("  text_secondary: {}", c.text_secondary);
            println!("  border:         {}", c.border);
            println!("  overlay:        {}", c.overlay);
            Ok(())
        }
    }
}
