use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use tour_core::paths;
use tour_core::storage::FileStorage;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Forget every "seen this session" flag, as if a new tab opened
    Reset,
}

pub fn run(root: &Path, subcmd: SessionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SessionSubcommand::Reset => {
            let session = FileStorage::new(paths::session_store_path(root));
            let removed = session
                .wipe()
                .with_context(|| format!("failed to remove {}", session.path().display()))?;
            if json {
                return print_json(&serde_json::json!({ "reset": removed }));
            }
            if removed {
                println!("Session reset.");
            } else {
                println!("No session to reset.");
            }
            Ok(())
        }
    }
}
