use crate::cmd::open_engine;
use crate::output::{format_ts, print_json, print_table};
use clap::Subcommand;
use std::path::Path;
use tour_core::state::{TourStateStore, TourUserState};
use tour_core::storage::StaticPage;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum StateSubcommand {
    /// Show stored progress for every tour, or one
    Show {
        /// Tour id (omit to show all)
        tour: Option<String>,
    },

    /// Mark a tour started (rewinds to step 0, counts a view)
    Start { tour: String },

    /// Record that a step was viewed
    Step {
        tour: String,
        step: String,
        /// Zero-based step index
        index: usize,
    },

    /// Record that a step was completed
    CompleteStep { tour: String, step: String },

    /// Mark a tour completed
    Complete { tour: String },

    /// Mark a tour dismissed
    Dismiss {
        tour: String,
        /// Step the visitor dismissed on
        #[arg(long, default_value = "0")]
        at_step: usize,
    },

    /// Flag a tour as seen in the current session
    Seen { tour: String },

    /// Delete progress for every tour
    Clear,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: StateSubcommand, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, StaticPage::default())?;
    let store = engine.store();

    let tour = match subcmd {
        StateSubcommand::Show { tour } => return show(store, tour.as_deref(), json),
        StateSubcommand::Clear => {
            store.clear_all_tour_state();
            if json {
                return print_json(&serde_json::json!({ "cleared": true }));
            }
            println!("Cleared all tour state.");
            return Ok(());
        }
        StateSubcommand::Start { tour } => {
            store.mark_tour_started(&tour);
            tour
        }
        StateSubcommand::Step { tour, step, index } => {
            store.record_step_view(&tour, &step, index);
            tour
        }
        StateSubcommand::CompleteStep { tour, step } => {
            store.record_step_completed(&tour, &step);
            tour
        }
        StateSubcommand::Complete { tour } => {
            let first = store.is_first_completed_tour();
            store.mark_tour_completed(&tour);
            if first && !json {
                println!("First completed tour for this visitor.");
            }
            tour
        }
        StateSubcommand::Dismiss { tour, at_step } => {
            store.mark_tour_dismissed(&tour, at_step);
            tour
        }
        StateSubcommand::Seen { tour } => {
            store.mark_seen_this_session(&tour);
            tour
        }
    };
    show(store, Some(&tour), json)
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(store: &TourStateStore, tour: Option<&str>, json: bool) -> anyhow::Result<()> {
    let all = store.get_all_tour_states();

    if let Some(id) = tour {
        let state = all.get(id).cloned().unwrap_or_default();
        if json {
            return print_json(&serde_json::json!({ "id": id, "state": state }));
        }
        print_detail(id, &state);
        return Ok(());
    }

    if json {
        return print_json(&all);
    }

    if all.is_empty() {
        println!("No tour state recorded.");
        return Ok(());
    }
    let rows = all
        .tours
        .iter()
        .map(|(id, s)| {
            vec![
                id.clone(),
                s.status.to_string(),
                s.current_step.to_string(),
                s.view_count.to_string(),
                s.step_history.len().to_string(),
                format_ts(s.last_viewed_at),
            ]
        })
        .collect();
    print_table(
        &["TOUR", "STATUS", "STEP", "VIEWS", "STEPS SEEN", "LAST VIEWED"],
        rows,
    );
    Ok(())
}

fn print_detail(id: &str, s: &TourUserState) {
    println!("Tour:         {id}");
    println!("Status:       {}", s.status);
    println!("Current step: {}", s.current_step);
    println!("Views:        {}", s.view_count);
    println!("Started:      {}", format_ts(s.started_at));
    println!("Completed:    {}", format_ts(s.completed_at));
    println!("Dismissed:    {}", format_ts(s.dismissed_at));
    println!("Last viewed:  {}", format_ts(s.last_viewed_at));
    if s.step_history.is_empty() {
        return;
    }
    println!("\nSteps:");
    for entry in &s.step_history {
        let done = if entry.completed_at.is_some() { " (completed)" } else { "" };
        println!(
            "  {}: viewed {}{}",
            entry.step_id,
            format_ts(Some(entry.viewed_at)),
            done
        );
    }
}
