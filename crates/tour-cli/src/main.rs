mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, session::SessionSubcommand, state::StateSubcommand,
    theme::ThemeSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tour",
    about = "Inspect onboarding tour targeting and visitor progress",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .tour/ or .git/)
    #[arg(long, global = true, env = "TOUR_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the match context for a page (counts a visit)
    Context {
        /// Full page URL
        #[arg(long)]
        url: String,
        /// Viewport width in CSS pixels
        #[arg(long, default_value = "1280")]
        width: u32,
    },

    /// Decide which tours in a definitions file would show on a page
    Check {
        /// YAML or JSON file with a list of tour definitions
        file: PathBuf,
        /// Full page URL
        #[arg(long)]
        url: String,
        /// Viewport width in CSS pixels
        #[arg(long, default_value = "1280")]
        width: u32,
        /// Selector present on the page (repeatable)
        #[arg(long = "element", value_name = "SELECTOR")]
        elements: Vec<String>,
        /// Only evaluate this tour id
        #[arg(long)]
        tour: Option<String>,
    },

    /// Read and change stored visitor progress
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },

    /// Manage the session store
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Browse the built-in theme presets
    Theme {
        #[command(subcommand)]
        subcommand: ThemeSubcommand,
    },

    /// Show or validate the engine config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Context { url, width } => cmd::context::run(&root, &url, width, cli.json),
        Commands::Check {
            file,
            url,
            width,
            elements,
            tour,
        } => cmd::check::run(
            &root,
            cmd::check::CheckArgs {
                file: &file,
                url: &url,
                width,
                elements: &elements,
                tour: tour.as_deref(),
            },
            cli.json,
        ),
        Commands::State { subcommand } => cmd::state::run(&root, subcommand, cli.json),
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand, cli.json),
        Commands::Theme { subcommand } => cmd::theme::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
