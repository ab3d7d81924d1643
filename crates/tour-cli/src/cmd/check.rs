use crate::cmd::open_engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tour_core::context::MatchContext;
use tour_core::storage::StaticPage;
use tour_core::tour::{find_definition, load_definitions, TourDefinition};
use tour_core::Decision;

pub struct CheckArgs<'a> {
    pub file: &'a Path,
    pub url: &'a str,
    pub width: u32,
    pub elements: &'a [String],
    pub tour: Option<&'a str>,
}

#[derive(Serialize)]
struct TourVerdict<'a> {
    id: &'a str,
    kind: String,
    priority: i32,
    theme: &'static str,
    #[serde(flatten)]
    decision: Decision,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    context: &'a MatchContext,
    tours: Vec<TourVerdict<'a>>,
}

pub fn run(root: &Path, args: CheckArgs<'_>, json: bool) -> anyhow::Result<()> {
    let defs = load_definitions(args.file)
        .with_context(|| format!("failed to load tours from {}", args.file.display()))?;

    let candidates: Vec<&TourDefinition> = match args.tour {
        Some(id) => vec![find_definition(&defs, id)?],
        None => defs.iter().collect(),
    };

    let page = args
        .elements
        .iter()
        .fold(StaticPage::new(args.url, args.width), |page, sel| {
            page.with_element(sel.as_str())
        });
    let engine = open_engine(root, page)?;
    let ctx = engine.get_user_context();

    let verdicts: Vec<TourVerdict> = candidates
        .iter()
        .map(|d| TourVerdict {
            id: &d.id,
            kind: d.kind.to_string(),
            priority: d.priority,
            theme: d.theme().id,
            decision: engine.evaluate_definition(d, &ctx),
        })
        .collect();

    if json {
        return print_json(&CheckOutput {
            context: &ctx,
            tours: verdicts,
        });
    }

    println!(
        "Context: {} ({}, visit {}, {:.2} days since first visit)",
        ctx.url, ctx.device, ctx.user_visit_count, ctx.days_since_first_visit
    );
    if verdicts.is_empty() {
        println!("No tours defined in {}", args.file.display());
        return Ok(());
    }
    let rows = verdicts
        .iter()
        .map(|v| {
            vec![
                v.id.to_string(),
                v.kind.clone(),
                v.priority.to_string(),
                if v.decision.is_shown() { "show" } else { "hide" }.to_string(),
                v.decision
                    .reason()
                    .map(|r| r.to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["TOUR", "KIND", "PRIORITY", "VERDICT", "REASON"], rows);
    Ok(())
}
