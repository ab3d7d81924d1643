use crate::cmd::open_engine;
use crate::output::print_json;
use std::path::Path;
use tour_core::storage::StaticPage;

pub fn run(root: &Path, url: &str, width: u32, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, StaticPage::new(url, width))?;
    let ctx = engine.get_user_context();

    if json {
        return print_json(&ctx);
    }

    println!("URL:        {}", ctx.url);
    println!("Device:     {}", ctx.device);
    println!("Visits:     {}", ctx.user_visit_count);
    println!("First seen: {:.2} days ago", ctx.days_since_first_visit);
    Ok(())
}
