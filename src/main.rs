use anyhow::{Context, Result};

use skill_halflife::config::{self, DashboardConfig, OutputFormat};
use skill_halflife::report;
use skill_halflife::state::Session;
use skill_halflife::summary::Summary;

fn main() -> Result<()> {
    env_logger::init();

    let config = DashboardConfig::from_matches(&config::command().get_matches());

    // No partial mode: without a dataset there is nothing to report.
    let mut session = Session::open(&config.data_path).inspect_err(|e| log::error!("{e}"))?;

    let selections = config.selections(session.dataset());
    session.set_selections(selections);
    log::info!("{}", session.status_line());

    let summary = Summary::from_view(&session.view());
    match config.format {
        OutputFormat::Text => print!("{}", report::render_text(&summary)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing summary")?
        ),
    }
    Ok(())
}
