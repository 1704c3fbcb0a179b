//! Update command - re-index scenes whose catalog records changed.

use crate::app::App;
use scenedex_core::{Config, ScrapedScene};

/// Run the update command.
pub fn run(config: Config, ids: Vec<String>) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let scraped: Vec<ScrapedScene> = ids.into_iter().map(ScrapedScene::new).collect();
    let outcome = app.indexer()?.index_scraped_scenes(&scraped)?;

    if let Some(report) = super::print_outcome("Re-indexed", &outcome) {
        let missing = scraped.len().saturating_sub(report.processed);
        if missing > 0 {
            println!("{} scene(s) not found in the catalog.", missing);
        }
    }

    Ok(())
}
