//! Match command - find scenes for a media filename.

use crate::app::App;
use crate::OutputFormat;
use scenedex_core::{canonicalize, Config};
use std::time::Instant;

/// Run the match command.
pub fn run(
    mut config: Config,
    filename: &str,
    limit: Option<usize>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if let Some(limit) = limit {
        config.search.max_results = limit;
    }
    let app = App::new(config)?;
    let searcher = app.searcher()?;

    if matches!(output, OutputFormat::Text) {
        eprintln!("Query: {}", canonicalize(filename));
    }

    let start = Instant::now();
    let results = searcher.match_filename(filename);
    super::query::print_results(&results, start.elapsed(), output)
}
