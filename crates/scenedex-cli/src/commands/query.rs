//! Query command - search for scenes.

use crate::app::App;
use crate::OutputFormat;
use scenedex_core::{Config, ScoredScene};
use std::time::{Duration, Instant};

/// Run the query command.
pub fn run(
    mut config: Config,
    text: &str,
    limit: Option<usize>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if let Some(limit) = limit {
        config.search.max_results = limit;
    }
    let app = App::new(config)?;
    let searcher = app.searcher()?;

    let start = Instant::now();
    let results = searcher.fuzzy_search(text);
    print_results(&results, start.elapsed(), output)
}

/// Print search results in the requested format.
pub fn print_results(
    results: &[ScoredScene],
    elapsed: Duration,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Text => {
            for result in results {
                let scene = &result.scene;
                let cast: Vec<&str> = scene.cast.iter().map(|c| c.name.as_str()).collect();

                println!("{:>7.3}  {}", result.score, scene);
                if !cast.is_empty() {
                    println!("         with {}", cast.join(", "));
                }
            }

            eprintln!();
            eprintln!(
                "Found {} scenes in {:.3}ms",
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "scene_id": r.scene.scene_id,
                        "title": r.scene.title,
                        "site": r.scene.site,
                        "cast": r.scene.cast.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                        "release_date": r.scene.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
                        "score": r.score,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}
