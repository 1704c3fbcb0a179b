//! Index command - index every catalog scene not indexed yet.

use crate::app::App;
use scenedex_core::Config;

/// Run the index command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.store.is_empty() {
        eprintln!("Catalog is empty. Pass --catalog <file> to index scenes.");
        return Ok(());
    }

    println!("Building scene index at {}", app.index_path()?.display());
    println!();

    let outcome = app.indexer()?.rebuild()?;

    if let Some(report) = super::print_outcome("Indexed", &outcome) {
        println!();
        println!("Indexing complete!");
        println!("  Scenes:    {}", report.processed);
        println!("  Written:   {}", report.written);
        println!("  Failed:    {}", report.failed);
        println!("  Time:      {:.2}s", report.elapsed.as_secs_f64());
        if report.elapsed.as_secs_f64() > 0.0 {
            println!(
                "  Rate:      {:.0} scenes/sec",
                report.processed as f64 / report.elapsed.as_secs_f64()
            );
        }
    }

    Ok(())
}
