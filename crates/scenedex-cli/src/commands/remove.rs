//! Remove command - delete scenes from the index.

use crate::app::App;
use scenedex_core::Config;

/// Run the remove command.
pub fn run(config: Config, ids: Vec<String>) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let outcome = app.indexer()?.delete_scene_ids(&ids)?;
    super::print_outcome("Removed", &outcome);
    Ok(())
}
