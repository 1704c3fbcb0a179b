//! Status command - show index status.

use crate::app::App;
use scenedex_core::{index, Config, OpenMode, SceneIndex};

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let settings = app.config.index_settings()?;
    let path = settings.path();

    println!("Scenedex Index Status");
    println!("=====================");
    println!();
    println!("Index location:  {}", path.display());
    println!("Catalog scenes:  {}", app.store.len());

    if !index::storage_exists(&path) {
        println!();
        println!("Index does not exist. Run 'scenedex index' to build it.");
        return Ok(());
    }

    let index = SceneIndex::open_or_create(
        &settings.dir,
        &settings.name,
        OpenMode::ReadOnly,
        &settings.options,
    )?;
    println!("Indexed scenes:  {}", index.num_docs());

    if let Some(ref catalog) = app.config.catalog.path {
        println!();
        println!("Catalog file: {}", catalog.display());
    }

    Ok(())
}
