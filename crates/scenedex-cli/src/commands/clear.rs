//! Clear command - delete the scene index.

use scenedex_core::{index, Config};
use std::io::{self, Write};

/// Run the clear command.
pub fn run(config: Config, skip_confirm: bool) -> anyhow::Result<()> {
    let path = config.index_settings()?.path();

    if !path.exists() {
        println!("No index found. Nothing to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!(
            "This will delete the index at {}. Are you sure? [y/N] ",
            path.display()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    index::remove_storage(&path)?;
    println!("Index cleared. Run 'scenedex index' to rebuild it.");

    Ok(())
}
