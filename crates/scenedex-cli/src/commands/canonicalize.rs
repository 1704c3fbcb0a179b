//! Canonicalize command - show the query derived from filenames.

use scenedex_core::canonicalize;

/// Run the canonicalize command.
pub fn run(filenames: &[String]) -> anyhow::Result<()> {
    for filename in filenames {
        let canonical = canonicalize(filename);
        if filenames.len() == 1 {
            println!("{}", canonical);
        } else {
            println!("{}\t{}", filename, canonical);
        }
    }
    Ok(())
}
