//! Subcommand implementations.

pub mod canonicalize;
pub mod clear;
pub mod index;
pub mod matching;
pub mod query;
pub mod remove;
pub mod status;
pub mod update;

use scenedex_core::{IndexOutcome, IndexReport};

/// Print the summary line for an indexing operation.
///
/// Returns the report, or `None` when another operation held the index.
pub(crate) fn print_outcome<'a>(verb: &str, outcome: &'a IndexOutcome) -> Option<&'a IndexReport> {
    match outcome {
        IndexOutcome::Skipped => {
            println!("Indexing already in progress, nothing done.");
            None
        }
        IndexOutcome::Completed(report) => {
            println!(
                "{} {} of {} scenes ({} failed) in {:.2}s",
                verb,
                report.written,
                report.processed,
                report.failed,
                report.elapsed.as_secs_f64()
            );
            Some(report)
        }
    }
}
