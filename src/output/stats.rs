//! Run statistics
//!
//! Totals gathered by the coordinator over a whole harvest, and a plain-text
//! report printed when the run finishes.

use std::time::Duration;

/// Summary of a completed harvest run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestSummary {
    /// Submissions collected from the search API
    pub parents: usize,

    /// Submissions whose comments were harvested this run
    pub parents_harvested: usize,

    /// Submissions skipped because their first shard was already on disk
    pub parents_skipped: usize,

    /// Submissions whose harvest ended on a filesystem error
    pub parents_failed: usize,

    /// Total comments persisted
    pub child_records: u64,

    /// Total comment shards written
    pub shards: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl HarvestSummary {
    /// Average comments per harvested submission
    pub fn comments_per_parent(&self) -> f64 {
        if self.parents_harvested == 0 {
            return 0.0;
        }
        self.child_records as f64 / self.parents_harvested as f64
    }
}

/// Prints the end-of-run report to stdout
pub fn print_summary(summary: &HarvestSummary) {
    println!("\nDone! All available data has been successfully saved locally.");
    println!();
    println!("Submissions:");
    println!("  Collected: {}", summary.parents);
    println!("  Harvested: {}", summary.parents_harvested);
    println!("  Skipped: {}", summary.parents_skipped);
    if summary.parents_failed > 0 {
        println!("  Failed: {}", summary.parents_failed);
    }
    println!();
    println!("Comments:");
    println!("  Shards written: {}", summary.shards);
    println!(
        "  Average per submission: {:.1}",
        summary.comments_per_parent()
    );
    println!();
    println!("Data retrieval time: {:?}", summary.elapsed);
    println!("Total comments retrieved: {}", summary.child_records);
}
