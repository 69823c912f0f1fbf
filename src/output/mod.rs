//! Output module for persisting harvested data
//!
//! This module handles:
//! - Writing comment pages as date-sharded CSV files
//! - Writing the enriched submission set as JSON
//! - Reporting run statistics

mod shard;
pub mod stats;
mod submissions;

pub use shard::{Checkpoint, ShardWriter};
pub use stats::{print_summary, HarvestSummary};
pub use submissions::write_submissions;
