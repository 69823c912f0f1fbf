//! Harvester module for submission and comment retrieval
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching against the search and record APIs
//! - Fixed-delay retry around every network call
//! - Day-windowed submission collection
//! - Cursor pagination over comments into shard files
//! - Overall run coordination

mod coordinator;
mod enrich;
mod fetcher;
mod paginator;
mod retry;
mod source;
mod windowed;

pub use coordinator::{run_harvest, Coordinator};
pub use enrich::{enrich, RecordLookup, RecordStats, RedditClient};
pub use fetcher::{build_http_client, fetch_json};
pub use paginator::{
    CursorPaginator, PaginationReport, Termination, DEFAULT_CUTOFF, DEFAULT_PAGE_LIMIT,
};
pub use retry::{RetryError, RetryPolicy, DEFAULT_RETRY_DELAY};
pub use source::{CommentQuery, PushshiftClient, SearchSource, SubmissionQuery};
pub use windowed::{day_start, DateRange, WindowedCollector, ALL_MODE_PAGE_LIMIT, SECONDS_PER_DAY};

use crate::config::Config;
use crate::output::HarvestSummary;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for starting a harvest. It will:
/// 1. Reject a date range whose end is not after its start
/// 2. Collect submissions over the range
/// 3. Enrich them with current scores, when credentials are configured
/// 4. Write the submission file
/// 5. Paginate through every submission's comments into shards
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(Some(HarvestSummary))` - Harvest completed
/// * `Ok(None)` - The date range was rejected; nothing was fetched or written
/// * `Err(HarvestError)` - Harvest failed
pub async fn harvest(config: Config) -> Result<Option<HarvestSummary>, HarvestError> {
    run_harvest(config).await
}
