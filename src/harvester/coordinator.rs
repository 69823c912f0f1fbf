//! Harvest coordinator - main run orchestration
//!
//! A run goes through three phases in order:
//! - Collecting submissions over the date range
//! - Enriching them with current scores and writing the submission file
//! - Paginating through every submission's comments into shards
//!
//! Submissions are processed one at a time. A filesystem failure while
//! writing one submission's shards is logged and the run moves on to the
//! next submission. With resume on, submissions marked complete are skipped
//! and interrupted ones continue after their last shard.

use crate::config::{CollectionMode, Config};
use crate::harvester::enrich::{enrich, RecordLookup, RedditClient};
use crate::harvester::fetcher::build_http_client;
use crate::harvester::paginator::CursorPaginator;
use crate::harvester::retry::RetryPolicy;
use crate::harvester::source::{PushshiftClient, SearchSource};
use crate::harvester::windowed::{DateRange, WindowedCollector};
use crate::output::{write_submissions, HarvestSummary, ShardWriter};
use crate::records::ParentRecord;
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Drives one harvest run
pub struct Coordinator {
    config: Config,
    source: Arc<dyn SearchSource>,
    lookup: Option<Arc<dyn RecordLookup>>,
    retry: RetryPolicy,
    writer: ShardWriter,
}

impl Coordinator {
    /// Creates a coordinator over explicit API clients
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `source` - Search API used for submissions and comments
    /// * `lookup` - Record API used for enrichment; `None` skips enrichment
    pub fn new(
        config: Config,
        source: Arc<dyn SearchSource>,
        lookup: Option<Arc<dyn RecordLookup>>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let writer = ShardWriter::new(config.output.comment_root());
        Self {
            config,
            source,
            lookup,
            retry,
            writer,
        }
    }

    /// Creates a coordinator with HTTP clients built from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Clients built
    /// * `Err(HarvestError)` - The HTTP client or API root URL was rejected
    pub fn from_config(config: Config) -> Result<Self> {
        let source: Arc<dyn SearchSource> = Arc::new(PushshiftClient::from_config(&config.api)?);

        let lookup: Option<Arc<dyn RecordLookup>> = match &config.credentials {
            Some(credentials) => {
                let client = build_http_client(&config.api)?;
                Some(Arc::new(RedditClient::new(client, credentials.clone())))
            }
            None => {
                tracing::warn!("No API credentials configured, submissions will not be enriched");
                None
            }
        };

        Ok(Self::new(config, source, lookup))
    }

    /// Runs the harvest over `range`
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestSummary)` - Totals for the run
    /// * `Err(HarvestError)` - Collection, enrichment output, or a bounded
    ///   retry policy failed
    pub async fn run(&self, range: DateRange) -> Result<HarvestSummary> {
        let start_time = Instant::now();
        let harvest = &self.config.harvest;

        tracing::info!(
            "Harvesting r/{} from {} to {} ({} days)",
            harvest.subreddit,
            range.start(),
            range.end(),
            range.num_days()
        );

        let parents = self.collect(&range).await?;
        tracing::info!("Collected {} submissions", parents.len());

        let parents = match &self.lookup {
            Some(lookup) => enrich(parents, lookup.as_ref(), &self.retry).await,
            None => parents,
        };

        write_submissions(&self.config.output.submission_path(), &parents)?;

        let mut summary = HarvestSummary {
            parents: parents.len(),
            ..HarvestSummary::default()
        };
        self.harvest_all_children(&parents, &mut summary).await;

        summary.elapsed = start_time.elapsed();
        tracing::info!(
            "Harvest complete: {} comments in {} shards across {} submissions in {:?}",
            summary.child_records,
            summary.shards,
            summary.parents_harvested,
            summary.elapsed
        );

        Ok(summary)
    }

    async fn collect(&self, range: &DateRange) -> Result<Vec<ParentRecord>> {
        let harvest = &self.config.harvest;
        let collector = WindowedCollector::new(
            self.source.as_ref(),
            &self.retry,
            Duration::from_millis(self.config.api.pacing_ms),
        );
        let search_term = harvest.search_term.as_deref().filter(|t| !t.is_empty());

        match harvest.mode {
            CollectionMode::Top => {
                collector
                    .collect_top(
                        range,
                        &harvest.subreddit,
                        search_term,
                        &harvest.sort_type,
                        harvest.results_per_day,
                    )
                    .await
            }
            CollectionMode::All => {
                collector
                    .collect_all(range, &harvest.subreddit, search_term)
                    .await
            }
        }
    }

    async fn harvest_all_children(&self, parents: &[ParentRecord], summary: &mut HarvestSummary) {
        let paginator = CursorPaginator::new(self.source.as_ref(), &self.writer, &self.retry)
            .with_limits(
                self.config.pagination.cutoff,
                self.config.pagination.page_limit,
            );
        let total = parents.len();
        let width = total.to_string().len();

        for (index, parent) in parents.iter().enumerate() {
            let resume = self.config.harvest.resume;
            if resume && self.writer.is_complete(&parent.id, &parent.date) {
                tracing::info!(
                    "({:0width$}/{}) Comments for '{}' already on disk, skipping",
                    index + 1,
                    total,
                    parent.title,
                    width = width
                );
                summary.parents_skipped += 1;
                continue;
            }

            tracing::info!(
                "({:0width$}/{}) Retrieving all comments for the following submission: '{}'",
                index + 1,
                total,
                parent.title,
                width = width
            );

            let checkpoint = if resume {
                self.writer.checkpoint(&parent.id, &parent.date)
            } else {
                Ok(None)
            };
            let result = match checkpoint {
                Ok(checkpoint) => paginator.resume_children(parent, checkpoint).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    if let Err(e) = self.writer.mark_complete(&parent.id, &parent.date) {
                        tracing::warn!(
                            "Could not mark comments for {} as complete: {}",
                            parent.id,
                            e
                        );
                    }
                    summary.parents_harvested += 1;
                    summary.child_records += report.records;
                    summary.shards += u64::from(report.shards);
                }
                Err(e) => {
                    tracing::error!("Failed to harvest comments for {}: {}", parent.id, e);
                    summary.parents_failed += 1;
                }
            }
        }
    }
}

/// Validates the date range and runs a full harvest
///
/// A range whose end is not after its start is rejected before any request
/// is made or any file is written.
///
/// # Returns
///
/// * `Ok(Some(HarvestSummary))` - The run completed
/// * `Ok(None)` - The date range was rejected
/// * `Err(HarvestError)` - The run failed
pub async fn run_harvest(config: Config) -> Result<Option<HarvestSummary>> {
    let Some(range) = DateRange::new(config.harvest.start_date, config.harvest.end_date) else {
        println!("The end date must be after the start date.");
        return Ok(None);
    };

    let coordinator = Coordinator::from_config(config)?;
    coordinator.run(range).await.map(Some)
}
