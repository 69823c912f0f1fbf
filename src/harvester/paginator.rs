//! Cursor pagination over a submission's comments
//!
//! The comment endpoint returns at most 10000 records per query, newest
//! first. To walk further back, each follow-up query sets `before` to the
//! oldest `created_at` of the previous page, so the cursor only ever moves
//! backwards in time.
//!
//! ```text
//! Start ──empty──────────────────────────────▶ Done(Exhausted)
//!   │
//!   └─page─▶ persist shard 1 ─┬─ len < cutoff ─▶ Done(Complete)
//!                             │
//!                             └─ len ≥ cutoff ─▶ Continue(before = cursor)
//!                                                  │ empty     ─▶ Done(Exhausted)
//!                                                  │ duplicate ─▶ Done(Duplicate)
//!                                                  │ no older  ─▶ Done(Stalled)
//!                                                  └ page      ─▶ persist shard n+1
//! ```
//!
//! Records sharing the boundary timestamp can come back on the next page.
//! A per-submission set of seen comment ids drops them before persisting.
//!
//! An interrupted harvest resumes in `Continue`, with the cursor and seen ids
//! taken from the last shard on disk.

use crate::harvester::retry::RetryPolicy;
use crate::harvester::source::{CommentQuery, SearchSource};
use crate::output::{Checkpoint, ShardWriter};
use crate::records::{ChildRecord, ParentRecord};
use crate::Result;
use std::collections::HashSet;

/// Pages at least this large trigger a follow-up query
///
/// Chosen with margin below the API's 10000-record cap.
pub const DEFAULT_CUTOFF: usize = 9000;

/// `limit` sent with every comment query
pub const DEFAULT_PAGE_LIMIT: usize = 10000;

/// Why pagination for a submission stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A query returned no records
    Exhausted,
    /// The last page was smaller than the cutoff
    Complete,
    /// A page repeated the previous one; indicates an upstream anomaly
    Duplicate,
    /// A page contained nothing older than the cursor
    Stalled,
}

/// Outcome of harvesting one submission's comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationReport {
    pub parent_id: String,
    /// Comments persisted
    pub records: u64,
    /// Shards written by this call
    pub shards: u32,
    /// Highest shard number on disk for the submission; shards are numbered
    /// `1..=last_sequence`
    pub last_sequence: u32,
    /// `before` bound of every query issued, in order
    pub upper_bounds: Vec<Option<i64>>,
    pub termination: Termination,
}

enum PaginationState {
    Start,
    Continue {
        cursor: i64,
        previous: Vec<ChildRecord>,
    },
    Done(Termination),
}

/// Harvests and persists every comment of a submission
pub struct CursorPaginator<'a> {
    source: &'a dyn SearchSource,
    writer: &'a ShardWriter,
    retry: &'a RetryPolicy,
    cutoff: usize,
    page_limit: usize,
}

impl<'a> CursorPaginator<'a> {
    /// Creates a paginator with the default cutoff and page limit
    pub fn new(
        source: &'a dyn SearchSource,
        writer: &'a ShardWriter,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            source,
            writer,
            retry,
            cutoff: DEFAULT_CUTOFF,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Overrides the cutoff and page limit
    pub fn with_limits(mut self, cutoff: usize, page_limit: usize) -> Self {
        self.cutoff = cutoff;
        self.page_limit = page_limit;
        self
    }

    /// Harvests all comments of `parent`, writing each page as a shard
    ///
    /// Network failures are handled by the retry policy. A filesystem failure
    /// ends the harvest for this submission and is returned to the caller.
    pub async fn harvest_children(&self, parent: &ParentRecord) -> Result<PaginationReport> {
        self.resume_children(parent, None).await
    }

    /// Continues an interrupted harvest from the last shard on disk
    ///
    /// With a checkpoint, the first query uses the oldest timestamp of the
    /// last shard as its upper bound, and new shards are numbered after it.
    /// Without one this is [`harvest_children`](Self::harvest_children).
    pub async fn resume_children(
        &self,
        parent: &ParentRecord,
        checkpoint: Option<Checkpoint>,
    ) -> Result<PaginationReport> {
        let mut report = PaginationReport {
            parent_id: parent.id.clone(),
            records: 0,
            shards: 0,
            last_sequence: 0,
            upper_bounds: Vec::new(),
            termination: Termination::Exhausted,
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut state = PaginationState::Start;

        if let Some(checkpoint) = checkpoint {
            tracing::info!(
                "{}: resuming after shard {:02}",
                parent.id,
                checkpoint.sequence
            );
            report.last_sequence = checkpoint.sequence;
            seen = checkpoint.seen;
            if let Some(cursor) = checkpoint.cursor {
                state = PaginationState::Continue {
                    cursor,
                    previous: Vec::new(),
                };
            }
        }

        loop {
            state = match state {
                PaginationState::Start => {
                    let page = self.fetch_page(&parent.id, None, &mut report).await?;
                    if page.is_empty() {
                        PaginationState::Done(Termination::Exhausted)
                    } else if page.iter().all(|c| seen.contains(&c.id)) {
                        PaginationState::Done(Termination::Duplicate)
                    } else {
                        self.accept(parent, page, &mut seen, &mut report)?
                    }
                }

                PaginationState::Continue { cursor, previous } => {
                    let page = self
                        .fetch_page(&parent.id, Some(cursor), &mut report)
                        .await?;

                    if page.is_empty() {
                        tracing::debug!("{}: skipping empty page", parent.id);
                        PaginationState::Done(Termination::Exhausted)
                    } else if page == previous || page.iter().all(|c| seen.contains(&c.id)) {
                        tracing::warn!(
                            "{}: skipping duplicate page of {} comments before {}",
                            parent.id,
                            page.len(),
                            cursor
                        );
                        PaginationState::Done(Termination::Duplicate)
                    } else if oldest(&page).map_or(true, |min| min >= cursor) {
                        tracing::warn!(
                            "{}: page before {} contained nothing older, stopping",
                            parent.id,
                            cursor
                        );
                        PaginationState::Done(Termination::Stalled)
                    } else {
                        self.accept(parent, page, &mut seen, &mut report)?
                    }
                }

                PaginationState::Done(termination) => {
                    report.termination = termination;
                    tracing::debug!(
                        "{}: {} comments in {} shards ({:?})",
                        parent.id,
                        report.records,
                        report.shards,
                        termination
                    );
                    return Ok(report);
                }
            };
        }
    }

    /// Persists the unseen part of a page and decides the next state
    fn accept(
        &self,
        parent: &ParentRecord,
        page: Vec<ChildRecord>,
        seen: &mut HashSet<String>,
        report: &mut PaginationReport,
    ) -> Result<PaginationState> {
        let Some(cursor) = oldest(&page) else {
            return Ok(PaginationState::Done(Termination::Exhausted));
        };

        let fresh: Vec<ChildRecord> = page
            .iter()
            .filter(|c| seen.insert(c.id.clone()))
            .cloned()
            .collect();

        if !fresh.is_empty() {
            let sequence = report.last_sequence + 1;
            self.writer
                .write_shard(&parent.id, &parent.date, sequence, &fresh)?;
            report.last_sequence = sequence;
            report.shards += 1;
            report.records += fresh.len() as u64;
        }

        // The cutoff looks at the raw page: dropped boundary duplicates must
        // not make a full page look like the last one.
        if page.len() >= self.cutoff {
            tracing::debug!(
                "{}: full page of {} comments, continuing before {}",
                parent.id,
                page.len(),
                cursor
            );
            Ok(PaginationState::Continue {
                cursor,
                previous: page,
            })
        } else {
            Ok(PaginationState::Done(Termination::Complete))
        }
    }

    async fn fetch_page(
        &self,
        parent_id: &str,
        before: Option<i64>,
        report: &mut PaginationReport,
    ) -> Result<Vec<ChildRecord>> {
        report.upper_bounds.push(before);

        let query = CommentQuery {
            link_id: parent_id.to_string(),
            before,
            limit: self.page_limit,
        };
        let source = self.source;
        let query_ref = &query;
        let raw = self
            .retry
            .run(&format!("Comment query for {}", parent_id), move || {
                source.search_comments(query_ref)
            })
            .await?;

        Ok(raw.into_iter().map(ChildRecord::from_raw).collect())
    }
}

/// Oldest `created_at` on a page
fn oldest(page: &[ChildRecord]) -> Option<i64> {
    page.iter().map(|c| c.created_at).min()
}
