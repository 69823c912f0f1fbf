//! Windowed submission collection
//!
//! Two ways of turning a date range into a set of submissions:
//!
//! - [`WindowedCollector::collect_top`] issues one query per calendar day and
//!   keeps the top N by a sort key. Cheap and predictable.
//! - [`WindowedCollector::collect_all`] pages forward through the whole range
//!   using the newest timestamp seen as the next lower bound. Complete, but
//!   far more requests; meant for quiet subreddits.

use crate::harvester::retry::RetryPolicy;
use crate::harvester::source::{SearchSource, SubmissionQuery};
use crate::records::{ParentRecord, RawSubmission};
use crate::Result;
use chrono::{NaiveDate, NaiveTime};
use std::time::Duration;

/// Length of one day bucket
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Page size used by the unbounded collection mode
pub const ALL_MODE_PAGE_LIMIT: u32 = 100;

/// A half-open range of calendar days `[start, end)`, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` unless `end` is after `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every day in the range, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn start_timestamp(&self) -> i64 {
        day_start(self.start)
    }

    pub fn end_timestamp(&self) -> i64 {
        day_start(self.end)
    }
}

/// Midnight UTC of `day` in epoch seconds
pub fn day_start(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Collects submissions over a date range
pub struct WindowedCollector<'a> {
    source: &'a dyn SearchSource,
    retry: &'a RetryPolicy,
    pacing: Duration,
}

impl<'a> WindowedCollector<'a> {
    /// Creates a collector
    ///
    /// # Arguments
    ///
    /// * `source` - The search API
    /// * `retry` - Policy wrapped around every query
    /// * `pacing` - Pause after every successful query
    pub fn new(source: &'a dyn SearchSource, retry: &'a RetryPolicy, pacing: Duration) -> Self {
        Self {
            source,
            retry,
            pacing,
        }
    }

    /// Collects the top `per_day_limit` submissions of every day in `range`
    ///
    /// Days without submissions contribute nothing; collection moves on to
    /// the next day. Results keep day order, and within a day the API's
    /// descending `sort_type` order.
    pub async fn collect_top(
        &self,
        range: &DateRange,
        subreddit: &str,
        search_term: Option<&str>,
        sort_type: &str,
        per_day_limit: u32,
    ) -> Result<Vec<ParentRecord>> {
        let mut collected: Vec<RawSubmission> = Vec::new();

        for day in range.days() {
            let after = day_start(day);
            let query = SubmissionQuery {
                subreddit: subreddit.to_string(),
                search_term: search_term.map(str::to_string),
                after,
                before: after + SECONDS_PER_DAY,
                sort_type: Some(sort_type.to_string()),
                limit: per_day_limit,
            };

            let batch = self
                .query(&format!("Submission query for {}", day), &query)
                .await?;

            if batch.is_empty() {
                tracing::info!("{}: no submissions", day);
            } else {
                tracing::info!("{}: {} submissions", day, batch.len());
                collected.extend(batch);
            }

            self.pace().await;
        }

        Ok(clean(collected))
    }

    /// Collects every submission in `range`
    ///
    /// Pages forward from the start of the range, moving the lower bound to
    /// the newest `created_utc` seen, until a query comes back empty or the
    /// bound stops advancing.
    pub async fn collect_all(
        &self,
        range: &DateRange,
        subreddit: &str,
        search_term: Option<&str>,
    ) -> Result<Vec<ParentRecord>> {
        let end = range.end_timestamp();
        let mut cursor = range.start_timestamp();
        let mut collected: Vec<RawSubmission> = Vec::new();

        while cursor <= end {
            let query = SubmissionQuery {
                subreddit: subreddit.to_string(),
                search_term: search_term.map(str::to_string),
                after: cursor,
                before: end,
                sort_type: None,
                limit: ALL_MODE_PAGE_LIMIT,
            };

            let batch = self
                .query(&format!("Submission query after {}", cursor), &query)
                .await?;

            let Some(newest) = batch.iter().map(|s| s.created_utc).max() else {
                break;
            };
            collected.extend(batch);

            if newest <= cursor {
                tracing::warn!(
                    "Submission cursor did not advance past {}, stopping collection",
                    cursor
                );
                break;
            }

            tracing::debug!(
                "Collected {} submissions, cursor {} -> {}",
                collected.len(),
                cursor,
                newest
            );
            cursor = newest;

            self.pace().await;
        }

        Ok(clean(collected))
    }

    async fn query(&self, label: &str, query: &SubmissionQuery) -> Result<Vec<RawSubmission>> {
        let source = self.source;
        let batch = self
            .retry
            .run(label, move || source.search_submissions(query))
            .await?;
        Ok(batch)
    }

    async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

fn clean(raw: Vec<RawSubmission>) -> Vec<ParentRecord> {
    raw.into_iter().map(ParentRecord::from_raw).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvester::source::CommentQuery;
    use crate::records::RawComment;
    use crate::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned submissions keyed by the query's `after` bound
    #[derive(Default)]
    struct CannedSource {
        by_after: HashMap<i64, Vec<RawSubmission>>,
        failures_left: Mutex<u32>,
        queries: Mutex<Vec<SubmissionQuery>>,
    }

    #[async_trait]
    impl SearchSource for CannedSource {
        async fn search_submissions(
            &self,
            query: &SubmissionQuery,
        ) -> std::result::Result<Vec<RawSubmission>, FetchError> {
            {
                let mut failures = self.failures_left.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(FetchError::Status {
                        url: "canned".to_string(),
                        status: 503,
                    });
                }
            }
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.by_after.get(&query.after).cloned().unwrap_or_default())
        }

        async fn search_comments(
            &self,
            _query: &CommentQuery,
        ) -> std::result::Result<Vec<RawComment>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn submission(id: &str, created_utc: i64) -> RawSubmission {
        RawSubmission {
            id: id.to_string(),
            title: format!("title {}", id),
            created_utc,
            ..Default::default()
        }
    }

    #[test]
    fn test_date_range_rejects_empty_and_inverted() {
        assert!(DateRange::new(date(2021, 1, 2), date(2021, 1, 2)).is_none());
        assert!(DateRange::new(date(2021, 1, 2), date(2021, 1, 1)).is_none());
        assert!(DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).is_some());
    }

    #[test]
    fn test_days_are_half_open() {
        let range = DateRange::new(date(2021, 1, 30), date(2021, 2, 2)).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days, vec![date(2021, 1, 30), date(2021, 1, 31), date(2021, 2, 1)]);
        assert_eq!(range.num_days(), 3);
    }

    #[test]
    fn test_day_start() {
        assert_eq!(day_start(date(2021, 1, 1)), 1_609_459_200);
    }

    #[tokio::test]
    async fn test_collect_top_one_query_per_day() {
        let mut source = CannedSource::default();
        source.by_after.insert(
            1_609_459_200,
            vec![submission("a", 1_609_460_000), submission("b", 1_609_470_000)],
        );
        // 2021-01-02 has no submissions
        source
            .by_after
            .insert(1_609_632_000, vec![submission("c", 1_609_640_000)]);

        let retry = RetryPolicy::forever(Duration::ZERO);
        let collector = WindowedCollector::new(&source, &retry, Duration::ZERO);
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 4)).unwrap();

        let records = collector
            .collect_top(&range, "test", None, "num_comments", 2)
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let queries = source.queries.lock().unwrap();
        assert_eq!(queries.len(), 3);
        for query in queries.iter() {
            assert_eq!(query.before - query.after, SECONDS_PER_DAY);
            assert_eq!(query.limit, 2);
            assert_eq!(query.sort_type.as_deref(), Some("num_comments"));
        }
    }

    #[tokio::test]
    async fn test_collect_top_retries_failed_day() {
        let mut source = CannedSource::default();
        source
            .by_after
            .insert(1_609_459_200, vec![submission("a", 1_609_460_000)]);
        source.failures_left = Mutex::new(2);

        let retry = RetryPolicy::forever(Duration::ZERO);
        let collector = WindowedCollector::new(&source, &retry, Duration::ZERO);
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).unwrap();

        let records = collector
            .collect_top(&range, "test", None, "score", 5)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_top_bounded_retry_surfaces_error() {
        let source = CannedSource {
            failures_left: Mutex::new(10),
            ..Default::default()
        };

        let retry = RetryPolicy::bounded(Duration::ZERO, 2);
        let collector = WindowedCollector::new(&source, &retry, Duration::ZERO);
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).unwrap();

        let result = collector.collect_top(&range, "test", None, "score", 5).await;
        assert!(matches!(
            result,
            Err(crate::HarvestError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_collect_all_pages_forward() {
        let start = day_start(date(2021, 1, 1));
        let mut source = CannedSource::default();
        source.by_after.insert(
            start,
            vec![submission("a", start + 10), submission("b", start + 50)],
        );
        source
            .by_after
            .insert(start + 50, vec![submission("c", start + 90)]);

        let retry = RetryPolicy::forever(Duration::ZERO);
        let collector = WindowedCollector::new(&source, &retry, Duration::ZERO);
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).unwrap();

        let records = collector.collect_all(&range, "test", None).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let queries = source.queries.lock().unwrap();
        let afters: Vec<i64> = queries.iter().map(|q| q.after).collect();
        assert_eq!(afters, vec![start, start + 50, start + 90]);
        assert!(queries.iter().all(|q| q.before == range.end_timestamp()));
        assert!(queries.iter().all(|q| q.sort_type.is_none()));
    }

    #[tokio::test]
    async fn test_collect_all_stops_when_cursor_stalls() {
        let start = day_start(date(2021, 1, 1));
        let mut source = CannedSource::default();
        // Misbehaving API: returns a record at the lower bound itself
        source.by_after.insert(start, vec![submission("a", start)]);

        let retry = RetryPolicy::forever(Duration::ZERO);
        let collector = WindowedCollector::new(&source, &retry, Duration::ZERO);
        let range = DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).unwrap();

        let records = collector.collect_all(&range, "test", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source.queries.lock().unwrap().len(), 1);
    }
}
