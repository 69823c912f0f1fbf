//! Search API access
//!
//! [`SearchSource`] is the seam the collectors and the paginator talk to.
//! [`PushshiftClient`] implements it against the public search API, which
//! exposes two endpoints:
//!
//! | Endpoint | Parameters |
//! |----------|------------|
//! | `/reddit/search/submission/` | `q`, `subreddit`, `after`, `before`, `sort_type`, `sort`, `limit` |
//! | `/reddit/comment/search/` | `link_id`, `before`, `limit` |
//!
//! Both answer with `{"data": [...]}`.

use crate::config::ApiConfig;
use crate::harvester::fetcher::{build_http_client, fetch_json};
use crate::records::{RawComment, RawSubmission, SearchResponse};
use crate::{FetchError, HarvestError};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const SUBMISSION_PATH: &str = "reddit/search/submission/";
const COMMENT_PATH: &str = "reddit/comment/search/";

/// A time-bounded submission search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub subreddit: String,
    /// Term that must appear in the title
    pub search_term: Option<String>,
    /// Exclusive lower bound, epoch seconds
    pub after: i64,
    /// Exclusive upper bound, epoch seconds
    pub before: i64,
    /// Field to sort by, descending; `None` leaves the API's default order
    pub sort_type: Option<String>,
    pub limit: u32,
}

/// One page of a submission's comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentQuery {
    /// Submission id, without kind prefix
    pub link_id: String,
    /// Exclusive upper time bound; `None` for the newest page
    pub before: Option<i64>,
    pub limit: usize,
}

/// Read-only access to the search API
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Runs a submission search
    async fn search_submissions(
        &self,
        query: &SubmissionQuery,
    ) -> Result<Vec<RawSubmission>, FetchError>;

    /// Fetches one page of comments for a submission
    async fn search_comments(&self, query: &CommentQuery) -> Result<Vec<RawComment>, FetchError>;
}

/// [`SearchSource`] backed by the Pushshift HTTP API
#[derive(Debug, Clone)]
pub struct PushshiftClient {
    client: Client,
    base_url: Url,
}

impl PushshiftClient {
    /// Creates a client for the API rooted at `base_url`
    pub fn new(client: Client, base_url: &str) -> Result<Self, FetchError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Builds the HTTP client and API root from the `[api]` config section
    pub fn from_config(config: &ApiConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;
        Ok(Self::new(client, &config.search_base_url)?)
    }

    /// Assembles the submission search URL
    pub fn submission_url(&self, query: &SubmissionQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.join(SUBMISSION_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(term) = query.search_term.as_deref().filter(|t| !t.is_empty()) {
                pairs.append_pair("q", term);
            }
            pairs
                .append_pair("subreddit", &query.subreddit)
                .append_pair("after", &query.after.to_string())
                .append_pair("before", &query.before.to_string());
            if let Some(sort_type) = &query.sort_type {
                pairs
                    .append_pair("sort_type", sort_type)
                    .append_pair("sort", "desc");
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }
        Ok(url)
    }

    /// Assembles the comment search URL
    pub fn comment_url(&self, query: &CommentQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.join(COMMENT_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("link_id", &query.link_id);
            if let Some(before) = query.before {
                pairs.append_pair("before", &before.to_string());
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl SearchSource for PushshiftClient {
    async fn search_submissions(
        &self,
        query: &SubmissionQuery,
    ) -> Result<Vec<RawSubmission>, FetchError> {
        let url = self.submission_url(query)?;
        let response: SearchResponse<RawSubmission> =
            fetch_json(&self.client, url.as_str()).await?;
        Ok(response.data)
    }

    async fn search_comments(&self, query: &CommentQuery) -> Result<Vec<RawComment>, FetchError> {
        let url = self.comment_url(query)?;
        let response: SearchResponse<RawComment> = fetch_json(&self.client, url.as_str()).await?;
        Ok(response.data)
    }
}
