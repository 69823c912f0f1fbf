use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

/// How submissions are collected over the date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    /// Top-N submissions per calendar day
    #[default]
    Top,
    /// Every submission in the range, paged forward by timestamp
    All,
}

/// What to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// First day to harvest (inclusive, UTC)
    #[serde(rename = "start-date")]
    pub start_date: NaiveDate,

    /// Day after the last day to harvest (exclusive, UTC)
    #[serde(rename = "end-date")]
    pub end_date: NaiveDate,

    /// Subreddit name without the `r/` prefix
    pub subreddit: String,

    /// Optional term that must appear in submission titles
    #[serde(rename = "search-term", default)]
    pub search_term: Option<String>,

    /// Field the search API sorts submissions by (descending)
    #[serde(rename = "sort-type", default = "default_sort_type")]
    pub sort_type: String,

    /// Number of submissions requested per day bucket
    #[serde(rename = "results-per-day", default = "default_results_per_day")]
    pub results_per_day: u32,

    #[serde(default)]
    pub mode: CollectionMode,

    /// Skip submissions whose first comment shard is already on disk
    #[serde(default = "default_true")]
    pub resume: bool,
}

/// Search API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "search-base-url", default = "default_search_base_url")]
    pub search_base_url: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay after every successful submission query (milliseconds)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            search_base_url: default_search_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

/// Retry behavior for network calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Fixed delay between attempts (seconds)
    #[serde(rename = "delay-secs", default = "default_retry_delay_secs")]
    pub delay_secs: u64,

    /// Attempts before giving up; 0 retries forever
    #[serde(rename = "max-attempts", default)]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_retry_delay_secs(),
            max_attempts: 0,
        }
    }
}

/// Comment pagination limits
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Pages at least this large trigger another request
    #[serde(default = "default_cutoff")]
    pub cutoff: usize,

    /// `limit` sent with every comment query
    #[serde(rename = "page-limit", default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            page_limit: default_page_limit(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for all harvested data
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl OutputConfig {
    /// Directory under which comment shards are sharded by date
    pub fn comment_root(&self) -> PathBuf {
        self.data_dir.join("comment_data")
    }

    /// File holding the enriched submission set
    pub fn submission_path(&self) -> PathBuf {
        self.data_dir.join("submission_data.json")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Application credentials for the authenticated record API
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(rename = "client-id")]
    pub client_id: String,

    #[serde(rename = "secret-key")]
    pub secret_key: String,

    #[serde(rename = "token-url", default = "default_token_url")]
    pub token_url: String,

    #[serde(rename = "oauth-base-url", default = "default_oauth_base_url")]
    pub oauth_base_url: String,
}

fn default_sort_type() -> String {
    "num_comments".to_string()
}

fn default_results_per_day() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_search_base_url() -> String {
    "https://api.pushshift.io".to_string()
}

fn default_user_agent() -> String {
    "SubmissionDataScraper/0.0.1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_retry_delay_secs() -> u64 {
    10
}

// Margin below the search API's hard cap of 10000 results per query
fn default_cutoff() -> usize {
    9000
}

fn default_page_limit() -> usize {
    10000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_token_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

fn default_oauth_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}
