//! Score enrichment from the authenticated record API
//!
//! The search API stores a submission's score as it was when first indexed.
//! Current score and upvote ratio come from the official API, one lookup per
//! submission.

use crate::config::CredentialsConfig;
use crate::harvester::fetcher::send_json;
use crate::harvester::retry::RetryPolicy;
use crate::records::ParentRecord;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Current engagement figures for a submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordStats {
    pub score: i64,
    pub upvote_ratio: f64,
}

/// Point lookup of a submission by id
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(&self, id: &str) -> Result<RecordStats, FetchError>;
}

/// Adds current score and upvote ratio to every record, keeping input order
///
/// Each lookup is retried on its own, so one failing id never causes
/// already-enriched records to be fetched again. If a bounded retry policy
/// runs out for an id, that record is left without score fields.
pub async fn enrich(
    mut records: Vec<ParentRecord>,
    lookup: &dyn RecordLookup,
    retry: &RetryPolicy,
) -> Vec<ParentRecord> {
    tracing::info!("Finalizing submission data for {} submissions...", records.len());

    for record in records.iter_mut() {
        let id = record.id.as_str();
        match retry
            .run(&format!("Score lookup for {}", id), move || lookup.lookup(id))
            .await
        {
            Ok(stats) => {
                record.score = Some(stats.score);
                record.upvote_ratio = Some(stats.upvote_ratio);
            }
            Err(e) => {
                tracing::warn!(
                    "Leaving {} without score after {} attempts: {}",
                    e.operation,
                    e.attempts,
                    e.last
                );
            }
        }
    }

    records
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: SubmissionStats,
}

#[derive(Debug, Deserialize)]
struct SubmissionStats {
    score: i64,
    upvote_ratio: f64,
}

/// [`RecordLookup`] against the official API with an application-only token
///
/// The token is requested on first use with the client-credentials grant and
/// dropped when the API answers 401, so the next attempt fetches a new one.
pub struct RedditClient {
    client: Client,
    credentials: CredentialsConfig,
    token: Mutex<Option<String>>,
}

impl RedditClient {
    pub fn new(client: Client, credentials: CredentialsConfig) -> Self {
        Self {
            client,
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        let mut token = self.token.lock().await;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }

        tracing::debug!("Requesting access token from {}", self.credentials.token_url);
        let request = self
            .client
            .post(&self.credentials.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.secret_key),
            )
            .form(&[("grant_type", "client_credentials")]);
        let response: TokenResponse = send_json(request, &self.credentials.token_url).await?;

        *token = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    fn by_id_url(&self, id: &str) -> String {
        format!(
            "{}/by_id/t3_{}",
            self.credentials.oauth_base_url.trim_end_matches('/'),
            id
        )
    }
}

#[async_trait]
impl RecordLookup for RedditClient {
    async fn lookup(&self, id: &str) -> Result<RecordStats, FetchError> {
        let token = self.access_token().await?;
        let url = self.by_id_url(id);

        let result: Result<Listing, FetchError> =
            send_json(self.client.get(&url).bearer_auth(token), &url).await;

        let listing = match result {
            Ok(listing) => listing,
            Err(e) => {
                if matches!(e, FetchError::Status { status: 401, .. }) {
                    *self.token.lock().await = None;
                }
                return Err(e);
            }
        };

        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| RecordStats {
                score: child.data.score,
                upvote_ratio: child.data.upvote_ratio,
            })
            .ok_or_else(|| FetchError::MissingRecord { id: id.to_string() })
    }
}
