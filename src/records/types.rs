//! Record definitions for harvested submissions and comments

use crate::records::clean::{normalize_text, strip_kind_prefix, without_marker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope returned by both search endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A submission as returned by the search API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_utc: i64,
    #[serde(default)]
    pub author_fullname: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub full_link: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
}

/// A comment as returned by the search API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComment {
    pub id: String,
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub subreddit_id: Option<String>,
    #[serde(default)]
    pub author_fullname: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_utc: i64,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub total_awards_received: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// A cleaned submission (parent record)
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRecord {
    pub id: String,
    pub title: String,
    /// Creation time, seconds since the Unix epoch
    pub created_at: i64,
    /// Creation time as a UTC datetime, used to place comment shards
    pub date: DateTime<Utc>,
    pub author_id: String,
    pub author_name: String,
    pub child_count: u64,
    pub permalink: String,
    pub body_text: String,
    /// Current score from the record API, set by enrichment
    pub score: Option<i64>,
    /// Current upvote ratio from the record API, set by enrichment
    pub upvote_ratio: Option<f64>,
}

impl ParentRecord {
    /// Cleans a raw submission payload
    pub fn from_raw(raw: RawSubmission) -> Self {
        let author_id = raw
            .author_fullname
            .as_deref()
            .map(strip_kind_prefix)
            .unwrap_or_default()
            .to_string();

        Self {
            date: DateTime::from_timestamp(raw.created_utc, 0).unwrap_or_default(),
            created_at: raw.created_utc,
            title: normalize_text(&raw.title),
            author_id,
            author_name: without_marker(raw.author.as_deref()).unwrap_or_default(),
            child_count: raw.num_comments,
            permalink: raw.full_link.unwrap_or_default(),
            body_text: raw.selftext.as_deref().map(normalize_text).unwrap_or_default(),
            id: raw.id,
            score: None,
            upvote_ratio: None,
        }
    }
}

/// A cleaned comment (child record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    pub id: String,
    /// Submission this comment belongs to
    pub parent_id: String,
    /// Subreddit name
    pub container: Option<String>,
    /// Subreddit id without kind prefix
    pub container_id: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    /// Creation time, seconds since the Unix epoch
    pub created_at: i64,
    pub score: Option<i64>,
    pub award_count: u64,
    pub body_text: String,
    /// Comment or submission this comment replies to, without kind prefix
    pub reply_to_id: Option<String>,
}

impl ChildRecord {
    /// Cleans a raw comment payload
    pub fn from_raw(raw: RawComment) -> Self {
        let strip = |value: Option<String>| {
            without_marker(value.as_deref()).map(|v| strip_kind_prefix(&v).to_string())
        };

        Self {
            parent_id: strip(raw.link_id).unwrap_or_default(),
            container: without_marker(raw.subreddit.as_deref()),
            container_id: strip(raw.subreddit_id),
            author_id: strip(raw.author_fullname),
            author_name: without_marker(raw.author.as_deref()),
            created_at: raw.created_utc,
            score: raw.score,
            award_count: raw.total_awards_received,
            body_text: raw.body.as_deref().map(normalize_text).unwrap_or_default(),
            reply_to_id: strip(raw.parent_id),
            id: raw.id,
        }
    }
}

/// Row layout of a comment shard file
#[derive(Debug, Serialize)]
pub struct CommentRow<'a> {
    pub comment_id: &'a str,
    pub submission_id: &'a str,
    pub subreddit: Option<&'a str>,
    pub subreddit_id: Option<&'a str>,
    pub author_id: Option<&'a str>,
    pub author: Option<&'a str>,
    pub dt: i64,
    pub score: Option<i64>,
    pub awards_received: u64,
    pub body: &'a str,
    pub parent_id: Option<&'a str>,
}

impl<'a> From<&'a ChildRecord> for CommentRow<'a> {
    fn from(record: &'a ChildRecord) -> Self {
        Self {
            comment_id: &record.id,
            submission_id: &record.parent_id,
            subreddit: record.container.as_deref(),
            subreddit_id: record.container_id.as_deref(),
            author_id: record.author_id.as_deref(),
            author: record.author_name.as_deref(),
            dt: record.created_at,
            score: record.score,
            awards_received: record.award_count,
            body: &record.body_text,
            parent_id: record.reply_to_id.as_deref(),
        }
    }
}

/// Entry layout of `submission_data.json`; field order is part of the format
#[derive(Debug, Serialize)]
pub struct SubmissionRow<'a> {
    pub created_utc: i64,
    pub id: &'a str,
    pub title: &'a str,
    pub author_fullname: &'a str,
    pub author: &'a str,
    pub num_comments: u64,
    pub full_link: &'a str,
    pub selftext: &'a str,
    pub score: Option<i64>,
    pub upvote_ratio: Option<f64>,
}

impl<'a> From<&'a ParentRecord> for SubmissionRow<'a> {
    fn from(record: &'a ParentRecord) -> Self {
        Self {
            created_utc: record.created_at,
            id: &record.id,
            title: &record.title,
            author_fullname: &record.author_id,
            author: &record.author_name,
            num_comments: record.child_count,
            full_link: &record.permalink,
            selftext: &record.body_text,
            score: record.score,
            upvote_ratio: record.upvote_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_from_raw() {
        let raw: RawSubmission = serde_json::from_str(
            r#"{
                "id": "kolt8y",
                "title": "  What   happened\nhere? ",
                "created_utc": 1609459200,
                "author_fullname": "t2_abcde",
                "author": "[deleted]",
                "num_comments": 42,
                "full_link": "https://www.reddit.com/r/test/comments/kolt8y/",
                "selftext": "[removed]",
                "score": 1
            }"#,
        )
        .unwrap();

        let record = ParentRecord::from_raw(raw);
        assert_eq!(record.id, "kolt8y");
        assert_eq!(record.title, "What happened here?");
        assert_eq!(record.author_id, "abcde");
        assert_eq!(record.author_name, "");
        assert_eq!(record.body_text, "");
        assert_eq!(record.child_count, 42);
        assert_eq!(record.date.to_rfc3339(), "2021-01-01T00:00:00+00:00");
        assert_eq!(record.score, None);
    }

    #[test]
    fn test_child_from_raw() {
        let raw: RawComment = serde_json::from_str(
            r#"{
                "id": "gfx1",
                "link_id": "t3_kolt8y",
                "subreddit": "test",
                "subreddit_id": "t5_2qh1i",
                "author_fullname": "t2_qqq",
                "author": "someone",
                "created_utc": 1609459300,
                "score": 7,
                "body": "first\nsecond   third",
                "parent_id": "t1_gfx0"
            }"#,
        )
        .unwrap();

        let record = ChildRecord::from_raw(raw);
        assert_eq!(record.parent_id, "kolt8y");
        assert_eq!(record.container_id.as_deref(), Some("2qh1i"));
        assert_eq!(record.author_id.as_deref(), Some("qqq"));
        assert_eq!(record.reply_to_id.as_deref(), Some("gfx0"));
        assert_eq!(record.body_text, "first second third");
        assert_eq!(record.award_count, 0);
        assert_eq!(record.score, Some(7));
    }

    #[test]
    fn test_child_missing_fields_default() {
        let raw: RawComment = serde_json::from_str(r#"{"id": "x", "author": "[deleted]"}"#).unwrap();
        let record = ChildRecord::from_raw(raw);

        assert_eq!(record.created_at, 0);
        assert_eq!(record.author_name, None);
        assert_eq!(record.parent_id, "");
        assert_eq!(record.body_text, "");
    }

    #[test]
    fn test_empty_response_decodes() {
        let response: SearchResponse<RawComment> = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(response.data.is_empty());
    }
}
