//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the search and record APIs and
//! run the full harvest cycle end-to-end against a temporary data directory.

use reddit_harvester::config::{parse_config, Config};
use reddit_harvester::harvest;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// 2021-01-01T00:00:00Z
const DAY: i64 = 1_609_459_200;

/// Matches on the `before` query parameter, including its absence
struct Before(Option<i64>);

impl Match for Before {
    fn matches(&self, request: &Request) -> bool {
        let before = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "before")
            .and_then(|(_, value)| value.parse::<i64>().ok());
        before == self.0
    }
}

/// Creates a one-day test configuration pointed at the mock server
fn create_test_config(server: &MockServer, data_dir: &Path, extra: &str) -> Config {
    let mut config = parse_config(&format!(
        r#"
[harvest]
start-date = "2021-01-01"
end-date = "2021-01-02"
subreddit = "test"
results-per-day = 2

[api]
search-base-url = "{}"
pacing-ms = 0

[retry]
delay-secs = 0

[output]
data-dir = "{}"
{}
"#,
        server.uri(),
        data_dir.display(),
        extra
    ))
    .expect("Failed to parse test config");
    config.api.timeout_secs = 5;
    config
}

fn submission(id: &str, created_utc: i64, num_comments: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Submission {}", id),
        "created_utc": created_utc,
        "author_fullname": "t2_author",
        "author": "author",
        "num_comments": num_comments,
        "full_link": format!("https://www.reddit.com/r/test/comments/{}/", id),
        "selftext": "",
    })
}

/// `count` comments on `link_id`, newest first, starting at `newest`
fn comment_page(link_id: &str, prefix: &str, count: i64, newest: i64) -> Value {
    let data: Vec<Value> = (0..count)
        .map(|n| {
            json!({
                "id": format!("{}{}", prefix, n),
                "link_id": format!("t3_{}", link_id),
                "subreddit": "test",
                "subreddit_id": "t5_2qh1i",
                "author_fullname": "t2_commenter",
                "author": "commenter",
                "created_utc": newest - n,
                "score": 1,
                "total_awards_received": 0,
                "body": format!("comment {}", n),
                "parent_id": format!("t3_{}", link_id),
            })
        })
        .collect();
    json!({ "data": data })
}

async fn mount_submissions(server: &MockServer, submissions: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/reddit/search/submission/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": submissions })))
        .mount(server)
        .await;
}

async fn mount_comments(server: &MockServer, link_id: &str, before: Option<i64>, body: Value) {
    Mock::given(method("GET"))
        .and(path("/reddit/comment/search/"))
        .and(query_param("link_id", link_id))
        .and(Before(before))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn shard(data_dir: &Path, name: &str) -> std::path::PathBuf {
    data_dir.join("comment_data/2021/1/1").join(name)
}

fn csv_rows(path: &Path) -> usize {
    let content = std::fs::read_to_string(path).expect("Failed to read shard");
    // Header line excluded
    content.lines().count() - 1
}

#[tokio::test]
async fn test_single_day_harvest() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_submissions(
        &server,
        vec![submission("aaa", DAY + 100, 5), submission("bbb", DAY + 200, 0)],
    )
    .await;
    mount_comments(&server, "aaa", None, comment_page("aaa", "a", 5, DAY + 5000)).await;
    mount_comments(&server, "bbb", None, json!({ "data": [] })).await;

    let config = create_test_config(&server, dir.path(), "");
    let summary = harvest(config)
        .await
        .expect("Harvest failed")
        .expect("Date range rejected");

    assert_eq!(summary.parents, 2);
    assert_eq!(summary.child_records, 5);
    assert_eq!(summary.shards, 1);

    let first = shard(dir.path(), "aaa_comments_01.csv");
    assert!(first.exists());
    assert_eq!(csv_rows(&first), 5);
    assert!(!shard(dir.path(), "aaa_comments_02.csv").exists());
    assert!(!shard(dir.path(), "bbb_comments_01.csv").exists());

    let header = std::fs::read_to_string(&first).unwrap();
    assert!(header.starts_with(
        "comment_id,submission_id,subreddit,subreddit_id,author_id,author,dt,score,awards_received,body,parent_id"
    ));

    let submissions: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("submission_data.json")).unwrap(),
    )
    .unwrap();
    let submissions = submissions.as_array().unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0]["id"], "aaa");
    assert_eq!(submissions[0]["author_fullname"], "author");
    assert_eq!(submissions[0]["score"], Value::Null);
}

#[tokio::test]
async fn test_full_page_continues_before_oldest() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let newest = DAY + 20_000;
    let first_oldest = newest - 8999;
    let second_newest = first_oldest - 1;
    let second_oldest = second_newest - 499;

    mount_submissions(&server, vec![submission("big", DAY + 100, 9500)]).await;
    mount_comments(&server, "big", None, comment_page("big", "p1_", 9000, newest)).await;
    mount_comments(
        &server,
        "big",
        Some(first_oldest),
        comment_page("big", "p2_", 500, second_newest),
    )
    .await;
    mount_comments(&server, "big", Some(second_oldest), json!({ "data": [] })).await;

    let config = create_test_config(&server, dir.path(), "");
    let summary = harvest(config).await.unwrap().unwrap();

    assert_eq!(summary.child_records, 9500);
    assert_eq!(summary.shards, 2);
    assert_eq!(csv_rows(&shard(dir.path(), "big_comments_01.csv")), 9000);
    assert_eq!(csv_rows(&shard(dir.path(), "big_comments_02.csv")), 500);
    assert!(!shard(dir.path(), "big_comments_03.csv").exists());
}

#[tokio::test]
async fn test_repeated_page_stops_pagination() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let newest = DAY + 20_000;
    let page = comment_page("loop", "c", 9000, newest);

    mount_submissions(&server, vec![submission("loop", DAY + 100, 9000)]).await;
    mount_comments(&server, "loop", None, page.clone()).await;
    Mock::given(method("GET"))
        .and(path("/reddit/comment/search/"))
        .and(query_param("link_id", "loop"))
        .and(Before(Some(newest - 8999)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), "");
    let summary = harvest(config).await.unwrap().unwrap();

    assert_eq!(summary.shards, 1);
    assert_eq!(summary.child_records, 9000);
    assert!(shard(dir.path(), "loop_comments_01.csv").exists());
    assert!(!shard(dir.path(), "loop_comments_02.csv").exists());
}

#[tokio::test]
async fn test_rejected_date_range() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");

    let mut config = create_test_config(&server, &data_dir, "");
    config.harvest.end_date = config.harvest.start_date;

    let result = harvest(config).await.unwrap();

    assert!(result.is_none());
    assert!(!data_dir.exists());
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/reddit/search/submission/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_submissions(&server, vec![submission("aaa", DAY + 100, 3)]).await;
    mount_comments(&server, "aaa", None, comment_page("aaa", "a", 3, DAY + 5000)).await;

    let config = create_test_config(&server, dir.path(), "");
    let summary = harvest(config).await.unwrap().unwrap();

    assert_eq!(summary.parents, 1);
    assert_eq!(summary.child_records, 3);
}

#[tokio::test]
async fn test_submissions_enriched_with_scores() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_submissions(&server, vec![submission("aaa", DAY + 100, 0)]).await;
    mount_comments(&server, "aaa", None, json!({ "data": [] })).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/by_id/t3_aaa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "children": [ { "data": { "score": 42, "upvote_ratio": 0.9 } } ] }
        })))
        .mount(&server)
        .await;

    let credentials = format!(
        r#"
[credentials]
client-id = "id"
secret-key = "secret"
token-url = "{uri}/api/v1/access_token"
oauth-base-url = "{uri}"
"#,
        uri = server.uri()
    );
    let config = create_test_config(&server, dir.path(), &credentials);
    harvest(config).await.unwrap().unwrap();

    let submissions: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("submission_data.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(submissions[0]["score"], 42);
    assert_eq!(submissions[0]["upvote_ratio"], 0.9);
}
