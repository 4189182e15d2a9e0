use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_USER_AGENT: &str = "promo-server/0.1 (promo code distribution)";

/// Authors excluded from the participant set; `[deleted]` is the platform's
/// sentinel for removed accounts and AutoModerator comments prove nothing.
const EXCLUDED_AUTHORS: [&str; 2] = ["[deleted]", "AutoModerator"];

/// Everything the gate needs from a discussion thread: who participated,
/// and what was said (lowercased, nested replies included).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadContent {
    pub handles: HashSet<String>,
    pub text: String,
}

#[async_trait]
pub trait ThreadFetcher: Send + Sync {
    async fn fetch_thread(&self, url: &str) -> Result<ThreadContent, Error>;
}

/// Fetches a reddit comment thread through the site's `.json` rendering of
/// the post page.
#[derive(Clone, Debug)]
pub struct RedditFetcher {
    client: reqwest::Client,
}

impl RedditFetcher {
    pub fn new() -> Result<RedditFetcher, Error> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(FETCH_USER_AGENT)
            .build()
            .map_err(Error::FailedVerificationCall)?;

        Ok(RedditFetcher { client })
    }
}

#[async_trait]
impl ThreadFetcher for RedditFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch_thread(&self, url: &str) -> Result<ThreadContent, Error> {
        let json_url = format!("{}.json", url.trim().trim_end_matches('/'));

        let listing: Value = self
            .client
            .get(&json_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| fetch_rejection(url, &err))?
            .json()
            .await
            .map_err(|err| fetch_rejection(url, &err))?;

        Ok(parse_listing(&listing))
    }
}

// A fetch or timeout failure is an expected, user-facing rejection; it must
// not consume a code or surface as a server error.
fn fetch_rejection(url: &str, err: &reqwest::Error) -> Error {
    tracing::warn!(url, error = %err, "thread fetch failed");
    Error::EngagementProofFailed {
        reason: format!("could not fetch the verification thread at {}", url),
    }
}

/// Walks a reddit listing response (`[post, comments]`), collecting comment
/// authors and bodies recursively through nested replies.
pub fn parse_listing(listing: &Value) -> ThreadContent {
    let mut handles = HashSet::new();
    let mut bodies = Vec::new();

    if let Some(comments) = listing
        .get(1)
        .and_then(|l| l.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
    {
        for comment in comments {
            collect_comment(comment, &mut handles, &mut bodies);
        }
    }

    ThreadContent {
        handles,
        text: bodies.join(" ").to_lowercase(),
    }
}

fn collect_comment(comment: &Value, handles: &mut HashSet<String>, bodies: &mut Vec<String>) {
    let data = &comment["data"];

    if let Some(author) = data.get("author").and_then(Value::as_str) {
        if !EXCLUDED_AUTHORS.contains(&author) {
            handles.insert(author.to_string());
            if let Some(body) = data.get("body").and_then(Value::as_str) {
                bodies.push(body.to_string());
            }
        }
    }

    if let Some(replies) = data
        .get("replies")
        .and_then(|r| r.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
    {
        for reply in replies {
            collect_comment(reply, handles, bodies);
        }
    }
}

/// Only discussion-thread urls on the supported platform are accepted as a
/// verification source.
pub fn is_thread_url(url: &str) -> bool {
    url.starts_with("http") && url.contains("reddit.com") && url.contains("/comments/")
}
