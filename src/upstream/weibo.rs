//! Content fetcher backed by the weibo.com ajax timeline API.

use crate::config::WeiboConfig;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::types::Post;
use crate::upstream::{ContentFetcher, send_json};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const SERVICE: &str = "Weibo";

#[allow(clippy::expect_used)]
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("hardcoded tag pattern"));

/// Remove HTML tags, keeping the text between them.
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Option<TimelineData>,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineData {
    #[serde(default)]
    list: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    text_raw: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl RawPost {
    fn into_post(self) -> Option<Post> {
        let raw = self
            .text_raw
            .filter(|t| !t.is_empty())
            .or(self.text)
            .unwrap_or_default();
        let text = strip_html(&raw);
        if text.is_empty() {
            return None;
        }

        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Some(Post {
            id,
            text,
            created_at: self.created_at.unwrap_or_default(),
        })
    }
}

/// Turn a timeline response body into at most `max_posts` posts.
///
/// The cap applies to the raw list first; items whose stripped text is empty
/// are then dropped, so fewer than `max_posts` may come back.
fn parse_timeline(response: TimelineResponse, max_posts: usize) -> Vec<Post> {
    response
        .data
        .unwrap_or_default()
        .list
        .into_iter()
        .take(max_posts)
        .filter_map(RawPost::into_post)
        .collect()
}

/// Fetches a user's latest posts from weibo.com.
pub struct WeiboFetcher {
    client: reqwest::Client,
    base_url: String,
    cookie: String,
    max_posts: usize,
    timeout: Duration,
}

impl WeiboFetcher {
    pub fn new(client: reqwest::Client, config: &WeiboConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie: config.cookie.clone(),
            max_posts: config.max_posts.min(defaults::MAX_POSTS),
            timeout: config.timeout(),
        }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for WeiboFetcher {
    async fn fetch_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        let url = format!("{}/ajax/statuses/mymblog", self.base_url);
        let request = self
            .client
            .get(url)
            .query(&[("uid", user_id), ("page", "1"), ("feature", "0")])
            .header(reqwest::header::USER_AGENT, defaults::WEIBO_USER_AGENT)
            .header(reqwest::header::COOKIE, &self.cookie)
            .header(
                reqwest::header::REFERER,
                format!("https://weibo.com/u/{user_id}"),
            )
            .timeout(self.timeout);

        let response: TimelineResponse = send_json(SERVICE, request).await?;
        let posts = parse_timeline(response, self.max_posts);
        tracing::debug!(user_id, count = posts.len(), "fetched posts");
        Ok(posts)
    }
}
