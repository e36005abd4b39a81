use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{RawPosting, SourceAdapter, Throttle, http_client};
use crate::error::{SourceError, SourceErrorKind};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Hosts whose result pages are individual job advertisements.
const JOB_BOARDS: &[&str] = &[
    "linkedin.com/jobs",
    "indeed.com",
    "glassdoor.com",
    "ziprecruiter.com",
    "monster.com",
    "simplyhired.com",
    "rigzone.com",
    "ehscareers.com",
];

/// Web search through the Brave Search API, restricted to job boards.
pub struct BraveSearch {
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    throttle: Throttle,
    cap: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl BraveSearch {
    pub fn new(api_key: Option<String>, timeout: Duration, delay: Duration, cap: usize) -> Result<Self, SourceError> {
        Ok(Self {
            api_key,
            client: http_client(timeout)?,
            throttle: Throttle::new(delay),
            cap,
        })
    }
}

fn build_query(query: &str, location: &str) -> String {
    let sites = ["linkedin.com/jobs", "indeed.com", "glassdoor.com"]
        .iter()
        .map(|s| format!("site:{}", s))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("\"{}\" jobs {} ({})", query, location, sites)
}

fn is_job_board(url: &str) -> bool {
    let lower = url.to_lowercase();
    JOB_BOARDS.iter().any(|board| lower.contains(board))
}

fn parse_results(body: SearchResponse, cap: usize) -> Vec<RawPosting> {
    body.web
        .map(|w| w.results)
        .unwrap_or_default()
        .into_iter()
        .filter(|r| is_job_board(&r.url))
        .take(cap)
        .map(|r| {
            let raw = serde_json::json!({ "url": r.url, "title": r.title });
            RawPosting::SearchHit {
                source: "brave".to_string(),
                url: r.url,
                page_title: r.title,
                snippet: r.description,
                raw: Some(raw),
            }
        })
        .collect()
}

impl SourceAdapter for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    fn search(&self, query: &str, location: &str) -> Result<Vec<RawPosting>, SourceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| SourceError::auth_missing("brave"))?;

        self.throttle.wait();
        let q = build_query(query, location);
        debug!(q = %q, "Brave search");
        let count = self.cap.min(20).to_string();
        let response = self
            .client
            .get(BRAVE_API_URL)
            .query(&[("q", q.as_str()), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()?;

        if response.status().as_u16() == 401 {
            return Err(SourceError::new(SourceErrorKind::AuthMissing, "Brave rejected the subscription token"));
        }
        let body: SearchResponse = response
            .error_for_status()?
            .json()
            .map_err(|e| SourceError::new(SourceErrorKind::Http, format!("bad Brave payload: {}", e)))?;

        let postings = parse_results(body, self.cap);
        info!(query, count = postings.len(), "Brave results");
        if postings.is_empty() {
            return Err(SourceError::empty(format!("no job-board hits for '{}'", query)));
        }
        Ok(postings)
    }
}
