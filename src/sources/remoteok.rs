use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use super::{RawPosting, SourceAdapter, Throttle, http_client};
use crate::error::{SourceError, SourceErrorKind};
use crate::models::LocationType;

const REMOTEOK_API_URL: &str = "https://remoteok.com/api";

/// RemoteOK public feed. One download per run, filtered per query.
pub struct RemoteOk {
    client: reqwest::blocking::Client,
    throttle: Throttle,
    cap: usize,
    feed: Mutex<Option<Vec<FeedItem>>>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedItem {
    #[serde(default, deserialize_with = "id_as_string")]
    id: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    salary_min: Option<i64>,
    #[serde(default)]
    salary_max: Option<i64>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl RemoteOk {
    pub fn new(timeout: Duration, delay: Duration, cap: usize) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            throttle: Throttle::new(delay),
            cap,
            feed: Mutex::new(None),
        })
    }

    fn feed(&self) -> Result<Vec<FeedItem>, SourceError> {
        let mut cached = match self.feed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(items) = cached.as_ref() {
            return Ok(items.clone());
        }

        self.throttle.wait();
        debug!("Downloading RemoteOK feed");
        let response = self.client.get(REMOTEOK_API_URL).send()?.error_for_status()?;
        let values: Vec<serde_json::Value> = response
            .json()
            .map_err(|e| SourceError::new(SourceErrorKind::Http, format!("bad RemoteOK payload: {}", e)))?;
        let items = parse_feed(values);
        *cached = Some(items.clone());
        Ok(items)
    }
}

fn parse_feed(values: Vec<serde_json::Value>) -> Vec<FeedItem> {
    // The first element is a legal notice without an id
    values
        .into_iter()
        .filter_map(|v| serde_json::from_value::<FeedItem>(v).ok())
        .filter(|item| item.id.is_some() && item.position.is_some())
        .collect()
}

fn matches_query(item: &FeedItem, query: &str) -> bool {
    let position = item.position.as_deref().unwrap_or_default().to_lowercase();
    let tags: Vec<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() >= 3 && *word != "remote")
        .any(|word| position.contains(word) || tags.iter().any(|t| t == word))
}

fn to_raw(item: FeedItem) -> RawPosting {
    let raw = serde_json::json!({
        "id": item.id,
        "position": item.position,
        "company": item.company,
        "tags": item.tags,
    });
    RawPosting::Structured {
        source: "remoteok".to_string(),
        external_id: item.id,
        title: item.position.unwrap_or_default(),
        company: item.company,
        location: item.location.filter(|l| !l.trim().is_empty()).or_else(|| Some("Remote".to_string())),
        location_type: Some(LocationType::Remote),
        description: item.description,
        salary_min: item.salary_min.filter(|v| *v > 0),
        salary_max: item.salary_max.filter(|v| *v > 0),
        url: item.url,
        posted_at: item.date,
        raw: Some(raw),
    }
}

impl SourceAdapter for RemoteOk {
    fn name(&self) -> &str {
        "remoteok"
    }

    fn search(&self, query: &str, _location: &str) -> Result<Vec<RawPosting>, SourceError> {
        let postings: Vec<RawPosting> = self
            .feed()?
            .into_iter()
            .filter(|item| matches_query(item, query))
            .take(self.cap)
            .map(to_raw)
            .collect();

        info!(query, count = postings.len(), "RemoteOK results");
        if postings.is_empty() {
            return Err(SourceError::empty(format!("no remote postings for '{}'", query)));
        }
        Ok(postings)
    }
}
