//! Job board adapters.
//!
//! Each adapter turns a (query, location) pair into [`RawPosting`]s. Adapters
//! never touch storage and never panic on expected conditions; those come back
//! as a [`SourceError`].

mod brave;
mod careers;
mod remoteok;
mod usajobs;

pub use brave::BraveSearch;
pub use careers::CareersPages;
pub use remoteok::RemoteOk;
pub use usajobs::UsaJobs;

use rand::Rng;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::SearchConfig;
use crate::credentials::CredentialProvider;
use crate::error::SourceError;
use crate::models::{LocationType, NewPosting};
use crate::normalize::{
    clean_title, collapse_whitespace, extract_company, extract_location, extract_pay_range, fingerprint,
    strip_html, truncate_chars,
};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_DESCRIPTION_CHARS: usize = 8000;

pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn search(&self, query: &str, location: &str) -> Result<Vec<RawPosting>, SourceError>;
}

/// What a source hands back, before normalization.
#[derive(Debug, Clone)]
pub enum RawPosting {
    /// Board API record with typed fields and usually a native id.
    Structured {
        source: String,
        external_id: Option<String>,
        title: String,
        company: Option<String>,
        location: Option<String>,
        location_type: Option<LocationType>,
        description: Option<String>,
        salary_min: Option<i64>,
        salary_max: Option<i64>,
        url: Option<String>,
        posted_at: Option<String>,
        raw: Option<serde_json::Value>,
    },
    /// Web search result pointing at a posting; fields must be inferred.
    SearchHit {
        source: String,
        url: String,
        page_title: String,
        snippet: String,
        raw: Option<serde_json::Value>,
    },
    /// Link scraped from a company career page.
    Listing {
        source: String,
        company: String,
        title: String,
        url: Option<String>,
        location: Option<String>,
    },
}

impl RawPosting {
    /// Required before a posting reaches the aggregator. `None` when the
    /// record has no usable title.
    pub fn normalize(self) -> Option<NewPosting> {
        match self {
            RawPosting::Structured {
                source,
                external_id,
                title,
                company,
                location,
                location_type,
                description,
                salary_min,
                salary_max,
                url,
                posted_at,
                raw,
            } => {
                let title = collapse_whitespace(&title);
                let description = description.map(|d| strip_html(&d)).unwrap_or_default();
                let location = location
                    .map(|l| collapse_whitespace(&l))
                    .filter(|l| !l.is_empty())
                    .or_else(|| extract_location(&description))
                    .unwrap_or_else(|| "Not specified".to_string());
                let location_type = location_type
                    .filter(|t| *t != LocationType::Unknown)
                    .unwrap_or_else(|| LocationType::infer(&location));
                let (salary_min, salary_max) = if salary_min.is_none() && salary_max.is_none() {
                    extract_pay_range(&description)
                } else {
                    (salary_min, salary_max)
                };
                build(
                    source,
                    external_id.filter(|id| !id.trim().is_empty()),
                    title,
                    company,
                    location,
                    location_type,
                    description,
                    (salary_min, salary_max),
                    url,
                    posted_at,
                    raw.map(|v| v.to_string()),
                )
            }
            RawPosting::SearchHit { source, url, page_title, snippet, raw } => {
                let title = clean_title(&page_title);
                let company = extract_company(&page_title);
                let snippet = strip_html(&snippet);
                let location = extract_location(&snippet).unwrap_or_else(|| "Not specified".to_string());
                let location_type = LocationType::infer(&snippet);
                let pay = extract_pay_range(&snippet);
                // The URL is the only stable identity a search engine gives us
                let external_id = Some(url_id(&url));
                build(
                    source,
                    external_id,
                    title,
                    company,
                    location,
                    location_type,
                    snippet,
                    pay,
                    Some(url),
                    None,
                    raw.map(|v| v.to_string()),
                )
            }
            RawPosting::Listing { source, company, title, url, location } => {
                let location = location.unwrap_or_else(|| "Not specified".to_string());
                let location_type = LocationType::infer(&format!("{} {}", title, location));
                let external_id = url.as_deref().map(url_id);
                build(
                    source,
                    external_id,
                    collapse_whitespace(&title),
                    Some(company),
                    location,
                    location_type,
                    String::new(),
                    (None, None),
                    url,
                    None,
                    None,
                )
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build(
    source: String,
    external_id: Option<String>,
    title: String,
    company: Option<String>,
    location: String,
    location_type: LocationType,
    description: String,
    pay: (Option<i64>, Option<i64>),
    url: Option<String>,
    posted_at: Option<String>,
    raw_data: Option<String>,
) -> Option<NewPosting> {
    if title.trim().is_empty() {
        return None;
    }
    let company_name = company
        .map(|c| collapse_whitespace(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Unknown Company".to_string());
    let (salary_min, salary_max) = match pay {
        (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
        other => other,
    };
    Some(NewPosting {
        fingerprint: fingerprint(&title, &company_name, &location),
        source,
        external_id,
        title,
        company_name,
        location,
        location_type,
        description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
        salary_min,
        salary_max,
        url,
        posted_at,
        raw_data,
    })
}

const TRACKING_PARAMS: &[&str] = &["src", "ref", "from", "trk", "refid"];

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Stable short id for sources that only give us a URL. Boards keep the
/// posting id in the query string (`viewjob?jk=`, `?gh_jid=`), so only the
/// fragment and tracking parameters are dropped.
fn url_id(url: &str) -> String {
    let clean = match reqwest::Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(key, _)| !is_tracking_param(key))
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            if kept.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(&kept);
            }
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).trim().to_string(),
    };
    crate::normalize::fingerprint(&clean, "", "")[..16].to_string()
}

/// Minimum spacing between outbound requests of one adapter, with jitter.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: Mutex::new(None) }
    }

    pub fn wait(&self) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let jitter = if self.delay.is_zero() {
                Duration::ZERO
            } else {
                Duration::from_millis(rand::thread_rng().gen_range(0..=self.delay.as_millis() as u64 / 4))
            };
            let target = self.delay + jitter;
            let elapsed = previous.elapsed();
            if elapsed < target {
                std::thread::sleep(target - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(SourceError::from)
}

/// Instantiate the adapters named in `config.sources`, in order. Unknown
/// names are skipped with a warning. Adapters that need a credential are
/// still built without one and report `AuthMissing` when searched.
pub fn build_adapters(
    config: &SearchConfig,
    credentials: &dyn CredentialProvider,
) -> Vec<Box<dyn SourceAdapter>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let delay = Duration::from_millis(config.rate_limit_ms);
    let cap = config.max_per_source;

    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for name in &config.sources {
        let built: Result<Box<dyn SourceAdapter>, SourceError> = match name.as_str() {
            "usajobs" => UsaJobs::new(credentials.get("usajobs"), timeout, delay, cap)
                .map(|a| Box::new(a) as Box<dyn SourceAdapter>),
            "remoteok" => RemoteOk::new(timeout, delay, cap).map(|a| Box::new(a) as Box<dyn SourceAdapter>),
            "brave" => BraveSearch::new(credentials.get("brave"), timeout, delay, cap)
                .map(|a| Box::new(a) as Box<dyn SourceAdapter>),
            "careers" => CareersPages::new(config.careers.clone(), timeout, delay, cap)
                .map(|a| Box::new(a) as Box<dyn SourceAdapter>),
            other => {
                warn!(source = other, "Unknown source in configuration, skipping");
                continue;
            }
        };
        match built {
            Ok(adapter) => adapters.push(adapter),
            Err(e) => warn!(source = %name, error = %e, "Failed to build source adapter"),
        }
    }
    adapters
}
