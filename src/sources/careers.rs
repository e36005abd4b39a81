use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RawPosting, SourceAdapter, Throttle, http_client};
use crate::config::CareersPage;
use crate::error::{SourceError, SourceErrorKind};
use crate::normalize::collapse_whitespace;

/// Scrapes configured company career pages for job links.
pub struct CareersPages {
    pages: Vec<CareersPage>,
    client: reqwest::blocking::Client,
    throttle: Throttle,
    cap: usize,
    // Listings per page URL, fetched once per run
    cache: Mutex<HashMap<String, Vec<Link>>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Link {
    title: String,
    url: String,
}

impl CareersPages {
    pub fn new(pages: Vec<CareersPage>, timeout: Duration, delay: Duration, cap: usize) -> Result<Self, SourceError> {
        Ok(Self {
            pages,
            client: http_client(timeout)?,
            throttle: Throttle::new(delay),
            cap,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn links(&self, page: &CareersPage) -> Result<Vec<Link>, SourceError> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(links) = cache.get(&page.url) {
            return Ok(links.clone());
        }

        self.throttle.wait();
        debug!(company = %page.company, url = %page.url, "Fetching careers page");
        let html = self.client.get(&page.url).send()?.error_for_status()?.text()?;
        let links = extract_links(&html, &page.url, &page.selector)?;
        cache.insert(page.url.clone(), links.clone());
        Ok(links)
    }
}

fn extract_links(html: &str, base_url: &str, selector: &str) -> Result<Vec<Link>, SourceError> {
    let selector = Selector::parse(selector).map_err(|e| {
        SourceError::new(SourceErrorKind::Http, format!("invalid selector '{}': {}", selector, e))
    })?;
    let base = reqwest::Url::parse(base_url).ok();
    let document = Html::parse_document(html);

    let mut links: Vec<Link> = Vec::new();
    for element in document.select(&selector) {
        let title = collapse_whitespace(&element.text().collect::<String>());
        if is_navigation_artifact(&title) {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let url = match &base {
            Some(base) => match base.join(href) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => href.to_string(),
        };
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        links.push(Link { title, url });
    }
    Ok(links)
}

/// Menu entries and search links that careers pages mix in with real
/// openings.
fn is_navigation_artifact(text: &str) -> bool {
    let lower = text.to_lowercase();
    let trimmed = lower.trim();

    if trimmed.len() < 8 {
        return true;
    }

    let artifacts = [
        "search jobs",
        "search for jobs",
        "see all jobs",
        "view all jobs",
        "view all",
        "job alerts",
        "career areas",
        "students and graduates",
    ];
    if artifacts.contains(&trimmed) {
        return true;
    }

    trimmed.starts_with("jobs in ")
        || trimmed.starts_with("join our talent")
        || trimmed.starts_with("sign in")
        || trimmed.contains("privacy")
        || trimmed.contains("cookie")
        || trimmed.ends_with(" jobs")
}

fn matches_query(title: &str, query: &str) -> bool {
    let title = title.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() >= 3)
        .any(|word| title.contains(word))
}

impl SourceAdapter for CareersPages {
    fn name(&self) -> &str {
        "careers"
    }

    fn search(&self, query: &str, _location: &str) -> Result<Vec<RawPosting>, SourceError> {
        if self.pages.is_empty() {
            return Err(SourceError::empty("no careers pages configured"));
        }

        let mut postings = Vec::new();
        let mut last_error = None;
        let mut reachable = 0;
        for page in &self.pages {
            let links = match self.links(page) {
                Ok(links) => links,
                Err(e) => {
                    warn!(company = %page.company, error = %e, "Careers page failed");
                    last_error = Some(e);
                    continue;
                }
            };
            reachable += 1;
            for link in links.into_iter().filter(|l| matches_query(&l.title, query)) {
                if postings.len() >= self.cap {
                    break;
                }
                postings.push(RawPosting::Listing {
                    source: "careers".to_string(),
                    company: page.company.clone(),
                    title: link.title,
                    url: Some(link.url),
                    location: page.location.clone(),
                });
            }
        }

        if reachable == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        info!(query, count = postings.len(), "Careers page results");
        if postings.is_empty() {
            return Err(SourceError::empty(format!("no careers listings for '{}'", query)));
        }
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <nav><a href="/careers">Careers</a><a href="/careers/search">Search Jobs</a></nav>
        <ul>
          <li><a href="/careers/job/101">HSE Coordinator - Field Operations</a></li>
          <li><a href="/careers/job/102?src=list">Senior Accountant</a></li>
          <li><a href="https://jobs.example.com/position/7">Safety Manager, Midstream</a></li>
          <li><a href="/careers/job/101">HSE Coordinator - Field Operations</a></li>
          <li><a href="/careers/tulsa">Engineering jobs</a></li>
        </ul>
        <a href="/privacy">Privacy notice for careers</a>
    </body></html>"#;

    fn default_selector() -> String {
        "a[href*='job'], a[href*='career'], a[href*='position']".to_string()
    }

    #[test]
    fn test_extract_links_filters_navigation_and_resolves_urls() {
        let links = extract_links(PAGE, "https://www.example.com/careers", &default_selector()).unwrap();
        let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["HSE Coordinator - Field Operations", "Senior Accountant", "Safety Manager, Midstream"]
        );
        assert_eq!(links[0].url, "https://www.example.com/careers/job/101");
        assert_eq!(links[2].url, "https://jobs.example.com/position/7");
    }

    #[test]
    fn test_extract_links_bad_selector() {
        let err = extract_links(PAGE, "https://www.example.com", "a[[").unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Http);
    }

    #[test]
    fn test_is_navigation_artifact() {
        assert!(is_navigation_artifact("Careers"));
        assert!(is_navigation_artifact("View All Jobs"));
        assert!(is_navigation_artifact("Engineering jobs"));
        assert!(!is_navigation_artifact("Environmental Health & Safety Specialist"));
    }

    #[test]
    fn test_matches_query() {
        assert!(matches_query("Safety Manager, Midstream", "HSE Safety"));
        assert!(!matches_query("Senior Accountant", "HSE Manager"));
    }

    #[test]
    fn test_search_with_no_pages_is_empty() {
        let adapter = CareersPages::new(Vec::new(), Duration::from_secs(1), Duration::ZERO, 10).unwrap();
        let err = adapter.search("Safety", "Remote").unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Empty);
    }
}
