use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{RawPosting, SourceAdapter, Throttle, http_client};
use crate::error::{SourceError, SourceErrorKind};
use crate::models::LocationType;
use crate::normalize::parse_salary;

const USAJOBS_API_URL: &str = "https://data.usajobs.gov/api/search";

/// USAJOBS federal search API. Free, but requires an API key.
pub struct UsaJobs {
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    throttle: Throttle,
    cap: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    search_result: SearchResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    #[serde(default)]
    search_result_items: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResultItem {
    #[serde(rename = "MatchedObjectId")]
    matched_object_id: Option<String>,
    matched_object_descriptor: Descriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Descriptor {
    position_title: String,
    organization_name: Option<String>,
    position_location_display: Option<String>,
    #[serde(rename = "PositionURI")]
    position_uri: Option<String>,
    #[serde(default)]
    position_remuneration: Vec<Remuneration>,
    publication_start_date: Option<String>,
    #[serde(rename = "UserArea")]
    user_area: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Remuneration {
    minimum_range: Option<String>,
    maximum_range: Option<String>,
}

impl UsaJobs {
    pub fn new(api_key: Option<String>, timeout: Duration, delay: Duration, cap: usize) -> Result<Self, SourceError> {
        Ok(Self {
            api_key,
            client: http_client(timeout)?,
            throttle: Throttle::new(delay),
            cap,
        })
    }
}

impl SourceAdapter for UsaJobs {
    fn name(&self) -> &str {
        "usajobs"
    }

    fn search(&self, query: &str, location: &str) -> Result<Vec<RawPosting>, SourceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| SourceError::auth_missing("usajobs"))?;

        self.throttle.wait();
        debug!(query, location, "USAJOBS search");
        let per_page = self.cap.to_string();
        let response = self
            .client
            .get(USAJOBS_API_URL)
            .query(&[
                ("Keyword", query),
                ("LocationName", location),
                ("ResultsPerPage", per_page.as_str()),
            ])
            .header("Host", "data.usajobs.gov")
            .header("Authorization-Key", api_key)
            .send()?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(SourceError::new(SourceErrorKind::AuthMissing, "USAJOBS rejected the API key"));
        }
        let response = response.error_for_status()?;
        let body: SearchResponse = response
            .json()
            .map_err(|e| SourceError::new(SourceErrorKind::Http, format!("bad USAJOBS payload: {}", e)))?;

        let postings = parse_items(body, self.cap);
        info!(query, count = postings.len(), "USAJOBS results");
        if postings.is_empty() {
            return Err(SourceError::empty(format!("no federal postings for '{}'", query)));
        }
        Ok(postings)
    }
}

fn parse_items(body: SearchResponse, cap: usize) -> Vec<RawPosting> {
    body.search_result
        .search_result_items
        .into_iter()
        .take(cap)
        .map(|item| {
            let d = item.matched_object_descriptor;
            let pay = d.position_remuneration.first();
            let description = d
                .user_area
                .as_ref()
                .and_then(|u| u.pointer("/Details/JobSummary"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let raw = serde_json::json!({
                "id": item.matched_object_id,
                "title": d.position_title,
                "organization": d.organization_name,
            });
            RawPosting::Structured {
                source: "usajobs".to_string(),
                external_id: item.matched_object_id,
                title: d.position_title,
                company: d.organization_name,
                location: d.position_location_display,
                location_type: Some(LocationType::Onsite),
                description,
                salary_min: pay.and_then(|p| p.minimum_range.as_deref()).and_then(parse_salary),
                salary_max: pay.and_then(|p| p.maximum_range.as_deref()).and_then(parse_salary),
                url: d.position_uri,
                posted_at: d.publication_start_date,
                raw: Some(raw),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "SearchResult": {
            "SearchResultCount": 2,
            "SearchResultItems": [
                {
                    "MatchedObjectId": "812345",
                    "MatchedObjectDescriptor": {
                        "PositionTitle": "Safety and Occupational Health Specialist",
                        "OrganizationName": "Federal Aviation Administration",
                        "PositionLocationDisplay": "Oklahoma City, Oklahoma",
                        "PositionURI": "https://www.usajobs.gov/job/812345",
                        "PositionRemuneration": [{"MinimumRange": "72553.0", "MaximumRange": "94317.0"}],
                        "PublicationStartDate": "2026-10-01",
                        "UserArea": {"Details": {"JobSummary": "Manage OSHA compliance programs."}}
                    }
                },
                {
                    "MatchedObjectId": "812346",
                    "MatchedObjectDescriptor": {
                        "PositionTitle": "Industrial Hygienist"
                    }
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_items() {
        let body: SearchResponse = serde_json::from_str(FIXTURE).unwrap();
        let items = parse_items(body, 10);
        assert_eq!(items.len(), 2);

        let posting = items[0].clone().normalize().unwrap();
        assert_eq!(posting.external_id.as_deref(), Some("812345"));
        assert_eq!(posting.company_name, "Federal Aviation Administration");
        assert_eq!(posting.salary_min, Some(72553));
        assert_eq!(posting.salary_max, Some(94317));
        assert_eq!(posting.description, "Manage OSHA compliance programs.");
        assert_eq!(posting.location_type, LocationType::Onsite);
    }

    #[test]
    fn test_parse_items_respects_cap() {
        let body: SearchResponse = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(parse_items(body, 1).len(), 1);
    }

    #[test]
    fn test_search_without_key_is_auth_missing() {
        let adapter = UsaJobs::new(None, Duration::from_secs(1), Duration::ZERO, 10).unwrap();
        let err = adapter.search("Safety", "Oklahoma").unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::AuthMissing);
    }
}
