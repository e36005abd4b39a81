//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::Database;
use crate::error::{ScoringError, SourceError, SourceErrorKind};
use crate::models::{ComponentScores, LocationType, MatchRecord, NewPosting, Profile, Recommendation, ScoringMethod};
use crate::normalize::fingerprint;
use crate::scorer::{DetailedScore, ScoreRequest, ScoringBackend};
use crate::sources::{RawPosting, SourceAdapter};

pub fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.init().unwrap();
    db
}

pub fn new_posting(source: &str, external_id: Option<&str>, title: &str, company: &str, location: &str) -> NewPosting {
    NewPosting {
        source: source.to_string(),
        external_id: external_id.map(str::to_string),
        title: title.to_string(),
        company_name: company.to_string(),
        location: location.to_string(),
        location_type: LocationType::infer(location),
        description: String::new(),
        salary_min: None,
        salary_max: None,
        url: None,
        posted_at: None,
        raw_data: None,
        fingerprint: fingerprint(title, company, location),
    }
}

pub fn structured(source: &str, external_id: Option<&str>, title: &str, company: &str, location: &str) -> RawPosting {
    RawPosting::Structured {
        source: source.to_string(),
        external_id: external_id.map(str::to_string),
        title: title.to_string(),
        company: Some(company.to_string()),
        location: Some(location.to_string()),
        location_type: None,
        description: None,
        salary_min: None,
        salary_max: None,
        url: None,
        posted_at: None,
        raw: None,
    }
}

pub fn listing(source: &str, company: &str, title: &str, location: &str) -> RawPosting {
    RawPosting::Listing {
        source: source.to_string(),
        company: company.to_string(),
        title: title.to_string(),
        url: None,
        location: Some(location.to_string()),
    }
}

pub fn profile(id: i64) -> Profile {
    Profile {
        id,
        name: "Pat".to_string(),
        email: None,
        phone: None,
        location: None,
        current_title: Some("HSE Manager".to_string()),
        years_experience: Some(12),
        summary: None,
        salary_min: None,
        salary_max: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

pub fn match_record(profile_id: i64, job_id: i64, score: f64) -> MatchRecord {
    MatchRecord {
        profile_id,
        job_id,
        overall_score: score,
        heuristic_score: score,
        components: ComponentScores::default(),
        reasoning: "test".to_string(),
        matched_skills: vec!["OSHA".to_string()],
        missing_skills: Vec::new(),
        strengths: Vec::new(),
        concerns: Vec::new(),
        recommendation: Recommendation::PossibleMatch,
        method: ScoringMethod::Detailed,
    }
}

/// Adapter returning the same postings, or the same error, for every query.
pub struct MockAdapter {
    name: String,
    postings: Vec<RawPosting>,
    failure: Option<SourceErrorKind>,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(name: &str, postings: Vec<RawPosting>) -> Self {
        Self {
            name: name.to_string(),
            postings,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str, kind: SourceErrorKind) -> Self {
        Self { failure: Some(kind), ..Self::new(name, Vec::new()) }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SourceAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, query: &str, _location: &str) -> Result<Vec<RawPosting>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(kind) => Err(SourceError::new(kind, format!("mock failure for '{}'", query))),
            None => Ok(self.postings.clone()),
        }
    }
}

/// Backend with a canned answer and a call counter.
pub struct MockBackend {
    response: Result<DetailedScore, ScoringError>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn with(score: DetailedScore) -> Self {
        Self { response: Ok(score), calls: AtomicUsize::new(0) }
    }

    pub fn overall(score: f64) -> Self {
        Self::with(DetailedScore {
            overall: Some(score),
            reasoning: "Mock assessment".to_string(),
            strengths: vec!["Relevant field experience".to_string()],
            ..Default::default()
        })
    }

    pub fn failing(error: ScoringError) -> Self {
        Self { response: Err(error), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoringBackend for MockBackend {
    fn score(&self, _request: &ScoreRequest<'_>) -> Result<DetailedScore, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}
