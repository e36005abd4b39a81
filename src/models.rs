use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    pub years_experience: Option<i64>,
    pub summary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub category: Option<String>,    // "technical", "domain", "certification", "soft"
    pub proficiency: Option<String>, // "beginner" .. "expert"
    pub source: Option<String>,      // "config", "resume:<file>"
    pub confidence: f64,
}

/// Identity fields written by the profile phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProfile {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    pub years_experience: Option<i64>,
    pub summary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
}

/// Skill as produced by the profile phase, before it has a row id.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillInput {
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Option<String>,
    pub source: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Remote,
    Hybrid,
    Onsite,
    Unknown,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Remote => "remote",
            LocationType::Hybrid => "hybrid",
            LocationType::Onsite => "onsite",
            LocationType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "remote" => LocationType::Remote,
            "hybrid" => LocationType::Hybrid,
            "onsite" | "on-site" | "on site" | "office" => LocationType::Onsite,
            _ => LocationType::Unknown,
        }
    }

    /// Best guess from free text such as a location string or description.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("hybrid") {
            LocationType::Hybrid
        } else if lower.contains("remote") || lower.contains("work from home") {
            LocationType::Remote
        } else if lower.contains("on-site") || lower.contains("onsite") {
            LocationType::Onsite
        } else {
            LocationType::Unknown
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A normalized posting ready for dedup and insertion.
#[derive(Debug, Clone)]
pub struct NewPosting {
    pub source: String,
    pub external_id: Option<String>,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub location_type: LocationType,
    pub description: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub url: Option<String>,
    pub posted_at: Option<String>,
    pub raw_data: Option<String>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: i64,
    pub source: String,
    pub external_id: Option<String>,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub location_type: LocationType,
    pub description: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub url: Option<String>,
    pub is_active: bool,
    pub fingerprint: String,
    pub posted_at: Option<String>,
    pub created_at: String,
    pub last_seen_at: String,
}

/// Outcome of offering one posting to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// Same (source, external_id) already stored; row refreshed.
    Refreshed(i64),
    /// Same fingerprint already stored, possibly from another source.
    DuplicateFingerprint(i64),
}

impl InsertOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongMatch,
    GoodMatch,
    PossibleMatch,
    PoorMatch,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongMatch => "strong_match",
            Recommendation::GoodMatch => "good_match",
            Recommendation::PossibleMatch => "possible_match",
            Recommendation::PoorMatch => "poor_match",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strong_match" => Some(Recommendation::StrongMatch),
            "good_match" => Some(Recommendation::GoodMatch),
            "possible_match" => Some(Recommendation::PossibleMatch),
            "poor_match" => Some(Recommendation::PoorMatch),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    /// Heuristic below the floor; detailed scoring never attempted.
    Gated,
    Detailed,
    /// Detailed scoring attempted and failed; heuristic kept.
    Fallback,
}

impl ScoringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::Gated => "gated",
            ScoringMethod::Detailed => "detailed",
            ScoringMethod::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "detailed" => ScoringMethod::Detailed,
            "fallback" => ScoringMethod::Fallback,
            _ => ScoringMethod::Gated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skills: Option<f64>,
    pub experience: Option<f64>,
    pub location: Option<f64>,
    pub compensation: Option<f64>,
    pub culture: Option<f64>,
}

/// Score fields written by the scorer. User flags live only in [`Match`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub profile_id: i64,
    pub job_id: i64,
    pub overall_score: f64,
    pub heuristic_score: f64,
    pub components: ComponentScores,
    pub reasoning: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Recommendation,
    pub method: ScoringMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub profile_id: i64,
    pub job_id: i64,
    pub overall_score: f64,
    pub heuristic_score: f64,
    pub components: ComponentScores,
    pub reasoning: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Recommendation,
    pub method: ScoringMethod,
    pub is_reviewed: bool,
    pub is_interested: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRun {
    pub id: i64,
    pub source: String,
    pub queries: i64,
    pub jobs_found: i64,
    pub new_jobs: i64,
    pub duplicates: i64,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub duration_seconds: f64,
    pub run_at: String,
}

/// One adapter's contribution to a search phase, before it is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSearchRun {
    pub source: String,
    pub queries: i64,
    pub jobs_found: i64,
    pub new_jobs: i64,
    pub duplicates: i64,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub duration_seconds: f64,
}

/// Match joined with its posting: the view consumed by reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub match_id: i64,
    pub job_id: i64,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub location_type: LocationType,
    pub source: String,
    pub url: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub overall_score: f64,
    pub components: ComponentScores,
    pub recommendation: Recommendation,
    pub method: ScoringMethod,
    pub reasoning: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub is_reviewed: bool,
    pub is_interested: Option<bool>,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_type_infer() {
        assert_eq!(LocationType::infer("Remote - US"), LocationType::Remote);
        assert_eq!(LocationType::infer("Hybrid (Remote 2 days)"), LocationType::Hybrid);
        assert_eq!(LocationType::infer("Tulsa, OK"), LocationType::Unknown);
        assert_eq!(LocationType::parse("On-Site"), LocationType::Onsite);
    }

    #[test]
    fn test_recommendation_round_trips_through_str() {
        for rec in [
            Recommendation::StrongMatch,
            Recommendation::GoodMatch,
            Recommendation::PossibleMatch,
            Recommendation::PoorMatch,
        ] {
            assert_eq!(Recommendation::parse(rec.as_str()), Some(rec));
        }
        assert_eq!(Recommendation::parse("maybe"), None);
    }
}
