//! Profile/posting compatibility scoring.
//!
//! Every posting first gets a cheap keyword heuristic. Postings under the
//! configured floor are stored as `poor_match` without ever reaching the
//! scoring backend; the rest are scored in detail, falling back to the
//! heuristic when the backend cannot answer.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::thread;
use tracing::{debug, info, warn};

use crate::config::{MatchingConfig, Thresholds, Weights};
use crate::db::Database;
use crate::error::ScoringError;
use crate::models::{ComponentScores, MatchRecord, Posting, Profile, Recommendation, ScoringMethod, Skill};
use crate::normalize::normalize_text;

pub const GATED_REASONING: &str = "Low keyword alignment with profile; detailed scoring skipped";
pub const FALLBACK_PREFIX: &str = "Detailed scoring unavailable";

const STOPWORDS: &[&str] = &["and", "the", "for", "with", "of", "in", "to", "a", "an", "or"];

/// Everything a backend needs to judge one posting.
pub struct ScoreRequest<'a> {
    pub profile: &'a Profile,
    pub skills: &'a [Skill],
    pub posting: &'a Posting,
    pub heuristic: &'a Heuristic,
}

/// Backend answer. Either `overall` or at least one component must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailedScore {
    pub overall: Option<f64>,
    pub components: ComponentScores,
    pub reasoning: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

pub trait ScoringBackend: Send + Sync {
    fn score(&self, request: &ScoreRequest<'_>) -> Result<DetailedScore, ScoringError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heuristic {
    pub score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Posting location hit one of the preferred locations.
    pub location_match: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub considered: usize,
    pub gated: usize,
    pub detailed: usize,
    pub fallback: usize,
}

impl MatchStats {
    fn record(&mut self, method: ScoringMethod) {
        self.considered += 1;
        match method {
            ScoringMethod::Gated => self.gated += 1,
            ScoringMethod::Detailed => self.detailed += 1,
            ScoringMethod::Fallback => self.fallback += 1,
        }
    }
}

fn significant_tokens(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {} ", haystack).contains(&format!(" {} ", phrase))
}

/// Heuristic inputs copied out of [`MatchingConfig`].
#[derive(Debug, Clone)]
pub struct HeuristicSettings {
    pub title_keywords: Vec<String>,
    pub title_keyword_bonus: f64,
    pub title_bonus_cap: f64,
    pub preferred_locations: Vec<String>,
    pub location_bonus: f64,
}

impl From<&MatchingConfig> for HeuristicSettings {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            title_keywords: config.title_keywords.iter().map(|k| normalize_text(k)).collect(),
            title_keyword_bonus: config.title_keyword_bonus,
            title_bonus_cap: config.title_bonus_cap,
            preferred_locations: config.preferred_locations.iter().map(|l| l.to_lowercase()).collect(),
            location_bonus: config.location_bonus,
        }
    }
}

pub fn heuristic_score(skills: &[Skill], posting: &Posting, settings: &HeuristicSettings) -> Heuristic {
    let text = normalize_text(&format!("{} {}", posting.title, posting.description));
    let tokens: HashSet<&str> = text.split_whitespace().collect();

    let mut credit = 0.0;
    let mut matched_skills = Vec::new();
    let mut missing_skills = Vec::new();
    for skill in skills {
        let phrase = normalize_text(&skill.name);
        let skill_credit = if contains_phrase(&text, &phrase) {
            1.0
        } else {
            let significant = significant_tokens(&skill.name);
            if significant.is_empty() {
                0.0
            } else {
                let present = significant.iter().filter(|t| tokens.contains(t.as_str())).count();
                present as f64 / significant.len() as f64
            }
        };
        credit += skill_credit;
        if skill_credit >= 0.5 {
            matched_skills.push(skill.name.clone());
        } else {
            missing_skills.push(skill.name.clone());
        }
    }

    let ratio = if skills.is_empty() { 50.0 } else { credit / skills.len() as f64 * 100.0 };

    let title = normalize_text(&posting.title);
    let keyword_hits = settings
        .title_keywords
        .iter()
        .filter(|k| contains_phrase(&title, k))
        .count();
    let title_bonus = (keyword_hits as f64 * settings.title_keyword_bonus).min(settings.title_bonus_cap);

    let location = format!("{} {}", posting.location, posting.location_type).to_lowercase();
    let location_match = settings
        .preferred_locations
        .iter()
        .any(|preferred| !preferred.is_empty() && location.contains(preferred.as_str()));
    let location_bonus = if location_match { settings.location_bonus } else { 0.0 };

    Heuristic {
        score: (ratio + title_bonus + location_bonus).clamp(0.0, 100.0),
        matched_skills,
        missing_skills,
        location_match,
    }
}

const MAX_NOTES: usize = 5;
const LISTED_SKILLS: usize = 3;

/// Strengths and concerns derivable without the backend: skill overlap,
/// certifications, experience, location and pay against the profile.
pub fn heuristic_notes(
    profile: &Profile,
    skills: &[Skill],
    posting: &Posting,
    heuristic: &Heuristic,
) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();

    if !heuristic.matched_skills.is_empty() {
        strengths.push(format!(
            "Matches {} of {} profile skills: {}",
            heuristic.matched_skills.len(),
            skills.len(),
            heuristic.matched_skills[..heuristic.matched_skills.len().min(LISTED_SKILLS)].join(", ")
        ));
    }
    let certifications: Vec<&str> = skills
        .iter()
        .filter(|s| s.category.as_deref() == Some("certification"))
        .filter(|s| heuristic.matched_skills.contains(&s.name))
        .map(|s| s.name.as_str())
        .collect();
    if !certifications.is_empty() {
        strengths.push(format!("Holds requested certification: {}", certifications.join(", ")));
    }
    if let Some(years) = profile.years_experience.filter(|y| *y >= 15) {
        strengths.push(format!("Extensive {}+ years of industry experience", years));
    }
    if heuristic.location_match {
        strengths.push(format!("Location fits preference ({})", posting.location));
    }

    if !skills.is_empty() && heuristic.matched_skills.is_empty() {
        concerns.push("None of the profile skills appear in the posting".to_string());
    } else if !heuristic.missing_skills.is_empty() {
        concerns.push(format!(
            "Posting does not mention: {}",
            heuristic.missing_skills[..heuristic.missing_skills.len().min(LISTED_SKILLS)].join(", ")
        ));
    }
    let offered = posting.salary_max.or(posting.salary_min);
    if let (Some(offered), Some(expected)) = (offered, profile.salary_min) {
        if (offered as f64) < expected as f64 * 0.8 {
            concerns.push("Listed salary may be below candidate expectations".to_string());
        }
    }

    strengths.truncate(MAX_NOTES);
    concerns.truncate(MAX_NOTES);
    (strengths, concerns)
}

/// Backend overall when given, else the weighted mean of supplied components.
pub fn final_overall(detailed: &DetailedScore, weights: &Weights) -> Option<f64> {
    if let Some(overall) = detailed.overall {
        return Some(overall.clamp(0.0, 100.0));
    }
    let c = &detailed.components;
    let pairs = [
        (c.skills, weights.skills),
        (c.experience, weights.experience),
        (c.location, weights.location),
        (c.compensation, weights.compensation),
        (c.culture, weights.culture),
    ];
    let (sum, total_weight) = pairs
        .iter()
        .filter_map(|(score, weight)| score.map(|s| (s.clamp(0.0, 100.0) * weight, *weight)))
        .fold((0.0, 0.0), |(s, w), (ds, dw)| (s + ds, w + dw));
    if total_weight <= 0.0 { None } else { Some(sum / total_weight) }
}

pub fn tier(score: f64, thresholds: &Thresholds) -> Recommendation {
    if score >= thresholds.strong {
        Recommendation::StrongMatch
    } else if score >= thresholds.good {
        Recommendation::GoodMatch
    } else if score >= thresholds.possible {
        Recommendation::PossibleMatch
    } else {
        Recommendation::PoorMatch
    }
}

pub struct Scorer<'a> {
    backend: &'a dyn ScoringBackend,
    heuristic: HeuristicSettings,
    quick_score_floor: f64,
    thresholds: Thresholds,
    weights: Weights,
    batch_size: usize,
    max_per_run: usize,
}

impl<'a> Scorer<'a> {
    /// Settings are copied here once and stay fixed for the run.
    pub fn new(config: &MatchingConfig, backend: &'a dyn ScoringBackend) -> Self {
        Self {
            backend,
            heuristic: HeuristicSettings::from(config),
            quick_score_floor: config.quick_score_floor,
            thresholds: config.thresholds,
            weights: config.weights,
            batch_size: config.batch_size.max(1),
            max_per_run: config.max_per_run,
        }
    }

    /// Produce the match for one posting. Never fails: backend errors turn
    /// into a fallback record.
    pub fn evaluate(&self, profile: &Profile, skills: &[Skill], posting: &Posting) -> MatchRecord {
        let heuristic = heuristic_score(skills, posting, &self.heuristic);
        let base = |overall: f64, reasoning: String, recommendation, method| MatchRecord {
            profile_id: profile.id,
            job_id: posting.id,
            overall_score: overall,
            heuristic_score: heuristic.score,
            components: ComponentScores::default(),
            reasoning,
            matched_skills: heuristic.matched_skills.clone(),
            missing_skills: heuristic.missing_skills.clone(),
            strengths: Vec::new(),
            concerns: Vec::new(),
            recommendation,
            method,
        };

        if heuristic.score < self.quick_score_floor {
            debug!(job_id = posting.id, score = heuristic.score, "Below quick score floor");
            return base(
                heuristic.score,
                GATED_REASONING.to_string(),
                Recommendation::PoorMatch,
                ScoringMethod::Gated,
            );
        }

        let request = ScoreRequest { profile, skills, posting, heuristic: &heuristic };
        let outcome = self.backend.score(&request).and_then(|detailed| {
            final_overall(&detailed, &self.weights)
                .map(|overall| (overall, detailed))
                .ok_or_else(|| ScoringError::InvalidResponse("no overall or component scores".to_string()))
        });

        match outcome {
            Ok((overall, detailed)) => MatchRecord {
                overall_score: overall,
                components: detailed.components,
                reasoning: detailed.reasoning,
                matched_skills: if detailed.matched_skills.is_empty() {
                    heuristic.matched_skills.clone()
                } else {
                    detailed.matched_skills
                },
                missing_skills: if detailed.missing_skills.is_empty() {
                    heuristic.missing_skills.clone()
                } else {
                    detailed.missing_skills
                },
                strengths: detailed.strengths,
                concerns: detailed.concerns,
                ..base(overall, String::new(), tier(overall, &self.thresholds), ScoringMethod::Detailed)
            },
            Err(e) => {
                warn!(job_id = posting.id, error = %e, "Detailed scoring failed, using heuristic");
                let (strengths, concerns) = heuristic_notes(profile, skills, posting, &heuristic);
                MatchRecord {
                    strengths,
                    concerns,
                    ..base(
                        heuristic.score,
                        format!("{} ({}); keyword heuristic used", FALLBACK_PREFIX, e),
                        tier(heuristic.score, &self.thresholds),
                        ScoringMethod::Fallback,
                    )
                }
            }
        }
    }

    /// Score due postings for `profile_id` and persist each match as soon as
    /// it is computed.
    pub fn run(&self, db: &Database, profile_id: i64, rescore: bool) -> Result<MatchStats> {
        let profile = db
            .get_profile(profile_id)?
            .ok_or_else(|| anyhow!("No profile with id {}", profile_id))?;
        let skills = db.get_skills(profile_id)?;
        let postings = db.postings_to_score(profile_id, rescore, self.max_per_run)?;
        info!(profile_id, postings = postings.len(), skills = skills.len(), "Scoring postings");

        let mut stats = MatchStats::default();
        for batch in postings.chunks(self.batch_size) {
            let results: Vec<Result<ScoringMethod>> = thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|posting| {
                        let profile = &profile;
                        let skills = &skills;
                        s.spawn(move || -> Result<ScoringMethod> {
                            let record = self.evaluate(profile, skills, posting);
                            db.upsert_match(&record)?;
                            Ok(record.method)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|_| Err(anyhow!("scoring thread panicked"))))
                    .collect()
            });
            for result in results {
                stats.record(result?);
            }
        }

        info!(
            considered = stats.considered,
            gated = stats.gated,
            detailed = stats.detailed,
            fallback = stats.fallback,
            "Scoring complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::{InsertOutcome, LocationType, NewProfile};
    use crate::testutil::{MockBackend, new_posting, test_db};

    fn skill(name: &str) -> Skill {
        Skill {
            id: 0,
            profile_id: 1,
            name: name.to_string(),
            category: None,
            proficiency: None,
            source: None,
            confidence: 1.0,
        }
    }

    fn posting(title: &str, description: &str, location: &str) -> Posting {
        Posting {
            id: 1,
            source: "test".to_string(),
            external_id: None,
            title: title.to_string(),
            company_name: "Acme".to_string(),
            location: location.to_string(),
            location_type: LocationType::infer(location),
            description: description.to_string(),
            salary_min: None,
            salary_max: None,
            url: None,
            is_active: true,
            fingerprint: String::new(),
            posted_at: None,
            created_at: String::new(),
            last_seen_at: String::new(),
        }
    }

    fn settings() -> HeuristicSettings {
        HeuristicSettings::from(&MatchingConfig::default())
    }

    #[test]
    fn test_heuristic_partial_skill_credit() {
        let h = heuristic_score(
            &[skill("OSHA Compliance")],
            &posting("Safety Coordinator", "Run OSHA audits in the field", "Tulsa, OK"),
            &settings(),
        );
        // 50 for half the skill tokens, 10 for "safety" and "coordinator"
        assert_eq!(h.score, 60.0);
        assert_eq!(h.matched_skills, vec!["OSHA Compliance".to_string()]);
    }

    #[test]
    fn test_heuristic_empty_profile_is_neutral() {
        let h = heuristic_score(&[], &posting("Accountant", "Ledgers", "Tulsa, OK"), &settings());
        assert_eq!(h.score, 50.0);
    }

    #[test]
    fn test_heuristic_bonus_cap_and_location() {
        let h = heuristic_score(
            &[skill("Underwater Welding")],
            &posting("HSE Safety Operations Manager Consultant", "", "Remote - US"),
            &settings(),
        );
        // five keywords capped at 15, plus 10 for remote
        assert_eq!(h.score, 25.0);
        assert_eq!(h.missing_skills, vec!["Underwater Welding".to_string()]);
    }

    #[test]
    fn test_final_overall_prefers_backend_overall() {
        let detailed = DetailedScore { overall: Some(120.0), ..Default::default() };
        assert_eq!(final_overall(&detailed, &Weights::default()), Some(100.0));
    }

    #[test]
    fn test_final_overall_renormalizes_weights() {
        let detailed = DetailedScore {
            components: ComponentScores { skills: Some(80.0), culture: Some(60.0), ..Default::default() },
            ..Default::default()
        };
        // (80 * 0.35 + 60 * 0.15) / 0.5
        let overall = final_overall(&detailed, &Weights::default()).unwrap();
        assert!((overall - 74.0).abs() < 1e-9);
        assert_eq!(final_overall(&DetailedScore::default(), &Weights::default()), None);
    }

    #[test]
    fn test_tier_boundaries() {
        let t = Thresholds::default();
        assert_eq!(tier(80.0, &t), Recommendation::StrongMatch);
        assert_eq!(tier(79.9, &t), Recommendation::GoodMatch);
        assert_eq!(tier(65.0, &t), Recommendation::GoodMatch);
        assert_eq!(tier(50.0, &t), Recommendation::PossibleMatch);
        assert_eq!(tier(49.9, &t), Recommendation::PoorMatch);
    }

    #[test]
    fn test_gate_skips_backend() {
        let backend = MockBackend::overall(90.0);
        let mut config = MatchingConfig::default();
        config.quick_score_floor = 30.0;
        let scorer = Scorer::new(&config, &backend);

        let profile = crate::testutil::profile(1);
        let record = scorer.evaluate(
            &profile,
            &[skill("OSHA Compliance")],
            &posting("Senior Software Engineer", "Build Rust services", "Austin, TX"),
        );
        assert_eq!(record.method, ScoringMethod::Gated);
        assert_eq!(record.recommendation, Recommendation::PoorMatch);
        assert_eq!(record.reasoning, GATED_REASONING);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_unavailable_backend_falls_back_to_heuristic() {
        let backend = MockBackend::failing(ScoringError::Unavailable("connection refused".to_string()));
        let scorer = Scorer::new(&MatchingConfig::default(), &backend);

        let profile = crate::testutil::profile(1);
        let record = scorer.evaluate(
            &profile,
            &[skill("OSHA Compliance")],
            &posting("Safety Coordinator", "OSHA audits", "Tulsa, OK"),
        );
        assert_eq!(backend.calls(), 1);
        assert_eq!(record.method, ScoringMethod::Fallback);
        assert_eq!(record.overall_score, record.heuristic_score);
        assert!(record.reasoning.starts_with(FALLBACK_PREFIX));
        assert_eq!(record.recommendation, Recommendation::PossibleMatch);
    }

    #[test]
    fn test_timed_out_backend_falls_back_with_notes() {
        let backend = MockBackend::failing(ScoringError::Timeout);
        let scorer = Scorer::new(&MatchingConfig::default(), &backend);

        let mut profile = crate::testutil::profile(1);
        profile.salary_min = Some(100_000);
        let mut listed = posting("Remote Safety Coordinator", "OSHA compliance audits", "Remote");
        listed.salary_max = Some(60_000);
        let skills = [skill("OSHA Compliance"), skill("Incident Investigation")];
        let record = scorer.evaluate(&profile, &skills, &listed);

        assert_eq!(backend.calls(), 1);
        assert_eq!(record.method, ScoringMethod::Fallback);
        assert_eq!(record.overall_score, record.heuristic_score);
        assert!(record.reasoning.starts_with(FALLBACK_PREFIX));
        assert_eq!(
            record.strengths,
            vec![
                "Matches 1 of 2 profile skills: OSHA Compliance".to_string(),
                "Location fits preference (Remote)".to_string(),
            ]
        );
        assert_eq!(
            record.concerns,
            vec![
                "Posting does not mention: Incident Investigation".to_string(),
                "Listed salary may be below candidate expectations".to_string(),
            ]
        );
    }

    #[test]
    fn test_heuristic_notes_certification_and_no_overlap() {
        let mut cert = skill("CSP");
        cert.category = Some("certification".to_string());
        let skills = [cert];
        let listed = posting("HSE Manager", "CSP required", "Tulsa, OK");
        let h = heuristic_score(&skills, &listed, &settings());
        let (strengths, concerns) = heuristic_notes(&crate::testutil::profile(1), &skills, &listed, &h);
        assert!(strengths.contains(&"Holds requested certification: CSP".to_string()));
        assert!(concerns.is_empty());

        let other = posting("HSE Manager", "Ledgers", "Tulsa, OK");
        let h = heuristic_score(&skills, &other, &settings());
        let (_, concerns) = heuristic_notes(&crate::testutil::profile(1), &skills, &other, &h);
        assert_eq!(concerns, vec!["None of the profile skills appear in the posting".to_string()]);
    }

    #[test]
    fn test_backend_without_scores_falls_back() {
        let backend = MockBackend::with(DetailedScore { reasoning: "looks fine".to_string(), ..Default::default() });
        let scorer = Scorer::new(&MatchingConfig::default(), &backend);
        let record = scorer.evaluate(
            &crate::testutil::profile(1),
            &[skill("OSHA Compliance")],
            &posting("Safety Coordinator", "OSHA audits", "Tulsa, OK"),
        );
        assert_eq!(record.method, ScoringMethod::Fallback);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let db = test_db();
        let profile_id = db
            .upsert_profile(&NewProfile { name: "Pat".to_string(), ..Default::default() })
            .unwrap();
        db.upsert_skills(
            profile_id,
            &[crate::models::SkillInput {
                name: "OSHA Compliance".to_string(),
                category: Some("domain".to_string()),
                proficiency: None,
                source: "config".to_string(),
                confidence: 1.0,
            }],
        )
        .unwrap();

        let mut a = new_posting("usajobs", Some("a"), "Safety Coordinator", "FAA", "Tulsa, OK");
        a.description = "Coordinate OSHA inspections and incident reviews.".to_string();
        let mut b = new_posting("usajobs", Some("b"), "Senior Software Engineer", "Initech", "Austin, TX");
        b.description = "Build distributed Rust services.".to_string();
        let InsertOutcome::Inserted(a_id) = db.insert_posting(&a).unwrap() else { panic!("insert a") };
        let InsertOutcome::Inserted(b_id) = db.insert_posting(&b).unwrap() else { panic!("insert b") };

        let mut config = AppConfig::default().matching;
        config.quick_score_floor = 30.0;
        let backend = MockBackend::overall(85.0);
        let scorer = Scorer::new(&config, &backend);

        let stats = scorer.run(&db, profile_id, false).unwrap();
        assert_eq!(stats, MatchStats { considered: 2, gated: 1, detailed: 1, fallback: 0 });
        assert_eq!(backend.calls(), 1);

        let match_a = db.get_match(profile_id, a_id).unwrap().unwrap();
        assert_eq!(match_a.method, ScoringMethod::Detailed);
        assert!(match_a.overall_score >= match_a.heuristic_score);
        assert!(match_a.heuristic_score >= 30.0);
        assert_eq!(match_a.recommendation, Recommendation::StrongMatch);

        let match_b = db.get_match(profile_id, b_id).unwrap().unwrap();
        assert_eq!(match_b.recommendation, Recommendation::PoorMatch);
        assert_eq!(match_b.method, ScoringMethod::Gated);

        // Nothing left to score without --rescore
        assert_eq!(scorer.run(&db, profile_id, false).unwrap().considered, 0);
    }

    #[test]
    fn test_rescore_preserves_interest_flag() {
        let db = test_db();
        let profile_id = db
            .upsert_profile(&NewProfile { name: "Pat".to_string(), ..Default::default() })
            .unwrap();
        let InsertOutcome::Inserted(job_id) = db
            .insert_posting(&new_posting("remoteok", Some("1"), "HSE Manager", "Acme", "Remote"))
            .unwrap()
        else {
            panic!("insert")
        };

        let backend = MockBackend::overall(70.0);
        let scorer = Scorer::new(&MatchingConfig::default(), &backend);
        scorer.run(&db, profile_id, false).unwrap();
        let first = db.get_match(profile_id, job_id).unwrap().unwrap();
        db.set_match_flags(first.id, None, Some(true)).unwrap();

        scorer.run(&db, profile_id, true).unwrap();
        let second = db.get_match(profile_id, job_id).unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.is_interested, Some(true));
        assert_eq!(db.count_matches(profile_id).unwrap(), 1);
    }

    #[test]
    fn test_run_scores_in_batches() {
        let db = test_db();
        let profile_id = db
            .upsert_profile(&NewProfile { name: "Pat".to_string(), ..Default::default() })
            .unwrap();
        for i in 0..7 {
            let ext = i.to_string();
            let title = format!("Safety Manager {}", i);
            db.insert_posting(&new_posting("remoteok", Some(&ext), &title, "Acme", "Remote"))
                .unwrap();
        }
        let backend = MockBackend::overall(66.0);
        let mut config = MatchingConfig::default();
        config.batch_size = 3;
        let stats = Scorer::new(&config, &backend).run(&db, profile_id, false).unwrap();
        assert_eq!(stats.detailed, 7);
        assert_eq!(backend.calls(), 7);
    }
}
