use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::config::ProfileConfig;
use crate::db::Database;
use crate::models::{NewProfile, SkillInput};
use crate::normalize::normalize_text;

/// Skills recognized in resume text, by category.
pub const SKILL_CATALOG: &[(&str, &[&str])] = &[
    (
        "technical",
        &[
            "python", "javascript", "typescript", "rust", "java", "c++", "c#", "sql", "postgresql",
            "docker", "kubernetes", "aws", "azure", "linux", "git", "machine learning", "data science",
            "analytics", "excel", "powerpoint", "tableau", "power bi", "sap",
        ],
    ),
    (
        "domain",
        &[
            "oil and gas", "drilling", "hse", "ehs", "safety", "osha", "well control",
            "managed pressure drilling", "mpd", "completions", "workover", "production", "upstream",
            "midstream", "downstream", "energy", "construction", "mining", "manufacturing", "logistics",
            "supply chain", "operations", "field operations", "consulting", "incident investigation",
            "risk assessment", "compliance", "environmental",
        ],
    ),
    (
        "certification",
        &[
            "iadc rigpass", "hazwoper", "osha 30", "osha 10", "safeland", "safegulf", "pmp", "six sigma",
            "cpr", "first aid", "forklift", "h2s", "confined space", "fall protection", "taproot", "loto",
            "lockout tagout", "csp", "chst",
        ],
    ),
    (
        "soft",
        &[
            "leadership", "communication", "team management", "project management", "problem solving",
            "critical thinking", "decision making", "negotiation", "stakeholder management",
            "vendor management", "contractor management", "training", "mentoring", "reporting",
            "documentation", "coordination",
        ],
    ),
];

/// Category of a catalog skill, if it is one.
pub fn catalog_category(name: &str) -> Option<&'static str> {
    let needle = normalize_text(name);
    SKILL_CATALOG
        .iter()
        .find(|(_, skills)| skills.iter().any(|s| normalize_text(s) == needle))
        .map(|(category, _)| *category)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeFacts {
    pub skills: Vec<SkillInput>,
    pub years_experience: Option<i64>,
}

/// Turns resume text into profile facts.
pub trait ProfileExtractor {
    fn extract(&self, text: &str, source: &str) -> ResumeFacts;
}

/// Matches [`SKILL_CATALOG`] phrases on word boundaries.
#[derive(Debug, Default)]
pub struct KeywordExtractor;

impl ProfileExtractor for KeywordExtractor {
    fn extract(&self, text: &str, source: &str) -> ResumeFacts {
        let haystack = format!(" {} ", normalize_text(text));
        let mut skills: Vec<SkillInput> = Vec::new();
        for (category, names) in SKILL_CATALOG {
            for name in *names {
                let phrase = normalize_text(name);
                if phrase.is_empty() || !haystack.contains(&format!(" {} ", phrase)) {
                    continue;
                }
                // "project management" and friends sit in more than one category
                if skills.iter().any(|s| s.name == *name) {
                    continue;
                }
                skills.push(SkillInput {
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    proficiency: None,
                    source: source.to_string(),
                    confidence: 0.9,
                });
            }
        }

        static YEARS: OnceLock<Regex> = OnceLock::new();
        let years = YEARS.get_or_init(|| {
            Regex::new(r"(?i)(\d{1,2})\+?\s*years?\s*(?:of\s*)?experience").expect("valid regex")
        });
        let years_experience = years
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());

        ResumeFacts { skills, years_experience }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutcome {
    pub profile_id: i64,
    pub skills: usize,
}

/// Merge configured seed skills over skills found in resumes. Seeds win on a
/// case-insensitive name clash.
fn merge_skills(seeds: Vec<SkillInput>, found: Vec<SkillInput>) -> Vec<SkillInput> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<SkillInput> = Vec::new();
    for skill in seeds.into_iter().chain(found) {
        let key = normalize_text(&skill.name);
        if key.is_empty() || by_key.contains_key(&key) {
            continue;
        }
        by_key.insert(key, merged.len());
        merged.push(skill);
    }
    merged
}

/// One line per populated category, used when no summary is configured.
fn generated_summary(skills: &[SkillInput]) -> Option<String> {
    let labels = [
        ("domain", "Domain expertise"),
        ("technical", "Technical skills"),
        ("certification", "Certifications"),
        ("soft", "Leadership"),
    ];
    let parts: Vec<String> = labels
        .iter()
        .filter_map(|(category, label)| {
            let names: Vec<&str> = skills
                .iter()
                .filter(|s| s.category.as_deref() == Some(*category))
                .take(5)
                .map(|s| s.name.as_str())
                .collect();
            if names.is_empty() { None } else { Some(format!("{}: {}", label, names.join(", "))) }
        })
        .collect();
    if parts.is_empty() { None } else { Some(parts.join(". ")) }
}

/// The PROFILE phase: store identity from configuration and the merged skill
/// set from configuration and resume text files.
pub fn build_profile(db: &Database, config: &ProfileConfig, extractor: &dyn ProfileExtractor) -> Result<ProfileOutcome> {
    let seeds: Vec<SkillInput> = config
        .skills
        .iter()
        .map(|seed| SkillInput {
            name: seed.name.trim().to_string(),
            category: seed
                .category
                .clone()
                .or_else(|| catalog_category(&seed.name).map(str::to_string)),
            proficiency: seed.proficiency.clone(),
            source: "config".to_string(),
            confidence: 1.0,
        })
        .collect();

    let mut found = Vec::new();
    let mut years_from_resume = None;
    for path in &config.resume_paths {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable resume");
                continue;
            }
        };
        let source = format!(
            "resume:{}",
            path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        );
        let facts = extractor.extract(&text, &source);
        info!(path = %path.display(), skills = facts.skills.len(), "Extracted resume skills");
        years_from_resume = years_from_resume.or(facts.years_experience);
        found.extend(facts.skills);
    }

    let skills = merge_skills(seeds, found);
    let summary = config.summary.clone().or_else(|| generated_summary(&skills));

    let profile = NewProfile {
        name: config.name.clone(),
        email: config.email.clone(),
        phone: config.phone.clone(),
        location: config.location.clone(),
        current_title: config.current_title.clone(),
        years_experience: config.years_experience.or(years_from_resume),
        summary,
        salary_min: config.salary_min,
        salary_max: config.salary_max,
    };
    let profile_id = db.upsert_profile(&profile).context("Failed to store profile")?;
    let stored = db.upsert_skills(profile_id, &skills)?;
    info!(profile_id, skills = stored, "Profile ready");

    Ok(ProfileOutcome { profile_id, skills: stored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkillSeed;
    use crate::testutil::test_db;

    #[test]
    fn test_keyword_extractor_word_boundaries() {
        let text = "Drilling consultant with 15+ years of experience. OSHA 30, H2S and well control. \
                    Good communication; Going forward.";
        let facts = KeywordExtractor.extract(text, "resume:cv.txt");
        let names: Vec<&str> = facts.skills.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"drilling"));
        assert!(names.contains(&"osha"));
        assert!(names.contains(&"osha 30"));
        assert!(names.contains(&"h2s"));
        assert!(names.contains(&"communication"));
        // "go" is not in the catalog and "rust" never appears
        assert!(!names.contains(&"rust"));
        assert_eq!(facts.years_experience, Some(15));
        assert!(facts.skills.iter().all(|s| s.source == "resume:cv.txt"));
    }

    #[test]
    fn test_catalog_category() {
        assert_eq!(catalog_category("OSHA"), Some("domain"));
        assert_eq!(catalog_category("HAZWOPER"), Some("certification"));
        assert_eq!(catalog_category("Basket Weaving"), None);
    }

    #[test]
    fn test_merge_prefers_seeds() {
        let skill = |name: &str, source: &str| SkillInput {
            name: name.to_string(),
            category: None,
            proficiency: None,
            source: source.to_string(),
            confidence: 1.0,
        };
        let merged = merge_skills(
            vec![skill("OSHA", "config")],
            vec![skill("osha", "resume:a"), skill("h2s", "resume:a")],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, "config");
    }

    #[test]
    fn test_build_profile_from_config_and_resume() {
        let dir = std::env::temp_dir().join(format!("jobscout-profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let resume = dir.join("resume.txt");
        std::fs::write(&resume, "HSE lead. 12 years experience in drilling and HAZWOPER response.").unwrap();

        let config = ProfileConfig {
            name: "Pat Doe".to_string(),
            skills: vec![SkillSeed {
                name: "OSHA Compliance".to_string(),
                category: None,
                proficiency: Some("expert".to_string()),
            }],
            resume_paths: vec![resume, dir.join("missing.txt")],
            ..Default::default()
        };

        let db = test_db();
        let outcome = build_profile(&db, &config, &KeywordExtractor).unwrap();
        assert_eq!(outcome.skills, 4);

        let profile = db.get_profile(outcome.profile_id).unwrap().unwrap();
        assert_eq!(profile.years_experience, Some(12));
        assert!(profile.summary.unwrap().starts_with("Domain expertise: "));

        // Running again keeps one profile and one row per skill
        let again = build_profile(&db, &config, &KeywordExtractor).unwrap();
        assert_eq!(again.profile_id, outcome.profile_id);
        assert_eq!(db.get_skills(outcome.profile_id).unwrap().len(), 4);

        std::fs::remove_dir_all(&dir).ok();
    }
}
