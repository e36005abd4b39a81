use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    pub search: SearchConfig,
    pub matching: MatchingConfig,
    pub reporting: ReportingConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub queries: Vec<String>,
    pub locations: Vec<String>,
    /// Enabled adapters, in the order they are consulted.
    pub sources: Vec<String>,
    pub max_per_source: usize,
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
    /// Postings not seen for this many days are deactivated.
    pub stale_after_days: Option<u32>,
    pub careers: Vec<CareersPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CareersPage {
    pub company: String,
    pub url: String,
    #[serde(default = "default_careers_selector")]
    pub selector: String,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_careers_selector() -> String {
    "a[href*='job'], a[href*='career'], a[href*='position']".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub model: String,
    pub timeout_secs: u64,
    pub quick_score_floor: f64,
    pub title_keywords: Vec<String>,
    pub title_keyword_bonus: f64,
    pub title_bonus_cap: f64,
    pub preferred_locations: Vec<String>,
    pub location_bonus: f64,
    pub batch_size: usize,
    pub max_per_run: usize,
    pub thresholds: Thresholds,
    pub weights: Weights,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub strong: f64,
    pub good: f64,
    pub possible: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { strong: 80.0, good: 65.0, possible: 50.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub skills: f64,
    pub experience: f64,
    pub location: f64,
    pub compensation: f64,
    pub culture: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            skills: 0.35,
            experience: 0.25,
            location: 0.15,
            compensation: 0.10,
            culture: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub min_score: f64,
    pub max_matches: usize,
    pub write_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    pub years_experience: Option<i64>,
    pub summary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub skills: Vec<SkillSeed>,
    /// Plain-text resume exports scanned for catalog skills.
    pub resume_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillSeed {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub proficiency: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            reports_dir: None,
            search: SearchConfig::default(),
            matching: MatchingConfig::default(),
            reporting: ReportingConfig::default(),
            profile: ProfileConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            queries: [
                "HSE Manager",
                "Safety Manager",
                "Safety Coordinator",
                "EHS Manager",
                "Compliance Manager",
                "Operations Manager",
                "Drilling Consultant",
                "Remote HSE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            locations: vec!["Oklahoma City, OK".to_string()],
            sources: vec![
                "usajobs".to_string(),
                "remoteok".to_string(),
                "brave".to_string(),
                "careers".to_string(),
            ],
            max_per_source: 30,
            rate_limit_ms: 1000,
            timeout_secs: 15,
            stale_after_days: Some(30),
            careers: Vec::new(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            model: "api-sonnet".to_string(),
            timeout_secs: 60,
            quick_score_floor: 20.0,
            title_keywords: [
                "hse",
                "safety",
                "operations",
                "manager",
                "supervisor",
                "coordinator",
                "drilling",
                "consultant",
                "risk",
                "compliance",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            title_keyword_bonus: 5.0,
            title_bonus_cap: 15.0,
            preferred_locations: vec!["remote".to_string()],
            location_bonus: 10.0,
            batch_size: 5,
            max_per_run: 100,
            thresholds: Thresholds::default(),
            weights: Weights::default(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            max_matches: 50,
            write_json: true,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: "Default Candidate".to_string(),
            email: None,
            phone: None,
            location: None,
            current_title: None,
            years_experience: None,
            summary: None,
            salary_min: None,
            salary_max: None,
            skills: Vec::new(),
            resume_paths: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location when `path` is `None`.
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Self::default().finish(),
            },
        };

        if !explicit && !path.exists() {
            return Self::default().finish();
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }

    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.finish()
    }

    fn finish(self) -> Result<Self, ConfigError> {
        let config = self.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(mut self) -> Self {
        if let Ok(db) = std::env::var("JOBSCOUT_DB") {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Ok(location) = std::env::var("JOBSCOUT_LOCATION") {
            self.search.locations = vec![location];
        }
        if let Some(floor) = std::env::var("JOBSCOUT_QUICK_SCORE_FLOOR")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.matching.quick_score_floor = floor;
        }
        if let Ok(model) = std::env::var("JOBSCOUT_MODEL") {
            self.matching.model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.matching.thresholds;
        for value in [t.strong, t.good, t.possible, self.matching.quick_score_floor] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "score thresholds must be within 0-100, got {}",
                    value
                )));
            }
        }
        if !(t.strong >= t.good && t.good >= t.possible) {
            return Err(ConfigError::Invalid(
                "thresholds must satisfy strong >= good >= possible".to_string(),
            ));
        }
        let w = &self.matching.weights;
        if [w.skills, w.experience, w.location, w.compensation, w.culture]
            .iter()
            .any(|v| *v < 0.0)
        {
            return Err(ConfigError::Invalid("weights must be non-negative".to_string()));
        }
        if self.matching.batch_size == 0 {
            return Err(ConfigError::Invalid("matching.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("jobscout.db"))
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("reports"))
    }

    /// Ordered (query, location) pairs consulted by every adapter.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let locations: Vec<String> = if self.search.locations.is_empty() {
            vec![String::new()]
        } else {
            self.search.locations.clone()
        };
        let mut pairs = Vec::new();
        for query in &self.search.queries {
            for location in &locations {
                pairs.push((query.clone(), location.clone()));
            }
        }
        pairs
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "jobscout")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn data_dir() -> PathBuf {
    // Use XDG data directory or fallback to the current directory
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.thresholds.strong, 80.0);
        assert_eq!(config.matching.weights.skills, 0.35);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [search]
            queries = ["Safety Coordinator"]
            locations = ["Tulsa, OK", "Remote"]

            [matching]
            quick_score_floor = 30.0

            [matching.thresholds]
            strong = 85.0
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.matching.quick_score_floor, 30.0);
        assert_eq!(config.matching.thresholds.strong, 85.0);
        assert_eq!(config.matching.thresholds.good, 65.0);
        assert_eq!(config.search.max_per_source, 30);
        assert_eq!(
            config.query_pairs(),
            vec![
                ("Safety Coordinator".to_string(), "Tulsa, OK".to_string()),
                ("Safety Coordinator".to_string(), "Remote".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = AppConfig::default();
        config.matching.thresholds = Thresholds { strong: 50.0, good: 65.0, possible: 40.0 };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_careers_page_default_selector() {
        let text = r#"
            [[search.careers]]
            company = "Devon Energy"
            url = "https://example.com/careers"
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.search.careers.len(), 1);
        assert!(config.search.careers[0].selector.contains("a[href"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = AppConfig::from_toml("[matching\nfloor = ", "inline");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
