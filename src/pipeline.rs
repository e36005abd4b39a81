use anyhow::{Result, anyhow};
use std::fmt;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{ConfigError, FailureKind};
use crate::profile::{KeywordExtractor, ProfileExtractor, build_profile};
use crate::report::{build_report, print_report, write_json};
use crate::scorer::{Scorer, ScoringBackend};
use crate::sources::SourceAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Profile,
    Search,
    Match,
    Report,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Profile, Phase::Search, Phase::Match, Phase::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Profile => "profile",
            Phase::Search => "search",
            Phase::Match => "match",
            Phase::Report => "report",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Phases requested for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSet {
    enabled: [bool; 4],
}

impl PhaseSet {
    pub fn all() -> Self {
        Self { enabled: [true; 4] }
    }

    pub fn only(phase: Phase) -> Self {
        let mut set = Self { enabled: [false; 4] };
        set.enabled[phase as usize] = true;
        set
    }

    pub fn without(mut self, phase: Phase) -> Self {
        self.enabled[phase as usize] = false;
        self
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.enabled[phase as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    Succeeded(String),
    Skipped,
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(Phase, PhaseOutcome)>,
}

impl RunSummary {
    pub fn outcome(&self, phase: Phase) -> Option<&PhaseOutcome> {
        self.outcomes.iter().find(|(p, _)| *p == phase).map(|(_, o)| o)
    }

    pub fn succeeded(&self) -> bool {
        !self.outcomes.iter().any(|(_, o)| matches!(o, PhaseOutcome::Failed { .. }))
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }

    /// One `phase=<name> status=<status>` line per phase.
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|(phase, outcome)| match outcome {
                PhaseOutcome::Succeeded(detail) => format!("phase={} status=ok {}", phase, detail),
                PhaseOutcome::Skipped => format!("phase={} status=skipped", phase),
                PhaseOutcome::Failed { kind, message } => {
                    format!("phase={} status=failed kind={} error={}", phase, kind, message)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub profile_id: Option<i64>,
    pub rescore: bool,
}

/// Sequences the phases. Each phase failure is recorded and the next phase
/// still runs.
pub struct Coordinator<'a> {
    config: &'a AppConfig,
    db: &'a Database,
    adapters: Vec<Box<dyn SourceAdapter>>,
    backend: Option<&'a dyn ScoringBackend>,
    extractor: Box<dyn ProfileExtractor + 'a>,
}

impl<'a> Coordinator<'a> {
    pub fn new(config: &'a AppConfig, db: &'a Database) -> Self {
        Self {
            config,
            db,
            adapters: Vec::new(),
            backend: None,
            extractor: Box::new(KeywordExtractor),
        }
    }

    pub fn with_adapters(mut self, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_backend(mut self, backend: &'a dyn ScoringBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn run(&self, phases: PhaseSet, options: RunOptions) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut profile_id = options.profile_id;

        for phase in Phase::ALL {
            if !phases.contains(phase) {
                summary.outcomes.push((phase, PhaseOutcome::Skipped));
                continue;
            }
            info!(phase = phase.as_str(), "Phase starting");
            let result = match phase {
                Phase::Profile => self.profile_phase().map(|(id, detail)| {
                    // An explicit --profile-id still wins for later phases
                    profile_id = profile_id.or(Some(id));
                    detail
                }),
                Phase::Search => self.search_phase(),
                Phase::Match => self.match_phase(profile_id, options.rescore),
                Phase::Report => self.report_phase(profile_id),
            };
            let outcome = match result {
                Ok(detail) => {
                    info!(phase = phase.as_str(), "Phase finished");
                    PhaseOutcome::Succeeded(detail)
                }
                Err(e) => {
                    let kind = FailureKind::classify(&e);
                    let message = format!("{:#}", e);
                    error!(phase = phase.as_str(), kind = kind.as_str(), error = %message, "Phase failed");
                    PhaseOutcome::Failed { kind, message }
                }
            };
            summary.outcomes.push((phase, outcome));
        }
        summary
    }

    fn resolve_profile(&self, profile_id: Option<i64>) -> Result<i64> {
        match profile_id {
            Some(id) => Ok(id),
            None => self
                .db
                .first_profile_id()?
                .ok_or_else(|| anyhow!("No profile found; run the profile phase first")),
        }
    }

    fn profile_phase(&self) -> Result<(i64, String)> {
        let outcome = build_profile(self.db, &self.config.profile, self.extractor.as_ref())?;
        Ok((
            outcome.profile_id,
            format!("profile_id={} skills={}", outcome.profile_id, outcome.skills),
        ))
    }

    fn search_phase(&self) -> Result<String> {
        let pairs = self.config.query_pairs();
        let aggregator = Aggregator::new(&self.adapters, &pairs, self.config.search.stale_after_days);
        let stats = aggregator.run(self.db)?;
        Ok(format!(
            "found={} new={} duplicates={} invalid={} source_errors={}",
            stats.found,
            stats.new,
            stats.duplicates,
            stats.invalid,
            stats.errors.len()
        ))
    }

    fn match_phase(&self, profile_id: Option<i64>, rescore: bool) -> Result<String> {
        let backend = self.backend.ok_or_else(|| ConfigError::MissingCredential {
            service: "scoring".to_string(),
            hint: "no scoring backend configured".to_string(),
        })?;
        let profile_id = self.resolve_profile(profile_id)?;
        let stats = Scorer::new(&self.config.matching, backend).run(self.db, profile_id, rescore)?;
        Ok(format!(
            "scored={} gated={} detailed={} fallback={}",
            stats.considered, stats.gated, stats.detailed, stats.fallback
        ))
    }

    fn report_phase(&self, profile_id: Option<i64>) -> Result<String> {
        let profile_id = self.resolve_profile(profile_id)?;
        let report = build_report(self.db, profile_id, &self.config.reporting)?;
        print_report(&report);
        if self.config.reporting.write_json {
            let path = write_json(&report, &self.config.reports_dir())?;
            Ok(format!("matches={} path={}", report.matches.len(), path.display()))
        } else {
            Ok(format!("matches={}", report.matches.len()))
        }
    }
}
