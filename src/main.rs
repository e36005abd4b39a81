mod aggregator;
mod ai;
mod config;
mod credentials;
mod db;
mod error;
mod models;
mod normalize;
mod pipeline;
mod profile;
mod report;
mod scorer;
mod sources;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use ai::AiScorer;
use config::AppConfig;
use credentials::{CredentialProvider, EnvCredentials};
use db::Database;
use error::FailureKind;
use pipeline::{Coordinator, Phase, PhaseSet, RunOptions};
use report::{format_pay, print_matches_table, truncate};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Daily job search pipeline - build a profile, collect postings, score and report")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline (default)
    Run(RunArgs),

    /// Check that credentials are present
    Validate,

    /// Initialize the database
    Init,

    /// List stored postings
    List {
        /// Filter by source (usajobs, remoteok, brave, careers)
        #[arg(short, long)]
        source: Option<String>,

        /// Include deactivated postings
        #[arg(long)]
        all: bool,

        /// Number of postings to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Show posting details
    Show {
        /// Posting ID
        id: i64,
    },

    /// Show top matches
    Matches {
        /// Number of matches to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Minimum overall score
        #[arg(short, long)]
        min_score: Option<f64>,

        /// Profile to report on (defaults to the first profile)
        #[arg(long)]
        profile_id: Option<i64>,
    },

    /// Set review and interest flags on a match
    Mark {
        /// Match ID
        id: i64,

        /// Mark as reviewed
        #[arg(long)]
        reviewed: bool,

        /// Mark as interesting
        #[arg(long, conflicts_with = "not_interested")]
        interested: bool,

        /// Mark as not interesting
        #[arg(long)]
        not_interested: bool,
    },

    /// Show recent search runs
    Runs {
        /// Number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    #[arg(long)]
    skip_profile: bool,

    #[arg(long)]
    skip_search: bool,

    #[arg(long)]
    skip_matching: bool,

    #[arg(long)]
    skip_report: bool,

    /// Run only the search phase
    #[arg(long, conflicts_with_all = ["match_only", "report_only", "profile_only"])]
    search_only: bool,

    /// Run only the matching phase
    #[arg(long, conflicts_with_all = ["report_only", "profile_only"])]
    match_only: bool,

    /// Run only the report phase
    #[arg(long, conflicts_with = "profile_only")]
    report_only: bool,

    /// Run only the profile phase
    #[arg(long)]
    profile_only: bool,

    /// Profile to match and report on
    #[arg(long)]
    profile_id: Option<i64>,

    /// Rescore postings that already have a match
    #[arg(long)]
    rescore: bool,
}

impl RunArgs {
    fn phases(&self) -> PhaseSet {
        let only = [
            (self.profile_only, Phase::Profile),
            (self.search_only, Phase::Search),
            (self.match_only, Phase::Match),
            (self.report_only, Phase::Report),
        ];
        if let Some((_, phase)) = only.iter().find(|(set, _)| *set) {
            return PhaseSet::only(*phase);
        }
        let mut phases = PhaseSet::all();
        for (skip, phase) in [
            (self.skip_profile, Phase::Profile),
            (self.skip_search, Phase::Search),
            (self.skip_matching, Phase::Match),
            (self.skip_report, Phase::Report),
        ] {
            if skip {
                phases = phases.without(phase);
            }
        }
        phases
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "jobscout=debug" } else { "jobscout=info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            println!("status=failed kind={} error={}", FailureKind::Configuration, e);
            return ExitCode::FAILURE;
        }
    };

    match execute(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            let kind = FailureKind::classify(&e);
            println!("status=failed kind={} error={:#}", kind, e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Option<Commands>, config: &AppConfig) -> Result<ExitCode> {
    let credentials = EnvCredentials;
    let command = command.unwrap_or(Commands::Run(RunArgs::default()));

    match command {
        Commands::Validate => Ok(validate(config, &credentials)),

        Commands::Run(args) => {
            let phases = args.phases();

            // Missing scoring credentials stop the run before any phase starts
            let backend = if phases.contains(Phase::Match) {
                let spec = ai::resolve_model(&config.matching.model)?;
                let provider = ai::create_provider(
                    &spec,
                    &credentials,
                    Duration::from_secs(config.matching.timeout_secs),
                )?;
                Some(AiScorer::new(provider))
            } else {
                None
            };

            let db = open_db(config)?;
            db.init()?;

            let adapters = if phases.contains(Phase::Search) {
                sources::build_adapters(&config.search, &credentials)
            } else {
                Vec::new()
            };

            let mut coordinator = Coordinator::new(config, &db).with_adapters(adapters);
            if let Some(backend) = &backend {
                tracing::info!(model = backend.model_name(), "Scoring backend ready");
                coordinator = coordinator.with_backend(backend);
            }
            let summary = coordinator.run(
                phases,
                RunOptions {
                    profile_id: args.profile_id,
                    rescore: args.rescore,
                },
            );

            println!();
            for line in summary.lines() {
                println!("{}", line);
            }
            Ok(ExitCode::from(summary.exit_code() as u8))
        }

        Commands::Init => {
            let db = open_db(config)?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::List { source, all, limit } => {
            let db = open_db(config)?;
            db.ensure_initialized()?;
            let postings = db.list_postings(source.as_deref(), all, limit)?;
            if postings.is_empty() {
                println!("No postings found.");
            } else {
                println!(
                    "{:<6} {:<9} {:<30} {:<20} {:<18} {:>12}",
                    "ID", "SOURCE", "TITLE", "COMPANY", "LOCATION", "PAY"
                );
                println!("{}", "-".repeat(100));
                for posting in postings {
                    println!(
                        "{:<6} {:<9} {:<30} {:<20} {:<18} {:>12}",
                        posting.id,
                        posting.source,
                        truncate(&posting.title, 28),
                        truncate(&posting.company_name, 18),
                        truncate(&posting.location, 16),
                        format_pay(posting.salary_min, posting.salary_max)
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Show { id } => {
            let db = open_db(config)?;
            db.ensure_initialized()?;
            match db.get_posting(id)? {
                Some(posting) => {
                    println!("Posting #{}", posting.id);
                    println!("Title: {}", posting.title);
                    println!("Company: {}", posting.company_name);
                    println!("Location: {} ({})", posting.location, posting.location_type);
                    println!("Source: {}", posting.source);
                    if let Some(url) = &posting.url {
                        println!("URL: {}", url);
                    }
                    println!("Pay: {}", format_pay(posting.salary_min, posting.salary_max));
                    println!("Active: {}", if posting.is_active { "yes" } else { "no" });
                    println!("First seen: {}", posting.created_at);
                    println!("Last seen: {}", posting.last_seen_at);

                    if let Some(profile_id) = db.first_profile_id()? {
                        if let Some(m) = db.get_match(profile_id, posting.id)? {
                            println!("\nMatch #{}: {:.0} ({}, {})", m.id, m.overall_score, m.recommendation, m.method.as_str());
                            for line in textwrap::fill(&m.reasoning, 76).lines() {
                                println!("  {}", line);
                            }
                            if !m.matched_skills.is_empty() {
                                println!("  Matched: {}", m.matched_skills.join(", "));
                            }
                            if !m.missing_skills.is_empty() {
                                println!("  Missing: {}", m.missing_skills.join(", "));
                            }
                        }
                    }

                    if !posting.description.is_empty() {
                        println!("\n--- Description ---\n{}", textwrap::fill(&posting.description, 80));
                    }
                }
                None => println!("Posting #{} not found.", id),
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Matches { limit, min_score, profile_id } => {
            let db = open_db(config)?;
            db.ensure_initialized()?;
            let profile_id = match profile_id {
                Some(id) => id,
                None => db
                    .first_profile_id()?
                    .ok_or_else(|| anyhow!("No profile found. Run 'jobscout run --profile-only' first."))?,
            };
            let rows = db.report_view(profile_id, min_score.unwrap_or(config.reporting.min_score), limit)?;
            if rows.is_empty() {
                println!("No matches found.");
            } else {
                print_matches_table(&rows);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Mark { id, reviewed, interested, not_interested } => {
            let db = open_db(config)?;
            db.ensure_initialized()?;
            let interest = if interested {
                Some(true)
            } else if not_interested {
                Some(false)
            } else {
                None
            };
            // A bare `mark <id>` marks the match reviewed
            let reviewed = if reviewed || interest.is_none() { Some(true) } else { None };
            if !db.set_match_flags(id, reviewed, interest).context("Failed to update match")? {
                println!("Match #{} not found.", id);
                return Ok(ExitCode::FAILURE);
            }
            if let Some(m) = db.get_match_by_id(id)? {
                let interest = match m.is_interested {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "-",
                };
                println!(
                    "Updated match #{}: reviewed={} interested={}",
                    m.id,
                    if m.is_reviewed { "yes" } else { "no" },
                    interest
                );
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Runs { limit } => {
            let db = open_db(config)?;
            db.ensure_initialized()?;
            let runs = db.recent_search_runs(limit)?;
            if runs.is_empty() {
                println!("No search runs recorded.");
            } else {
                println!(
                    "{:<6} {:<20} {:<9} {:>7} {:>5} {:>5} {:>6} {:<14}",
                    "ID", "RUN AT", "SOURCE", "QUERIES", "FOUND", "NEW", "SECS", "ERROR"
                );
                println!("{}", "-".repeat(80));
                for run in runs {
                    println!(
                        "{:<6} {:<20} {:<9} {:>7} {:>5} {:>5} {:>6.1} {:<14}",
                        run.id,
                        run.run_at,
                        run.source,
                        run.queries,
                        run.jobs_found,
                        run.new_jobs,
                        run.duration_seconds,
                        run.error_kind.unwrap_or_else(|| "-".to_string())
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_db(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database_path())
}

/// Print credential presence per service. Fails when a required one is
/// missing; the scoring provider for the configured model counts as required.
/// A model that cannot be resolved fails outright.
fn validate(config: &AppConfig, credentials: &dyn CredentialProvider) -> ExitCode {
    let spec = match ai::resolve_model(&config.matching.model) {
        Ok(spec) => spec,
        Err(e) => {
            println!("status=failed kind={} error={:#}", FailureKind::classify(&e), e);
            return ExitCode::FAILURE;
        }
    };
    let statuses = credentials::validate(credentials, &[spec.provider.service()]);

    println!("{:<12} {:<9} {:<9} {}", "SERVICE", "PRESENT", "REQUIRED", "VARIABLE");
    println!("{}", "-".repeat(56));
    for status in &statuses {
        println!(
            "{:<12} {:<9} {:<9} {}",
            status.service,
            if status.present { "yes" } else { "no" },
            if status.required { "yes" } else { "no" },
            EnvCredentials::var_name(&status.service)
        );
    }

    if credentials::all_required_present(&statuses) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jobscout").chain(args.iter().copied())).unwrap()
    }

    fn run_args(cli: Cli) -> RunArgs {
        match cli.command {
            Some(Commands::Run(args)) => args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(RunArgs::default().phases(), PhaseSet::all());
    }

    #[test]
    fn test_only_flags() {
        let args = run_args(parse(&["run", "--search-only"]));
        assert_eq!(args.phases(), PhaseSet::only(Phase::Search));
    }

    #[test]
    fn test_skip_flags() {
        let args = run_args(parse(&["run", "--skip-profile", "--skip-report", "--rescore"]));
        let phases = args.phases();
        assert!(!phases.contains(Phase::Profile));
        assert!(phases.contains(Phase::Search));
        assert!(phases.contains(Phase::Match));
        assert!(!phases.contains(Phase::Report));
        assert!(args.rescore);
    }

    #[test]
    fn test_only_flags_conflict() {
        let result = Cli::try_parse_from(["jobscout", "run", "--search-only", "--match-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_scoring_credential() {
        let config = AppConfig::default();
        let missing = credentials::StaticCredentials::new();
        assert_eq!(validate(&config, &missing), ExitCode::FAILURE);

        let present = credentials::StaticCredentials::new().with("anthropic", "key");
        assert_eq!(validate(&config, &present), ExitCode::SUCCESS);

        let mut unknown = AppConfig::default();
        unknown.matching.model = "gpt-3".to_string();
        let everything = credentials::StaticCredentials::new()
            .with("anthropic", "key")
            .with("openai", "key");
        assert_eq!(validate(&unknown, &everything), ExitCode::FAILURE);
    }
}
