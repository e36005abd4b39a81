use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ReportingConfig;
use crate::db::Database;
use crate::models::{Recommendation, ReportRow};

const TOP_COMPANIES: usize = 5;
const DETAILED_ROWS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_matches: usize,
    pub strong_matches: usize,
    pub good_matches: usize,
    pub possible_matches: usize,
    pub poor_matches: usize,
    pub average_score: f64,
    pub by_source: BTreeMap<String, usize>,
    pub by_location_type: BTreeMap<String, usize>,
    pub top_companies: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub profile_id: i64,
    pub active_postings: i64,
    pub summary: ReportSummary,
    pub matches: Vec<ReportRow>,
}

pub fn summarize(rows: &[ReportRow]) -> ReportSummary {
    let mut summary = ReportSummary { total_matches: rows.len(), ..Default::default() };
    let mut companies: HashMap<&str, usize> = HashMap::new();
    let mut total_score = 0.0;

    for row in rows {
        match row.recommendation {
            Recommendation::StrongMatch => summary.strong_matches += 1,
            Recommendation::GoodMatch => summary.good_matches += 1,
            Recommendation::PossibleMatch => summary.possible_matches += 1,
            Recommendation::PoorMatch => summary.poor_matches += 1,
        }
        total_score += row.overall_score;
        *summary.by_source.entry(row.source.clone()).or_default() += 1;
        *summary.by_location_type.entry(row.location_type.to_string()).or_default() += 1;
        *companies.entry(row.company_name.as_str()).or_default() += 1;
    }

    if !rows.is_empty() {
        summary.average_score = (total_score / rows.len() as f64 * 10.0).round() / 10.0;
    }

    let mut companies: Vec<(String, usize)> = companies.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
    companies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    companies.truncate(TOP_COMPANIES);
    summary.top_companies = companies;
    summary
}

pub fn build_report(db: &Database, profile_id: i64, config: &ReportingConfig) -> Result<Report> {
    let matches = db.report_view(profile_id, config.min_score, config.max_matches)?;
    Ok(Report {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        profile_id,
        active_postings: db.count_postings(true)?,
        summary: summarize(&matches),
        matches,
    })
}

/// Write `report-YYYY-MM-DD.json` into `dir`, replacing an earlier report
/// from the same day.
pub fn write_json(report: &Report, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("report-{}.json", chrono::Local::now().format("%Y-%m-%d")));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), matches = report.matches.len(), "Report written");
    Ok(path)
}

pub fn format_pay(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("${}k-${}k", min / 1000, max / 1000),
        (Some(min), None) => format!("${}k+", min / 1000),
        (None, Some(max)) => format!("<${}k", max / 1000),
        (None, None) => "-".to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn print_matches_table(rows: &[ReportRow]) {
    println!(
        "{:<6} {:>5} {:<15} {:<30} {:<20} {:<18} {:>12}",
        "ID", "SCORE", "TIER", "TITLE", "COMPANY", "LOCATION", "PAY"
    );
    println!("{}", "-".repeat(112));
    for row in rows {
        println!(
            "{:<6} {:>5.0} {:<15} {:<30} {:<20} {:<18} {:>12}",
            row.match_id,
            row.overall_score,
            row.recommendation,
            truncate(&row.title, 28),
            truncate(&row.company_name, 18),
            truncate(&row.location, 16),
            format_pay(row.salary_min, row.salary_max)
        );
    }
}

pub fn print_report(report: &Report) {
    let s = &report.summary;
    println!("Job match report ({})", report.generated_at);
    println!(
        "  Matches: {} (strong {}, good {}, possible {}, poor {})",
        s.total_matches, s.strong_matches, s.good_matches, s.possible_matches, s.poor_matches
    );
    println!("  Average score: {:.1}", s.average_score);
    println!("  Active postings: {}", report.active_postings);
    if !s.by_source.is_empty() {
        let sources: Vec<String> = s.by_source.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        println!("  By source: {}", sources.join(", "));
    }
    if !s.by_location_type.is_empty() {
        let types: Vec<String> = s.by_location_type.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        println!("  By location: {}", types.join(", "));
    }
    if !s.top_companies.is_empty() {
        let companies: Vec<String> = s.top_companies.iter().map(|(k, v)| format!("{} ({})", k, v)).collect();
        println!("  Top companies: {}", companies.join(", "));
    }

    if report.matches.is_empty() {
        println!("\nNo matches to report.");
        return;
    }

    println!();
    print_matches_table(&report.matches);

    for row in report.matches.iter().take(DETAILED_ROWS) {
        println!("\n#{} {} at {} ({:.0})", row.match_id, row.title, row.company_name, row.overall_score);
        if let Some(url) = &row.url {
            println!("  {}", url);
        }
        for line in textwrap::fill(&row.reasoning, 76).lines() {
            println!("  {}", line);
        }
        if !row.strengths.is_empty() {
            println!("  + {}", row.strengths.join("; "));
        }
        if !row.concerns.is_empty() {
            println!("  - {}", row.concerns.join("; "));
        }
    }
}
