use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::models::{
    ComponentScores, InsertOutcome, LocationType, Match, MatchRecord, NewPosting, NewProfile, NewSearchRun,
    Posting, Profile, Recommendation, ReportRow, ScoringMethod, SearchRun, Skill, SkillInput,
};

/// SQLite store. The connection sits behind a mutex so that every method is
/// atomic with respect to the scoring and search threads.
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
}

const POSTING_COLUMNS: &str = "id, source, external_id, title, company_name, location, location_type,
     description, salary_min, salary_max, url, is_active, fingerprint, posted_at, created_at, last_seen_at";

const MATCH_COLUMNS: &str = "id, profile_id, job_id, overall_score, heuristic_score,
     skills_score, experience_score, location_score, compensation_score, culture_score,
     reasoning, matched_skills, missing_skills, strengths, concerns, recommendation, method,
     is_reviewed, is_interested, created_at, updated_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn: Mutex::new(conn), path: path.to_path_buf() })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn), path: PathBuf::from(":memory:") })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panicked holder cannot leave a half-applied statement behind
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                email TEXT,
                phone TEXT,
                location TEXT,
                current_title TEXT,
                years_experience INTEGER,
                summary TEXT,
                salary_min INTEGER,
                salary_max INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS skills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id INTEGER NOT NULL REFERENCES profiles(id),
                name TEXT NOT NULL,
                category TEXT,
                proficiency TEXT,
                source TEXT,
                confidence REAL NOT NULL DEFAULT 1.0,
                UNIQUE (profile_id, name)
            );

            CREATE TABLE IF NOT EXISTS postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                external_id TEXT,
                title TEXT NOT NULL,
                company_name TEXT NOT NULL,
                location TEXT NOT NULL,
                location_type TEXT NOT NULL DEFAULT 'unknown'
                    CHECK (location_type IN ('remote', 'hybrid', 'onsite', 'unknown')),
                description TEXT NOT NULL DEFAULT '',
                salary_min INTEGER,
                salary_max INTEGER,
                url TEXT,
                raw_data TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                fingerprint TEXT NOT NULL UNIQUE,
                posted_at TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                last_seen_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (source, external_id)
            );

            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id INTEGER NOT NULL REFERENCES profiles(id),
                job_id INTEGER NOT NULL REFERENCES postings(id),
                overall_score REAL NOT NULL,
                heuristic_score REAL NOT NULL,
                skills_score REAL,
                experience_score REAL,
                location_score REAL,
                compensation_score REAL,
                culture_score REAL,
                reasoning TEXT NOT NULL,
                matched_skills TEXT NOT NULL DEFAULT '[]',
                missing_skills TEXT NOT NULL DEFAULT '[]',
                strengths TEXT NOT NULL DEFAULT '[]',
                concerns TEXT NOT NULL DEFAULT '[]',
                recommendation TEXT NOT NULL
                    CHECK (recommendation IN ('strong_match', 'good_match', 'possible_match', 'poor_match')),
                method TEXT NOT NULL CHECK (method IN ('gated', 'detailed', 'fallback')),
                is_reviewed INTEGER NOT NULL DEFAULT 0,
                is_interested INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (profile_id, job_id)
            );

            CREATE TABLE IF NOT EXISTS search_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                queries INTEGER NOT NULL,
                jobs_found INTEGER NOT NULL,
                new_jobs INTEGER NOT NULL,
                duplicates INTEGER NOT NULL,
                error_kind TEXT,
                error TEXT,
                duration_seconds REAL NOT NULL,
                run_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_postings_active ON postings(is_active);
            CREATE INDEX IF NOT EXISTS idx_matches_profile_score ON matches(profile_id, overall_score);
            CREATE INDEX IF NOT EXISTS idx_search_runs_source ON search_runs(source);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='postings'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'jobscout init' first."));
        }
        Ok(())
    }

    // --- Profile operations ---

    /// Insert or update the profile with this name and return its id.
    pub fn upsert_profile(&self, profile: &NewProfile) -> Result<i64> {
        let id: i64 = self
            .conn()
            .query_row(
                "INSERT INTO profiles (name, email, phone, location, current_title, years_experience,
                                       summary, salary_min, salary_max)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(name) DO UPDATE SET
                    email = excluded.email,
                    phone = excluded.phone,
                    location = excluded.location,
                    current_title = excluded.current_title,
                    years_experience = excluded.years_experience,
                    summary = excluded.summary,
                    salary_min = excluded.salary_min,
                    salary_max = excluded.salary_max,
                    updated_at = datetime('now')
                 RETURNING id",
                params![
                    profile.name,
                    profile.email,
                    profile.phone,
                    profile.location,
                    profile.current_title,
                    profile.years_experience,
                    profile.summary,
                    profile.salary_min,
                    profile.salary_max,
                ],
                |row| row.get(0),
            )
            .context("Failed to upsert profile")?;
        Ok(id)
    }

    /// Skills are keyed by (profile, name); a repeated name overwrites.
    pub fn upsert_skills(&self, profile_id: i64, skills: &[SkillInput]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO skills (profile_id, name, category, proficiency, source, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(profile_id, name) DO UPDATE SET
                    category = excluded.category,
                    proficiency = excluded.proficiency,
                    source = excluded.source,
                    confidence = excluded.confidence",
            )?;
            for skill in skills {
                stmt.execute(params![
                    profile_id,
                    skill.name,
                    skill.category,
                    skill.proficiency,
                    skill.source,
                    skill.confidence,
                ])?;
            }
        }
        tx.commit().context("Failed to store skills")?;
        Ok(skills.len())
    }

    pub fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        self.conn()
            .query_row(
                "SELECT id, name, email, phone, location, current_title, years_experience, summary,
                        salary_min, salary_max, created_at, updated_at
                 FROM profiles WHERE id = ?1",
                [id],
                Self::row_to_profile,
            )
            .optional()
            .context("Failed to load profile")
    }

    pub fn first_profile_id(&self) -> Result<Option<i64>> {
        self.conn()
            .query_row("SELECT id FROM profiles ORDER BY id LIMIT 1", [], |row| row.get(0))
            .optional()
            .context("Failed to look up profile")
    }

    pub fn get_skills(&self, profile_id: i64) -> Result<Vec<Skill>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, profile_id, name, category, proficiency, source, confidence
             FROM skills WHERE profile_id = ?1 ORDER BY confidence DESC, name",
        )?;
        let rows = stmt.query_map([profile_id], |row| {
            Ok(Skill {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                name: row.get(2)?,
                category: row.get(3)?,
                proficiency: row.get(4)?,
                source: row.get(5)?,
                confidence: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().context("Failed to list skills")
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        Ok(Profile {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            location: row.get(4)?,
            current_title: row.get(5)?,
            years_experience: row.get(6)?,
            summary: row.get(7)?,
            salary_min: row.get(8)?,
            salary_max: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    // --- Posting operations ---

    /// Offer one posting. Existing (source, external_id) rows are refreshed;
    /// otherwise the row is inserted unless its fingerprint is already stored.
    pub fn insert_posting(&self, posting: &NewPosting) -> Result<InsertOutcome> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if let Some(external_id) = &posting.external_id {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM postings WHERE source = ?1 AND external_id = ?2",
                    params![posting.source, external_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                tx.execute(
                    "UPDATE postings SET
                        description = ?1,
                        url = COALESCE(?2, url),
                        salary_min = COALESCE(?3, salary_min),
                        salary_max = COALESCE(?4, salary_max),
                        raw_data = COALESCE(?5, raw_data),
                        is_active = 1,
                        last_seen_at = datetime('now'),
                        updated_at = datetime('now')
                     WHERE id = ?6",
                    params![
                        posting.description,
                        posting.url,
                        posting.salary_min,
                        posting.salary_max,
                        posting.raw_data,
                        id,
                    ],
                )?;
                tx.commit()?;
                return Ok(InsertOutcome::Refreshed(id));
            }
        }

        let duplicate: Option<i64> = tx
            .query_row(
                "SELECT id FROM postings WHERE fingerprint = ?1",
                [&posting.fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = duplicate {
            // Seen again: keep it active, leave the stored fields alone
            tx.execute(
                "UPDATE postings SET is_active = 1, last_seen_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            tx.commit()?;
            return Ok(InsertOutcome::DuplicateFingerprint(id));
        }

        tx.execute(
            "INSERT INTO postings (source, external_id, title, company_name, location, location_type,
                                   description, salary_min, salary_max, url, raw_data, fingerprint, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                posting.source,
                posting.external_id,
                posting.title,
                posting.company_name,
                posting.location,
                posting.location_type.as_str(),
                posting.description,
                posting.salary_min,
                posting.salary_max,
                posting.url,
                posting.raw_data,
                posting.fingerprint,
                posting.posted_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit().context("Failed to insert posting")?;
        Ok(InsertOutcome::Inserted(id))
    }

    /// Mark postings not seen within `days` as inactive. Returns rows changed.
    pub fn deactivate_stale(&self, days: u32) -> Result<usize> {
        let changed = self
            .conn()
            .execute(
                "UPDATE postings SET is_active = 0, updated_at = datetime('now')
                 WHERE is_active = 1 AND last_seen_at < datetime('now', ?1)",
                [format!("-{} days", days)],
            )
            .context("Failed to deactivate stale postings")?;
        Ok(changed)
    }

    pub fn count_postings(&self, active_only: bool) -> Result<i64> {
        let sql = if active_only {
            "SELECT COUNT(*) FROM postings WHERE is_active = 1"
        } else {
            "SELECT COUNT(*) FROM postings"
        };
        let count = self.conn().query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn list_postings(&self, source: Option<&str>, include_inactive: bool, limit: usize) -> Result<Vec<Posting>> {
        let mut sql = format!("SELECT {} FROM postings WHERE 1 = 1", POSTING_COLUMNS);
        if !include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if source.is_some() {
            sql.push_str(" AND source = ?2");
        }
        sql.push_str(" ORDER BY last_seen_at DESC, id DESC LIMIT ?1");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = if let Some(s) = source {
            stmt.query_map(params![limit as i64, s], Self::row_to_posting)?
        } else {
            stmt.query_map(params![limit as i64], Self::row_to_posting)?
        };
        rows.collect::<Result<Vec<_>, _>>().context("Failed to list postings")
    }

    pub fn get_posting(&self, id: i64) -> Result<Option<Posting>> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM postings WHERE id = ?1", POSTING_COLUMNS),
                [id],
                Self::row_to_posting,
            )
            .optional()
            .context("Failed to load posting")
    }

    /// Active postings due for scoring: unmatched ones, or all with `rescore`.
    pub fn postings_to_score(&self, profile_id: i64, rescore: bool, limit: usize) -> Result<Vec<Posting>> {
        let conn = self.conn();
        let rows = if rescore {
            let sql = format!("SELECT {} FROM postings WHERE is_active = 1 ORDER BY id LIMIT ?1", POSTING_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit as i64], Self::row_to_posting)?;
            rows.collect::<Result<Vec<_>, _>>()
        } else {
            let sql = format!(
                "SELECT {} FROM postings p WHERE is_active = 1
                   AND NOT EXISTS (SELECT 1 FROM matches m WHERE m.job_id = p.id AND m.profile_id = ?1)
                 ORDER BY id LIMIT ?2",
                POSTING_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![profile_id, limit as i64], Self::row_to_posting)?;
            rows.collect::<Result<Vec<_>, _>>()
        };
        rows.context("Failed to select postings to score")
    }

    fn row_to_posting(row: &rusqlite::Row) -> rusqlite::Result<Posting> {
        let location_type: String = row.get(6)?;
        Ok(Posting {
            id: row.get(0)?,
            source: row.get(1)?,
            external_id: row.get(2)?,
            title: row.get(3)?,
            company_name: row.get(4)?,
            location: row.get(5)?,
            location_type: LocationType::parse(&location_type),
            description: row.get(7)?,
            salary_min: row.get(8)?,
            salary_max: row.get(9)?,
            url: row.get(10)?,
            is_active: row.get(11)?,
            fingerprint: row.get(12)?,
            posted_at: row.get(13)?,
            created_at: row.get(14)?,
            last_seen_at: row.get(15)?,
        })
    }

    // --- Match operations ---

    /// Insert or rescore. `is_reviewed` and `is_interested` are never touched.
    pub fn upsert_match(&self, record: &MatchRecord) -> Result<i64> {
        let id: i64 = self
            .conn()
            .query_row(
                "INSERT INTO matches (profile_id, job_id, overall_score, heuristic_score,
                                      skills_score, experience_score, location_score,
                                      compensation_score, culture_score, reasoning,
                                      matched_skills, missing_skills, strengths, concerns,
                                      recommendation, method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT(profile_id, job_id) DO UPDATE SET
                    overall_score = excluded.overall_score,
                    heuristic_score = excluded.heuristic_score,
                    skills_score = excluded.skills_score,
                    experience_score = excluded.experience_score,
                    location_score = excluded.location_score,
                    compensation_score = excluded.compensation_score,
                    culture_score = excluded.culture_score,
                    reasoning = excluded.reasoning,
                    matched_skills = excluded.matched_skills,
                    missing_skills = excluded.missing_skills,
                    strengths = excluded.strengths,
                    concerns = excluded.concerns,
                    recommendation = excluded.recommendation,
                    method = excluded.method,
                    updated_at = datetime('now')
                 RETURNING id",
                params![
                    record.profile_id,
                    record.job_id,
                    record.overall_score,
                    record.heuristic_score,
                    record.components.skills,
                    record.components.experience,
                    record.components.location,
                    record.components.compensation,
                    record.components.culture,
                    record.reasoning,
                    serde_json::to_string(&record.matched_skills)?,
                    serde_json::to_string(&record.missing_skills)?,
                    serde_json::to_string(&record.strengths)?,
                    serde_json::to_string(&record.concerns)?,
                    record.recommendation.as_str(),
                    record.method.as_str(),
                ],
                |row| row.get(0),
            )
            .context("Failed to upsert match")?;
        Ok(id)
    }

    pub fn get_match(&self, profile_id: i64, job_id: i64) -> Result<Option<Match>> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM matches WHERE profile_id = ?1 AND job_id = ?2", MATCH_COLUMNS),
                params![profile_id, job_id],
                Self::row_to_match,
            )
            .optional()
            .context("Failed to load match")
    }

    pub fn get_match_by_id(&self, id: i64) -> Result<Option<Match>> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM matches WHERE id = ?1", MATCH_COLUMNS),
                [id],
                Self::row_to_match,
            )
            .optional()
            .context("Failed to load match")
    }

    pub fn count_matches(&self, profile_id: i64) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM matches WHERE profile_id = ?1",
            [profile_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// User-owned flags. `None` leaves a flag unchanged. Returns false when
    /// the match does not exist.
    pub fn set_match_flags(&self, match_id: i64, reviewed: Option<bool>, interested: Option<bool>) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE matches SET
                is_reviewed = COALESCE(?1, is_reviewed),
                is_interested = COALESCE(?2, is_interested)
             WHERE id = ?3",
            params![reviewed, interested, match_id],
        )?;
        Ok(changed > 0)
    }

    fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<Match> {
        let recommendation: String = row.get(15)?;
        let method: String = row.get(16)?;
        Ok(Match {
            id: row.get(0)?,
            profile_id: row.get(1)?,
            job_id: row.get(2)?,
            overall_score: row.get(3)?,
            heuristic_score: row.get(4)?,
            components: ComponentScores {
                skills: row.get(5)?,
                experience: row.get(6)?,
                location: row.get(7)?,
                compensation: row.get(8)?,
                culture: row.get(9)?,
            },
            reasoning: row.get(10)?,
            matched_skills: json_list(&row.get::<_, String>(11)?),
            missing_skills: json_list(&row.get::<_, String>(12)?),
            strengths: json_list(&row.get::<_, String>(13)?),
            concerns: json_list(&row.get::<_, String>(14)?),
            recommendation: Recommendation::parse(&recommendation).unwrap_or(Recommendation::PoorMatch),
            method: ScoringMethod::parse(&method),
            is_reviewed: row.get(17)?,
            is_interested: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }

    // --- Search run log ---

    pub fn log_search_run(&self, run: &NewSearchRun) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO search_runs (source, queries, jobs_found, new_jobs, duplicates,
                                      error_kind, error, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run.source,
                run.queries,
                run.jobs_found,
                run.new_jobs,
                run.duplicates,
                run.error_kind,
                run.error,
                run.duration_seconds,
            ],
        )
        .context("Failed to log search run")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_search_runs(&self, limit: usize) -> Result<Vec<SearchRun>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, source, queries, jobs_found, new_jobs, duplicates, error_kind, error,
                    duration_seconds, run_at
             FROM search_runs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(SearchRun {
                id: row.get(0)?,
                source: row.get(1)?,
                queries: row.get(2)?,
                jobs_found: row.get(3)?,
                new_jobs: row.get(4)?,
                duplicates: row.get(5)?,
                error_kind: row.get(6)?,
                error: row.get(7)?,
                duration_seconds: row.get(8)?,
                run_at: row.get(9)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().context("Failed to list search runs")
    }

    // --- Reporting ---

    /// Matches for a profile joined with their postings, best first.
    pub fn report_view(&self, profile_id: i64, min_score: f64, limit: usize) -> Result<Vec<ReportRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.id, p.id, p.title, p.company_name, p.location, p.location_type, p.source, p.url,
                    p.salary_min, p.salary_max, m.overall_score,
                    m.skills_score, m.experience_score, m.location_score, m.compensation_score, m.culture_score,
                    m.recommendation, m.method, m.reasoning,
                    m.matched_skills, m.missing_skills, m.strengths, m.concerns,
                    m.is_reviewed, m.is_interested, m.updated_at
             FROM matches m JOIN postings p ON p.id = m.job_id
             WHERE m.profile_id = ?1 AND m.overall_score >= ?2 AND p.is_active = 1
             ORDER BY m.overall_score DESC, m.id
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![profile_id, min_score, limit as i64], |row| {
            let location_type: String = row.get(5)?;
            let recommendation: String = row.get(16)?;
            let method: String = row.get(17)?;
            Ok(ReportRow {
                match_id: row.get(0)?,
                job_id: row.get(1)?,
                title: row.get(2)?,
                company_name: row.get(3)?,
                location: row.get(4)?,
                location_type: LocationType::parse(&location_type),
                source: row.get(6)?,
                url: row.get(7)?,
                salary_min: row.get(8)?,
                salary_max: row.get(9)?,
                overall_score: row.get(10)?,
                components: ComponentScores {
                    skills: row.get(11)?,
                    experience: row.get(12)?,
                    location: row.get(13)?,
                    compensation: row.get(14)?,
                    culture: row.get(15)?,
                },
                recommendation: Recommendation::parse(&recommendation).unwrap_or(Recommendation::PoorMatch),
                method: ScoringMethod::parse(&method),
                reasoning: row.get(18)?,
                matched_skills: json_list(&row.get::<_, String>(19)?),
                missing_skills: json_list(&row.get::<_, String>(20)?),
                strengths: json_list(&row.get::<_, String>(21)?),
                concerns: json_list(&row.get::<_, String>(22)?),
                is_reviewed: row.get(23)?,
                is_interested: row.get(24)?,
                updated_at: row.get(25)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().context("Failed to build report view")
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<usize> {
        Ok(self.conn().execute(sql, [])?)
    }
}

fn json_list(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_default()
}
