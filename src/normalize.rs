//! Text normalization shared by the source adapters and the aggregator.
//!
//! Everything that feeds the posting fingerprint lives here so that two
//! adapters reporting the same advertisement always hash identically.

use regex::Regex;
use scraper::Html;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case, punctuation to spaces, whitespace collapsed.
pub fn normalize_text(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '&' || c == '+' || c == '#' { c } else { ' ' })
        .collect();
    collapse_whitespace(&mapped)
}

/// City/state token: first two comma segments, postcodes and parentheticals
/// removed. "Oklahoma City, OK 73102, USA" -> "oklahoma city, ok".
pub fn location_token(location: &str) -> String {
    let without_parens = parenthetical_re().replace_all(location, " ");
    without_parens
        .split(',')
        .map(|segment| {
            let no_digits: String = segment.chars().filter(|c| !c.is_ascii_digit()).collect();
            normalize_text(&no_digits)
        })
        .filter(|segment| !segment.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn fingerprint(title: &str, company: &str, location: &str) -> String {
    let key = format!(
        "{}|{}|{}",
        normalize_text(title),
        normalize_text(company),
        location_token(location)
    );
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)").expect("valid regex"))
}

/// Strip job-board suffixes ("- Indeed", "| LinkedIn") and a trailing
/// parenthetical from a search-engine page title.
pub fn clean_title(title: &str) -> String {
    static BOARD: OnceLock<Regex> = OnceLock::new();
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let board = BOARD.get_or_init(|| {
        Regex::new(r"(?i)\s*[-|]\s*(?:LinkedIn|Indeed(?:\.com)?|Glassdoor|ZipRecruiter|Monster)\b.*$")
            .expect("valid regex")
    });
    let trailing = TRAILING.get_or_init(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));

    let title = board.replace(title, "");
    let title = trailing.replace(&title, "");
    collapse_whitespace(&title)
}

/// Company from "Title at Company", "Title - Company" or "Company is hiring".
pub fn extract_company(title: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?i)\b(?:at|@)\s+([A-Za-z0-9][A-Za-z0-9 .&']*?)\s*(?:[-|,(]|$)",
            r"(?i)^([A-Za-z0-9][A-Za-z0-9 .&']*?)\s+(?:is hiring|jobs)\b",
            r"[-|]\s*([A-Za-z0-9][A-Za-z0-9 .&']*?)\s*(?:[-|]|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    });

    for re in patterns {
        if let Some(company) = re.captures(title).and_then(|c| c.get(1)) {
            let company = company.as_str().trim();
            if !company.is_empty() && company.len() < 60 {
                return Some(company.to_string());
            }
        }
    }
    None
}

/// "City, ST" from free text, else "Remote" when mentioned.
pub fn extract_location(text: &str) -> Option<String> {
    static CITY_STATE: OnceLock<Regex> = OnceLock::new();
    let re = CITY_STATE
        .get_or_init(|| Regex::new(r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)?,\s*[A-Z]{2})\b").expect("valid regex"));
    if let Some(m) = re.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str().to_string());
    }
    if text.to_lowercase().contains("remote") {
        return Some("Remote".to_string());
    }
    None
}

/// Visible text of an HTML fragment.
pub fn strip_html(html: &str) -> String {
    if !html.contains('<') {
        return collapse_whitespace(html);
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Amounts above this are parse noise, not pay.
const MAX_PLAUSIBLE_PAY: i64 = 10_000_000;

/// Salary-like number ("$85,000", "85000.00", "85k") to whole units.
pub fn parse_salary(raw: &str) -> Option<i64> {
    let lower = raw.trim().to_lowercase();
    let number: String = lower
        .chars()
        .take_while(|c| !c.is_ascii_alphabetic() || *c == 'k')
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value = number.parse::<f64>().ok()?;
    let value = if lower.contains('k') { value * 1000.0 } else { value };
    if value <= 0.0 || value > MAX_PLAUSIBLE_PAY as f64 {
        None
    } else {
        Some(value.round() as i64)
    }
}

/// First two dollar amounts in free text, ordered (min, max).
pub fn extract_pay_range(content: &str) -> (Option<i64>, Option<i64>) {
    let lower = content.to_lowercase();

    let mut pay_min = None;
    let mut pay_max = None;

    let chars: Vec<char> = lower.chars().collect();
    for i in 0..chars.len() {
        if chars[i] == '$' {
            let mut j = i + 1;
            let mut num_str = String::new();
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == ',' || chars[j] == '.') {
                if chars[j] == '.' {
                    // Cents are dropped; skip to the end of the number
                    while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                        j += 1;
                    }
                    break;
                }
                if chars[j].is_ascii_digit() {
                    num_str.push(chars[j]);
                }
                j += 1;
            }

            if let Ok(num) = num_str.parse::<i64>() {
                let value = if j < chars.len() && chars[j] == 'k' {
                    num.checked_mul(1000)
                } else if num < 1000 {
                    // Likely already in thousands (e.g., $150 meaning $150k)
                    num.checked_mul(1000)
                } else {
                    Some(num)
                };
                let Some(value) = value.filter(|v| *v <= MAX_PLAUSIBLE_PAY) else {
                    continue;
                };

                if pay_min.is_none() {
                    pay_min = Some(value);
                } else if pay_max.is_none() {
                    pay_max = Some(value);
                }
            }
        }
    }

    if let (Some(min), Some(max)) = (pay_min, pay_max) {
        if min > max {
            return (Some(max), Some(min));
        }
    }

    (pay_min, pay_max)
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
