use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::credentials::{CredentialProvider, EnvCredentials};
use crate::error::{ConfigError, ScoringError};
use crate::models::ComponentScores;
use crate::normalize::truncate_chars;
use crate::scorer::{DetailedScore, ScoreRequest, ScoringBackend};

// --- Provider trait ---

pub trait AIProvider: Send + Sync {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ScoringError>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
}

impl ProviderKind {
    /// Credential service name for this provider.
    pub fn service(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAI => "openai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (provider, model_id, short_name) = match name {
        "api-sonnet" | "sonnet" => (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "api-sonnet"),
        "api-opus" | "opus" => (ProviderKind::Anthropic, "claude-opus-4-6", "api-opus"),
        "api-haiku" | "haiku" => (ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "api-haiku"),
        "gpt-4o" => (ProviderKind::OpenAI, "gpt-4o", "gpt-4o"),
        "gpt-4o-mini" => (ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"),
        "o3" => (ProviderKind::OpenAI, "o3", "o3"),
        _ => {
            return Err(ConfigError::Invalid(format!(
                "unknown model '{}'. Available: api-sonnet (default), api-opus, api-haiku, gpt-4o, gpt-4o-mini, o3",
                name
            ))
            .into());
        }
    };
    Ok(ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

/// Build the provider for `spec`. A missing API key is a startup error.
pub fn create_provider(
    spec: &ModelSpec,
    credentials: &dyn CredentialProvider,
    timeout: Duration,
) -> Result<Box<dyn AIProvider>> {
    let service = spec.provider.service();
    let api_key = credentials.get(service).ok_or_else(|| ConfigError::MissingCredential {
        service: service.to_string(),
        hint: format!("set {} to score with {}", EnvCredentials::var_name(service), spec.short_name),
    })?;
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    match spec.provider {
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider {
            api_key,
            model_id: spec.model_id.clone(),
            client,
        })),
        ProviderKind::OpenAI => Ok(Box::new(OpenAIProvider {
            api_key,
            model_id: spec.model_id.clone(),
            client,
        })),
    }
}

fn status_error(provider: &str, response: reqwest::blocking::Response) -> ScoringError {
    let status = response.status();
    let error_text = response.text().unwrap_or_default();
    ScoringError::Unavailable(format!(
        "{} API request failed with status {}: {}",
        provider,
        status,
        truncate_chars(&error_text, 200)
    ))
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ScoringError> {
        let request = AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(status_error("Anthropic", response));
        }

        let api_response: AnthropicResponse = response
            .json()
            .map_err(|e| ScoringError::InvalidResponse(format!("Anthropic response: {}", e)))?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| ScoringError::InvalidResponse("No content in Anthropic API response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    max_completion_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ScoringError> {
        let request = OpenAIRequest {
            model: self.model_id.clone(),
            max_completion_tokens: max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(status_error("OpenAI", response));
        }

        let api_response: OpenAIResponse = response
            .json()
            .map_err(|e| ScoringError::InvalidResponse(format!("OpenAI response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ScoringError::InvalidResponse("No choices in OpenAI API response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Match scoring on top of a provider ---

const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Scoring backend that asks a language model for a JSON breakdown.
pub struct AiScorer {
    provider: Box<dyn AIProvider>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScoreBreakdown {
    overall_score: Option<f64>,
    skills_score: Option<f64>,
    experience_score: Option<f64>,
    location_score: Option<f64>,
    compensation_score: Option<f64>,
    culture_score: Option<f64>,
    reasoning: String,
    matched_skills: Vec<String>,
    missing_skills: Vec<String>,
    strengths: Vec<String>,
    concerns: Vec<String>,
}

impl AiScorer {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self { provider }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

fn format_salary(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("${} - ${}", min, max),
        (Some(min), None) => format!("from ${}", min),
        (None, Some(max)) => format!("up to ${}", max),
        (None, None) => "not stated".to_string(),
    }
}

pub fn build_prompt(request: &ScoreRequest<'_>) -> String {
    let profile = request.profile;
    let posting = request.posting;
    let skills = request
        .skills
        .iter()
        .map(|s| match &s.proficiency {
            Some(level) => format!("{} ({})", s.name, level),
            None => s.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Score how well this candidate fits the job posting.\n\n\
        Return ONLY a JSON object with these keys:\n\
        overall_score, skills_score, experience_score, location_score, compensation_score, culture_score \
        (numbers 0-100), reasoning (2-3 sentences), matched_skills, missing_skills, strengths, concerns \
        (arrays of short strings).\n\n\
        Candidate:\n\
        Current title: {}\n\
        Years of experience: {}\n\
        Location: {}\n\
        Salary expectation: {}\n\
        Skills: {}\n\
        Summary: {}\n\n\
        Job:\n\
        Title: {}\n\
        Company: {}\n\
        Location: {} ({})\n\
        Salary: {}\n\
        Keyword pre-score: {:.0}\n\
        Description:\n{}",
        profile.current_title.as_deref().unwrap_or("not stated"),
        profile.years_experience.map(|y| y.to_string()).unwrap_or_else(|| "not stated".to_string()),
        profile.location.as_deref().unwrap_or("not stated"),
        format_salary(profile.salary_min, profile.salary_max),
        skills,
        profile.summary.as_deref().unwrap_or(""),
        posting.title,
        posting.company_name,
        posting.location,
        posting.location_type,
        format_salary(posting.salary_min, posting.salary_max),
        request.heuristic.score,
        truncate_chars(&posting.description, MAX_DESCRIPTION_CHARS),
    )
}

/// Parse the model reply, tolerating code fences and surrounding prose.
pub fn parse_breakdown(response: &str) -> Result<DetailedScore, ScoringError> {
    let text = response.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(ScoringError::InvalidResponse("no JSON object in reply".to_string())),
    };

    let breakdown: ScoreBreakdown =
        serde_json::from_str(json).map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

    Ok(DetailedScore {
        overall: breakdown.overall_score,
        components: ComponentScores {
            skills: breakdown.skills_score,
            experience: breakdown.experience_score,
            location: breakdown.location_score,
            compensation: breakdown.compensation_score,
            culture: breakdown.culture_score,
        },
        reasoning: breakdown.reasoning.trim().to_string(),
        matched_skills: breakdown.matched_skills,
        missing_skills: breakdown.missing_skills,
        strengths: breakdown.strengths,
        concerns: breakdown.concerns,
    })
}

impl ScoringBackend for AiScorer {
    fn score(&self, request: &ScoreRequest<'_>) -> Result<DetailedScore, ScoringError> {
        let prompt = build_prompt(request);
        let response = self.provider.complete(&prompt, 1024)?;
        parse_breakdown(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::error::FailureKind;

    #[test]
    fn test_resolve_model_anthropic_api() {
        let spec = resolve_model("api-sonnet").unwrap();
        assert_eq!(spec.model_id, "claude-sonnet-4-5-20250929");
        assert_eq!(spec.provider, ProviderKind::Anthropic);

        let spec = resolve_model("haiku").unwrap();
        assert_eq!(spec.short_name, "api-haiku");
    }

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o").unwrap();
        assert_eq!(spec.provider, ProviderKind::OpenAI);
        assert_eq!(spec.provider.service(), "openai");

        let spec = resolve_model("o3").unwrap();
        assert_eq!(spec.model_id, "o3");
    }

    #[test]
    fn test_resolve_model_unknown() {
        assert!(resolve_model("gpt-3").is_err());
    }

    #[test]
    fn test_create_provider_requires_api_key() {
        let spec = resolve_model("api-sonnet").unwrap();
        let result = create_provider(&spec, &StaticCredentials::new(), Duration::from_secs(5));
        let err = result.err().unwrap();
        assert_eq!(FailureKind::classify(&err), FailureKind::Configuration);
        assert!(err.to_string().contains("JOBSCOUT_ANTHROPIC_KEY"));
    }

    #[test]
    fn test_create_provider_with_api_key() {
        let spec = resolve_model("gpt-4o").unwrap();
        let creds = StaticCredentials::new().with("openai", "test-key");
        let provider = create_provider(&spec, &creds, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[test]
    fn test_parse_breakdown_with_fences() {
        let reply = "```json\n{\"overall_score\": 82, \"skills_score\": 90, \"reasoning\": \"Strong HSE fit.\",\n\
                     \"matched_skills\": [\"OSHA\"], \"concerns\": [\"Relocation\"]}\n```";
        let score = parse_breakdown(reply).unwrap();
        assert_eq!(score.overall, Some(82.0));
        assert_eq!(score.components.skills, Some(90.0));
        assert_eq!(score.components.culture, None);
        assert_eq!(score.reasoning, "Strong HSE fit.");
        assert_eq!(score.matched_skills, vec!["OSHA".to_string()]);
        assert_eq!(score.concerns, vec!["Relocation".to_string()]);
    }

    #[test]
    fn test_parse_breakdown_with_prose() {
        let reply = "Here is my assessment: {\"skills_score\": 70} Hope this helps.";
        let score = parse_breakdown(reply).unwrap();
        assert_eq!(score.overall, None);
        assert_eq!(score.components.skills, Some(70.0));
    }

    #[test]
    fn test_parse_breakdown_rejects_garbage() {
        assert!(matches!(
            parse_breakdown("I cannot score this."),
            Err(ScoringError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_breakdown("{\"overall_score\": \"high\"}"),
            Err(ScoringError::InvalidResponse(_))
        ));
    }
}
