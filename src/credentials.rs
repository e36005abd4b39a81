use std::collections::HashMap;

/// Single lookup point for secrets. Every collaborator asks this, never the
/// environment directly.
pub trait CredentialProvider: Send + Sync {
    fn get(&self, service: &str) -> Option<String>;
}

/// Known services and whether the pipeline refuses to run without them.
pub const KNOWN_SERVICES: &[(&str, bool)] = &[
    ("anthropic", false),
    ("openai", false),
    ("usajobs", false),
    ("brave", false),
];

/// Reads `JOBSCOUT_<SERVICE>_KEY` from the process environment.
#[derive(Debug, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn var_name(service: &str) -> String {
        format!("JOBSCOUT_{}_KEY", service.to_uppercase())
    }
}

impl CredentialProvider for EnvCredentials {
    fn get(&self, service: &str) -> Option<String> {
        std::env::var(Self::var_name(service))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// In-memory provider, used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: &str, secret: &str) -> Self {
        self.values.insert(service.to_string(), secret.to_string());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn get(&self, service: &str) -> Option<String> {
        self.values.get(service).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStatus {
    pub service: String,
    pub present: bool,
    pub required: bool,
}

/// Presence check for every known service. `required_extra` marks services the
/// current configuration depends on (e.g. the scoring provider).
pub fn validate(provider: &dyn CredentialProvider, required_extra: &[&str]) -> Vec<CredentialStatus> {
    KNOWN_SERVICES
        .iter()
        .map(|(service, required)| CredentialStatus {
            service: service.to_string(),
            present: provider.get(service).is_some(),
            required: *required || required_extra.contains(service),
        })
        .collect()
}

pub fn all_required_present(statuses: &[CredentialStatus]) -> bool {
    statuses.iter().all(|s| s.present || !s.required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(EnvCredentials::var_name("usajobs"), "JOBSCOUT_USAJOBS_KEY");
    }

    #[test]
    fn test_validate_marks_required_services() {
        let creds = StaticCredentials::new().with("brave", "b-key");
        let statuses = validate(&creds, &["anthropic"]);

        let anthropic = statuses.iter().find(|s| s.service == "anthropic").unwrap();
        assert!(anthropic.required);
        assert!(!anthropic.present);

        let brave = statuses.iter().find(|s| s.service == "brave").unwrap();
        assert!(brave.present);
        assert!(!brave.required);

        assert!(!all_required_present(&statuses));
    }

    #[test]
    fn test_all_required_present_ignores_optional() {
        let creds = StaticCredentials::new().with("anthropic", "a-key");
        let statuses = validate(&creds, &["anthropic"]);
        assert!(all_required_present(&statuses));
    }
}
