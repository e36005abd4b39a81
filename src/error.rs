use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Source answered but had nothing for the query.
    Empty,
    /// Rate limited, captcha, or HTTP 403/429.
    Blocked,
    Timeout,
    /// Credential for the source is not configured.
    AuthMissing,
    /// Any other transport or decoding failure.
    Http,
}

impl SourceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceErrorKind::Empty => "empty",
            SourceErrorKind::Blocked => "blocked",
            SourceErrorKind::Timeout => "timeout",
            SourceErrorKind::AuthMissing => "auth_missing",
            SourceErrorKind::Http => "http",
        }
    }
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub detail: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn empty(detail: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Empty, detail)
    }

    pub fn auth_missing(service: &str) -> Self {
        Self::new(
            SourceErrorKind::AuthMissing,
            format!("no credential configured for '{}'", service),
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            SourceErrorKind::Timeout
        } else if e
            .status()
            .is_some_and(|s| s.as_u16() == 403 || s.as_u16() == 429)
        {
            SourceErrorKind::Blocked
        } else {
            SourceErrorKind::Http
        };
        Self::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("scoring backend unavailable: {0}")]
    Unavailable(String),
    #[error("scoring backend timed out")]
    Timeout,
    #[error("invalid scoring response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ScoringError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScoringError::Timeout
        } else {
            ScoringError::Unavailable(e.to_string())
        }
    }
}

/// Startup failures: no phase is attempted when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential '{service}' ({hint})")]
    MissingCredential { service: String, hint: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Coarse classification used in phase summary lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Storage,
    Configuration,
    Io,
    Other,
}

impl FailureKind {
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<rusqlite::Error>() {
                return FailureKind::Storage;
            }
            if cause.is::<ConfigError>() {
                return FailureKind::Configuration;
            }
            if cause.is::<std::io::Error>() {
                return FailureKind::Io;
            }
        }
        FailureKind::Other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Storage => "storage",
            FailureKind::Configuration => "configuration",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_classify_storage_error_through_context() {
        let err: anyhow::Result<()> = Err(rusqlite::Error::InvalidQuery).context("Failed to insert posting");
        assert_eq!(FailureKind::classify(&err.unwrap_err()), FailureKind::Storage);
    }

    #[test]
    fn test_classify_other_error() {
        let err = anyhow::anyhow!("no profile found");
        assert_eq!(FailureKind::classify(&err), FailureKind::Other);
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::auth_missing("brave");
        assert_eq!(err.to_string(), "auth_missing: no credential configured for 'brave'");
    }
}
