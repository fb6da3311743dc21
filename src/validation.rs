//! Lint for the canonical server list.

use crate::config::{ServerDefinition, Transport};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub server: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.server, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Whether the list should be rejected. With `strict`, warnings count too.
    pub fn is_failure(&self, strict: bool) -> bool {
        if strict {
            !self.issues.is_empty()
        } else {
            self.errors().next().is_some()
        }
    }

    fn push(&mut self, server: &str, severity: Severity, message: String) {
        self.issues.push(ValidationIssue { server: server.to_string(), severity, message });
    }
}

/// Compiled lint rules.
#[derive(Debug)]
pub struct Validator {
    name_regex: Regex,
    env_key_regex: Regex,
    url_regex: Regex,
    header_regex: Regex,
}

impl Validator {
    /// # Errors
    ///
    /// Returns an error if:
    /// - Unable to compile one of the lint patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            name_regex: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")?,
            env_key_regex: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?,
            url_regex: Regex::new(r"^https?://[^\s/]+")?,
            header_regex: Regex::new(r"^[!#$%&'*+.^_`|~0-9A-Za-z-]+$")?,
        })
    }

    /// Check every server of the list.
    pub fn validate(&self, servers: &[ServerDefinition]) -> ValidationResult {
        let mut result = ValidationResult::default();
        let mut seen = HashSet::new();

        for server in servers {
            let name = server.name.as_str();
            if !seen.insert(name) {
                result.push(name, Severity::Error, "duplicate server name".to_string());
            }
            if !self.name_regex.is_match(name) {
                result.push(
                    name,
                    Severity::Warning,
                    "name should use letters, digits, '.', '_' or '-' so every target accepts it"
                        .to_string(),
                );
            }

            match &server.transport {
                Transport::Stdio { command, env, .. } => {
                    if command.trim().is_empty() {
                        result.push(name, Severity::Error, "neither command nor url is set".to_string());
                    }
                    for key in env.keys().filter(|k| !self.env_key_regex.is_match(k)) {
                        result.push(
                            name,
                            Severity::Warning,
                            format!("environment variable `{key}` is not a portable name"),
                        );
                    }
                },
                Transport::Remote { url, headers } => {
                    if !self.url_regex.is_match(url) {
                        result.push(name, Severity::Error, format!("url `{url}` is not an http(s) URL"));
                    }
                    for key in headers.keys().filter(|k| !self.header_regex.is_match(k)) {
                        result.push(name, Severity::Warning, format!("header name `{key}` is invalid"));
                    }
                },
            }
        }

        result
    }
}

/// Check every server of the list with a fresh [`Validator`].
///
/// # Errors
///
/// Returns an error if the lint patterns fail to compile.
pub fn validate_servers(servers: &[ServerDefinition]) -> Result<ValidationResult, regex::Error> {
    Ok(Validator::new()?.validate(servers))
}
