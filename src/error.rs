use std::collections::BTreeMap;
use std::fmt;

use anyhow::anyhow;

use crate::models::FamilyInvariantViolation;

pub type Result<T> = std::result::Result<T, LibError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Integrity,
    Persistence,
    Forbidden,
    NotFound,
}

/// Structured payload attached to an error for callers that render it per field or per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetails {
    Fields(BTreeMap<String, String>),
    Violations(Vec<FamilyInvariantViolation>),
}

#[derive(Debug)]
pub struct LibError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub public: &'static str,
    pub details: Option<ErrorDetails>,
    pub source: anyhow::Error,
}

impl LibError {
    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        let source = anyhow!(
            "blocking validation failed for fields: {}",
            fields.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Self {
            kind: ErrorKind::Validation,
            code: "validation_failed",
            public: "Please fix the highlighted fields",
            details: Some(ErrorDetails::Fields(fields)),
            source,
        }
    }

    pub fn invalid(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Validation,
            code: "invalid_input",
            public,
            details: None,
            source,
        }
    }

    pub fn integrity(code: &'static str, public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Integrity,
            code,
            public,
            details: None,
            source,
        }
    }

    pub fn violations(
        code: &'static str,
        public: &'static str,
        violations: Vec<FamilyInvariantViolation>,
    ) -> Self {
        let source = anyhow!("family invariant validation failed: {:?}", violations);
        Self {
            kind: ErrorKind::Integrity,
            code,
            public,
            details: Some(ErrorDetails::Violations(violations)),
            source,
        }
    }

    pub fn cycle(source: anyhow::Error) -> Self {
        Self::integrity(
            "family_cycle",
            "A person cannot become a descendant of themselves",
            source,
        )
    }

    pub fn persistence(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Persistence,
            code: "persistence_error",
            public,
            details: None,
            source,
        }
    }

    pub fn forbidden(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            code: "forbidden",
            public,
            details: None,
            source,
        }
    }

    pub fn not_found(public: &'static str, source: anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            code: "not_found",
            public,
            details: None,
            source,
        }
    }

    /// Field errors, when this is a blocking validation failure.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match &self.details {
            Some(ErrorDetails::Fields(fields)) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for LibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.public, self.code)
    }
}

impl std::error::Error for LibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl From<serde_json::Error> for LibError {
    fn from(value: serde_json::Error) -> Self {
        Self::persistence("Family data could not be encoded", anyhow!(value))
    }
}
