use serde::Serialize;

use crate::Location;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub severity: Severity,
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Diagnostic {
    pub fn new(location: Location, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            location,
            severity,
            message: message.into(),
            code: None,
        }
    }

    pub fn error(location: Location, message: impl Into<String>) -> Self {
        Self::new(location, Severity::Error, message)
    }

    pub fn warning(location: Location, message: impl Into<String>) -> Self {
        Self::new(location, Severity::Warning, message)
    }

    pub fn hint(location: Location, message: impl Into<String>) -> Self {
        Self::new(location, Severity::Hint, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
