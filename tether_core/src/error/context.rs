//! Key/value annotations attached to framework errors.

use std::fmt;

/// Names what an error concerns, e.g. `mode: direct` or `provider: redis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    key: &'static str,
    value: String,
}

impl ErrorContext {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

impl<V: Into<String>> From<(&'static str, V)> for ErrorContext {
    fn from((key, value): (&'static str, V)) -> Self {
        Self::new(key, value)
    }
}
