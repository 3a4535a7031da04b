use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One error or warning attached to a handler operation, optionally carrying
/// the attribute path it concerns.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: Option<String>,
    pub attribute_path: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            attribute_path: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
            attribute_path: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute_path = Some(path.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.summary)?,
            Severity::Warning => write!(f, "warning: {}", self.summary)?,
        }
        if let Some(path) = &self.attribute_path {
            write!(f, " (attribute {path})")?;
        }
        Ok(())
    }
}

/// The ordered diagnostics a handler operation returns to the orchestrator.
/// An operation with at least one error diagnostic has failed; warnings are
/// informational.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_error(error: impl fmt::Display) -> Self {
        Self(vec![Diagnostic::error(error.to_string())])
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl From<scw_locality::Error> for Diagnostic {
    fn from(error: scw_locality::Error) -> Self {
        Diagnostic::error(error.to_string())
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn warnings_do_not_fail_the_operation() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("instance may reboot"));
        assert!(!diags.has_error());
        diags.push(Diagnostic::error("boom").with_attribute("options.0.id"));
        assert!(diags.has_error());
        assert_eq!(diags.iter().count(), 2);
    }

    #[test]
    fn display_carries_attribute_path() {
        let d = Diagnostic::warning("couldn't read tags").with_attribute("tags");
        assert_eq!(d.to_string(), "warning: couldn't read tags (attribute tags)");
    }
}
