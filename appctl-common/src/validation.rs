//! Structured validation results.
//!
//! Validation is a sequence of pure checks. Each check looks at the value and
//! returns the issues it found; the [`Validator`] runs every check and either
//! succeeds or returns all collected issues at once, so a user sees every
//! configuration problem in a single pass.

use serde::Serialize;
use std::fmt;

/// A single problem found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Dotted path of the offending field, e.g. `webhooks.subscriptions[0].path`.
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue reported by a failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<Issue>,
}

impl ValidationErrors {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  • {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

type Check<'a, T> = Box<dyn Fn(&T) -> Vec<Issue> + 'a>;

/// An ordered pipeline of checks over `T`.
///
/// ```rust,ignore
/// let result = Validator::new()
///     .check(|c: &Config| check_name(&c.name))
///     .check_one(|c: &Config| check_url("application_url", &c.application_url))
///     .validate(&config);
/// ```
pub struct Validator<'a, T: ?Sized> {
    checks: Vec<Check<'a, T>>,
}

impl<'a, T: ?Sized> Validator<'a, T> {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Add a check that may report any number of issues.
    pub fn check(mut self, check: impl Fn(&T) -> Vec<Issue> + 'a) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Add a check that reports at most one issue.
    pub fn check_one(mut self, check: impl Fn(&T) -> Option<Issue> + 'a) -> Self {
        self.checks
            .push(Box::new(move |value| check(value).into_iter().collect()));
        self
    }

    /// Run every check in order and collect the issues.
    pub fn issues(&self, value: &T) -> Vec<Issue> {
        self.checks.iter().flat_map(|check| check(value)).collect()
    }

    pub fn validate(&self, value: &T) -> Result<(), ValidationErrors> {
        let issues = self.issues(value);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(issues))
        }
    }
}

impl<T: ?Sized> Default for Validator<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a parent path and a field name.
pub fn field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Path of a list element.
pub fn index(parent: &str, i: usize) -> String {
    format!("{parent}[{i}]")
}
