//! Path matching logic.
//!
//! # Responsibilities
//! - Match the request target against a prefix
//! - Match the request target exactly
//!
//! # Design Decisions
//! - Matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - Matchers see the raw request target (path plus query), not a decoded path

/// Trait for matching a request target against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the target matches this condition.
    fn matches(&self, target: &str) -> bool;
}

/// Matches the request target prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, target: &str) -> bool {
        target.starts_with(&self.prefix)
    }
}

/// Matches one request target exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, target: &str) -> bool {
        target == self.path
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, target: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(target))
    }
}
