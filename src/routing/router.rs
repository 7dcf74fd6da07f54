//! Request classification.
//!
//! # Responsibilities
//! - Store the ordered rule table
//! - Map a request target to exactly one service class
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over rules, first match wins
//! - Total: anything unmatched falls through to the default class

use crate::routing::matcher::{AnyMatcher, ExactPathMatcher, Matcher, PathPrefixMatcher};
use crate::routing::ServiceClass;

/// A compiled routing rule.
#[derive(Debug)]
pub struct RoutingRule {
    pub matcher: Box<dyn Matcher>,
    pub class: ServiceClass,
}

impl RoutingRule {
    pub fn new(matcher: impl Matcher + 'static, class: ServiceClass) -> Self {
        Self {
            matcher: Box::new(matcher),
            class,
        }
    }
}

/// Maps request targets to service classes.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<RoutingRule>,
    fallback: ServiceClass,
}

impl Classifier {
    /// Create a classifier from ordered rules and a fallback class.
    pub fn new(rules: Vec<RoutingRule>, fallback: ServiceClass) -> Self {
        Self { rules, fallback }
    }

    /// Classify a request target. An empty target is treated as `/`.
    pub fn classify(&self, target: &str) -> ServiceClass {
        let target = if target.is_empty() { "/" } else { target };

        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(target))
            .map(|rule| rule.class)
            .unwrap_or(self.fallback)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = vec![
            RoutingRule::new(PathPrefixMatcher::new("/api/v1"), ServiceClass::Api),
            RoutingRule::new(PathPrefixMatcher::new("/processor"), ServiceClass::Wisensys),
            RoutingRule::new(
                AnyMatcher::new(vec![
                    Box::new(PathPrefixMatcher::new("/plugins/UxxxxM")),
                    Box::new(PathPrefixMatcher::new("/plugins/Wxxxx")),
                    Box::new(PathPrefixMatcher::new("/plugins/intabsoap")),
                ]),
                ServiceClass::Comet,
            ),
            RoutingRule::new(
                AnyMatcher::new(vec![
                    Box::new(PathPrefixMatcher::new("/provision")),
                    Box::new(PathPrefixMatcher::new("/onep:v1")),
                    Box::new(ExactPathMatcher::new("/timestamp")),
                ]),
                ServiceClass::Novus,
            ),
            RoutingRule::new(PathPrefixMatcher::new("/IntabWS"), ServiceClass::Gprs),
        ];

        Self::new(rules, ServiceClass::Ui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify("/api/v1/x"), ServiceClass::Api);
        assert_eq!(classifier.classify("/processor/y"), ServiceClass::Wisensys);
        assert_eq!(classifier.classify("/IntabWS/z"), ServiceClass::Gprs);
        assert_eq!(classifier.classify("/plugins/intabsoap/upload"), ServiceClass::Comet);
        assert_eq!(classifier.classify("/plugins/UxxxxM"), ServiceClass::Comet);
        assert_eq!(classifier.classify("/onep:v1/stack/alias"), ServiceClass::Novus);
        assert_eq!(classifier.classify("/timestamp"), ServiceClass::Novus);
        assert_eq!(classifier.classify("/anything-else"), ServiceClass::Ui);
    }

    #[test]
    fn test_fallback_cases() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify(""), ServiceClass::Ui);
        assert_eq!(classifier.classify("/"), ServiceClass::Ui);
        // Exact rule does not match with a trailing segment
        assert_eq!(classifier.classify("/timestamp/2"), ServiceClass::Ui);
        // Prefix test is literal, so /api/v10 still starts with /api/v1
        assert_eq!(classifier.classify("/api/v10"), ServiceClass::Api);
        assert_eq!(classifier.classify("/api/v2"), ServiceClass::Ui);
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = Classifier::new(
            vec![
                RoutingRule::new(PathPrefixMatcher::new("/a"), ServiceClass::Api),
                RoutingRule::new(PathPrefixMatcher::new("/a/b"), ServiceClass::Gprs),
            ],
            ServiceClass::Ui,
        );

        assert_eq!(classifier.classify("/a/b/c"), ServiceClass::Api);
    }
}
