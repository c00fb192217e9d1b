//! Topic matching for handler registration.

/// Which topics a handler receives.
///
/// Patterns follow the job-kind convention: `"user:created"` matches exactly,
/// `"user:*"` matches every topic starting with `"user:"`, `"*"` matches all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicMatcher {
    Exact(String),
    Prefix(String),
    Any,
}

impl TopicMatcher {
    pub fn exact(topic: impl Into<String>) -> Self {
        Self::Exact(topic.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Parse a pattern string (see type docs).
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            Self::Any
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            Self::Prefix(prefix.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Exact(t) => t == topic,
            Self::Prefix(p) => topic.starts_with(p.as_str()),
            Self::Any => true,
        }
    }
}

impl From<&str> for TopicMatcher {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
