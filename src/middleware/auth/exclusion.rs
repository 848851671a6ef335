//! Routes that bypass the gate entirely.
//!
//! Matching is route-based: `Exact` compares the whole path, `Prefix` matches
//! the path itself or anything below it on a segment boundary. Substring
//! containment is never used, so `/api/v1/mylogin` stays gated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    Exact(String),
    Prefix(String),
}

impl ExclusionRule {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ExclusionRule::Exact(p) => path == p,
            ExclusionRule::Prefix(p) => path
                .strip_prefix(p.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.rules.iter().any(|r| r.matches(path))
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        let exact = |p: &str| ExclusionRule::Exact(p.to_string());
        Self::new(vec![
            exact("/"),
            exact("/api/v1/user/login"),
            exact("/api/v1/user/logout"),
            exact("/api/v1/install"),
            exact("/api/v1/install/status"),
            exact("/api/v1/install/version"),
            ExclusionRule::Prefix("/api/v1/websocket".to_string()),
        ])
    }
}
