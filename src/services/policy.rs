//! Role-based policy evaluation.
//!
//! A rule `(subject, path, action)` allows a request when `subject` equals the
//! caller's user id or its resolved role, `path` matches the request path and
//! `action` is `*` or the request method.
//!
//! Path patterns, segment by segment:
//! - literal segments match exactly
//! - `:name` / `{name}` match one non-empty segment
//! - `*` matches one segment; as the last segment it matches one or more

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::repos::policy_repo::{PolicyRule, PolicyStore};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy store: {0}")]
    Store(#[from] RepoError),
}

#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn enforce(
        &self,
        subject: &str,
        role: &str,
        path: &str,
        method: &str,
    ) -> Result<bool, PolicyError>;

    async fn reload(&self) -> Result<(), PolicyError>;
}

/// Rules granted to a fresh installation.
pub fn default_policy() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new("admin", "/api/v1/*", "*"),
        PolicyRule::new("normal", "/api/v1/*", "GET"),
        PolicyRule::new("normal", "/api/v1/user/info", "PUT"),
    ]
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<PolicyRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn allows(&self, subject: &str, role: &str, path: &str, method: &str) -> bool {
        self.rules.iter().any(|rule| {
            (rule.subject == subject || rule.subject == role)
                && action_matches(&rule.action, method)
                && path_matches(&rule.path, path)
        })
    }
}

fn action_matches(action: &str, method: &str) -> bool {
    action == "*" || action.eq_ignore_ascii_case(method)
}

pub fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pat: Vec<&str> = pattern.split('/').collect();
    let segs: Vec<&str> = path.split('/').collect();

    if pat.last() == Some(&"*") {
        pat.pop();
        // trailing `*` needs at least one segment to consume
        return segs.len() > pat.len() && segments_match(&pat, &segs[..pat.len()]);
    }

    pat.len() == segs.len() && segments_match(&pat, &segs)
}

fn segments_match(pattern: &[&str], path: &[&str]) -> bool {
    pattern.iter().zip(path).all(|(p, s)| match *p {
        "*" => true,
        p if p.starts_with(':') || (p.starts_with('{') && p.ends_with('}')) => !s.is_empty(),
        p => p == *s,
    })
}

/// Holds the current rule set behind an `Arc` swap so readers never see a
/// partially loaded set.
pub struct RulePolicyEngine {
    store: Arc<dyn PolicyStore>,
    rules: RwLock<Arc<RuleSet>>,
}

impl RulePolicyEngine {
    /// Builds the engine and performs the initial load.
    pub async fn load(store: Arc<dyn PolicyStore>) -> Result<Self, PolicyError> {
        let rules = store.load_rules().await?;
        tracing::info!(rules = rules.len(), "policy rules loaded");

        Ok(Self {
            store,
            rules: RwLock::new(Arc::new(RuleSet::new(rules))),
        })
    }

    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PolicyEngine for RulePolicyEngine {
    async fn enforce(
        &self,
        subject: &str,
        role: &str,
        path: &str,
        method: &str,
    ) -> Result<bool, PolicyError> {
        Ok(self.snapshot().allows(subject, role, path, method))
    }

    async fn reload(&self) -> Result<(), PolicyError> {
        let rules = self.store.load_rules().await?;
        let next = Arc::new(RuleSet::new(rules));
        tracing::info!(rules = next.len(), "policy rules reloaded");

        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }
}
