use crate::{peer::CidrParseError, rules::Direction};
use policy_converter_core::{KvPair, PortParseError, Rule};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Fails the conversion of an object as a whole.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0} has no name")]
    MissingName(&'static str),

    #[error("NetworkPolicy {0} has no namespace")]
    MissingNamespace(String),

    #[error("AdminNetworkPolicy subject must select namespaces or pods")]
    MissingSubject,

    #[error("invalid UID {uid:?}")]
    InvalidUid {
        uid: String,
        #[source]
        source: uuid::Error,
    },

    #[error("revision {0:?} must have the form <namespace>/<service account>")]
    InvalidRevision(String),

    #[error("resource name {0:?} is not a namespace profile")]
    NotNamespaceProfile(String),

    #[error("resource name {0:?} is not a service account profile")]
    NotServiceAccountProfile(String),

    #[error("malformed service account profile name {0:?}")]
    MalformedProfileName(String),
}

/// Fails the conversion of a single rule.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RuleError {
    #[error("invalid port {port:?}")]
    InvalidPort {
        port: String,
        #[source]
        source: PortParseError,
    },

    #[error(transparent)]
    InvalidCidr(#[from] CidrParseError),

    #[error("none of supported fields in '{0}' is set")]
    MissingPeer(&'static str),

    #[error("unsupported action {0:?}")]
    UnsupportedAction(String),
}

/// A source rule that could not be converted.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadRule {
    pub direction: Direction,
    /// The source rule as it was written.
    pub rule: serde_json::Value,
    pub reason: String,
}

/// Describes every rule of a policy that failed to convert.
#[derive(Clone, Debug, Serialize)]
pub struct RuleConversionErrors {
    pub policy: String,
    pub rules: Vec<BadRule>,
}

/// Converts a policy's rules one at a time, recording each failure instead of stopping.
#[derive(Debug)]
pub struct ErrorTracker {
    policy: String,
    bad_rules: Vec<BadRule>,
}

/// The result of a conversion that completed, possibly with some rules omitted or replaced.
#[derive(Debug)]
#[must_use]
pub struct Converted {
    pub kvp: KvPair,
    pub errors: Option<RuleConversionErrors>,
}

// === impl RuleConversionErrors ===

impl fmt::Display for RuleConversionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error converting {} rule(s) of policy {}",
            self.rules.len(),
            self.policy
        )?;
        for (i, BadRule {
            direction, reason, ..
        }) in self.rules.iter().enumerate()
        {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{direction} rule: {reason}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuleConversionErrors {}

// === impl ErrorTracker ===

impl ErrorTracker {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            bad_rules: Vec::new(),
        }
    }

    /// Converts each rule, concatenating the results in order.
    ///
    /// A rule that fails to convert is recorded. When `fail_closed` returns a rule for it, that
    /// rule takes its place; otherwise the failed rule is dropped.
    pub fn convert_rules<'r, R: Serialize + 'r>(
        &mut self,
        direction: Direction,
        rules: impl IntoIterator<Item = &'r R>,
        convert: impl Fn(&R) -> Result<Vec<Rule>, RuleError>,
        fail_closed: impl Fn(&R) -> Option<Rule>,
    ) -> Vec<Rule> {
        let mut converted = Vec::new();
        for rule in rules {
            match convert(rule) {
                Ok(rules) => converted.extend(rules),
                Err(error) => {
                    warn!(policy = %self.policy, %direction, %error, "Failed to convert rule");
                    if let Some(deny) = fail_closed(rule) {
                        warn!(policy = %self.policy, %direction, "Replacing failed rule with a deny-all rule");
                        converted.push(deny);
                    }
                    self.record(direction, rule, &error);
                }
            }
        }
        converted
    }

    fn record<R: Serialize>(&mut self, direction: Direction, rule: &R, error: &RuleError) {
        let rule = serde_json::to_value(rule).unwrap_or_else(|error| {
            warn!(policy = %self.policy, %direction, %error, "Failed to record rule");
            serde_json::Value::Null
        });
        let mut reason = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(e) = source {
            reason = format!("{reason}: {e}");
            source = std::error::Error::source(e);
        }
        self.bad_rules.push(BadRule {
            direction,
            rule,
            reason,
        });
    }

    pub fn into_error(self) -> Option<RuleConversionErrors> {
        if self.bad_rules.is_empty() {
            return None;
        }
        Some(RuleConversionErrors {
            policy: self.policy,
            rules: self.bad_rules,
        })
    }
}

// === impl Converted ===

impl Converted {
    pub fn into_parts(self) -> (KvPair, Option<RuleConversionErrors>) {
        (self.kvp, self.errors)
    }
}
