use crate::{IpNet, Port, Protocol};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The annotation key under which a source rule's name is recorded.
pub const RULE_NAME_ANNOTATION: &str = "name";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Action {
    #[default]
    Allow,
    Deny,
    Pass,
}

/// A single directional policy rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RuleMetadata>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "EntityRule::is_empty")]
    pub source: EntityRule,
    #[serde(default, skip_serializing_if = "EntityRule::is_empty")]
    pub destination: EntityRule,
}

/// Matches one end of a connection.
///
/// Empty fields do not constrain the match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selector: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace_selector: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nets: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_nets: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleMetadata {
    pub annotations: BTreeMap<String, String>,
}

// === impl Action ===

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => "Allow".fmt(f),
            Self::Deny => "Deny".fmt(f),
            Self::Pass => "Pass".fmt(f),
        }
    }
}

// === impl Rule ===

impl Rule {
    /// A rule matching all traffic.
    pub fn all(action: Action) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }
}

// === impl EntityRule ===

impl EntityRule {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// === impl RuleMetadata ===

impl RuleMetadata {
    /// Records a source rule name. Unnamed rules carry no metadata at all.
    pub fn for_rule_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        Some(Self {
            annotations: Some((RULE_NAME_ANNOTATION.to_string(), name.to_string()))
                .into_iter()
                .collect(),
        })
    }
}
