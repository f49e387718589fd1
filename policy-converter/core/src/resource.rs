use crate::Rule;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The kinds of objects produced by conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Kind {
    NetworkPolicy,
    GlobalNetworkPolicy,
    Profile,
}

/// Identifies a converted object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct ResourceKey {
    pub kind: Kind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A converted object along with its key and the revision of its source(s).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct KvPair {
    pub key: ResourceKey,
    pub value: Resource,
    pub revision: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind")]
pub enum Resource {
    NetworkPolicy(NetworkPolicy),
    GlobalNetworkPolicy(GlobalNetworkPolicy),
    Profile(Profile),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PolicyType {
    Ingress,
    Egress,
}

/// A namespaced policy.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NetworkPolicy {
    pub metadata: ObjectMeta,
    pub spec: NetworkPolicySpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    pub order: Option<f64>,
    pub selector: String,
    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
    pub types: Vec<PolicyType>,
}

/// A cluster-wide policy evaluated within a tier.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GlobalNetworkPolicy {
    pub metadata: ObjectMeta,
    pub spec: GlobalNetworkPolicySpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalNetworkPolicySpec {
    pub tier: String,
    pub order: Option<f64>,
    pub namespace_selector: String,
    pub selector: String,
    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
    pub types: Vec<PolicyType>,
}

/// Labels (and default rules) inherited by the workloads of a namespace or service account.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    pub metadata: ObjectMeta,
    pub spec: ProfileSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<Rule>,
    pub labels_to_apply: BTreeMap<String, String>,
}

// === impl Kind ===

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkPolicy => "NetworkPolicy".fmt(f),
            Self::GlobalNetworkPolicy => "GlobalNetworkPolicy".fmt(f),
            Self::Profile => "Profile".fmt(f),
        }
    }
}

// === impl ResourceKey ===

impl ResourceKey {
    pub fn cluster(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
        }
    }

    pub fn namespaced(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace.as_deref() {
            Some(ns) => write!(f, "{}({}/{})", self.kind, ns, self.name),
            None => write!(f, "{}({})", self.kind, self.name),
        }
    }
}

// === impl Resource ===

impl Resource {
    pub fn kind(&self) -> Kind {
        match self {
            Self::NetworkPolicy(_) => Kind::NetworkPolicy,
            Self::GlobalNetworkPolicy(_) => Kind::GlobalNetworkPolicy,
            Self::Profile(_) => Kind::Profile,
        }
    }
}

impl From<NetworkPolicy> for Resource {
    fn from(np: NetworkPolicy) -> Self {
        Self::NetworkPolicy(np)
    }
}

impl From<GlobalNetworkPolicy> for Resource {
    fn from(gnp: GlobalNetworkPolicy) -> Self {
        Self::GlobalNetworkPolicy(gnp)
    }
}

impl From<Profile> for Resource {
    fn from(profile: Profile) -> Self {
        Self::Profile(profile)
    }
}

// === impl PolicyType ===

impl PolicyType {
    /// Enables each direction for which there is at least one rule.
    pub fn from_rules(ingress: &[Rule], egress: &[Rule]) -> Vec<Self> {
        let mut types = Vec::with_capacity(2);
        if !ingress.is_empty() {
            types.push(Self::Ingress);
        }
        if !egress.is_empty() {
            types.push(Self::Egress);
        }
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;

    #[test]
    fn policy_types_follow_rules() {
        let allow = vec![Rule::all(Action::Allow)];
        assert!(PolicyType::from_rules(&[], &[]).is_empty());
        assert_eq!(
            PolicyType::from_rules(&allow, &[]),
            vec![PolicyType::Ingress]
        );
        assert_eq!(
            PolicyType::from_rules(&[], &allow),
            vec![PolicyType::Egress]
        );
        assert_eq!(
            PolicyType::from_rules(&allow, &allow),
            vec![PolicyType::Ingress, PolicyType::Egress]
        );
    }

    #[test]
    fn resource_is_tagged_by_kind() {
        let value = serde_json::to_value(Resource::from(Profile::default())).unwrap();
        assert_eq!(value["kind"], "Profile");
        assert_eq!(
            ResourceKey::namespaced(Kind::NetworkPolicy, "ns-0", "knp.default.np-0").to_string(),
            "NetworkPolicy(ns-0/knp.default.np-0)"
        );
    }
}
