use crate::{
    peer::Peer,
    ports,
    rules::{self, Direction},
    selector::{self, SelectorKind},
    uid, Converted, Error, ErrorTracker, RuleError, NETWORK_POLICY_PREFIX,
};
use policy_converter_core::{
    self as model, Action, Kind, KvPair, ObjectMeta, PolicyType, ResourceKey, Rule,
};
use policy_converter_k8s_api::{
    NetworkPolicy, NetworkPolicyPeer, NetworkPolicyPort, NetworkPolicySpec,
};
use tracing::warn;

/// Every converted `NetworkPolicy` is ordered after the admin tier policies.
pub const NETWORK_POLICY_ORDER: f64 = 1000.0;

/// Converts a namespaced `NetworkPolicy`.
///
/// Rules that cannot be converted are dropped and reported in the result's errors. Since every
/// rule of a `NetworkPolicy` allows traffic, dropping a rule never allows more than intended.
pub fn convert_network_policy(np: &NetworkPolicy) -> Result<Converted, Error> {
    let name = np
        .metadata
        .name
        .as_deref()
        .ok_or(Error::MissingName("NetworkPolicy"))?;
    let namespace = np
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::MissingNamespace(name.to_string()))?;
    let policy_name = format!("{NETWORK_POLICY_PREFIX}{name}");
    let uid = uid::convert_meta_uid(&np.metadata)?;

    let default_spec = NetworkPolicySpec::default();
    let spec = np.spec.as_ref().unwrap_or(&default_spec);

    let mut errors = ErrorTracker::new(&policy_name);
    let ingress = errors.convert_rules(
        Direction::Ingress,
        spec.ingress.iter().flatten(),
        |rule| convert_rule(rule.from.as_deref(), rule.ports.as_deref(), Direction::Ingress),
        |_| None,
    );
    let egress = errors.convert_rules(
        Direction::Egress,
        spec.egress.iter().flatten(),
        |rule| convert_rule(rule.to.as_deref(), rule.ports.as_deref(), Direction::Egress),
        |_| None,
    );

    let types = policy_types(spec.policy_types.as_deref());
    if !types.contains(&PolicyType::Egress) && !egress.is_empty() {
        warn!(policy = %policy_name, "Policy types do not include egress, but the policy has egress rules");
    }

    let policy = model::NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(policy_name.clone()),
            namespace: Some(namespace.to_string()),
            creation_timestamp: np.metadata.creation_timestamp.clone(),
            uid,
            resource_version: np.metadata.resource_version.clone(),
            ..ObjectMeta::default()
        },
        spec: model::NetworkPolicySpec {
            order: Some(NETWORK_POLICY_ORDER),
            selector: selector::compile(Some(&spec.pod_selector), SelectorKind::Pod),
            ingress,
            egress,
            types,
        },
    };

    Ok(Converted {
        kvp: KvPair {
            key: ResourceKey::namespaced(Kind::NetworkPolicy, namespace, policy_name),
            value: policy.into(),
            revision: np.metadata.resource_version.clone().unwrap_or_default(),
        },
        errors: errors.into_error(),
    })
}

fn convert_rule(
    peers: Option<&[NetworkPolicyPeer]>,
    port_specs: Option<&[NetworkPolicyPort]>,
    direction: Direction,
) -> Result<Vec<Rule>, RuleError> {
    let ports = port_specs
        .unwrap_or_default()
        .iter()
        .map(ports::network_policy_port)
        .collect::<Result<Vec<_>, _>>()?;
    let peers = peers
        .unwrap_or_default()
        .iter()
        .map(|peer| Peer::from(peer).resolve())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rules::build(
        ports::unpack(ports),
        peers,
        direction,
        Action::Allow,
        "",
    ))
}

/// Policies that don't list their types only apply to ingress traffic.
fn policy_types(types: Option<&[String]>) -> Vec<PolicyType> {
    let types = types.unwrap_or_default();
    let mut policy_types = Vec::with_capacity(2);
    if types.iter().any(|t| t == "Ingress") {
        policy_types.push(PolicyType::Ingress);
    }
    if types.iter().any(|t| t == "Egress") {
        policy_types.push(PolicyType::Egress);
    }
    if policy_types.is_empty() {
        policy_types.push(PolicyType::Ingress);
    }
    policy_types
}
