//! Converts the cluster-scoped admin tier policies.
//!
//! Both kinds share one pipeline, parameterized by a [`Tier`]. Unlike `NetworkPolicy`, admin
//! policies may deny traffic, so a rule that fails to convert is replaced by a deny-all rule when
//! dropping it would allow traffic the policy meant to block.

use crate::{
    peer::Peer,
    ports,
    rules::{self, Direction},
    selector::{self, SelectorKind},
    uid, Converted, Error, ErrorTracker, RuleError, ADMIN_NETWORK_POLICY_PREFIX,
    BASELINE_ADMIN_NETWORK_POLICY_PREFIX,
};
use policy_converter_core::{
    Action, GlobalNetworkPolicy, GlobalNetworkPolicySpec, Kind, KvPair, ObjectMeta, PolicyType,
    ResourceKey, Rule,
};
use policy_converter_k8s_api::policy::{
    AdminNetworkPolicy, AdminNetworkPolicyAction, BaselineAdminNetworkPolicy,
    BaselineAdminNetworkPolicyAction, EgressRule, IngressRule, RulePort, Subject,
};
use serde::Serialize;
use std::fmt;

pub const ADMIN_NETWORK_POLICY_TIER: &str = "adminnetworkpolicy";
pub const BASELINE_ADMIN_NETWORK_POLICY_TIER: &str = "baselineadminnetworkpolicy";

/// Baseline policies are ordered after every admin policy priority.
pub const BASELINE_ADMIN_NETWORK_POLICY_ORDER: f64 = 1000.0;

/// Describes how the policies of one tier are converted.
#[derive(Debug)]
pub struct Tier<A: 'static> {
    pub kind: &'static str,
    pub tier: &'static str,
    pub policy_prefix: &'static str,
    /// Actions whose failed rules are replaced with a deny-all rule.
    pub fail_closed: &'static [A],
    pub action: fn(A) -> Result<Action, RuleError>,
}

pub static ADMIN: Tier<AdminNetworkPolicyAction> = Tier {
    kind: "AdminNetworkPolicy",
    tier: ADMIN_NETWORK_POLICY_TIER,
    policy_prefix: ADMIN_NETWORK_POLICY_PREFIX,
    fail_closed: &[AdminNetworkPolicyAction::Deny, AdminNetworkPolicyAction::Pass],
    action: admin_action,
};

pub static BASELINE: Tier<BaselineAdminNetworkPolicyAction> = Tier {
    kind: "BaselineAdminNetworkPolicy",
    tier: BASELINE_ADMIN_NETWORK_POLICY_TIER,
    policy_prefix: BASELINE_ADMIN_NETWORK_POLICY_PREFIX,
    fail_closed: &[BaselineAdminNetworkPolicyAction::Deny],
    action: baseline_action,
};

/// Converts an `AdminNetworkPolicy`, ordered by its priority.
pub fn convert_admin_network_policy(anp: &AdminNetworkPolicy) -> Result<Converted, Error> {
    ADMIN.convert(
        &anp.metadata,
        f64::from(anp.spec.priority),
        &anp.spec.subject,
        &anp.spec.ingress,
        &anp.spec.egress,
    )
}

/// Converts a `BaselineAdminNetworkPolicy`.
pub fn convert_baseline_admin_network_policy(
    banp: &BaselineAdminNetworkPolicy,
) -> Result<Converted, Error> {
    BASELINE.convert(
        &banp.metadata,
        BASELINE_ADMIN_NETWORK_POLICY_ORDER,
        &banp.spec.subject,
        &banp.spec.ingress,
        &banp.spec.egress,
    )
}

fn admin_action(action: AdminNetworkPolicyAction) -> Result<Action, RuleError> {
    match action {
        AdminNetworkPolicyAction::Allow => Ok(Action::Allow),
        AdminNetworkPolicyAction::Deny => Ok(Action::Deny),
        AdminNetworkPolicyAction::Pass => Ok(Action::Pass),
        AdminNetworkPolicyAction::Unknown => Err(RuleError::UnsupportedAction(action.to_string())),
    }
}

fn baseline_action(action: BaselineAdminNetworkPolicyAction) -> Result<Action, RuleError> {
    match action {
        BaselineAdminNetworkPolicyAction::Allow => Ok(Action::Allow),
        BaselineAdminNetworkPolicyAction::Deny => Ok(Action::Deny),
        BaselineAdminNetworkPolicyAction::Unknown => {
            Err(RuleError::UnsupportedAction(action.to_string()))
        }
    }
}

// === impl Tier ===

impl<A> Tier<A>
where
    A: Copy + PartialEq + fmt::Debug + Serialize + 'static,
{
    fn convert(
        &self,
        metadata: &ObjectMeta,
        order: f64,
        subject: &Subject,
        ingress: &[IngressRule<A>],
        egress: &[EgressRule<A>],
    ) -> Result<Converted, Error> {
        let name = metadata
            .name
            .as_deref()
            .ok_or(Error::MissingName(self.kind))?;
        let policy_name = format!("{}{}", self.policy_prefix, name);
        let (namespace_selector, selector) = subject_selectors(subject)?;
        let uid = uid::convert_meta_uid(metadata)?;

        let mut errors = ErrorTracker::new(&policy_name);
        let ingress = errors.convert_rules(
            Direction::Ingress,
            ingress,
            |rule| self.convert_ingress_rule(rule),
            |rule| self.fail_closed_rule(rule.action),
        );
        let egress = errors.convert_rules(
            Direction::Egress,
            egress,
            |rule| self.convert_egress_rule(rule),
            |rule| self.fail_closed_rule(rule.action),
        );

        let types = PolicyType::from_rules(&ingress, &egress);
        let policy = GlobalNetworkPolicy {
            metadata: ObjectMeta {
                name: Some(policy_name.clone()),
                creation_timestamp: metadata.creation_timestamp.clone(),
                uid,
                resource_version: metadata.resource_version.clone(),
                ..ObjectMeta::default()
            },
            spec: GlobalNetworkPolicySpec {
                tier: self.tier.to_string(),
                order: Some(order),
                namespace_selector,
                selector,
                ingress,
                egress,
                types,
            },
        };

        Ok(Converted {
            kvp: KvPair {
                key: ResourceKey::cluster(Kind::GlobalNetworkPolicy, policy_name),
                value: policy.into(),
                revision: metadata.resource_version.clone().unwrap_or_default(),
            },
            errors: errors.into_error(),
        })
    }

    fn convert_ingress_rule(&self, rule: &IngressRule<A>) -> Result<Vec<Rule>, RuleError> {
        let action = (self.action)(rule.action)?;
        let ports = admin_ports(rule.ports.as_deref())?;
        let peers = rule
            .from
            .iter()
            .map(|peer| Peer::ingress(peer)?.resolve())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules::build(
            ports,
            peers,
            Direction::Ingress,
            action,
            &rule.name,
        ))
    }

    fn convert_egress_rule(&self, rule: &EgressRule<A>) -> Result<Vec<Rule>, RuleError> {
        let action = (self.action)(rule.action)?;
        let ports = admin_ports(rule.ports.as_deref())?;
        let peers = rule
            .to
            .iter()
            .map(|peer| Peer::egress(peer)?.resolve())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules::build(
            ports,
            peers,
            Direction::Egress,
            action,
            &rule.name,
        ))
    }

    fn fail_closed_rule(&self, action: A) -> Option<Rule> {
        self.fail_closed
            .contains(&action)
            .then(|| Rule::all(Action::Deny))
    }
}

fn admin_ports(port_specs: Option<&[RulePort]>) -> Result<ports::ProtocolPorts, RuleError> {
    let ports = port_specs
        .unwrap_or_default()
        .iter()
        .map(ports::admin_policy_port)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ports::unpack(ports))
}

/// Returns the namespace and pod selectors for a policy subject.
fn subject_selectors(subject: &Subject) -> Result<(String, String), Error> {
    if let Some(namespaces) = subject.namespaces.as_ref() {
        // Still restrict the policy to Kubernetes workloads.
        return Ok((
            selector::compile(Some(namespaces), SelectorKind::Namespace),
            selector::compile(None, SelectorKind::Pod),
        ));
    }
    if let Some(pods) = subject.pods.as_ref() {
        return Ok((
            selector::compile(Some(&pods.namespace_selector), SelectorKind::Namespace),
            selector::compile(Some(&pods.pod_selector), SelectorKind::Pod),
        ));
    }
    Err(Error::MissingSubject)
}
