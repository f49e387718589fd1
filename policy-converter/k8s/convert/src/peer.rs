use crate::{
    selector::{self, SelectorKind},
    RuleError,
};
use ipnet::IpNet;
use policy_converter_core::EntityRule;
use policy_converter_k8s_api::{
    policy::{EgressPeer, IngressPeer, NamespacedPod},
    IPBlock, LabelSelector, NetworkPolicyPeer,
};
use tracing::error;

/// One peer of a rule, borrowed from the source object.
#[derive(Copy, Clone, Debug)]
pub enum Peer<'a> {
    /// A `NetworkPolicy` peer selecting pods and/or namespaces. Either may be unset.
    Selectors {
        pods: Option<&'a LabelSelector>,
        namespaces: Option<&'a LabelSelector>,
    },

    /// A `NetworkPolicy` IP block.
    IpBlock(&'a IPBlock),

    /// All pods in the selected namespaces.
    Namespaces(&'a LabelSelector),

    /// The selected pods in the selected namespaces.
    Pods(&'a NamespacedPod),

    /// Any of the given CIDRs.
    Networks(&'a [String]),
}

#[derive(Debug, thiserror::Error)]
#[error("not a valid CIDR: {0:?}")]
pub struct CidrParseError(String);

// === impl Peer ===

impl<'a> Peer<'a> {
    /// Reads an admin policy ingress peer, which must select namespaces or pods.
    pub fn ingress(peer: &'a IngressPeer) -> Result<Self, RuleError> {
        if let Some(pods) = peer.pods.as_ref() {
            return Ok(Self::Pods(pods));
        }
        if let Some(namespaces) = peer.namespaces.as_ref() {
            return Ok(Self::Namespaces(namespaces));
        }
        Err(RuleError::MissingPeer("From"))
    }

    /// Reads an admin policy egress peer, which must select namespaces, pods or networks.
    pub fn egress(peer: &'a EgressPeer) -> Result<Self, RuleError> {
        if let Some(pods) = peer.pods.as_ref() {
            return Ok(Self::Pods(pods));
        }
        if let Some(namespaces) = peer.namespaces.as_ref() {
            return Ok(Self::Namespaces(namespaces));
        }
        match peer.networks.as_deref() {
            Some(networks) if !networks.is_empty() => Ok(Self::Networks(networks)),
            _ => Err(RuleError::MissingPeer("To")),
        }
    }

    /// Resolves the peer to the selectors and networks matching it.
    ///
    /// An IP block with an invalid CIDR is logged and resolves to an empty entity, whereas an
    /// invalid network fails the rule.
    pub fn resolve(self) -> Result<EntityRule, RuleError> {
        match self {
            Self::Selectors { pods, namespaces } => Ok(EntityRule {
                selector: selector::compile(pods, SelectorKind::Pod),
                namespace_selector: selector::compile(namespaces, SelectorKind::Namespace),
                ..EntityRule::default()
            }),

            Self::IpBlock(block) => Ok(resolve_ip_block(block).unwrap_or_else(|error| {
                error!(cidr = %block.cidr, %error, "Failed to parse IP block");
                EntityRule::default()
            })),

            Self::Namespaces(namespaces) => Ok(EntityRule {
                namespace_selector: selector::compile(Some(namespaces), SelectorKind::Namespace),
                ..EntityRule::default()
            }),

            Self::Pods(NamespacedPod {
                namespace_selector,
                pod_selector,
            }) => Ok(EntityRule {
                selector: selector::compile(Some(pod_selector), SelectorKind::Pod),
                namespace_selector: selector::compile(
                    Some(namespace_selector),
                    SelectorKind::Namespace,
                ),
                ..EntityRule::default()
            }),

            Self::Networks(networks) => Ok(EntityRule {
                nets: networks
                    .iter()
                    .map(|n| parse_cidr(n))
                    .collect::<Result<Vec<_>, _>>()?,
                ..EntityRule::default()
            }),
        }
    }
}

impl<'a> From<&'a NetworkPolicyPeer> for Peer<'a> {
    fn from(peer: &'a NetworkPolicyPeer) -> Self {
        // An IP block excludes selectors.
        if let Some(block) = peer.ip_block.as_ref() {
            return Self::IpBlock(block);
        }
        Self::Selectors {
            pods: peer.pod_selector.as_ref(),
            namespaces: peer.namespace_selector.as_ref(),
        }
    }
}

fn resolve_ip_block(block: &IPBlock) -> Result<EntityRule, CidrParseError> {
    let net = parse_cidr(&block.cidr)?;
    let not_nets = block
        .except
        .iter()
        .flatten()
        .map(|n| parse_cidr(n))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EntityRule {
        nets: vec![net],
        not_nets,
        ..EntityRule::default()
    })
}

/// Parses a CIDR, masking off any host bits (e.g. `10.0.0.7/24` is read as `10.0.0.0/24`).
/// Addresses without a prefix length are rejected.
pub fn parse_cidr(s: &str) -> Result<IpNet, CidrParseError> {
    s.parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|_| CidrParseError(s.to_string()))
}
