use crate::ports::{self, ProtocolPorts};
use policy_converter_core::{Action, EntityRule, Protocol, Rule, RuleMetadata};
use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Ingress,
    Egress,
}

// === impl Direction ===

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => "ingress".fmt(f),
            Self::Egress => "egress".fmt(f),
        }
    }
}

/// Builds one rule for each combination of protocol group and peer.
///
/// Rules are ordered by protocol, then by peer. Peers are the remote end of the connection: the
/// source of ingress rules and the destination of egress rules. Ports always constrain the
/// destination. A rule without peers matches any remote end.
pub fn build(
    ports: ProtocolPorts,
    peers: Vec<EntityRule>,
    direction: Direction,
    action: Action,
    name: &str,
) -> Vec<Rule> {
    let peers = if peers.is_empty() {
        vec![EntityRule::default()]
    } else {
        peers
    };

    let metadata = RuleMetadata::for_rule_name(name);
    let mut rules = Vec::with_capacity(ports.len() * peers.len());
    for (protocol, protocol_ports) in ports {
        let protocol = (!protocol.is_empty()).then(|| Protocol::from(protocol.as_str()));
        let protocol_ports = protocol_ports.map(ports::simplify).unwrap_or_default();

        for peer in &peers {
            let (source, destination) = match direction {
                Direction::Ingress => (
                    peer.clone(),
                    EntityRule {
                        ports: protocol_ports.clone(),
                        ..EntityRule::default()
                    },
                ),
                Direction::Egress => (
                    EntityRule::default(),
                    EntityRule {
                        ports: protocol_ports.clone(),
                        ..peer.clone()
                    },
                ),
            };
            rules.push(Rule {
                metadata: metadata.clone(),
                action,
                protocol: protocol.clone(),
                source,
                destination,
            });
        }
    }
    rules
}
