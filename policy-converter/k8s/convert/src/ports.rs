use crate::RuleError;
use policy_converter_core::{Port, Protocol};
use policy_converter_k8s_api::{policy::RulePort, IntOrString, NetworkPolicyPort};
use std::collections::{btree_map, BTreeMap};
use tracing::trace;

/// Ports grouped by protocol, ordered by protocol name.
///
/// The empty protocol name means "any protocol", and a `None` port list means "all ports" for the
/// protocol. The wildcard group, `{"": None}`, matches all traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolPorts(BTreeMap<String, Option<Vec<Port>>>);

/// A protocol and port extracted from a single port entry. Neither being set matches all traffic;
/// a protocol without a port matches all ports for that protocol.
pub type PortFields = (Option<Protocol>, Option<Port>);

// === impl ProtocolPorts ===

impl ProtocolPorts {
    /// Matches all traffic.
    pub fn any() -> Self {
        Self(Some((String::new(), None)).into_iter().collect())
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, protocol: &str) -> Option<Option<&[Port]>> {
        self.0.get(protocol).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[Port]>)> {
        self.0.iter().map(|(p, ports)| (p.as_str(), ports.as_deref()))
    }
}

impl IntoIterator for ProtocolPorts {
    type Item = (String, Option<Vec<Port>>);
    type IntoIter = btree_map::IntoIter<String, Option<Vec<Port>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Groups a rule's ports by protocol.
///
/// An empty list matches all traffic. Likewise, an entry without a protocol or port widens the
/// whole group to match all traffic, discarding all other entries. An entry with only a protocol
/// matches all ports for that protocol, absorbing any other ports listed for it.
pub fn unpack(ports: impl IntoIterator<Item = PortFields>) -> ProtocolPorts {
    let mut by_protocol = BTreeMap::<String, Option<Vec<Port>>>::new();
    let mut empty = true;

    for fields in ports {
        empty = false;
        let (protocol, port) = match fields {
            (Some(protocol), port) => (protocol, port),
            (None, Some(port)) => (Protocol::tcp(), Some(port)),
            (None, None) => {
                trace!("Unconstrained port matches all traffic");
                return ProtocolPorts::any();
            }
        };

        match (by_protocol.entry(protocol.to_string()), port) {
            (btree_map::Entry::Vacant(entry), port) => {
                entry.insert(port.map(|p| vec![p]));
            }
            (btree_map::Entry::Occupied(mut entry), None) => {
                *entry.get_mut() = None;
            }
            (btree_map::Entry::Occupied(mut entry), Some(port)) => {
                if let Some(ports) = entry.get_mut() {
                    ports.push(port);
                }
            }
        }
    }

    if empty {
        return ProtocolPorts::any();
    }
    ProtocolPorts(by_protocol)
}

/// Calculates the minimal list of port ranges covering the given ports.
///
/// Numeric ports and ranges are merged into the fewest possible ranges, in ascending order,
/// followed by named ports in their original order. For example, `[9090, 80, 81, http, 82]`
/// simplifies to `[80:82, 9090, http]`.
pub fn simplify(ports: Vec<Port>) -> Vec<Port> {
    if ports.len() <= 1 {
        return ports;
    }

    let mut ranges = Vec::with_capacity(ports.len());
    let mut named = Vec::new();
    for port in ports {
        match port {
            Port::Range { min, max } => ranges.push((min, max)),
            port @ Port::Named(_) => named.push(port),
        }
    }
    ranges.sort_unstable();

    let mut simplified = Vec::with_capacity(ranges.len() + named.len());
    let mut ranges = ranges.into_iter();
    if let Some((mut first, mut last)) = ranges.next() {
        for (min, max) in ranges {
            // Widen to avoid overflowing at the top of the port space.
            if u32::from(min) <= u32::from(last) + 1 {
                last = last.max(max);
                continue;
            }
            simplified.push(Port::Range { min: first, max: last });
            (first, last) = (min, max);
        }
        simplified.push(Port::Range { min: first, max: last });
    }

    simplified.extend(named);
    simplified
}

/// Reads a `NetworkPolicy` port.
///
/// An unset or empty protocol defaults to TCP, so an entry without a port matches all TCP
/// ports. `endPort` extends a numeric port into a range.
pub fn network_policy_port(port: &NetworkPolicyPort) -> Result<PortFields, RuleError> {
    let protocol = port
        .protocol
        .as_deref()
        .filter(|p| !p.is_empty())
        .map_or_else(Protocol::tcp, Protocol::from);

    let spec = match port.port.as_ref() {
        None => return Ok((Some(protocol), None)),
        Some(IntOrString::Int(n)) => n.to_string(),
        Some(IntOrString::String(s)) => s.clone(),
    };
    let spec = match port.end_port {
        Some(end) => format!("{spec}:{end}"),
        None => spec,
    };

    match spec.parse::<Port>() {
        Ok(port) => Ok((Some(protocol), Some(port))),
        Err(source) => Err(RuleError::InvalidPort { port: spec, source }),
    }
}

/// Reads an admin policy port.
///
/// An empty entry matches all traffic. Named ports, and ports with an unset or empty protocol,
/// are matched over TCP.
pub fn admin_policy_port(port: &RulePort) -> Result<PortFields, RuleError> {
    fn protocol(p: Option<&str>) -> Protocol {
        p.filter(|p| !p.is_empty())
            .map_or_else(Protocol::tcp, Protocol::from)
    }

    fn number(port: i32) -> Result<u16, RuleError> {
        Port::number(port).map_err(|source| RuleError::InvalidPort {
            port: port.to_string(),
            source,
        })
    }

    if let Some(pn) = port.port_number.as_ref() {
        let p = Port::single(number(pn.port)?);
        return Ok((Some(protocol(pn.protocol.as_deref())), Some(p)));
    }

    if let Some(range) = port.port_range.as_ref() {
        let p = Port::range(number(range.start)?, number(range.end)?).map_err(|source| {
            RuleError::InvalidPort {
                port: format!("{}:{}", range.start, range.end),
                source,
            }
        })?;
        return Ok((Some(protocol(range.protocol.as_deref())), Some(p)));
    }

    if let Some(name) = port.named_port.as_deref() {
        let p = name.parse::<Port>().map_err(|source| RuleError::InvalidPort {
            port: name.to_string(),
            source,
        })?;
        return Ok((Some(Protocol::tcp()), Some(p)));
    }

    Ok((None, None))
}
