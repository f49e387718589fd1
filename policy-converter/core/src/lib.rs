//! The policy model consumed by the enforcement layer.
//!
//! Every external policy object is converted into one of the [`Resource`] kinds defined here,
//! keyed by a [`ResourceKey`] and carried in a [`KvPair`] along with its revision.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod port;
mod resource;
mod rule;

pub use self::{
    port::{Port, PortParseError, Protocol},
    resource::{
        GlobalNetworkPolicy, GlobalNetworkPolicySpec, Kind, KvPair, NetworkPolicy,
        NetworkPolicySpec, PolicyType, Profile, ProfileSpec, Resource, ResourceKey,
    },
    rule::{Action, EntityRule, Rule, RuleMetadata, RULE_NAME_ANNOTATION},
};
pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
