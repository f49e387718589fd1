//! Cluster-scoped admin-tier policy resources (`policy.networking.k8s.io/v1alpha1`).

pub mod admin_network_policy;
pub mod baseline_admin_network_policy;
pub mod rule;

pub use self::{
    admin_network_policy::{AdminNetworkPolicy, AdminNetworkPolicyAction, AdminNetworkPolicySpec},
    baseline_admin_network_policy::{
        BaselineAdminNetworkPolicy, BaselineAdminNetworkPolicyAction,
        BaselineAdminNetworkPolicySpec,
    },
    rule::{
        EgressPeer, EgressRule, IngressPeer, IngressRule, NamespacedPod, PortNumber, PortRange,
        RulePort, Subject,
    },
};
