//! Converts Kubernetes network policies and identity objects into the policy model.
//!
//! Each object is converted independently by a pure function:
//!
//! - [`convert_network_policy`] for namespaced `NetworkPolicy`s;
//! - [`convert_admin_network_policy`] and [`convert_baseline_admin_network_policy`] for the
//!   cluster-scoped admin tiers;
//! - [`namespace_to_profile`] and [`service_account_to_profile`] for the profiles carrying
//!   namespace and service account labels.
//!
//! Policy conversion tolerates rules that cannot be converted: they are dropped (or replaced by
//! a deny-all rule, for admin tier rules that would have denied traffic) and reported alongside
//! the converted policy in [`Converted::errors`].

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod admin;
mod errors;
mod network_policy;
pub mod peer;
pub mod ports;
mod profile;
pub mod rules;
pub mod selector;
mod uid;


pub use self::{
    admin::{
        convert_admin_network_policy, convert_baseline_admin_network_policy,
        ADMIN_NETWORK_POLICY_TIER, BASELINE_ADMIN_NETWORK_POLICY_ORDER,
        BASELINE_ADMIN_NETWORK_POLICY_TIER,
    },
    errors::{BadRule, Converted, Error, ErrorTracker, RuleConversionErrors, RuleError},
    network_policy::{convert_network_policy, NETWORK_POLICY_ORDER},
    profile::{
        join_profile_revisions, namespace_to_profile, profile_name_to_namespace,
        profile_name_to_service_account, service_account_profile_name,
        service_account_to_profile, split_profile_revision, NAMESPACE_LABEL_PREFIX, NAME_LABEL,
        SERVICE_ACCOUNT_LABEL_PREFIX,
    },
    rules::Direction,
    uid::convert_uid,
};

pub const NETWORK_POLICY_PREFIX: &str = "knp.default.";
pub const ADMIN_NETWORK_POLICY_PREFIX: &str = "kanp.adminnetworkpolicy.";
pub const BASELINE_ADMIN_NETWORK_POLICY_PREFIX: &str = "kbanp.baselineadminnetworkpolicy.";
pub const NAMESPACE_PROFILE_PREFIX: &str = "kns.";
pub const SERVICE_ACCOUNT_PROFILE_PREFIX: &str = "ksa.";
