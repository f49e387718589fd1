use crate::{uid, Error, NAMESPACE_PROFILE_PREFIX, SERVICE_ACCOUNT_PROFILE_PREFIX};
use policy_converter_core::{
    Action, Kind, KvPair, ObjectMeta, Profile, ProfileSpec, ResourceKey, Rule,
};
use policy_converter_k8s_api::{Namespace, ServiceAccount};
use std::collections::BTreeMap;

/// Prefixes the labels a namespace profile applies to its workloads.
pub const NAMESPACE_LABEL_PREFIX: &str = "pcns.";

/// Prefixes the labels a service account profile applies to its workloads.
pub const SERVICE_ACCOUNT_LABEL_PREFIX: &str = "pcsa.";

/// Records the name of the source object among the applied labels.
pub const NAME_LABEL: &str = "projectcalico.org/name";

/// Service accounts without a namespace belong to this one.
const DEFAULT_NAMESPACE: &str = "default";

/// Converts a namespace into a profile applying the namespace's labels to its workloads.
///
/// Namespaces allow all traffic by default.
pub fn namespace_to_profile(ns: &Namespace) -> Result<KvPair, Error> {
    let name = ns
        .metadata
        .name
        .as_deref()
        .ok_or(Error::MissingName("Namespace"))?;
    let profile_name = format!("{NAMESPACE_PROFILE_PREFIX}{name}");

    let profile = Profile {
        metadata: profile_meta(&profile_name, &ns.metadata)?,
        spec: ProfileSpec {
            ingress: vec![Rule::all(Action::Allow)],
            egress: vec![Rule::all(Action::Allow)],
            labels_to_apply: prefixed_labels(
                NAMESPACE_LABEL_PREFIX,
                ns.metadata.labels.as_ref(),
                name,
            ),
        },
    };

    let revision = join_profile_revisions(
        ns.metadata.resource_version.as_deref().unwrap_or_default(),
        "",
    );
    Ok(KvPair {
        key: ResourceKey::cluster(Kind::Profile, profile_name),
        value: profile.into(),
        revision,
    })
}

/// Converts a service account into a profile applying the account's labels to its workloads.
pub fn service_account_to_profile(sa: &ServiceAccount) -> Result<KvPair, Error> {
    let name = sa
        .metadata
        .name
        .as_deref()
        .ok_or(Error::MissingName("ServiceAccount"))?;
    let profile_name =
        service_account_profile_name(sa.metadata.namespace.as_deref().unwrap_or_default(), name);

    let profile = Profile {
        metadata: profile_meta(&profile_name, &sa.metadata)?,
        spec: ProfileSpec {
            labels_to_apply: prefixed_labels(
                SERVICE_ACCOUNT_LABEL_PREFIX,
                sa.metadata.labels.as_ref(),
                name,
            ),
            ..ProfileSpec::default()
        },
    };

    let revision = join_profile_revisions(
        "",
        sa.metadata.resource_version.as_deref().unwrap_or_default(),
    );
    Ok(KvPair {
        key: ResourceKey::cluster(Kind::Profile, profile_name),
        value: profile.into(),
        revision,
    })
}

/// Names the profile of a service account. Service accounts in the unnamed namespace are
/// placed in the default namespace.
pub fn service_account_profile_name(namespace: &str, name: &str) -> String {
    let namespace = if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    };
    format!("{SERVICE_ACCOUNT_PROFILE_PREFIX}{namespace}.{name}")
}

/// Returns the name of the namespace backing a profile.
pub fn profile_name_to_namespace(profile_name: &str) -> Result<&str, Error> {
    profile_name
        .strip_prefix(NAMESPACE_PROFILE_PREFIX)
        .ok_or_else(|| Error::NotNamespaceProfile(profile_name.to_string()))
}

/// Returns the namespace and name of the service account backing a profile.
///
/// Service account names may contain dots, so everything after the namespace is the name.
pub fn profile_name_to_service_account(profile_name: &str) -> Result<(&str, &str), Error> {
    if !profile_name.starts_with(SERVICE_ACCOUNT_PROFILE_PREFIX) {
        return Err(Error::NotServiceAccountProfile(profile_name.to_string()));
    }

    let mut parts = profile_name.splitn(3, '.').skip(1);
    match (parts.next(), parts.next()) {
        (Some(ns), Some(sa)) => Ok((ns, sa)),
        _ => Err(Error::MalformedProfileName(profile_name.to_string())),
    }
}

/// Combines the revisions of the namespace and service account backing a profile.
pub fn join_profile_revisions(ns_revision: &str, sa_revision: &str) -> String {
    format!("{ns_revision}/{sa_revision}")
}

/// Splits a profile revision into its namespace and service account revisions.
///
/// The empty and zero revisions denote a profile that hasn't been observed yet.
pub fn split_profile_revision(revision: &str) -> Result<(&str, &str), Error> {
    if revision.is_empty() || revision == "0" {
        return Ok(("", ""));
    }

    let mut parts = revision.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ns), Some(sa), None) => Ok((ns, sa)),
        _ => Err(Error::InvalidRevision(revision.to_string())),
    }
}

fn profile_meta(name: &str, source: &ObjectMeta) -> Result<ObjectMeta, Error> {
    Ok(ObjectMeta {
        name: Some(name.to_string()),
        creation_timestamp: source.creation_timestamp.clone(),
        uid: uid::convert_meta_uid(source)?,
        ..ObjectMeta::default()
    })
}

fn prefixed_labels(
    prefix: &str,
    labels: Option<&BTreeMap<String, String>>,
    name: &str,
) -> BTreeMap<String, String> {
    labels
        .into_iter()
        .flatten()
        .map(|(k, v)| (format!("{prefix}{k}"), v.clone()))
        .chain(Some((format!("{prefix}{NAME_LABEL}"), name.to_string())))
        .collect()
}
