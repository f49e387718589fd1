use super::*;
use crate::{
    namespace_to_profile, profile_name_to_namespace, profile_name_to_service_account,
    service_account_to_profile, split_profile_revision, Error,
};
use maplit::btreemap;
use policy_converter_core::{Action, Kind, ResourceKey, Rule};
use policy_converter_k8s_api::{Namespace, ServiceAccount};

fn mk_namespace(name: &str, labels: BTreeMap<String, String>) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..mk_meta(None, name)
        },
        ..Default::default()
    }
}

fn mk_service_account(ns: Option<&str>, name: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            labels: Some(btreemap! { "role".to_string() => "api".to_string() }),
            ..mk_meta(ns, name)
        },
        ..Default::default()
    }
}

#[test]
fn converts_namespace() {
    let _tracing = init_tracing();
    let ns = mk_namespace(
        "ns-0",
        btreemap! {
            "team".to_string() => "a".to_string(),
            "kubernetes.io/metadata.name".to_string() => "ns-0".to_string(),
        },
    );

    let kvp = namespace_to_profile(&ns).expect("namespace must convert");
    assert_eq!(kvp.key, ResourceKey::cluster(Kind::Profile, "kns.ns-0"));
    assert_eq!(kvp.revision, "1234/");
    assert_eq!(split_profile_revision(&kvp.revision).unwrap(), ("1234", ""));
    assert_eq!(profile_name_to_namespace(&kvp.key.name).unwrap(), "ns-0");

    let profile = expect_profile(&kvp);
    assert_eq!(profile.metadata.name.as_deref(), Some("kns.ns-0"));
    assert_eq!(profile.metadata.uid.as_deref(), Some(CONVERTED_UID));
    assert_eq!(profile.metadata.resource_version, None);
    assert_eq!(profile.spec.ingress, vec![Rule::all(Action::Allow)]);
    assert_eq!(profile.spec.egress, vec![Rule::all(Action::Allow)]);
    assert_eq!(
        profile.spec.labels_to_apply,
        btreemap! {
            "pcns.kubernetes.io/metadata.name".to_string() => "ns-0".to_string(),
            "pcns.projectcalico.org/name".to_string() => "ns-0".to_string(),
            "pcns.team".to_string() => "a".to_string(),
        }
    );
}

#[test]
fn converts_service_account() {
    let _tracing = init_tracing();
    let sa = mk_service_account(Some("ns-0"), "sa.with.dots");

    let kvp = service_account_to_profile(&sa).expect("service account must convert");
    assert_eq!(
        kvp.key,
        ResourceKey::cluster(Kind::Profile, "ksa.ns-0.sa.with.dots")
    );
    assert_eq!(kvp.revision, "/1234");
    assert_eq!(split_profile_revision(&kvp.revision).unwrap(), ("", "1234"));
    assert_eq!(
        profile_name_to_service_account(&kvp.key.name).unwrap(),
        ("ns-0", "sa.with.dots")
    );

    let profile = expect_profile(&kvp);
    assert_eq!(profile.metadata.uid.as_deref(), Some(CONVERTED_UID));
    assert!(profile.spec.ingress.is_empty());
    assert!(profile.spec.egress.is_empty());
    assert_eq!(
        profile.spec.labels_to_apply,
        btreemap! {
            "pcsa.projectcalico.org/name".to_string() => "sa.with.dots".to_string(),
            "pcsa.role".to_string() => "api".to_string(),
        }
    );
}

#[test]
fn service_account_namespace_defaults() {
    let _tracing = init_tracing();
    let kvp = service_account_to_profile(&mk_service_account(None, "sa-0")).unwrap();
    assert_eq!(kvp.key.name, "ksa.default.sa-0");
}

#[test]
fn profile_hard_failures() {
    let _tracing = init_tracing();

    let mut ns = mk_namespace("ns-0", Default::default());
    ns.metadata.uid = Some("zzz".to_string());
    assert!(matches!(
        namespace_to_profile(&ns),
        Err(Error::InvalidUid { uid, .. }) if uid == "zzz"
    ));

    let mut sa = mk_service_account(Some("ns-0"), "sa-0");
    sa.metadata.name = None;
    assert!(matches!(
        service_account_to_profile(&sa),
        Err(Error::MissingName("ServiceAccount"))
    ));
}
