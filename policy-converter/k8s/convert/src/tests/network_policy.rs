use super::*;
use crate::{convert_network_policy, Direction, Error};
use policy_converter_core::{
    Action, EntityRule, Kind, PolicyType, Port, Protocol, ResourceKey, Rule,
};
use policy_converter_k8s_api::{NetworkPolicy, NetworkPolicySpec};

fn mk_network_policy(ns: &str, name: &str, spec: NetworkPolicySpec) -> NetworkPolicy {
    NetworkPolicy {
        metadata: mk_meta(Some(ns), name),
        spec: Some(spec),
    }
}

#[test]
fn converts_network_policy() {
    let _tracing = init_tracing();
    let np: NetworkPolicy = parse_yaml(
        r#"
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: test-network-policy
  namespace: default
  uid: 30316465-6365-4463-ad63-3564622d3638
  resourceVersion: "1234"
spec:
  podSelector:
    matchLabels:
      role: db
  policyTypes:
    - Ingress
    - Egress
  ingress:
    - from:
        - podSelector:
            matchLabels:
              role: frontend
        - namespaceSelector:
            matchLabels:
              project: myproject
      ports:
        - protocol: UDP
          port: 53
        - protocol: TCP
          port: 6379
  egress:
    - to:
        - ipBlock:
            cidr: 10.0.0.0/24
            except:
              - 10.0.0.128/25
      ports:
        - port: 5978
"#,
    );

    let (kvp, errors) = convert_network_policy(&np)
        .expect("policy must convert")
        .into_parts();
    assert!(errors.is_none(), "{errors:?}");
    assert_eq!(
        kvp.key,
        ResourceKey::namespaced(
            Kind::NetworkPolicy,
            "default",
            "knp.default.test-network-policy"
        )
    );
    assert_eq!(kvp.revision, "1234");

    let policy = expect_policy(&kvp);
    assert_eq!(
        policy.metadata.name.as_deref(),
        Some("knp.default.test-network-policy")
    );
    assert_eq!(policy.metadata.namespace.as_deref(), Some("default"));
    assert_eq!(policy.metadata.uid.as_deref(), Some(CONVERTED_UID));
    assert_eq!(policy.metadata.resource_version.as_deref(), Some("1234"));
    assert_eq!(policy.spec.order, Some(1000.0));
    assert_eq!(policy.spec.selector, format!("{ORIGIN} && role == 'db'"));
    assert_eq!(
        policy.spec.types,
        vec![PolicyType::Ingress, PolicyType::Egress]
    );

    let frontend = EntityRule {
        selector: format!("{ORIGIN} && role == 'frontend'"),
        ..Default::default()
    };
    let myproject = EntityRule {
        selector: ORIGIN.to_string(),
        namespace_selector: "project == 'myproject'".to_string(),
        ..Default::default()
    };
    let ingress = |protocol: &str, port: u16, source: &EntityRule| Rule {
        action: Action::Allow,
        protocol: Some(Protocol::from(protocol)),
        source: source.clone(),
        destination: EntityRule {
            ports: vec![Port::single(port)],
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(
        policy.spec.ingress,
        vec![
            ingress("TCP", 6379, &frontend),
            ingress("TCP", 6379, &myproject),
            ingress("UDP", 53, &frontend),
            ingress("UDP", 53, &myproject),
        ]
    );

    assert_eq!(
        policy.spec.egress,
        vec![Rule {
            action: Action::Allow,
            protocol: Some(Protocol::tcp()),
            destination: EntityRule {
                nets: vec!["10.0.0.0/24".parse().unwrap()],
                not_nets: vec!["10.0.0.128/25".parse().unwrap()],
                ports: vec![Port::single(5978)],
                ..Default::default()
            },
            ..Default::default()
        }]
    );
}

#[test]
fn unconstrained_rule_allows_all() {
    let _tracing = init_tracing();
    let np: NetworkPolicy = parse_yaml(
        r#"
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: allow-all
  namespace: ns-0
spec:
  podSelector: {}
  ingress:
    - {}
"#,
    );
    let (kvp, errors) = convert_network_policy(&np).unwrap().into_parts();
    assert!(errors.is_none());
    assert_eq!(kvp.revision, "");

    let policy = expect_policy(&kvp);
    assert_eq!(policy.metadata.uid, None);
    assert_eq!(policy.spec.selector, ORIGIN);
    assert_eq!(policy.spec.ingress, vec![Rule::all(Action::Allow)]);
    assert!(policy.spec.egress.is_empty());
    assert_eq!(policy.spec.types, vec![PolicyType::Ingress]);
}

#[test]
fn policy_types_default_to_ingress() {
    let _tracing = init_tracing();
    for (types, expected) in [
        (None, vec![PolicyType::Ingress]),
        (Some(vec![]), vec![PolicyType::Ingress]),
        (Some(vec!["Egress"]), vec![PolicyType::Egress]),
        (
            Some(vec!["Egress", "Ingress"]),
            vec![PolicyType::Ingress, PolicyType::Egress],
        ),
    ] {
        let np = mk_network_policy(
            "ns-0",
            "np-0",
            NetworkPolicySpec {
                policy_types: types
                    .clone()
                    .map(|ts| ts.into_iter().map(String::from).collect()),
                egress: Some(vec![Default::default()]),
                ..Default::default()
            },
        );
        let (kvp, _) = convert_network_policy(&np).unwrap().into_parts();
        let policy = expect_policy(&kvp);
        assert_eq!(policy.spec.types, expected, "{types:?}");
        assert_eq!(
            policy.spec.egress,
            vec![Rule::all(Action::Allow)],
            "egress rules are kept regardless of policy types"
        );
    }
}

#[test]
fn failed_rules_are_dropped() {
    let _tracing = init_tracing();
    let np: NetworkPolicy = parse_yaml(
        r#"
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: bad-ports
  namespace: ns-0
spec:
  podSelector:
    matchLabels:
      app: web
  ingress:
    - ports:
        - port: 8080
          endPort: 80
    - from:
        - ipBlock:
            cidr: not-a-cidr
      ports:
        - port: http
"#,
    );

    let (kvp, errors) = convert_network_policy(&np).unwrap().into_parts();
    let policy = expect_policy(&kvp);
    assert_eq!(
        policy.spec.ingress,
        vec![Rule {
            action: Action::Allow,
            protocol: Some(Protocol::tcp()),
            destination: EntityRule {
                ports: vec![Port::named("http")],
                ..Default::default()
            },
            ..Default::default()
        }],
        "an invalid IP block does not fail its rule"
    );

    let errors = errors.expect("the invalid port must be reported");
    assert_eq!(errors.policy, "knp.default.bad-ports");
    assert_eq!(errors.rules.len(), 1);
    assert_eq!(errors.rules[0].direction, Direction::Ingress);
    assert_eq!(errors.rules[0].rule["ports"][0]["endPort"], 80);
    assert!(
        errors.rules[0].reason.starts_with("invalid port \"8080:80\""),
        "{}",
        errors.rules[0].reason
    );
}

#[test]
fn wildcard_ports_collapse() {
    let _tracing = init_tracing();
    let with_wildcard: NetworkPolicy = parse_yaml(
        r#"
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: np-0
  namespace: ns-0
spec:
  podSelector: {}
  egress:
    - ports:
        - protocol: UDP
          port: 53
        - protocol: TCP
"#,
    );
    let (kvp, _) = convert_network_policy(&with_wildcard).unwrap().into_parts();
    let policy = expect_policy(&kvp);
    assert_eq!(
        policy.spec.egress,
        vec![
            Rule {
                protocol: Some(Protocol::tcp()),
                ..Rule::all(Action::Allow)
            },
            Rule {
                protocol: Some(Protocol::from("UDP")),
                destination: EntityRule {
                    ports: vec![Port::single(53)],
                    ..Default::default()
                },
                ..Rule::all(Action::Allow)
            },
        ]
    );
}

#[test]
fn missing_identity() {
    let _tracing = init_tracing();

    let mut np = mk_network_policy("ns-0", "np-0", Default::default());
    np.metadata.namespace = None;
    assert!(matches!(
        convert_network_policy(&np),
        Err(Error::MissingNamespace(name)) if name == "np-0"
    ));

    let mut np = mk_network_policy("ns-0", "np-0", Default::default());
    np.metadata.name = None;
    assert!(matches!(
        convert_network_policy(&np),
        Err(Error::MissingName("NetworkPolicy"))
    ));

    let mut np = mk_network_policy("ns-0", "np-0", Default::default());
    np.metadata.uid = Some("not-a-uid".to_string());
    assert!(matches!(
        convert_network_policy(&np),
        Err(Error::InvalidUid { .. })
    ));
}

#[test]
fn missing_spec() {
    let _tracing = init_tracing();
    let np = NetworkPolicy {
        metadata: mk_meta(Some("ns-0"), "np-0"),
        spec: None,
    };
    let (kvp, errors) = convert_network_policy(&np).unwrap().into_parts();
    assert!(errors.is_none());
    let policy = expect_policy(&kvp);
    assert_eq!(policy.spec.selector, ORIGIN);
    assert!(policy.spec.ingress.is_empty());
    assert_eq!(policy.spec.types, vec![PolicyType::Ingress]);
}

#[test]
fn selector_expressions() {
    let _tracing = init_tracing();
    let np = mk_network_policy(
        "ns-0",
        "np-0",
        NetworkPolicySpec {
            pod_selector: mk_labels([("b", "2"), ("a", "1")]),
            ..Default::default()
        },
    );
    let (kvp, _) = convert_network_policy(&np).unwrap().into_parts();
    assert_eq!(
        expect_policy(&kvp).spec.selector,
        format!("{ORIGIN} && a == '1' && b == '2'")
    );
}
