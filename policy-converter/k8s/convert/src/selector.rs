use policy_converter_k8s_api::LabelSelector;
use tracing::{debug, warn};

/// The label identifying the orchestrator that owns a workload.
pub const ORCHESTRATOR_LABEL: &str = "projectcalico.org/orchestrator";

/// Selects every namespace. Distinct from the empty selector, which does not constrain a match
/// at all.
pub const ALL: &str = "all()";

/// Indicates what a label selector selects over.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    Namespace,
    Pod,
}

/// Compiles a Kubernetes label selector into a selector expression.
///
/// Pod selectors are always scoped to Kubernetes workloads, so a missing pod selector compiles to
/// just that constraint. A missing namespace selector compiles to the empty string, while a
/// namespace selector without any terms selects all namespaces.
///
/// Terms are emitted in a fixed order (orchestrator, then `matchLabels` sorted by key, then
/// `matchExpressions` in their given order) and joined with `&&`.
pub fn compile(selector: Option<&LabelSelector>, kind: SelectorKind) -> String {
    let mut terms = Vec::new();
    if kind == SelectorKind::Pod {
        terms.push(format!("{ORCHESTRATOR_LABEL} == 'k8s'"));
    }

    let selector = match selector {
        Some(selector) => selector,
        None => return terms.join(" && "),
    };

    let labels = selector.match_labels.as_ref().filter(|l| !l.is_empty());
    let exprs = selector.match_expressions.as_ref().filter(|e| !e.is_empty());
    if kind == SelectorKind::Namespace && labels.is_none() && exprs.is_none() {
        debug!("Empty namespace selector selects all namespaces");
        return ALL.to_string();
    }

    // `matchLabels` is a BTreeMap, so keys are visited in sorted order.
    for (key, value) in labels.into_iter().flatten() {
        terms.push(format!("{key} == '{value}'"));
    }

    for expr in exprs.into_iter().flatten() {
        let values = expr.values.as_deref().unwrap_or_default().join("', '");
        match expr.operator.as_str() {
            "In" => terms.push(format!("{} in {{ '{}' }}", expr.key, values)),
            "NotIn" => terms.push(format!("{} not in {{ '{}' }}", expr.key, values)),
            "Exists" => terms.push(format!("has({})", expr.key)),
            "DoesNotExist" => terms.push(format!("! has({})", expr.key)),
            operator => {
                warn!(key = %expr.key, %operator, "Ignoring label selector expression with unsupported operator");
            }
        }
    }

    terms.join(" && ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use policy_converter_k8s_api::LabelSelectorRequirement;

    const ORIGIN: &str = "projectcalico.org/orchestrator == 'k8s'";

    fn expr(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: Some(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    #[test]
    fn missing_selectors() {
        assert_eq!(compile(None, SelectorKind::Pod), ORIGIN);
        assert_eq!(compile(None, SelectorKind::Namespace), "");
    }

    #[test]
    fn empty_selectors() {
        let empty = LabelSelector::default();
        assert_eq!(compile(Some(&empty), SelectorKind::Namespace), ALL);
        assert_eq!(compile(Some(&empty), SelectorKind::Pod), ORIGIN);

        let empty_collections = LabelSelector {
            match_labels: Some(Default::default()),
            match_expressions: Some(vec![]),
        };
        assert_eq!(
            compile(Some(&empty_collections), SelectorKind::Namespace),
            ALL
        );
    }

    #[test]
    fn match_labels_sorted() {
        let selector = LabelSelector {
            match_labels: Some(btreemap! {
                "b".to_string() => "2".to_string(),
                "a".to_string() => "1".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(
            compile(Some(&selector), SelectorKind::Pod),
            format!("{ORIGIN} && a == '1' && b == '2'")
        );
        assert_eq!(
            compile(Some(&selector), SelectorKind::Namespace),
            "a == '1' && b == '2'"
        );
    }

    #[test]
    fn match_expressions() {
        for (expr, expected) in [
            (
                expr("app", "In", &["web", "api"]),
                "app in { 'web', 'api' }",
            ),
            (
                expr("tier", "NotIn", &["db"]),
                "tier not in { 'db' }",
            ),
            (expr("team", "Exists", &[]), "has(team)"),
            (expr("legacy", "DoesNotExist", &[]), "! has(legacy)"),
        ] {
            let selector = LabelSelector {
                match_expressions: Some(vec![expr]),
                ..Default::default()
            };
            assert_eq!(compile(Some(&selector), SelectorKind::Namespace), expected);
        }
    }

    #[test]
    fn terms_in_fixed_order() {
        let selector = LabelSelector {
            match_labels: Some(btreemap! { "env".to_string() => "prod".to_string() }),
            match_expressions: Some(vec![
                expr("z", "Exists", &[]),
                expr("a", "In", &["x"]),
            ]),
        };
        assert_eq!(
            compile(Some(&selector), SelectorKind::Pod),
            format!("{ORIGIN} && env == 'prod' && has(z) && a in {{ 'x' }}")
        );
    }

    #[test]
    fn unsupported_operator_is_skipped() {
        let selector = LabelSelector {
            match_expressions: Some(vec![
                expr("a", "Gt", &["1"]),
                expr("b", "Exists", &[]),
            ]),
            ..Default::default()
        };
        assert_eq!(compile(Some(&selector), SelectorKind::Namespace), "has(b)");

        // An expression list made only of unsupported operators still isn't empty, so it does
        // not select all namespaces.
        let selector = LabelSelector {
            match_expressions: Some(vec![expr("a", "Gt", &["1"])]),
            ..Default::default()
        };
        assert_eq!(compile(Some(&selector), SelectorKind::Namespace), "");
    }
}
