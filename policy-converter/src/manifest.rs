use anyhow::{anyhow, Context, Result};
use policy_converter_core::KvPair;
use policy_converter_k8s_api::{
    self as k8s,
    policy::{AdminNetworkPolicy, BaselineAdminNetworkPolicy},
    ResourceExt,
};
use policy_converter_k8s_convert::{self as conversion, Converted, RuleConversionErrors};
use serde::{de::DeserializeOwned, Deserialize};
use serde_yaml::Value;
use tracing::{debug, error, warn};

/// A Kubernetes object that can be converted.
#[derive(Clone, Debug)]
pub enum Object {
    NetworkPolicy(k8s::NetworkPolicy),
    AdminNetworkPolicy(AdminNetworkPolicy),
    BaselineAdminNetworkPolicy(BaselineAdminNetworkPolicy),
    Namespace(k8s::Namespace),
    ServiceAccount(k8s::ServiceAccount),
}

/// The outcome of converting a set of objects.
#[derive(Debug, Default)]
pub struct Report {
    /// Converted objects, in input order.
    pub converted: Vec<KvPair>,
    /// Rules that were omitted from (or replaced in) converted policies.
    pub rule_errors: Vec<RuleConversionErrors>,
    /// Objects that could not be decoded or converted at all.
    pub failures: Vec<anyhow::Error>,
}

/// Decodes every object in a (possibly multi-document) YAML or JSON manifest.
///
/// `List`s are flattened and empty documents skipped. Objects of unsupported kinds are skipped
/// with a warning, while a supported object that fails to decode is returned as an error so
/// that the remaining objects may still be converted. Only malformed YAML fails the whole
/// manifest.
pub fn decode(manifest: &str) -> Result<Vec<Result<Object>>> {
    let mut objects = Vec::new();
    for (i, document) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let value = Value::deserialize(document).with_context(|| format!("invalid document {i}"))?;
        decode_value(value, &mut objects);
    }
    Ok(objects)
}

/// Converts each object independently.
///
/// Namespaced objects without a namespace are placed in `default_namespace`.
pub fn convert(objects: Vec<Result<Object>>, default_namespace: &str) -> Report {
    let mut report = Report::default();
    for object in objects {
        let converted = object.and_then(|mut object| {
            object.set_default_namespace(default_namespace);
            object.convert()
        });
        match converted {
            Ok((kvp, rule_errors)) => {
                debug!(key = %kvp.key, kind = %kvp.value.kind(), "Converted");
                if let Some(errors) = rule_errors {
                    warn!(key = %kvp.key, "{errors}");
                    report.rule_errors.push(errors);
                }
                report.converted.push(kvp);
            }
            Err(failure) => {
                let failure_chain = format!("{failure:#}");
                error!(error = %failure_chain, "Skipping object");
                report.failures.push(failure);
            }
        }
    }
    report
}

fn decode_value(value: Value, objects: &mut Vec<Result<Object>>) {
    if value.is_null() {
        debug!("Skipping empty document");
        return;
    }

    let kind = match value.get("kind").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None => {
            objects.push(Err(anyhow!("object has no kind")));
            return;
        }
    };

    let object = match kind.as_str() {
        "List" => {
            let items = value.get("items").and_then(Value::as_sequence);
            for item in items.into_iter().flatten() {
                decode_value(item.clone(), objects);
            }
            return;
        }
        "NetworkPolicy" => from_value(&kind, value).map(Object::NetworkPolicy),
        "AdminNetworkPolicy" => from_value(&kind, value).map(Object::AdminNetworkPolicy),
        "BaselineAdminNetworkPolicy" => {
            from_value(&kind, value).map(Object::BaselineAdminNetworkPolicy)
        }
        "Namespace" => from_value(&kind, value).map(Object::Namespace),
        "ServiceAccount" => from_value(&kind, value).map(Object::ServiceAccount),
        _ => {
            warn!(%kind, "Skipping unsupported object");
            return;
        }
    };
    objects.push(object);
}

fn from_value<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_yaml::from_value(value).with_context(|| format!("invalid {kind}"))
}

// === impl Object ===

impl Object {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkPolicy(_) => "NetworkPolicy",
            Self::AdminNetworkPolicy(_) => "AdminNetworkPolicy",
            Self::BaselineAdminNetworkPolicy(_) => "BaselineAdminNetworkPolicy",
            Self::Namespace(_) => "Namespace",
            Self::ServiceAccount(_) => "ServiceAccount",
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::NetworkPolicy(np) => np.name_any(),
            Self::AdminNetworkPolicy(anp) => anp.name_any(),
            Self::BaselineAdminNetworkPolicy(banp) => banp.name_any(),
            Self::Namespace(ns) => ns.name_any(),
            Self::ServiceAccount(sa) => sa.name_any(),
        }
    }

    fn set_default_namespace(&mut self, namespace: &str) {
        let meta = match self {
            Self::NetworkPolicy(np) => &mut np.metadata,
            Self::ServiceAccount(sa) => &mut sa.metadata,
            _ => return,
        };
        if meta.namespace.as_deref().unwrap_or_default().is_empty() {
            meta.namespace = Some(namespace.to_string());
        }
    }

    fn convert(&self) -> Result<(KvPair, Option<RuleConversionErrors>)> {
        let converted = match self {
            Self::NetworkPolicy(np) => {
                conversion::convert_network_policy(np).map(Converted::into_parts)
            }
            Self::AdminNetworkPolicy(anp) => {
                conversion::convert_admin_network_policy(anp).map(Converted::into_parts)
            }
            Self::BaselineAdminNetworkPolicy(banp) => {
                conversion::convert_baseline_admin_network_policy(banp).map(Converted::into_parts)
            }
            Self::Namespace(ns) => conversion::namespace_to_profile(ns).map(|kvp| (kvp, None)),
            Self::ServiceAccount(sa) => {
                conversion::service_account_to_profile(sa).map(|kvp| (kvp, None))
            }
        };
        converted.with_context(|| format!("failed to convert {} {}", self.kind(), self.name()))
    }
}
