use crate::{Cluster, Deployment, Error, ResourceExt, Service};
use k8s_openapi::{
    api::core::v1::{ContainerPort, ServicePort},
    apimachinery::pkg::util::intstr::IntOrString,
};
use netpol_generator_core::{self as model, Exposure, L4Protocol, PortConfig, Selector};
use tracing::warn;

const KIND: &str = "Deployment";

/// Describes a Kubernetes deployment.
///
/// `services` are the services of the deployment's namespace; each port's
/// exposure is the widest exposure of any service that selects the
/// deployment's pods and targets the port.
pub fn from_k8s(
    deployment: &Deployment,
    services: &[Service],
    cluster: &Cluster,
) -> Result<model::Deployment, Error> {
    let name = deployment.name_any();
    let namespace = deployment
        .namespace()
        .ok_or_else(|| Error::MissingNamespace {
            kind: KIND,
            name: name.clone(),
        })?;

    let template = deployment.spec.as_ref().map(|spec| &spec.template);
    let pod_labels = template
        .and_then(|t| t.metadata.as_ref())
        .and_then(|m| m.labels.clone())
        .unwrap_or_default();

    let label_selector = match deployment.spec.as_ref() {
        Some(spec) => Some(
            serde_json::to_value(&spec.selector)
                .and_then(serde_json::from_value::<Selector>)
                .map_err(|source| Error::Invalid {
                    kind: KIND,
                    name: name.clone(),
                    source,
                })?,
        ),
        None => None,
    };

    let selecting = services
        .iter()
        .filter(|svc| svc.namespace().as_deref() == Some(namespace.as_str()))
        .filter(|svc| selects(svc, &pod_labels))
        .collect::<Vec<_>>();

    let ports = template
        .and_then(|t| t.spec.as_ref())
        .into_iter()
        .flat_map(|spec| spec.containers.iter())
        .flat_map(|c| c.ports.iter().flatten())
        .filter_map(|port| {
            let Ok(container_port) = u32::try_from(port.container_port) else {
                warn!(
                    deployment = %name,
                    %namespace,
                    port = port.container_port,
                    "Ignoring invalid container port"
                );
                return None;
            };
            Some(PortConfig {
                name: port.name.clone(),
                container_port,
                protocol: protocol(port.protocol.as_deref()),
                exposure: exposure(port, &selecting),
            })
        })
        .collect();

    Ok(model::Deployment {
        id: deployment
            .uid()
            .unwrap_or_else(|| format!("{namespace}/{name}")),
        name,
        namespace,
        cluster_id: cluster.id.clone(),
        cluster_name: cluster.name.clone(),
        pod_labels,
        label_selector,
        ports,
        annotations: deployment.annotations().clone(),
    })
}

fn protocol(name: Option<&str>) -> L4Protocol {
    match name {
        Some("UDP") => L4Protocol::Udp,
        Some("SCTP") => L4Protocol::Sctp,
        _ => L4Protocol::Tcp,
    }
}

/// Services without a selector manage their endpoints by hand and never
/// select pods.
fn selects(svc: &Service, labels: &model::labels::Map) -> bool {
    match svc.spec.as_ref().and_then(|s| s.selector.as_ref()) {
        Some(selector) if !selector.is_empty() => {
            Selector::from_map(selector.clone()).matches(labels)
        }
        _ => false,
    }
}

fn exposure(port: &ContainerPort, services: &[&Service]) -> Exposure {
    services
        .iter()
        .filter_map(|svc| {
            let spec = svc.spec.as_ref()?;
            let targeted = spec.ports.iter().flatten().any(|sp| targets(sp, port));
            if !targeted {
                return None;
            }
            Some(match spec.type_.as_deref() {
                Some("NodePort") => Exposure::Node,
                Some("LoadBalancer") => Exposure::External,
                _ => Exposure::Internal,
            })
        })
        .max()
        .unwrap_or_default()
}

fn targets(svc_port: &ServicePort, port: &ContainerPort) -> bool {
    if svc_port.protocol.as_deref().unwrap_or("TCP") != port.protocol.as_deref().unwrap_or("TCP") {
        return false;
    }
    match svc_port.target_port.as_ref() {
        Some(IntOrString::Int(target)) => *target == port.container_port,
        Some(IntOrString::String(target)) => port.name.as_deref() == Some(target.as_str()),
        None => svc_port.port == port.container_port,
    }
}
