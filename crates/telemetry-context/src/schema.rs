//! Typed deployment context
//!
//! The merged tree is parsed into [`AppContext`] once at startup so that
//! missing or malformed settings fail immediately, with the offending path,
//! instead of surfacing later at the point of use.
//!
//! Each section is parsed on its own so errors carry the path of the section
//! (and, for services, the service) that failed.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::{DESIRED_COUNT_KEY, STAGE_KEY};
use crate::tree::{ConfigTree, scalar_to_string};
use crate::view::ContextView;
use crate::{Error, Result};

/// Name of the outbound service that drains the queue
pub const PROCESSOR_SERVICE: &str = "processor";

/// Fully typed deployment context for one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppContext {
    pub stage: String,
    pub default_desired_count: u32,
    pub account_id: String,
    pub aws_region: String,
    /// Passed through to containers as `DEBUG_OUTPUT`
    pub debug_output: String,
    /// Source range allowed to reach listening services
    pub ingress_cidr: Option<String>,
    /// KMS key protecting the Secrets Manager secrets
    pub secrets_key_arn: Option<String>,
    pub vpc_props: VpcProps,
    pub queue: QueueConfig,
    pub inbound: InboundConfig,
    pub outbound: OutboundConfig,
}

/// Attributes of an existing VPC the clusters are placed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcProps {
    pub vpc_id: String,
    pub availability_zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_subnet_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_subnet_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolated_subnet_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_cidr_block: Option<String>,
    /// Any further attributes, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Buffer queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub kinesis_shard_count: u32,
    pub kinesis_endpoint: String,
}

/// Existing Cloud Map namespace used by `cloudmap` services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceProps {
    pub namespace_name: String,
    pub namespace_id: String,
    pub namespace_arn: String,
}

/// Fargate task size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSize {
    /// CPU units
    pub cpu: u32,
    /// Memory in MiB
    pub ram: u32,
}

/// CPU target-tracking autoscaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingConfig {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_utilization_percent: u32,
    pub scale_in_cooldown_seconds: u32,
    pub scale_out_cooldown_seconds: u32,
}

/// Settings for one containerised service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Filled from the mapping key the service is declared under
    #[serde(default)]
    pub name: String,
    pub size: TaskSize,
    pub scaling: ScalingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_count: Option<u32>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub udp_ports: Vec<u16>,
    /// Container environment additions, keys are upper-cased on use.
    /// Declaration order is kept so the last of two colliding keys wins.
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    /// Secret name to Secrets Manager ARN, in declaration order
    #[serde(default)]
    pub secrets: IndexMap<String, String>,
}

/// How a service receives its traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Behind the shared network load balancer
    Nlb,
    /// Registered in a Cloud Map namespace
    CloudMap,
    /// Pulls its input; no listener
    Pull,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [ServiceKind::Nlb, ServiceKind::CloudMap, ServiceKind::Pull];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nlb => "nlb",
            Self::CloudMap => "cloudmap",
            Self::Pull => "pull",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound tier services grouped by kind, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InboundServices {
    pub nlb: Vec<ServiceConfig>,
    pub cloudmap: Vec<ServiceConfig>,
    pub pull: Vec<ServiceConfig>,
}

impl InboundServices {
    pub fn by_kind(&self, kind: ServiceKind) -> &[ServiceConfig] {
        match kind {
            ServiceKind::Nlb => &self.nlb,
            ServiceKind::CloudMap => &self.cloudmap,
            ServiceKind::Pull => &self.pull,
        }
    }

    /// All services in nlb, cloudmap, pull order
    pub fn iter(&self) -> impl Iterator<Item = (ServiceKind, &ServiceConfig)> {
        ServiceKind::ALL
            .into_iter()
            .flat_map(move |kind| self.by_kind(kind).iter().map(move |s| (kind, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.nlb.is_empty() && self.cloudmap.is_empty() && self.pull.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundConfig {
    pub services: InboundServices,
    pub namespace_props: Option<NamespaceProps>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundConfig {
    /// Pull services draining the queue
    pub services: Vec<ServiceConfig>,
}

impl OutboundConfig {
    /// The queue processor service, if declared
    pub fn processor(&self) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == PROCESSOR_SERVICE)
    }
}

impl AppContext {
    /// Parse a merged context tree
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        Self::from_view(&ContextView::new(tree))
    }

    /// Parse from a view over a merged context tree
    pub fn from_view(view: &ContextView) -> Result<Self> {
        let inbound = view.require("inbound")?;
        let outbound = view.require("outbound")?;
        let inbound_services = inbound.require("services")?;

        Ok(Self {
            stage: field(view, STAGE_KEY)?,
            default_desired_count: field(view, DESIRED_COUNT_KEY)?,
            account_id: field(view, "account_id")?,
            aws_region: field(view, "aws_region")?,
            debug_output: scalar_field(view, "debug_output")?,
            ingress_cidr: optional(view, "ingress_cidr")?,
            secrets_key_arn: optional(view, "secrets_key_arn")?,
            vpc_props: field(view, "vpc_props")?,
            queue: field(view, "queue")?,
            inbound: InboundConfig {
                services: InboundServices {
                    nlb: services(&inbound_services, "nlb")?,
                    cloudmap: services(&inbound_services, "cloudmap")?,
                    pull: services(&inbound_services, "pull")?,
                },
                namespace_props: optional(&inbound, "namespace_props")?,
            },
            outbound: OutboundConfig {
                services: match outbound.path("services") {
                    Some(group) => services(&group, "pull")?,
                    None => Vec::new(),
                },
            },
        })
    }

    /// Desired task count for a service: its own setting or the stage default
    pub fn effective_desired_count(&self, service: &ServiceConfig) -> u32 {
        service.desired_count.unwrap_or(self.default_desired_count)
    }
}

fn schema_error(view: &ContextView, error: impl fmt::Display) -> Error {
    Error::Schema {
        path: view.location().to_string(),
        message: error.to_string(),
    }
}

/// Deserialize a required field
fn field<T: DeserializeOwned>(view: &ContextView, path: &str) -> Result<T> {
    let target = view.require(path)?;
    if target.value().is_null() {
        return Err(Error::MissingField {
            path: target.location().to_string(),
        });
    }
    serde_json::from_value(target.to_value()).map_err(|e| schema_error(&target, e))
}

/// Deserialize an optional field; absent and null both read as `None`
fn optional<T: DeserializeOwned>(view: &ContextView, path: &str) -> Result<Option<T>> {
    match view.path(path) {
        Some(target) if !target.value().is_null() => serde_json::from_value(target.to_value())
            .map(Some)
            .map_err(|e| schema_error(&target, e)),
        _ => Ok(None),
    }
}

/// A required scalar of any type, rendered as a string
fn scalar_field(view: &ContextView, path: &str) -> Result<String> {
    let target = view.require(path)?;
    match target.value() {
        Value::Object(_) | Value::Array(_) => {
            Err(schema_error(&target, "expected a scalar value"))
        }
        scalar => Ok(scalar_to_string(scalar)),
    }
}

/// Services declared under `group.<kind>`, each parsed with its own path
fn services(group: &ContextView, kind: &str) -> Result<Vec<ServiceConfig>> {
    let Some(declared) = group.get(kind) else {
        return Ok(Vec::new());
    };
    if declared.value().is_null() {
        return Ok(Vec::new());
    }
    if !declared.is_mapping() {
        return Err(schema_error(&declared, "expected a mapping of service names"));
    }

    declared
        .items()
        .into_iter()
        .map(|(name, service)| {
            let mut config: ServiceConfig = serde_json::from_value(service.to_value())
                .map_err(|e| schema_error(&service, e))?;
            config.name = name;
            Ok(config)
        })
        .collect()
}
