//! Plan data model
//!
//! Everything here is plain data describing what the infrastructure engine
//! should declare. Values that only exist once the engine has created a
//! resource (stream names, table names, ARNs) are carried as
//! [`ResourceRef`]s and never resolved.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use telemetry_context::{NamespaceProps, ServiceKind, VpcProps};

/// Account and region every stack deploys into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployEnvironment {
    pub account: String,
    pub region: String,
}

/// Reference to an attribute of a resource declared in some stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub stack: String,
    pub resource: String,
    pub attribute: String,
}

impl ResourceRef {
    pub fn new(
        stack: impl Into<String>,
        resource: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}/{}.{}}}", self.stack, self.resource, self.attribute)
    }
}

/// A value that is either known now or produced by the engine later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanValue {
    Literal(String),
    Ref(ResourceRef),
}

impl PlanValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }
}

impl From<ResourceRef> for PlanValue {
    fn from(reference: ResourceRef) -> Self {
        Self::Ref(reference)
    }
}

impl fmt::Display for PlanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Ref(reference) => write!(f, "{}", reference),
        }
    }
}

/// Exported stack output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub id: String,
    pub export_name: String,
    pub value: PlanValue,
}

/// Which of the five pipeline stacks a plan entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackRole {
    Queue,
    InboundRepository,
    Inbound,
    OutboundRepository,
    Outbound,
}

impl StackRole {
    /// Declaration order
    pub const ALL: [StackRole; 5] = [
        StackRole::Queue,
        StackRole::InboundRepository,
        StackRole::Inbound,
        StackRole::OutboundRepository,
        StackRole::Outbound,
    ];

    /// Stack id suffix appended to `{stage}-`
    pub fn id_suffix(&self) -> &'static str {
        match self {
            Self::Queue => "telemetry-logstash-queue",
            Self::InboundRepository => "telemetry-logstash-in-ecr",
            Self::Inbound => "telemetry-logstash-in",
            Self::OutboundRepository => "telemetry-logstash-out-ecr",
            Self::Outbound => "telemetry-logstash-out",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Queue => "Telemetry: Kinesis buffer queue for pipeline",
            Self::InboundRepository => "Telemetry: ECR for inbound pipeline",
            Self::Inbound => "Telemetry: Logstash for inbound pipeline",
            Self::OutboundRepository => "Telemetry: ECR for outbound pipeline",
            Self::Outbound => "Telemetry: Logstash for outbound pipeline",
        }
    }

    pub fn stack_id(&self, stage: &str) -> String {
        format!("{}-{}", stage, self.id_suffix())
    }
}

/// One stack of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackPlan {
    pub id: String,
    pub role: StackRole,
    pub description: String,
    pub environment: DeployEnvironment,
    pub body: StackBody,
    pub outputs: Vec<StackOutput>,
}

/// Resources declared by a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StackBody {
    Queue(QueuePlan),
    Repository(RepositoryPlan),
    Services(Box<ServiceStackPlan>),
}

/// Buffer stream plus the consumer lease table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePlan {
    pub stream: StreamPlan,
    pub state_table: TablePlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPlan {
    pub id: String,
    pub shard_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePlan {
    pub id: String,
    pub partition_key: String,
    pub partition_key_type: String,
    pub billing_mode: String,
    pub removal_policy: String,
}

/// Container image repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPlan {
    pub id: String,
}

/// A Fargate cluster with its services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStackPlan {
    pub cluster_id: String,
    pub vpc: VpcProps,
    pub log_group_id: String,
    pub execution_role: RolePlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancerPlan>,
    pub services: Vec<ServicePlan>,
}

/// Internal network load balancer shared by `nlb` services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerPlan {
    pub id: String,
    pub internet_facing: bool,
    pub cross_zone_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub cidr: String,
    pub port: u16,
    pub protocol: Protocol,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerPlan {
    pub id: String,
    pub port: u16,
    pub target_group_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPlan {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_cpu_utilization_percent: u32,
    pub scale_in_cooldown_seconds: u32,
    pub scale_out_cooldown_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDiscoveryPlan {
    pub namespace: NamespaceProps,
    pub dns_record_type: String,
    pub dns_ttl_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePlan {
    pub repository: ResourceRef,
    pub tag: String,
}

/// One Fargate service with its task and container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub name: String,
    pub kind: ServiceKind,
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    pub image: ImagePlan,
    pub log_stream_prefix: String,
    pub environment: BTreeMap<String, PlanValue>,
    /// Environment variable name to Secrets Manager ARN
    pub secrets: BTreeMap<String, String>,
    pub port_mappings: Vec<PortMapping>,
    pub ingress: Vec<IngressRule>,
    pub listeners: Vec<ListenerPlan>,
    pub scaling: ScalingPlan,
    pub task_role: RolePlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_grace_period_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_discovery: Option<ServiceDiscoveryPlan>,
}

/// IAM role assumed by ECS tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePlan {
    pub id: String,
    pub assumed_by: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_policies: Vec<String>,
    pub statements: Vec<PolicyStatement>,
}

/// An allow statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<PlanValue>,
}

/// The complete pipeline for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub stage: String,
    pub environment: DeployEnvironment,
    pub stacks: Vec<StackPlan>,
}
