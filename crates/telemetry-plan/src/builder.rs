//! Build a [`PipelinePlan`] from a typed context

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use telemetry_context::validate::JVM_HEAP_HEADROOM_MIB;
use telemetry_context::{AppContext, ServiceConfig, ServiceKind, has_errors, tree::scalar_to_string};

use crate::iam::{LOG_BUCKET_SUFFIX, TASK_EXECUTION_POLICY};
use crate::model::*;
use crate::{Error, Result};

const STREAM_ID: &str = "logstash_queue";
const STATE_TABLE_ID: &str = "logstash_state";
const REPOSITORY_ID: &str = "ecr";
const LOG_GROUP_ID: &str = "logs";
const EXECUTION_ROLE_ID: &str = "ecs_logstash-exec_role";
const IMAGE_TAG: &str = "latest";
const NLB_HEALTH_CHECK_GRACE_SECONDS: u32 = 600;
const CLOUDMAP_DNS_TTL_SECONDS: u32 = 15;

/// Stack ids and shared resource references for one stage
struct Stacks {
    queue: String,
    inbound_repository: String,
    inbound: String,
    outbound_repository: String,
    outbound: String,
}

impl Stacks {
    fn new(stage: &str) -> Self {
        Self {
            queue: StackRole::Queue.stack_id(stage),
            inbound_repository: StackRole::InboundRepository.stack_id(stage),
            inbound: StackRole::Inbound.stack_id(stage),
            outbound_repository: StackRole::OutboundRepository.stack_id(stage),
            outbound: StackRole::Outbound.stack_id(stage),
        }
    }

    fn id(&self, role: StackRole) -> &str {
        match role {
            StackRole::Queue => &self.queue,
            StackRole::InboundRepository => &self.inbound_repository,
            StackRole::Inbound => &self.inbound,
            StackRole::OutboundRepository => &self.outbound_repository,
            StackRole::Outbound => &self.outbound,
        }
    }

    fn stream(&self, attribute: &str) -> ResourceRef {
        ResourceRef::new(&self.queue, STREAM_ID, attribute)
    }

    fn state_table(&self, attribute: &str) -> ResourceRef {
        ResourceRef::new(&self.queue, STATE_TABLE_ID, attribute)
    }
}

/// Which tier a service stack belongs to
#[derive(Clone, Copy, PartialEq, Eq)]
enum Tier {
    Inbound,
    Outbound,
}

impl PipelinePlan {
    /// Build the plan for the context's stage.
    ///
    /// # Errors
    ///
    /// [`Error::Invalid`] if the context has error-level validation issues.
    pub fn build(ctx: &AppContext) -> Result<Self> {
        let issues = ctx.validate();
        for issue in &issues {
            tracing::debug!(%issue, "Context validation");
        }
        if has_errors(&issues) {
            return Err(Error::Invalid {
                issues: issues
                    .into_iter()
                    .filter(|i| i.level == telemetry_context::Severity::Error)
                    .collect(),
            });
        }

        let stacks = Stacks::new(&ctx.stage);
        let environment = DeployEnvironment {
            account: ctx.account_id.clone(),
            region: ctx.aws_region.clone(),
        };

        let plan = Self {
            stage: ctx.stage.clone(),
            environment: environment.clone(),
            stacks: StackRole::ALL
                .into_iter()
                .map(|role| build_stack(ctx, &stacks, role, &environment))
                .collect(),
        };

        tracing::debug!(
            stage = %plan.stage,
            stacks = plan.stacks.len(),
            services = plan.services().count(),
            "Built deployment plan"
        );
        Ok(plan)
    }

    /// Stack ids in declaration order
    pub fn stack_ids(&self) -> Vec<&str> {
        self.stacks.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn stack(&self, role: StackRole) -> Option<&StackPlan> {
        self.stacks.iter().find(|s| s.role == role)
    }

    /// All services across both tiers
    pub fn services(&self) -> impl Iterator<Item = &ServicePlan> {
        self.stacks.iter().flat_map(|stack| match &stack.body {
            StackBody::Services(body) => body.services.as_slice(),
            _ => &[],
        })
    }

    pub fn service(&self, name: &str) -> Option<&ServicePlan> {
        self.services().find(|s| s.name == name)
    }

    /// Content checksum of the plan (`sha256:<hex>`), stable across runs
    pub fn fingerprint(&self) -> Result<String> {
        let content = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Ok(format!("sha256:{:x}", hasher.finalize()))
    }
}

fn build_stack(
    ctx: &AppContext,
    stacks: &Stacks,
    role: StackRole,
    environment: &DeployEnvironment,
) -> StackPlan {
    let id = stacks.id(role).to_string();
    let (body, outputs) = match role {
        StackRole::Queue => (queue_body(ctx), Vec::new()),
        StackRole::InboundRepository | StackRole::OutboundRepository => repository_body(&id),
        StackRole::Inbound => service_stack(ctx, stacks, Tier::Inbound, &id),
        StackRole::Outbound => service_stack(ctx, stacks, Tier::Outbound, &id),
    };

    StackPlan {
        id,
        role,
        description: role.description().to_string(),
        environment: environment.clone(),
        body,
        outputs,
    }
}

fn queue_body(ctx: &AppContext) -> StackBody {
    StackBody::Queue(QueuePlan {
        stream: StreamPlan {
            id: STREAM_ID.to_string(),
            shard_count: ctx.queue.kinesis_shard_count,
        },
        state_table: TablePlan {
            id: STATE_TABLE_ID.to_string(),
            partition_key: "leaseKey".to_string(),
            partition_key_type: "string".to_string(),
            billing_mode: "pay_per_request".to_string(),
            removal_policy: "destroy".to_string(),
        },
    })
}

fn repository_body(stack_id: &str) -> (StackBody, Vec<StackOutput>) {
    let outputs = vec![StackOutput {
        id: "ecr-repo-name-out".to_string(),
        export_name: format!("{}-ecr-repo-name", stack_id),
        value: ResourceRef::new(stack_id, REPOSITORY_ID, "repository_name").into(),
    }];
    (
        StackBody::Repository(RepositoryPlan {
            id: REPOSITORY_ID.to_string(),
        }),
        outputs,
    )
}

fn service_stack(
    ctx: &AppContext,
    stacks: &Stacks,
    tier: Tier,
    stack_id: &str,
) -> (StackBody, Vec<StackOutput>) {
    let repository_stack = match tier {
        Tier::Inbound => &stacks.inbound_repository,
        Tier::Outbound => &stacks.outbound_repository,
    };
    let builder = ServiceBuilder {
        ctx,
        stacks,
        tier,
        stack_id,
        repository: ResourceRef::new(repository_stack, REPOSITORY_ID, "repository_uri"),
        log_group: ResourceRef::new(stack_id, LOG_GROUP_ID, "log_group_arn"),
    };

    let mut execution_role =
        RolePlan::for_ecs_tasks(EXECUTION_ROLE_ID).with_managed_policy(TASK_EXECUTION_POLICY);
    if let Some(key_arn) = &ctx.secrets_key_arn {
        execution_role.allow_kms_decrypt(key_arn);
    }
    execution_role.grant_log_write(builder.log_group.clone());

    let services: Vec<ServicePlan> = match tier {
        Tier::Inbound => ctx
            .inbound
            .services
            .iter()
            .map(|(kind, service)| builder.service(kind, service))
            .collect(),
        Tier::Outbound => ctx
            .outbound
            .processor()
            .map(|service| builder.service(ServiceKind::Pull, service))
            .into_iter()
            .collect(),
    };

    let load_balancer = (tier == Tier::Inbound).then(|| LoadBalancerPlan {
        id: format!("{}-nlb", stack_id),
        internet_facing: false,
        cross_zone_enabled: true,
    });

    let cluster_id = format!("{}_cluster", stack_id);
    let service_names = services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let outputs = vec![
        StackOutput {
            id: "cluster-name-out".to_string(),
            export_name: format!("{}-cluster-name", stack_id),
            value: ResourceRef::new(stack_id, &cluster_id, "cluster_name").into(),
        },
        StackOutput {
            id: "service-names-out".to_string(),
            export_name: format!("{}-service-names", stack_id),
            value: PlanValue::Literal(service_names),
        },
    ];

    let body = ServiceStackPlan {
        cluster_id,
        vpc: ctx.vpc_props.clone(),
        log_group_id: LOG_GROUP_ID.to_string(),
        execution_role,
        load_balancer,
        services,
    };
    (StackBody::Services(Box::new(body)), outputs)
}

struct ServiceBuilder<'a> {
    ctx: &'a AppContext,
    stacks: &'a Stacks,
    tier: Tier,
    stack_id: &'a str,
    repository: ResourceRef,
    log_group: ResourceRef,
}

impl ServiceBuilder<'_> {
    fn service(&self, kind: ServiceKind, service: &ServiceConfig) -> ServicePlan {
        let name = &service.name;
        let (port_mappings, ingress) = self.ports(kind, service);

        let listeners = match kind {
            ServiceKind::Nlb => service
                .ports
                .iter()
                .map(|port| ListenerPlan {
                    id: format!("{}_{}", name, port),
                    port: *port,
                    target_group_id: format!("{}_{}_tg", name, port),
                })
                .collect(),
            _ => Vec::new(),
        };

        let service_discovery = match (kind, &self.ctx.inbound.namespace_props) {
            (ServiceKind::CloudMap, Some(namespace)) => Some(ServiceDiscoveryPlan {
                namespace: namespace.clone(),
                dns_record_type: "A".to_string(),
                dns_ttl_seconds: CLOUDMAP_DNS_TTL_SECONDS,
            }),
            _ => None,
        };

        ServicePlan {
            name: name.clone(),
            kind,
            cpu: service.size.cpu,
            memory_mib: service.size.ram,
            desired_count: self.ctx.effective_desired_count(service),
            image: ImagePlan {
                repository: self.repository.clone(),
                tag: IMAGE_TAG.to_string(),
            },
            log_stream_prefix: name.clone(),
            environment: self.environment(service),
            secrets: service
                .secrets
                .iter()
                .map(|(key, arn)| (format!("{}_SECRET", key.to_uppercase()), arn.clone()))
                .collect(),
            port_mappings,
            ingress,
            listeners,
            scaling: ScalingPlan {
                min_capacity: service.scaling.min_capacity,
                max_capacity: service.scaling.max_capacity,
                target_cpu_utilization_percent: service.scaling.target_utilization_percent,
                scale_in_cooldown_seconds: service.scaling.scale_in_cooldown_seconds,
                scale_out_cooldown_seconds: service.scaling.scale_out_cooldown_seconds,
            },
            task_role: self.task_role(service),
            health_check_grace_period_seconds: (kind == ServiceKind::Nlb)
                .then_some(NLB_HEALTH_CHECK_GRACE_SECONDS),
            service_discovery,
        }
    }

    /// Container port mappings and the matching security group ingress
    fn ports(&self, kind: ServiceKind, service: &ServiceConfig) -> (Vec<PortMapping>, Vec<IngressRule>) {
        let mut ports: Vec<(u16, Protocol)> = Vec::new();
        match kind {
            ServiceKind::Nlb => {
                ports.extend(service.ports.iter().map(|p| (*p, Protocol::Tcp)));
            }
            ServiceKind::CloudMap => {
                ports.extend(service.ports.iter().map(|p| (*p, Protocol::Tcp)));
                ports.extend(service.udp_ports.iter().map(|p| (*p, Protocol::Udp)));
            }
            ServiceKind::Pull => {}
        }

        let mappings = ports
            .iter()
            .map(|(port, protocol)| PortMapping {
                container_port: *port,
                host_port: *port,
                protocol: *protocol,
            })
            .collect();

        let ingress = match &self.ctx.ingress_cidr {
            Some(cidr) => ports
                .iter()
                .map(|(port, protocol)| IngressRule {
                    cidr: cidr.clone(),
                    port: *port,
                    protocol: *protocol,
                    description: format!("Logstash ingress for {}", service.name),
                })
                .collect(),
            None => Vec::new(),
        };

        (mappings, ingress)
    }

    /// Container environment: pipeline defaults, then service variables
    fn environment(&self, service: &ServiceConfig) -> BTreeMap<String, PlanValue> {
        let ctx = self.ctx;
        let mut env = BTreeMap::new();
        env.insert("ENV_STAGE".to_string(), PlanValue::literal(&ctx.stage));
        env.insert("SERVICE_NAME".to_string(), PlanValue::literal(&service.name));
        env.insert("DEBUG_OUTPUT".to_string(), PlanValue::literal(&ctx.debug_output));
        env.insert(
            "LS_JAVA_OPTS".to_string(),
            PlanValue::literal(format!(
                "-Xms256m -Xmx{}m",
                service.size.ram.saturating_sub(JVM_HEAP_HEADROOM_MIB)
            )),
        );
        env.insert(
            "KINESIS_ENDPOINT".to_string(),
            PlanValue::literal(&ctx.queue.kinesis_endpoint),
        );
        env.insert(
            "KINESIS_STREAM_NAME".to_string(),
            self.stacks.stream("stream_name").into(),
        );
        env.insert("AWS_REGION".to_string(), PlanValue::literal(&ctx.aws_region));
        if self.tier == Tier::Outbound {
            env.insert(
                "DYNAMODB_STATE_TABLE_NAME".to_string(),
                self.stacks.state_table("table_name").into(),
            );
        }

        for (key, value) in &service.variables {
            env.insert(key.to_uppercase(), PlanValue::Literal(scalar_to_string(value)));
        }
        env
    }

    fn task_role(&self, service: &ServiceConfig) -> RolePlan {
        let mut role = RolePlan::for_ecs_tasks(format!("{}_task_role", service.name));
        role.allow_put_metrics();

        match self.tier {
            Tier::Inbound => role.grant_stream_write(self.stacks.stream("stream_arn")),
            Tier::Outbound => {
                role.grant_stream_read(self.stacks.stream("stream_arn"));
                role.allow(
                    &["kinesis:ListShards"],
                    vec![self.stacks.stream("stream_arn").into()],
                );
                role.grant_table_full_access(self.stacks.state_table("table_arn"));
                role.grant_archive_upload(archive_buckets(service));
            }
        }

        tracing::trace!(stack = self.stack_id, role = %role.id, "Task role");
        role
    }
}

/// Values of service variables naming archive buckets, rendered like
/// every other container variable
fn archive_buckets(service: &ServiceConfig) -> Vec<String> {
    service
        .variables
        .iter()
        .filter(|(key, _)| key.ends_with(LOG_BUCKET_SUFFIX))
        .map(|(_, value)| scalar_to_string(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn processor(variables: Vec<(&str, Value)>) -> ServiceConfig {
        ServiceConfig {
            name: "processor".into(),
            size: telemetry_context::TaskSize { cpu: 512, ram: 1024 },
            scaling: telemetry_context::ScalingConfig {
                min_capacity: 1,
                max_capacity: 1,
                target_utilization_percent: 50,
                scale_in_cooldown_seconds: 60,
                scale_out_cooldown_seconds: 60,
            },
            desired_count: None,
            ports: vec![],
            udp_ports: vec![],
            variables: variables
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            secrets: Default::default(),
        }
    }

    #[test]
    fn archive_buckets_only_reads_log_bucket_variables() {
        let service = processor(vec![
            ("archive_log_bucket", json!("archive")),
            ("audit_log_bucket", json!("audit")),
            ("log_bucket_region", json!("eu-west-1")),
        ]);

        assert_eq!(archive_buckets(&service), vec!["archive", "audit"]);
    }

    #[test]
    fn archive_buckets_render_non_string_values() {
        let service = processor(vec![
            ("numeric_log_bucket", json!(42)),
            ("flag_log_bucket", json!(true)),
        ]);

        assert_eq!(archive_buckets(&service), vec!["42", "true"]);

        let mut role = RolePlan::for_ecs_tasks("processor_task_role");
        role.grant_archive_upload(archive_buckets(&service));
        assert_eq!(role.actions_on(&PlanValue::literal("arn:aws:s3:::42/*")).len(), 4);
    }

    #[test]
    fn stack_ids_follow_stage() {
        let stacks = Stacks::new("qa");
        assert_eq!(stacks.queue, "qa-telemetry-logstash-queue");
        assert_eq!(stacks.inbound_repository, "qa-telemetry-logstash-in-ecr");
        assert_eq!(stacks.inbound, "qa-telemetry-logstash-in");
        assert_eq!(stacks.outbound_repository, "qa-telemetry-logstash-out-ecr");
        assert_eq!(stacks.outbound, "qa-telemetry-logstash-out");
    }
}
