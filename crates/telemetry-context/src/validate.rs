//! Consistency checks for a typed deployment context
//!
//! Parsing guarantees every required field is present; these checks catch
//! combinations that parse fine but cannot be deployed, plus a few likely
//! data-entry mistakes.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{AppContext, PROCESSOR_SERVICE, ServiceConfig, ServiceKind};

/// Heap reserved for the JVM below the container memory limit, in MiB
pub const JVM_HEAP_HEADROOM_MIB: u32 = 256;

/// CPU unit values Fargate accepts
pub const FARGATE_CPU_UNITS: [u32; 5] = [256, 512, 1024, 2048, 4096];

static ACCOUNT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{12}$").unwrap());

static SECRET_ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:secretsmanager:[a-z0-9-]+:\d{12}:secret:.+$").unwrap()
});

static KMS_KEY_ARN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^arn:aws[a-z-]*:kms:[a-z0-9-]+:\d{12}:key/.+$").unwrap());

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational notice
    Info,
    /// Potential problem
    Warning,
    /// Configuration that cannot be deployed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single finding about the context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: Severity,
    /// Dotted path of the setting concerned
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(level: Severity, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.level, self.path, self.message)
    }
}

/// True if any issue is error-level
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|issue| issue.level == Severity::Error)
}

impl AppContext {
    /// Check the context for undeployable or suspicious settings
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !ACCOUNT_ID_PATTERN.is_match(&self.account_id) {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                "account_id",
                format!("'{}' is not a 12-digit account id", self.account_id),
            ));
        }

        if self.queue.kinesis_shard_count == 0 {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "queue.kinesis_shard_count",
                "stream needs at least one shard",
            ));
        }

        if let Some(arn) = &self.secrets_key_arn {
            if !KMS_KEY_ARN_PATTERN.is_match(arn) {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    "secrets_key_arn",
                    format!("'{}' does not look like a KMS key ARN", arn),
                ));
            }
        }

        self.check_ingress(&mut issues);

        if self.inbound.services.is_empty() {
            issues.push(ValidationIssue::new(
                Severity::Info,
                "inbound.services",
                "no inbound services configured",
            ));
        }

        let mut listener_ports: HashMap<u16, &str> = HashMap::new();
        for service in &self.inbound.services.nlb {
            let path = service_path("inbound", ServiceKind::Nlb, service);
            if service.ports.is_empty() {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    format!("{}.ports", path),
                    "load balanced service declares no ports",
                ));
            }
            for port in &service.ports {
                if let Some(owner) = listener_ports.insert(*port, &service.name) {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        format!("{}.ports", path),
                        format!("port {} already has a listener for '{}'", port, owner),
                    ));
                }
            }
        }

        if !self.inbound.services.cloudmap.is_empty() && self.inbound.namespace_props.is_none() {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "inbound.namespace_props",
                "cloudmap services need a namespace",
            ));
        }

        for (kind, service) in self.inbound.services.iter() {
            check_service(&service_path("inbound", kind, service), service, &mut issues);
        }

        if self.outbound.processor().is_none() {
            issues.push(ValidationIssue::new(
                Severity::Error,
                format!("outbound.services.pull.{}", PROCESSOR_SERVICE),
                "outbound processor service is not declared",
            ));
        }
        for service in &self.outbound.services {
            check_service(
                &service_path("outbound", ServiceKind::Pull, service),
                service,
                &mut issues,
            );
        }

        issues
    }

    fn check_ingress(&self, issues: &mut Vec<ValidationIssue>) {
        let listening = !self.inbound.services.nlb.is_empty()
            || !self.inbound.services.cloudmap.is_empty();

        match &self.ingress_cidr {
            None if listening => issues.push(ValidationIssue::new(
                Severity::Error,
                "ingress_cidr",
                "listening services need an ingress range",
            )),
            None => {}
            Some(cidr) if !is_ipv4_cidr(cidr) => issues.push(ValidationIssue::new(
                Severity::Warning,
                "ingress_cidr",
                format!("'{}' is not an IPv4 CIDR range", cidr),
            )),
            Some(_) => {}
        }
    }
}

fn service_path(tier: &str, kind: ServiceKind, service: &ServiceConfig) -> String {
    format!("{}.services.{}.{}", tier, kind, service.name)
}

fn check_service(path: &str, service: &ServiceConfig, issues: &mut Vec<ValidationIssue>) {
    if service.size.ram <= JVM_HEAP_HEADROOM_MIB {
        issues.push(ValidationIssue::new(
            Severity::Error,
            format!("{}.size.ram", path),
            format!(
                "{} MiB leaves no JVM heap above the {} MiB headroom",
                service.size.ram, JVM_HEAP_HEADROOM_MIB
            ),
        ));
    }

    if !FARGATE_CPU_UNITS.contains(&service.size.cpu) {
        issues.push(ValidationIssue::new(
            Severity::Warning,
            format!("{}.size.cpu", path),
            format!("{} is not a Fargate CPU value", service.size.cpu),
        ));
    }

    let scaling = &service.scaling;
    if scaling.min_capacity > scaling.max_capacity {
        issues.push(ValidationIssue::new(
            Severity::Error,
            format!("{}.scaling", path),
            format!(
                "min_capacity {} exceeds max_capacity {}",
                scaling.min_capacity, scaling.max_capacity
            ),
        ));
    }
    if !(1..=100).contains(&scaling.target_utilization_percent) {
        issues.push(ValidationIssue::new(
            Severity::Error,
            format!("{}.scaling.target_utilization_percent", path),
            format!(
                "{} is outside 1..=100",
                scaling.target_utilization_percent
            ),
        ));
    }

    for (name, arn) in &service.secrets {
        if !SECRET_ARN_PATTERN.is_match(arn) {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                format!("{}.secrets.{}", path, name),
                format!("'{}' does not look like a Secrets Manager ARN", arn),
            ));
        }
    }
}

fn is_ipv4_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    address.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|p| p <= 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        InboundConfig, InboundServices, NamespaceProps, OutboundConfig, QueueConfig,
        ScalingConfig, TaskSize, VpcProps,
    };
    use indexmap::IndexMap;
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn service(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            size: TaskSize { cpu: 512, ram: 1024 },
            scaling: ScalingConfig {
                min_capacity: 1,
                max_capacity: 2,
                target_utilization_percent: 50,
                scale_in_cooldown_seconds: 60,
                scale_out_cooldown_seconds: 60,
            },
            desired_count: None,
            ports: Vec::new(),
            udp_ports: Vec::new(),
            variables: IndexMap::new(),
            secrets: IndexMap::new(),
        }
    }

    fn context() -> AppContext {
        AppContext {
            stage: "dev".into(),
            default_desired_count: 1,
            account_id: "123456789012".into(),
            aws_region: "eu-west-1".into(),
            debug_output: "false".into(),
            ingress_cidr: Some("10.0.0.0/8".into()),
            secrets_key_arn: None,
            vpc_props: VpcProps {
                vpc_id: "vpc-1".into(),
                availability_zones: vec!["eu-west-1a".into()],
                public_subnet_ids: None,
                private_subnet_ids: None,
                isolated_subnet_ids: None,
                vpc_cidr_block: None,
                extra: BTreeMap::new(),
            },
            queue: QueueConfig {
                kinesis_shard_count: 1,
                kinesis_endpoint: "kinesis.eu-west-1.amazonaws.com".into(),
            },
            inbound: InboundConfig {
                services: InboundServices {
                    pull: vec![service("poller")],
                    ..Default::default()
                },
                namespace_props: None,
            },
            outbound: OutboundConfig {
                services: vec![service(PROCESSOR_SERVICE)],
            },
        }
    }

    #[test]
    fn valid_context_has_no_issues() {
        assert!(context().validate().is_empty());
    }

    #[test]
    fn missing_processor_is_an_error() {
        let mut ctx = context();
        ctx.outbound.services.clear();
        let issues = ctx.validate();
        assert!(has_errors(&issues));
        assert_eq!(issues[0].path, "outbound.services.pull.processor");
    }

    #[test]
    fn cloudmap_without_namespace_is_an_error() {
        let mut ctx = context();
        let mut syslog = service("syslog");
        syslog.udp_ports = vec![514];
        ctx.inbound.services.cloudmap.push(syslog);

        let issues = ctx.validate();
        assert!(issues.iter().any(|i| i.path == "inbound.namespace_props"));

        ctx.inbound.namespace_props = Some(NamespaceProps {
            namespace_name: "telemetry.example.com".into(),
            namespace_id: "ns-1".into(),
            namespace_arn: "arn:aws:servicediscovery:eu-west-1:123456789012:namespace/ns-1".into(),
        });
        assert!(!has_errors(&ctx.validate()));
    }

    #[test]
    fn listening_service_without_ingress_is_an_error() {
        let mut ctx = context();
        ctx.ingress_cidr = None;
        assert!(!has_errors(&ctx.validate()));

        let mut beats = service("beats");
        beats.ports = vec![5044];
        ctx.inbound.services.nlb.push(beats);
        let issues = ctx.validate();
        assert!(issues.iter().any(|i| i.path == "ingress_cidr" && i.level == Severity::Error));
    }

    #[test]
    fn duplicate_listener_port_is_a_warning() {
        let mut ctx = context();
        let mut beats = service("beats");
        beats.ports = vec![5044];
        let mut other = service("other");
        other.ports = vec![5044];
        ctx.inbound.services.nlb = vec![beats, other];

        let issues = ctx.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, Severity::Warning);
        assert!(issues[0].message.contains("'beats'"));
    }

    #[test]
    fn empty_inbound_is_informational() {
        let mut ctx = context();
        ctx.inbound.services.pull.clear();
        let issues = ctx.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, Severity::Info);
    }

    #[test]
    fn load_balanced_service_without_ports_is_an_error() {
        let mut ctx = context();
        ctx.inbound.services.nlb.push(service("beats"));

        let issues = ctx.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, Severity::Error);
        assert_eq!(issues[0].path, "inbound.services.nlb.beats.ports");
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(50, false)]
    #[case(100, false)]
    #[case(101, true)]
    fn target_utilization_bounds(#[case] percent: u32, #[case] rejected: bool) {
        let mut ctx = context();
        ctx.outbound.services[0].scaling.target_utilization_percent = percent;

        let issues = ctx.validate();
        assert_eq!(has_errors(&issues), rejected);
        if rejected {
            assert_eq!(issues.len(), 1);
            assert_eq!(
                issues[0].path,
                "outbound.services.pull.processor.scaling.target_utilization_percent"
            );
        }
    }

    #[rstest]
    #[case::short_account("account_id")]
    #[case::malformed_ingress("ingress_cidr")]
    fn suspicious_identifiers_are_warnings(#[case] path: &str) {
        let mut ctx = context();
        match path {
            "account_id" => ctx.account_id = "1234".into(),
            _ => ctx.ingress_cidr = Some("10.0.0.0/33".into()),
        }

        let issues = ctx.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, path);
        assert_eq!(issues[0].level, Severity::Warning);
        assert!(!has_errors(&issues));
    }

    #[rstest]
    #[case(256, 512, Severity::Error)]
    #[case(1024, 300, Severity::Warning)]
    fn sizing_checks(#[case] ram: u32, #[case] cpu: u32, #[case] expected: Severity) {
        let mut ctx = context();
        ctx.outbound.services[0].size = TaskSize { cpu, ram };
        let issues = ctx.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, expected);
    }

    #[rstest]
    #[case("10.0.0.0/8", true)]
    #[case("0.0.0.0/0", true)]
    #[case("10.0.0.0", false)]
    #[case("10.0.0.0/33", false)]
    #[case("example.com/24", false)]
    fn cidr_parsing(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_ipv4_cidr(value), expected);
    }

    #[test]
    fn malformed_arns_are_warnings() {
        let mut ctx = context();
        ctx.secrets_key_arn = Some("not-an-arn".into());
        ctx.outbound.services[0]
            .secrets
            .insert("es_password".into(), "plain".into());

        let issues = ctx.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.level == Severity::Warning));
        assert!(!has_errors(&issues));
    }

    #[test]
    fn inverted_scaling_bounds_are_errors() {
        let mut ctx = context();
        ctx.outbound.services[0].scaling.min_capacity = 5;
        let issues = ctx.validate();
        assert_eq!(issues[0].path, "outbound.services.pull.processor.scaling");
    }
}
