//! In-memory context documents.
//!
//! [`sample_document`] mirrors a real `cdk.json`: shared defaults carry the
//! full service catalogue, `dev` only supplies account and network details,
//! `prod` additionally resizes the queue and the processor.

use serde_json::{Value, json};

/// A service declaration with the given task size and default scaling.
pub fn service(cpu: u32, ram: u32) -> Value {
    json!({
        "size": {"cpu": cpu, "ram": ram},
        "scaling": {
            "min_capacity": 1,
            "max_capacity": 4,
            "target_utilization_percent": 60,
            "scale_in_cooldown_seconds": 300,
            "scale_out_cooldown_seconds": 60
        }
    })
}

fn with(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

/// Shared defaults common to all stages.
pub fn shared_branch() -> Value {
    json!({
        "aws_region": "eu-west-1",
        "debug_output": "false",
        "ingress_cidr": "10.0.0.0/8",
        "queue": {
            "kinesis_endpoint": "https://kinesis.eu-west-1.amazonaws.com",
            "kinesis_shard_count": 1
        },
        "inbound": {
            "namespace_props": {
                "namespace_name": "telemetry.example.com",
                "namespace_id": "ns-abcdef0123456789",
                "namespace_arn": "arn:aws:servicediscovery:eu-west-1:111111111111:namespace/ns-abcdef0123456789"
            },
            "services": {
                "nlb": {
                    "beats": with(service(512, 1024), json!({"ports": [5044]}))
                },
                "cloudmap": {
                    "syslog": with(service(512, 1024), json!({"ports": [601], "udp_ports": [514]}))
                },
                "pull": {
                    "cloudtrail": with(service(256, 512), json!({
                        "variables": {"sqs_queue_url": "https://sqs.eu-west-1.amazonaws.com/111111111111/cloudtrail"}
                    }))
                }
            }
        },
        "outbound": {
            "services": {
                "pull": {
                    "processor": with(service(1024, 2048), json!({
                        "variables": {
                            "archive_log_bucket": "telemetry-archive-dev",
                            "elasticsearch_url": "https://search.example.com:443"
                        },
                        "secrets": {
                            "elasticsearch_password": "arn:aws:secretsmanager:eu-west-1:111111111111:secret:es-password-AbCdEf"
                        }
                    }))
                }
            }
        }
    })
}

/// Overrides for the `dev` stage.
pub fn dev_branch() -> Value {
    json!({
        "account_id": "111111111111",
        "vpc_props": {
            "vpc_id": "vpc-0dev",
            "availability_zones": ["eu-west-1a", "eu-west-1b"],
            "private_subnet_ids": ["subnet-0deva", "subnet-0devb"]
        }
    })
}

/// Overrides for the `prod` stage.
pub fn prod_branch() -> Value {
    json!({
        "account_id": "222222222222",
        "secrets_key_arn": "arn:aws:kms:eu-west-1:222222222222:key/1234abcd-12ab-34cd-56ef-1234567890ab",
        "vpc_props": {
            "vpc_id": "vpc-0prod",
            "availability_zones": ["eu-west-1a", "eu-west-1b", "eu-west-1c"],
            "private_subnet_ids": ["subnet-0proda", "subnet-0prodb", "subnet-0prodc"]
        },
        "queue": {"kinesis_shard_count": 4},
        "outbound": {
            "services": {
                "pull": {
                    "processor": {
                        "desired_count": 2,
                        "size": {"cpu": 2048, "ram": 4096},
                        "variables": {"archive_log_bucket": "telemetry-archive-prod"}
                    }
                }
            }
        }
    })
}

/// A complete `cdk.json`-style document with `shared`, `dev` and `prod`
/// branches and no stage selected.
pub fn sample_document() -> Value {
    json!({
        "app": "telemetry plan",
        "context": {
            "shared": shared_branch(),
            "dev": dev_branch(),
            "prod": prod_branch()
        }
    })
}
